//! State reconciler.
//!
//! The only writer of [`CounterState`]. Every entry point (the app surface,
//! the widget, the scheduled jobs) goes through the same routine:
//!
//! ```text
//! load -> apply period resets -> (check-in only) apply delta -> save
//! ```
//!
//! A mutex is held across the whole sequence, and the store's `update`
//! runs it as one unit, so concurrent callers queue instead of reading a
//! stale baseline and double-counting.
//!
//! ## Delta scheme
//!
//! `today_cycles` is recomputed from the clock on every check-in. Only the
//! difference from `last_recorded_today_cycles` is added to the week and
//! month totals, so repeated check-ins on one day add each cycle once.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cycles::CycleClock;
use crate::error::Result;
use crate::events::Event;
use crate::reset::ResetSet;
use crate::state::CounterState;
use crate::storage::StateStore;

/// Result of one reconciler operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub state: CounterState,
    pub resets: ResetSet,
    /// Cycles added to week and month totals. Always 0 for a passive pass.
    pub delta: u32,
    pub events: Vec<Event>,
}

/// Zero the counters whose period boundary was crossed since the last reset.
pub fn apply_resets(state: &mut CounterState, now: NaiveDateTime) -> ResetSet {
    let today = now.date();
    let resets = ResetSet::evaluate(today, state.last_reset_date);
    if resets.daily {
        state.today_cycles = 0;
        state.last_recorded_today_cycles = 0;
    }
    if resets.weekly {
        state.week_cycles = 0;
    }
    if resets.monthly {
        state.month_cycles = 0;
    }
    if resets.any() {
        state.last_reset_date = Some(today);
    }
    resets
}

/// Recompute today's cycles and add the newly elapsed ones to the totals.
///
/// Expects [`apply_resets`] to have run for the same `now`. Returns the delta.
pub fn apply_check_in(state: &mut CounterState, clock: &CycleClock, now: NaiveDateTime) -> u32 {
    let current = clock.cycles(now.date(), now);
    let delta = match current.checked_sub(state.last_recorded_today_cycles) {
        Some(delta) => delta,
        None => {
            warn!(
                current,
                recorded = state.last_recorded_today_cycles,
                "recorded cycles exceed recomputed cycles, clamping delta to 0"
            );
            0
        }
    };
    state.week_cycles = state.week_cycles.saturating_add(delta);
    state.month_cycles = state.month_cycles.saturating_add(delta);
    state.today_cycles = current;
    state.last_recorded_today_cycles = current;
    state.last_check_in = Some(now);
    delta
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Passive,
    CheckIn,
}

/// Serialized owner of the counter state.
pub struct Reconciler<S> {
    store: S,
    clock: CycleClock,
    /// Last state computed by this reconciler; also the writer lock.
    last: Mutex<CounterState>,
}

impl<S: StateStore> Reconciler<S> {
    pub fn new(store: S, clock: CycleClock) -> Self {
        let last = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not load counter state, starting from defaults");
            CounterState::default()
        });
        Self {
            store,
            clock,
            last: Mutex::new(last),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    /// The state as last computed, even if saving it failed.
    pub fn snapshot(&self) -> CounterState {
        self.lock().clone()
    }

    /// Apply period resets, then record a check-in at `now`.
    ///
    /// # Errors
    /// Returns the store error if loading or saving fails. When only the
    /// save failed, [`snapshot`](Self::snapshot) holds the computed state.
    pub fn check_in(&self, now: NaiveDateTime) -> Result<Reconciliation> {
        self.run(now, Mode::CheckIn)
    }

    /// Apply period resets only. Used on app start, widget refresh and by
    /// the scheduled reset jobs.
    pub fn reconcile(&self, now: NaiveDateTime) -> Result<Reconciliation> {
        self.run(now, Mode::Passive)
    }

    /// Reset every field to its default and persist.
    pub fn clear_all(&self, now: NaiveDateTime) -> Result<Reconciliation> {
        let mut last = self.lock();
        *last = CounterState::default();
        self.store.save(&last).inspect_err(|e| {
            warn!(error = %e, "failed to persist cleared records");
        })?;
        info!("all records cleared");
        Ok(Reconciliation {
            state: last.clone(),
            resets: ResetSet::default(),
            delta: 0,
            events: vec![Event::RecordsCleared { at: now }],
        })
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run(&self, now: NaiveDateTime, mode: Mode) -> Result<Reconciliation> {
        let mut last = self.lock();
        let clock = self.clock;
        let mut computed: Option<(CounterState, ResetSet, u32)> = None;

        let saved = self.store.update(&mut |mut state| {
            let resets = apply_resets(&mut state, now);
            let delta = match mode {
                Mode::CheckIn => apply_check_in(&mut state, &clock, now),
                Mode::Passive => 0,
            };
            computed = Some((state.clone(), resets, delta));
            state
        });

        let (state, resets, delta) = match (saved, computed) {
            (Ok(saved), Some((_, resets, delta))) => (saved, resets, delta),
            (Ok(saved), None) => (saved, ResetSet::default(), 0),
            (Err(e), computed) => {
                if let Some((state, _, _)) = computed {
                    *last = state;
                }
                warn!(error = %e, ?mode, "failed to persist counter state");
                return Err(e);
            }
        };
        *last = state.clone();

        let mut events = Vec::new();
        if resets.any() {
            info!(
                daily = resets.daily,
                weekly = resets.weekly,
                monthly = resets.monthly,
                "period counters reset"
            );
            events.push(Event::PeriodsReset {
                daily: resets.daily,
                weekly: resets.weekly,
                monthly: resets.monthly,
                on: now.date(),
            });
        }
        if mode == Mode::CheckIn {
            info!(
                today = state.today_cycles,
                delta,
                week = state.week_cycles,
                month = state.month_cycles,
                "checked in"
            );
            events.push(Event::CheckedIn {
                today_cycles: state.today_cycles,
                delta,
                week_cycles: state.week_cycles,
                month_cycles: state.month_cycles,
                at: now,
            });
        } else {
            debug!(resets = resets.any(), "reconciled");
        }

        Ok(Reconciliation {
            state,
            resets,
            delta,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn reconciler() -> Reconciler<MemoryStore> {
        Reconciler::new(MemoryStore::new(), CycleClock::default())
    }

    #[test]
    fn first_check_in_scenario() {
        let r = reconciler();
        let out = r.check_in(at(20, 0)).unwrap();
        assert_eq!(out.state.today_cycles, 1);
        assert_eq!(out.state.week_cycles, 1);
        assert_eq!(out.state.month_cycles, 1);
        assert_eq!(out.state.last_recorded_today_cycles, 1);
        assert_eq!(out.state.last_reset_date, Some(day()));
        assert_eq!(out.state.last_check_in, Some(at(20, 0)));
        assert_eq!(out.delta, 1);

        let out = r.check_in(at(21, 0)).unwrap();
        assert_eq!(out.state.today_cycles, 3);
        assert_eq!(out.delta, 2);
        assert_eq!(out.state.week_cycles, 3);
        assert_eq!(out.state.month_cycles, 3);
        assert!(!out.resets.any());
    }

    #[test]
    fn same_instant_check_in_adds_nothing() {
        let r = reconciler();
        r.check_in(at(21, 0)).unwrap();
        let out = r.check_in(at(21, 0)).unwrap();
        assert_eq!(out.delta, 0);
        assert_eq!(out.state.today_cycles, 3);
        assert_eq!(out.state.week_cycles, 3);
        assert_eq!(out.state.month_cycles, 3);
    }

    #[test]
    fn new_day_adds_full_count() {
        let yesterday = day().pred_opt().unwrap();
        let store = MemoryStore::with_state(&CounterState {
            last_check_in: yesterday.and_hms_opt(23, 0, 0),
            today_cycles: 7,
            week_cycles: 10,
            month_cycles: 20,
            last_reset_date: Some(yesterday),
            last_recorded_today_cycles: 7,
        });
        let r = Reconciler::new(store, CycleClock::default());
        let out = r.check_in(at(21, 0)).unwrap();
        assert!(out.resets.daily);
        assert_eq!(out.delta, 3);
        assert_eq!(out.state.today_cycles, 3);
        assert_eq!(out.state.week_cycles, 13);
        assert_eq!(out.state.month_cycles, 23);
    }

    #[test]
    fn check_in_before_anchor_records_zero() {
        let r = reconciler();
        let out = r.check_in(at(9, 0)).unwrap();
        assert_eq!(out.state.today_cycles, 0);
        assert_eq!(out.delta, 0);
        assert_eq!(out.state.last_check_in, Some(at(9, 0)));
    }

    #[test]
    fn stale_baseline_is_clamped() {
        let store = MemoryStore::with_state(&CounterState {
            today_cycles: 6,
            week_cycles: 6,
            month_cycles: 6,
            last_reset_date: Some(day()),
            last_recorded_today_cycles: 6,
            ..Default::default()
        });
        let r = Reconciler::new(store, CycleClock::default());
        let out = r.check_in(at(20, 0)).unwrap();
        assert_eq!(out.delta, 0);
        assert_eq!(out.state.today_cycles, 1);
        assert_eq!(out.state.last_recorded_today_cycles, 1);
        assert_eq!(out.state.week_cycles, 6);
    }

    #[test]
    fn passive_pass_resets_without_checking_in() {
        let yesterday = day().pred_opt().unwrap();
        let store = MemoryStore::with_state(&CounterState {
            today_cycles: 4,
            week_cycles: 4,
            month_cycles: 4,
            last_reset_date: Some(yesterday),
            last_recorded_today_cycles: 4,
            ..Default::default()
        });
        let r = Reconciler::new(store, CycleClock::default());
        let out = r.reconcile(at(23, 0)).unwrap();
        assert!(out.resets.daily);
        assert_eq!(out.delta, 0);
        assert_eq!(out.state.today_cycles, 0);
        assert_eq!(out.state.last_recorded_today_cycles, 0);
        assert_eq!(out.state.week_cycles, 4);
        assert_eq!(out.state.last_check_in, None);
        assert_eq!(out.state.last_reset_date, Some(day()));
        assert_eq!(
            out.events,
            vec![Event::PeriodsReset {
                daily: true,
                weekly: false,
                monthly: false,
                on: day()
            }]
        );
    }

    #[test]
    fn passive_pass_on_same_day_is_a_no_op() {
        let r = reconciler();
        let checked = r.check_in(at(21, 0)).unwrap();
        let out = r.reconcile(at(22, 0)).unwrap();
        assert_eq!(out.state, checked.state);
        assert!(out.events.is_empty());
    }

    #[test]
    fn first_of_month_resets_month_total() {
        let last = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let store = MemoryStore::with_state(&CounterState {
            week_cycles: 5,
            month_cycles: 40,
            last_reset_date: Some(last),
            ..Default::default()
        });
        let r = Reconciler::new(store, CycleClock::default());
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(20, 30, 0)
            .unwrap();
        let out = r.check_in(now).unwrap();
        assert!(out.resets.monthly);
        assert_eq!(out.state.month_cycles, 2);
    }

    #[test]
    fn clear_all_resets_and_persists() {
        let r = reconciler();
        r.check_in(at(22, 0)).unwrap();
        let out = r.clear_all(at(22, 5)).unwrap();
        assert_eq!(out.state, CounterState::default());
        assert_eq!(r.store().load().unwrap(), CounterState::default());
        assert_eq!(r.snapshot(), CounterState::default());
    }

    #[test]
    fn failed_save_keeps_computed_state_visible() {
        let r = reconciler();
        r.store().set_fail_writes(true);
        assert!(r.check_in(at(21, 0)).is_err());
        assert_eq!(r.snapshot().today_cycles, 3);
        assert_eq!(r.store().load().unwrap(), CounterState::default());

        r.store().set_fail_writes(false);
        let out = r.check_in(at(21, 0)).unwrap();
        assert_eq!(out.state.week_cycles, 3);
    }

    #[test]
    fn concurrent_check_ins_do_not_double_count() {
        let r = Arc::new(reconciler());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || r.check_in(at(22, 0)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let state = r.store().load().unwrap();
        assert_eq!(state.today_cycles, 5);
        assert_eq!(state.week_cycles, 5);
        assert_eq!(state.month_cycles, 5);
    }

    proptest! {
        #[test]
        fn increasing_check_ins_sum_to_final_count(mut minutes in proptest::collection::vec(0u32..270, 1..12)) {
            minutes.sort_unstable();
            let r = reconciler();
            let mut last = None;
            for m in minutes {
                let now = at(19, 30) + chrono::Duration::minutes(i64::from(m));
                last = Some(r.check_in(now).unwrap().state);
            }
            let state = last.unwrap();
            prop_assert_eq!(state.week_cycles, state.today_cycles);
            prop_assert_eq!(state.month_cycles, state.today_cycles);
            prop_assert_eq!(state.last_recorded_today_cycles, state.today_cycles);
        }
    }
}
