/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule output types.
//!
//! ```text
//! strategy ──(relative offsets)──►  DispatchDecision  ──►  Schedule  ──►  checker / metrics
//!                                    ↑ absolute time          ↑ sorted (machine, start)
//! ```
//!
//! Strategies work in offsets from the start of the horizon; decisions are
//! converted to absolute timestamps exactly once, anchored at
//! [`reference_instant`].  The end of a decision is always computed as
//! `start + duration`, so `end - start` equals the recipe duration exactly
//! regardless of how the start offset was obtained.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::scheduler::SchedulerError;
use crate::wafer::{Machine, Minutes, Priority, Wafer};

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Fixed instant every schedule is anchored at: 2022-11-14 09:00:00.
pub fn reference_instant() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 11, 14)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

// ── DispatchDecision ──────────────────────────────────────────────────────────

/// One wafer processed on one machine during `[start, end)`.
///
/// Created once at assignment time and never mutated.  The wafer's priority
/// is denormalized here so metrics can be computed from the schedule alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchDecision {
    pub wafer: String,
    pub priority: Priority,
    pub machine: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DispatchDecision {
    /// Build a decision starting `start_ms` milliseconds after `anchor` and
    /// lasting `duration` minutes.
    ///
    /// # Errors
    /// [`SchedulerError::TimeOverflow`] if the start or the end cannot be
    /// represented.
    pub fn at_offset(
        anchor: NaiveDateTime,
        wafer: &Wafer,
        machine: &Machine,
        start_ms: i64,
        duration: Minutes,
    ) -> Result<Self, SchedulerError> {
        let overflow = || SchedulerError::TimeOverflow {
            wafer: wafer.name.clone(),
            machine: machine.name.clone(),
        };
        let start = Duration::try_milliseconds(start_ms)
            .and_then(|offset| anchor.checked_add_signed(offset))
            .ok_or_else(overflow)?;
        let end = minutes_to_ms(duration)
            .and_then(Duration::try_milliseconds)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or_else(overflow)?;
        Ok(Self {
            wafer: wafer.name.clone(),
            priority: wafer.priority,
            machine: machine.name.clone(),
            start,
            end,
        })
    }

    /// Same as [`at_offset`](Self::at_offset) with the start given in whole
    /// minutes (the greedy clock's unit).
    pub fn at_minute(
        anchor: NaiveDateTime,
        wafer: &Wafer,
        machine: &Machine,
        start: Minutes,
        duration: Minutes,
    ) -> Result<Self, SchedulerError> {
        let start_ms = minutes_to_ms(start).ok_or_else(|| SchedulerError::TimeOverflow {
            wafer: wafer.name.clone(),
            machine: machine.name.clone(),
        })?;
        Self::at_offset(anchor, wafer, machine, start_ms, duration)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// A complete schedule: decisions sorted by (machine name, start).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    decisions: Vec<DispatchDecision>,
}

impl Schedule {
    /// Assemble a schedule, sorting `decisions` into canonical order.
    pub fn new(mut decisions: Vec<DispatchDecision>) -> Self {
        decisions.sort_by(|a, b| a.machine.cmp(&b.machine).then(a.start.cmp(&b.start)));
        Self { decisions }
    }

    pub fn decisions(&self) -> &[DispatchDecision] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// The decision that processes `wafer`, if any.
    pub fn decision_for_wafer(&self, wafer: &str) -> Option<&DispatchDecision> {
        self.decisions.iter().find(|d| d.wafer == wafer)
    }

    /// Decisions grouped by machine name, each group in start order.
    pub fn by_machine(&self) -> HashMap<&str, Vec<&DispatchDecision>> {
        let mut map: HashMap<&str, Vec<&DispatchDecision>> = HashMap::new();
        for d in &self.decisions {
            map.entry(d.machine.as_str()).or_default().push(d);
        }
        for group in map.values_mut() {
            group.sort_by_key(|d| d.start);
        }
        map
    }

    /// Earliest start across all decisions.
    pub fn first_start(&self) -> Option<NaiveDateTime> {
        self.decisions.iter().map(|d| d.start).min()
    }

    /// Latest end across all decisions.
    pub fn last_end(&self) -> Option<NaiveDateTime> {
        self.decisions.iter().map(|d| d.end).max()
    }

    /// Makespan in hours: latest end minus earliest start.  `0.0` when empty.
    pub fn makespan_hours(&self) -> f64 {
        match (self.first_start(), self.last_end()) {
            (Some(start), Some(end)) => hours(end - start),
            _ => 0.0,
        }
    }

    /// Priority-weighted cycle time in weighted hours:
    /// `Σ weight(w) · (end(w) − earliest start)`.
    pub fn priority_weighted_cycle_time(&self) -> f64 {
        let Some(origin) = self.first_start() else {
            return 0.0;
        };
        self.decisions
            .iter()
            .map(|d| d.priority.weight() * hours(d.end - origin))
            .sum()
    }

    pub fn metrics(&self) -> ScheduleMetrics {
        ScheduleMetrics::from_schedule(self)
    }
}

fn minutes_to_ms(minutes: Minutes) -> Option<i64> {
    i64::try_from(minutes).ok()?.checked_mul(MS_PER_MINUTE)
}

fn hours(span: Duration) -> f64 {
    span.num_milliseconds() as f64 / MS_PER_HOUR
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Headline metrics consumed by the output side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleMetrics {
    /// Latest end minus earliest start, in hours.
    pub makespan_hours: f64,
    /// Priority-weighted cycle time, in weighted hours.
    pub weighted_cycle_time_hours: f64,
}

impl ScheduleMetrics {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            makespan_hours: schedule.makespan_hours(),
            weighted_cycle_time_hours: schedule.priority_weighted_cycle_time(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> NaiveDateTime {
        reference_instant()
    }

    fn decision(wafer: &str, p: Priority, machine: &str, start_min: u64, dur: u64) -> DispatchDecision {
        let w = Wafer::new(wafer, p, "A");
        let m = Machine::new(machine).with_recipe("A", dur);
        DispatchDecision::at_minute(t0(), &w, &m, start_min, dur).unwrap()
    }

    #[test]
    fn reference_instant_is_fixed() {
        assert_eq!(t0().to_string(), "2022-11-14 09:00:00");
    }

    #[test]
    fn decision_end_is_start_plus_duration() {
        let d = decision("w1", Priority::Red, "m1", 15, 30);
        assert_eq!(d.start, t0() + Duration::minutes(15));
        assert_eq!(d.end, t0() + Duration::minutes(45));
        assert_eq!(d.duration(), Duration::minutes(30));
    }

    #[test]
    fn out_of_range_times_are_errors() {
        let w = Wafer::new("w1", Priority::Red, "A");
        let m = Machine::new("m1").with_recipe("A", u64::MAX);

        // duration does not fit the millisecond range
        let err = DispatchDecision::at_minute(t0(), &w, &m, 0, u64::MAX).unwrap_err();
        assert!(matches!(err, SchedulerError::TimeOverflow { ref wafer, .. } if wafer == "w1"));

        // fits in i64 ms but runs past the calendar
        let err = DispatchDecision::at_minute(t0(), &w, &m, 0, 1_000_000_000_000).unwrap_err();
        assert!(matches!(err, SchedulerError::TimeOverflow { .. }));

        // start offset out of range
        assert!(DispatchDecision::at_offset(t0(), &w, &m, i64::MAX, 1).is_err());
        assert!(DispatchDecision::at_offset(t0(), &w, &m, i64::MIN, 1).is_err());
    }

    #[test]
    fn schedule_is_sorted_by_machine_then_start() {
        let s = Schedule::new(vec![
            decision("w3", Priority::Red, "m2", 0, 10),
            decision("w2", Priority::Red, "m1", 20, 10),
            decision("w1", Priority::Red, "m1", 0, 20),
        ]);
        let order: Vec<&str> = s.decisions().iter().map(|d| d.wafer.as_str()).collect();
        assert_eq!(order, vec!["w1", "w2", "w3"]);
    }

    #[test]
    fn single_decision_metrics() {
        // One red wafer, 30 minutes → 0.5 h makespan, 0.5 weighted hours.
        let s = Schedule::new(vec![decision("w1", Priority::Red, "m1", 0, 30)]);
        let m = s.metrics();
        assert!((m.makespan_hours - 0.5).abs() < 1e-12);
        assert!((m.weighted_cycle_time_hours - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weighted_cycle_time_uses_priority_weights() {
        // red ends at 60 min (1.0 × 1h), yellow ends at 120 min (0.1 × 2h)
        let s = Schedule::new(vec![
            decision("r", Priority::Red, "m1", 0, 60),
            decision("y", Priority::Yellow, "m1", 60, 60),
        ]);
        assert!((s.makespan_hours() - 2.0).abs() < 1e-12);
        assert!((s.priority_weighted_cycle_time() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn metrics_measure_from_earliest_start() {
        let s = Schedule::new(vec![
            decision("a", Priority::Orange, "m1", 30, 30),
            decision("b", Priority::Orange, "m2", 60, 30),
        ]);
        // earliest start 30, latest end 90 → 1 h
        assert!((s.makespan_hours() - 1.0).abs() < 1e-12);
        // 0.5 × 0.5h + 0.5 × 1h
        assert!((s.priority_weighted_cycle_time() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn empty_schedule_metrics_are_zero() {
        let s = Schedule::default();
        assert!(s.is_empty());
        assert_eq!(s.makespan_hours(), 0.0);
        assert_eq!(s.priority_weighted_cycle_time(), 0.0);
    }

    #[test]
    fn lookup_helpers() {
        let s = Schedule::new(vec![
            decision("w1", Priority::Red, "m1", 0, 20),
            decision("w2", Priority::Red, "m2", 0, 10),
            decision("w3", Priority::Red, "m1", 20, 10),
        ]);
        assert_eq!(s.decision_for_wafer("w2").unwrap().machine, "m2");
        assert!(s.decision_for_wafer("nope").is_none());
        let groups = s.by_machine();
        assert_eq!(groups["m1"].len(), 2);
        assert_eq!(groups["m1"][1].wafer, "w3");
    }
}
