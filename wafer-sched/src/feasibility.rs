/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Post-schedule feasibility checks.
//!
//! A finished [`Schedule`] is checked against the wafers and machines it was
//! built from by a fixed set of [`ScheduleRule`]s:
//!
//! | Rule | Passes when |
//! |---|---|
//! | `completeness` | every input wafer appears in exactly one decision |
//! | `compatibility` | every decision's machine has the decision's wafer recipe |
//! | `non_overlap` | per machine, decisions sorted by start do not overlap, and `end ≥ start` |
//!
//! The rules are independent; [`check`] always evaluates all of them and
//! logs one PASS / FAIL line per rule.  A failure is **not** an error: the
//! caller gets a [`CheckReport`] and decides what to do with it.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::schedule::Schedule;
use crate::wafer::{compatible_machines, Machine, Wafer};

// ── Rule seam ─────────────────────────────────────────────────────────────────

/// One independent check over a finished schedule.
pub trait ScheduleRule {
    /// Stable rule name used in reports.
    fn name(&self) -> &'static str;

    /// `true` if `schedule` satisfies the rule.
    fn validate(&self, schedule: &Schedule, wafers: &[Wafer], machines: &[Machine]) -> bool;
}

/// Every input wafer is processed exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Completeness;

impl ScheduleRule for Completeness {
    fn name(&self) -> &'static str {
        "completeness"
    }

    fn validate(&self, schedule: &Schedule, wafers: &[Wafer], _machines: &[Machine]) -> bool {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for d in schedule.decisions() {
            *seen.entry(d.wafer.as_str()).or_default() += 1;
        }
        let mut ok = true;
        for w in wafers {
            match seen.get(w.name.as_str()).copied().unwrap_or(0) {
                1 => {}
                0 => {
                    debug!(wafer = %w.name, "completeness: wafer never dispatched");
                    ok = false;
                }
                n => {
                    debug!(wafer = %w.name, count = n, "completeness: wafer dispatched more than once");
                    ok = false;
                }
            }
        }
        // Decisions for wafers that were never part of the input.
        for name in seen.keys() {
            if !wafers.iter().any(|w| w.name == *name) {
                debug!(wafer = %name, "completeness: decision for unknown wafer");
                ok = false;
            }
        }
        ok
    }
}

/// Every decision's machine supports the wafer's recipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compatibility;

impl ScheduleRule for Compatibility {
    fn name(&self) -> &'static str {
        "compatibility"
    }

    fn validate(&self, schedule: &Schedule, wafers: &[Wafer], machines: &[Machine]) -> bool {
        let allowed: HashMap<&str, Vec<&str>> = wafers
            .iter()
            .map(|w| (w.name.as_str(), compatible_machines(w, machines)))
            .collect();

        let mut ok = true;
        for d in schedule.decisions() {
            let Some(names) = allowed.get(d.wafer.as_str()) else {
                debug!(wafer = %d.wafer, "compatibility: unknown wafer");
                ok = false;
                continue;
            };
            // unknown machines are never in the list
            if !names.contains(&d.machine.as_str()) {
                debug!(
                    wafer = %d.wafer,
                    machine = %d.machine,
                    "compatibility: machine cannot run the wafer's recipe"
                );
                ok = false;
            }
        }
        ok
    }
}

/// No machine processes two wafers at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonOverlap;

impl ScheduleRule for NonOverlap {
    fn name(&self) -> &'static str {
        "non_overlap"
    }

    fn validate(&self, schedule: &Schedule, _wafers: &[Wafer], _machines: &[Machine]) -> bool {
        let mut ok = true;
        for d in schedule.decisions() {
            if d.end < d.start {
                debug!(wafer = %d.wafer, "non_overlap: decision ends before it starts");
                ok = false;
            }
        }
        for (machine, group) in schedule.by_machine() {
            for pair in group.windows(2) {
                if pair[0].end > pair[1].start {
                    debug!(
                        machine = %machine,
                        first = %pair[0].wafer,
                        second = %pair[1].wafer,
                        "non_overlap: intervals overlap"
                    );
                    ok = false;
                }
            }
        }
        ok
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub passed: bool,
}

/// Pass/fail per rule, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl CheckReport {
    /// Result of `rule`, or `None` if it was not evaluated.
    pub fn passed(&self, rule: &str) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|o| o.rule == rule)
            .map(|o| o.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// Rule name → pass flag.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.outcomes
            .iter()
            .map(|o| (o.rule.to_string(), o.passed))
            .collect()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// The standard rule set, in reporting order.
pub fn standard_rules() -> Vec<Box<dyn ScheduleRule>> {
    vec![
        Box::new(Completeness),
        Box::new(Compatibility),
        Box::new(NonOverlap),
    ]
}

/// Run `rules` over `schedule`; never short-circuits.
pub fn check_with(
    rules: &[Box<dyn ScheduleRule>],
    schedule: &Schedule,
    wafers: &[Wafer],
    machines: &[Machine],
) -> CheckReport {
    let outcomes = rules
        .iter()
        .map(|rule| {
            let passed = rule.validate(schedule, wafers, machines);
            if passed {
                info!(rule = rule.name(), "PASS");
            } else {
                warn!(rule = rule.name(), "FAIL");
            }
            RuleOutcome {
                rule: rule.name(),
                passed,
            }
        })
        .collect();
    CheckReport { outcomes }
}

/// Run the standard rule set over `schedule`.
pub fn check(schedule: &Schedule, wafers: &[Wafer], machines: &[Machine]) -> CheckReport {
    check_with(&standard_rules(), schedule, wafers, machines)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{reference_instant, DispatchDecision};
    use crate::wafer::Priority;

    fn fixture() -> (Vec<Wafer>, Vec<Machine>) {
        let wafers = vec![
            Wafer::new("w1", Priority::Red, "A"),
            Wafer::new("w2", Priority::Yellow, "A"),
            Wafer::new("w3", Priority::Orange, "B"),
        ];
        let machines = vec![
            Machine::new("m1").with_recipe("A", 20),
            Machine::new("m2").with_recipe("B", 10),
        ];
        (wafers, machines)
    }

    /// Decision for `wafer` on `machine` at `start` minutes, using the
    /// machine's duration for the wafer's recipe when it has one.
    fn at(wafers: &[Wafer], machines: &[Machine], wafer: &str, machine: &str, start: u64) -> DispatchDecision {
        let w = wafers.iter().find(|w| w.name == wafer).unwrap();
        let m = machines.iter().find(|m| m.name == machine).unwrap();
        let dur = m.duration(&w.recipe).unwrap_or(5);
        DispatchDecision::at_minute(reference_instant(), w, m, start, dur).unwrap()
    }

    fn valid(wafers: &[Wafer], machines: &[Machine]) -> Schedule {
        Schedule::new(vec![
            at(wafers, machines, "w1", "m1", 0),
            at(wafers, machines, "w2", "m1", 20),
            at(wafers, machines, "w3", "m2", 0),
        ])
    }

    #[test]
    fn valid_schedule_passes_everything() {
        let (w, m) = fixture();
        let report = check(&valid(&w, &m), &w, &m);
        assert!(report.all_passed());
        assert_eq!(report.outcomes.len(), 3);
        let map = report.to_map();
        assert_eq!(map.get("completeness"), Some(&true));
        assert_eq!(map.get("compatibility"), Some(&true));
        assert_eq!(map.get("non_overlap"), Some(&true));
    }

    #[test]
    fn missing_wafer_fails_completeness_only() {
        let (w, m) = fixture();
        let s = Schedule::new(vec![at(&w, &m, "w1", "m1", 0), at(&w, &m, "w3", "m2", 0)]);
        let report = check(&s, &w, &m);
        assert_eq!(report.passed("completeness"), Some(false));
        assert_eq!(report.passed("compatibility"), Some(true));
        assert_eq!(report.passed("non_overlap"), Some(true));
    }

    #[test]
    fn duplicated_wafer_fails_completeness() {
        let (w, m) = fixture();
        let mut decisions = valid(&w, &m).decisions().to_vec();
        decisions.push(at(&w, &m, "w1", "m1", 40));
        let report = check(&Schedule::new(decisions), &w, &m);
        assert_eq!(report.passed("completeness"), Some(false));
    }

    #[test]
    fn wrong_machine_fails_compatibility() {
        let (w, m) = fixture();
        // w3 needs B, m1 only has A
        let s = Schedule::new(vec![
            at(&w, &m, "w1", "m1", 0),
            at(&w, &m, "w2", "m1", 20),
            at(&w, &m, "w3", "m1", 40),
        ]);
        let report = check(&s, &w, &m);
        assert_eq!(report.passed("compatibility"), Some(false));
        assert_eq!(report.passed("completeness"), Some(true));
    }

    #[test]
    fn unknown_machine_fails_compatibility() {
        let (w, m) = fixture();
        let ghost = Machine::new("ghost").with_recipe("B", 10);
        let s = Schedule::new(vec![
            at(&w, &m, "w1", "m1", 0),
            at(&w, &m, "w2", "m1", 20),
            DispatchDecision::at_minute(reference_instant(), &w[2], &ghost, 0, 10).unwrap(),
        ]);
        assert_eq!(check(&s, &w, &m).passed("compatibility"), Some(false));
    }

    #[test]
    fn overlapping_intervals_fail_non_overlap() {
        let (w, m) = fixture();
        let s = Schedule::new(vec![
            at(&w, &m, "w1", "m1", 0),
            at(&w, &m, "w2", "m1", 10), // w1 runs until 20
            at(&w, &m, "w3", "m2", 0),
        ]);
        let report = check(&s, &w, &m);
        assert_eq!(report.passed("non_overlap"), Some(false));
        assert!(!report.all_passed());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let (w, m) = fixture();
        // w2 starts exactly when w1 ends
        assert!(NonOverlap.validate(&valid(&w, &m), &w, &m));
    }

    #[test]
    fn inverted_interval_fails_non_overlap() {
        let (w, m) = fixture();
        let mut d = at(&w, &m, "w3", "m2", 10);
        std::mem::swap(&mut d.start, &mut d.end);
        let s = Schedule::new(vec![at(&w, &m, "w1", "m1", 0), at(&w, &m, "w2", "m1", 20), d]);
        assert_eq!(check(&s, &w, &m).passed("non_overlap"), Some(false));
    }

    #[test]
    fn empty_schedule() {
        let (w, m) = fixture();
        let report = check(&Schedule::default(), &w, &m);
        assert_eq!(report.passed("completeness"), Some(false));
        assert_eq!(report.passed("compatibility"), Some(true));
        assert_eq!(report.passed("non_overlap"), Some(true));

        // nothing to schedule, nothing scheduled
        assert!(check(&Schedule::default(), &[], &m).all_passed());
    }

    #[test]
    fn unknown_rule_is_not_reported() {
        let (w, m) = fixture();
        assert_eq!(check(&valid(&w, &m), &w, &m).passed("nope"), None);
    }
}
