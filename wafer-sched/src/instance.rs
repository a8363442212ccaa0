/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Validated problem instance shared by every strategy.
//!
//! [`ProblemInstance`] is built once from the caller's wafers and machines.
//! It owns:
//!
//! * the wafers in dispatch order (descending weight, ascending name);
//! * the machines in their input list order;
//! * per-wafer compatible machine indices, the sparse compatibility relation
//!   every strategy iterates over.
//!
//! Indices (`usize`) into `wafers()` / `machines()` are used everywhere inside
//! the strategies; names only reappear when decisions are emitted.

use std::collections::HashSet;

use tracing::debug;

use crate::scheduler::SchedulerError;
use crate::wafer::{dispatch_order, Machine, Minutes, Wafer};

#[derive(Debug, Clone)]
pub struct ProblemInstance {
    wafers: Vec<Wafer>,
    machines: Vec<Machine>,
    /// `compatible[w]` = indices of machines able to run wafer `w`, in
    /// machine-list order.
    compatible: Vec<Vec<usize>>,
}

impl ProblemInstance {
    /// Validate and index the inputs.
    ///
    /// # Errors
    /// [`SchedulerError::DuplicateWafer`] / [`SchedulerError::DuplicateMachine`]
    /// when names are not unique.
    pub fn new(wafers: &[Wafer], machines: &[Machine]) -> Result<Self, SchedulerError> {
        let mut seen = HashSet::new();
        for w in wafers {
            if !seen.insert(w.name.as_str()) {
                return Err(SchedulerError::DuplicateWafer {
                    name: w.name.clone(),
                });
            }
        }
        let mut seen = HashSet::new();
        for m in machines {
            if !seen.insert(m.name.as_str()) {
                return Err(SchedulerError::DuplicateMachine {
                    name: m.name.clone(),
                });
            }
        }

        let mut wafers = wafers.to_vec();
        wafers.sort_by(dispatch_order);
        let machines = machines.to_vec();

        let compatible: Vec<Vec<usize>> = wafers
            .iter()
            .map(|w| {
                machines
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.supports(&w.recipe))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        debug!(
            wafers = wafers.len(),
            machines = machines.len(),
            compatible_pairs = compatible.iter().map(Vec::len).sum::<usize>(),
            "problem instance indexed"
        );

        Ok(Self {
            wafers,
            machines,
            compatible,
        })
    }

    /// Wafers in dispatch order.
    pub fn wafers(&self) -> &[Wafer] {
        &self.wafers
    }

    /// Machines in list order.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn wafer(&self, index: usize) -> &Wafer {
        &self.wafers[index]
    }

    pub fn machine(&self, index: usize) -> &Machine {
        &self.machines[index]
    }

    /// Indices of the machines compatible with wafer `wafer`.
    pub fn compatible_machines(&self, wafer: usize) -> &[usize] {
        &self.compatible[wafer]
    }

    /// Processing time of wafer `wafer` on machine `machine`.
    ///
    /// `None` when the pair is not compatible.
    pub fn duration(&self, wafer: usize, machine: usize) -> Option<Minutes> {
        self.machines[machine].duration(&self.wafers[wafer].recipe)
    }

    /// Names of wafers with no compatible machine at all.
    pub fn unassignable_wafers(&self) -> Vec<String> {
        self.compatible
            .iter()
            .enumerate()
            .filter(|(_, ms)| ms.is_empty())
            .map(|(w, _)| self.wafers[w].name.clone())
            .collect()
    }

    /// Iterate every compatible `(wafer, machine, duration)` triple, wafers in
    /// dispatch order, machines in list order.
    pub fn compatible_pairs(&self) -> impl Iterator<Item = (usize, usize, Minutes)> + '_ {
        self.compatible.iter().enumerate().flat_map(move |(w, ms)| {
            ms.iter().filter_map(move |&m| self.duration(w, m).map(|d| (w, m, d)))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wafer::Priority;

    fn machines() -> Vec<Machine> {
        vec![
            Machine::new("m1").with_recipe("A", 30),
            Machine::new("m2").with_recipe("A", 20).with_recipe("B", 40),
        ]
    }

    #[test]
    fn wafers_are_sorted_into_dispatch_order() {
        let wafers = vec![
            Wafer::new("w3", Priority::Yellow, "A"),
            Wafer::new("w2", Priority::Red, "B"),
            Wafer::new("w1", Priority::Orange, "A"),
        ];
        let inst = ProblemInstance::new(&wafers, &machines()).unwrap();
        let names: Vec<&str> = inst.wafers().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["w2", "w1", "w3"]);
    }

    #[test]
    fn compatibility_is_indexed_in_machine_order() {
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("b", Priority::Red, "B"),
            Wafer::new("c", Priority::Red, "Z"),
        ];
        let inst = ProblemInstance::new(&wafers, &machines()).unwrap();
        assert_eq!(inst.compatible_machines(0), &[0, 1]);
        assert_eq!(inst.compatible_machines(1), &[1]);
        assert!(inst.compatible_machines(2).is_empty());
        assert_eq!(inst.unassignable_wafers(), vec!["c".to_string()]);
    }

    #[test]
    fn compatible_pairs_are_sparse() {
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("b", Priority::Red, "B"),
        ];
        let inst = ProblemInstance::new(&wafers, &machines()).unwrap();
        let pairs: Vec<_> = inst.compatible_pairs().collect();
        assert_eq!(pairs, vec![(0, 0, 30), (0, 1, 20), (1, 1, 40)]);
        assert_eq!(inst.duration(1, 0), None);
    }

    #[test]
    fn duplicate_wafer_is_rejected() {
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("a", Priority::Yellow, "A"),
        ];
        let err = ProblemInstance::new(&wafers, &machines()).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateWafer { ref name } if name == "a"));
    }

    #[test]
    fn duplicate_machine_is_rejected() {
        let ms = vec![Machine::new("m"), Machine::new("m")];
        let err = ProblemInstance::new(&[], &ms).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateMachine { .. }));
    }
}
