/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exact MILP formulation of wafer dispatching.
//!
//! # Model
//!
//! Every index set is built over the sparse compatible-pair relation of the
//! [`ProblemInstance`]; nothing is materialised for incompatible pairs.
//!
//! | Variable | Domain | Index |
//! |---|---|---|
//! | `assign[w,m]` | binary | compatible `(w, m)` |
//! | `end[w]` | real | every wafer |
//! | `order[w1,w2,m]` | binary | `w1 < w2` by name, both compatible with `m` |
//! | `makespan` | real | |
//!
//! Constraints, with `d(w,m)` the processing time and `M = Σ d(w,m)` over all
//! compatible pairs:
//!
//! ```text
//! end[w]               ≥ d(w,m)·assign[w,m]                          ∀ (w,m)
//! Σ_m assign[w,m]      = 1                                           ∀ w
//! order[w1,w2,m]       ≤ (assign[w1,m] + assign[w2,m]) / 2           ∀ (w1,w2,m)
//! end[w1] + d(w2,m) − end[w2] ≤ M(1 − order) + M(2 − assign[w1,m] − assign[w2,m])
//! end[w2] + d(w1,m) − end[w1] ≤ M·order      + M(2 − assign[w1,m] − assign[w2,m])
//! makespan             ≥ end[w]                                      ∀ w
//! ```
//!
//! Objective: `min α·Σ weight(w)·end[w] + (1 − α)·makespan`.
//!
//! The two disjunctive rows are written in `expr ≤ rhs` form with every
//! variable moved to the left-hand side.

use tracing::{debug, info, warn};

use super::{ExactSchedule, SchedulerError};
use crate::instance::ProblemInstance;
use crate::schedule::{reference_instant, DispatchDecision, Schedule};
use crate::solver::{Comparison, Domain, LinearExpr, LinearProgram, VarId};
use crate::solver::{MipSolver, SolveParams, SolveStatus};
use crate::wafer::Minutes;

/// Binary values above this threshold count as 1.
const BINARY_THRESHOLD: f64 = 0.5;

const MS_PER_MINUTE: f64 = 60_000.0;

/// `assign[w,m]` for one compatible pair.
#[derive(Debug, Clone, Copy)]
struct AssignVar {
    wafer: usize,
    machine: usize,
    duration: Minutes,
    var: VarId,
}

/// The built program plus the handles extraction needs.
pub(super) struct Formulation {
    program: LinearProgram,
    assign: Vec<AssignVar>,
    /// `end[w]`, indexed by wafer.
    end: Vec<VarId>,
    makespan: VarId,
    big_m: f64,
    order_count: usize,
}

impl Formulation {
    /// Build the model for `instance` with cycle-time weight `alpha`.
    ///
    /// The caller has already validated `alpha` and rejected unassignable
    /// wafers.
    pub(super) fn build(instance: &ProblemInstance, alpha: f64) -> Self {
        let mut program = LinearProgram::new();
        let wafers = instance.wafers();
        let machines = instance.machines();

        // ── Sparse pair index ─────────────────────────────────────────────────
        let pairs: Vec<(usize, usize, Minutes)> = instance.compatible_pairs().collect();
        let big_m: f64 = pairs.iter().map(|&(_, _, d)| d as f64).sum();

        // ── Variables ─────────────────────────────────────────────────────────
        let end: Vec<VarId> = wafers
            .iter()
            .map(|w| program.add_variable(format!("end[{}]", w.name), Domain::FREE))
            .collect();

        let assign: Vec<AssignVar> = pairs
            .iter()
            .map(|&(w, m, duration)| AssignVar {
                wafer: w,
                machine: m,
                duration,
                var: program.add_variable(
                    format!("assign[{},{}]", wafers[w].name, machines[m].name),
                    Domain::Binary,
                ),
            })
            .collect();

        // Per machine: its assign entries, ordered by wafer name so that
        // `w1 < w2` below means name order.
        let mut by_machine: Vec<Vec<AssignVar>> = vec![Vec::new(); machines.len()];
        for a in &assign {
            by_machine[a.machine].push(*a);
        }
        for list in &mut by_machine {
            list.sort_by(|a, b| wafers[a.wafer].name.cmp(&wafers[b.wafer].name));
        }

        let makespan = program.add_variable("makespan", Domain::FREE);

        // ── Minimum processing time ───────────────────────────────────────────
        for a in &assign {
            program.add_constraint(
                format!(
                    "min_processing[{},{}]",
                    wafers[a.wafer].name, machines[a.machine].name
                ),
                LinearExpr::new()
                    .term(end[a.wafer], 1.0)
                    .term(a.var, -(a.duration as f64)),
                Comparison::GreaterEq,
                0.0,
            );
        }

        // ── Exactly one machine per wafer ─────────────────────────────────────
        for (w, wafer) in wafers.iter().enumerate() {
            let mut expr = LinearExpr::new();
            for a in assign.iter().filter(|a| a.wafer == w) {
                expr.add_term(a.var, 1.0);
            }
            program.add_constraint(
                format!("one_machine[{}]", wafer.name),
                expr,
                Comparison::Equal,
                1.0,
            );
        }

        // ── Pairwise sequencing on shared machines ────────────────────────────
        let mut order_count = 0usize;
        for (m, list) in by_machine.iter().enumerate() {
            let machine_name = &machines[m].name;
            for (i, first) in list.iter().enumerate() {
                for second in &list[i + 1..] {
                    let n1 = &wafers[first.wafer].name;
                    let n2 = &wafers[second.wafer].name;
                    let order = program.add_variable(
                        format!("order[{n1},{n2},{machine_name}]"),
                        Domain::Binary,
                    );
                    order_count += 1;

                    // order ≤ (a1 + a2) / 2
                    program.add_constraint(
                        format!("feasible_sequence[{n1},{n2},{machine_name}]"),
                        LinearExpr::new()
                            .term(order, 1.0)
                            .term(first.var, -0.5)
                            .term(second.var, -0.5),
                        Comparison::LessEq,
                        0.0,
                    );

                    // end1 + d2 − end2 ≤ M(1 − o) + M(2 − a1 − a2)
                    //   ⇔ end1 − end2 + M·o + M·a1 + M·a2 ≤ 3M − d2
                    program.add_constraint(
                        format!("sequence_before[{n1},{n2},{machine_name}]"),
                        LinearExpr::new()
                            .term(end[first.wafer], 1.0)
                            .term(end[second.wafer], -1.0)
                            .term(order, big_m)
                            .term(first.var, big_m)
                            .term(second.var, big_m),
                        Comparison::LessEq,
                        3.0 * big_m - second.duration as f64,
                    );

                    // end2 + d1 − end1 ≤ M·o + M(2 − a1 − a2)
                    //   ⇔ end2 − end1 − M·o + M·a1 + M·a2 ≤ 2M − d1
                    program.add_constraint(
                        format!("sequence_after[{n1},{n2},{machine_name}]"),
                        LinearExpr::new()
                            .term(end[second.wafer], 1.0)
                            .term(end[first.wafer], -1.0)
                            .term(order, -big_m)
                            .term(first.var, big_m)
                            .term(second.var, big_m),
                        Comparison::LessEq,
                        2.0 * big_m - first.duration as f64,
                    );
                }
            }
        }

        // ── Makespan ──────────────────────────────────────────────────────────
        for (w, wafer) in wafers.iter().enumerate() {
            program.add_constraint(
                format!("makespan[{}]", wafer.name),
                LinearExpr::new().term(makespan, 1.0).term(end[w], -1.0),
                Comparison::GreaterEq,
                0.0,
            );
        }

        // ── Objective ─────────────────────────────────────────────────────────
        let mut objective = LinearExpr::new();
        for (w, wafer) in wafers.iter().enumerate() {
            objective.add_term(end[w], alpha * wafer.weight());
        }
        objective.add_term(makespan, 1.0 - alpha);
        program.set_objective(objective);

        debug!(
            variables = program.variable_count(),
            binaries = program.binary_count(),
            constraints = program.constraints().len(),
            assign_vars = assign.len(),
            order_vars = order_count,
            big_m = big_m,
            "exact: model built"
        );

        Self {
            program,
            assign,
            end,
            makespan,
            big_m,
            order_count,
        }
    }

    pub(super) fn program(&self) -> &LinearProgram {
        &self.program
    }

    /// Turn a full value vector into decisions.
    ///
    /// For each wafer the first machine (list order) whose `assign` value is
    /// above one half is taken; `start = end[w] − d(w,m)`, rounded to the
    /// millisecond.  Offsets beyond the `i64` range saturate and are then
    /// rejected as [`SchedulerError::TimeOverflow`].
    fn extract(
        &self,
        instance: &ProblemInstance,
        values: &[f64],
    ) -> Result<Schedule, SchedulerError> {
        let anchor = reference_instant();
        let mut decisions = Vec::with_capacity(self.end.len());

        for (w, &end_var) in self.end.iter().enumerate() {
            let chosen = self
                .assign
                .iter()
                .find(|a| a.wafer == w && values[a.var.0] > BINARY_THRESHOLD);
            let Some(a) = chosen else {
                warn!(
                    wafer = %instance.wafer(w).name,
                    "exact: solution assigns wafer to no machine"
                );
                continue;
            };
            let start_minutes = values[end_var.0] - a.duration as f64;
            let start_ms = (start_minutes * MS_PER_MINUTE).round() as i64;
            decisions.push(DispatchDecision::at_offset(
                anchor,
                instance.wafer(w),
                instance.machine(a.machine),
                start_ms,
                a.duration,
            )?);
        }

        debug!(
            makespan_var = values[self.makespan.0],
            "exact: solution extracted"
        );
        Ok(Schedule::new(decisions))
    }
}

/// Build, solve and extract.  Parameters are already validated.
pub(super) fn schedule(
    instance: &ProblemInstance,
    alpha: f64,
    params: &SolveParams,
    solver: &dyn MipSolver,
) -> Result<ExactSchedule, SchedulerError> {
    let formulation = Formulation::build(instance, alpha);
    info!(
        wafers = instance.wafers().len(),
        compatible_pairs = formulation.assign.len(),
        order_vars = formulation.order_count,
        big_m = formulation.big_m,
        alpha = alpha,
        "exact: handing model to solver"
    );

    let outcome = solver.solve(formulation.program(), params);
    if !outcome.status.has_solution() {
        warn!(status = %outcome.status, detail = %outcome.detail, "✗ exact: no usable solution");
        return Err(SchedulerError::SolverFailed {
            status: outcome.status,
            detail: outcome.detail,
        });
    }

    let values = validated_values(formulation.program(), outcome.values)?;

    if outcome.status == SolveStatus::Feasible {
        warn!("exact: solution is feasible but not proven optimal");
    }

    let objective_value = formulation.program().objective().evaluate(&values);
    let schedule = formulation.extract(instance, &values)?;

    info!(
        status = %outcome.status,
        objective = objective_value,
        decisions = schedule.len(),
        makespan_h = schedule.makespan_hours(),
        "exact: schedule complete"
    );

    Ok(ExactSchedule {
        schedule,
        status: outcome.status,
        objective_value,
    })
}

/// One finite value per variable, or [`SchedulerError::MalformedSolution`].
fn validated_values(
    program: &LinearProgram,
    values: Option<Vec<f64>>,
) -> Result<Vec<f64>, SchedulerError> {
    let expected = program.variable_count();
    let values = values.unwrap_or_default();
    if values.len() != expected {
        return Err(SchedulerError::MalformedSolution {
            detail: format!(
                "{} values for a model with {expected} variables",
                values.len()
            ),
        });
    }
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SchedulerError::MalformedSolution {
            detail: format!("variable {} has non-finite value {v}", program.variables()[i].name),
        });
    }
    Ok(values)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wafer::{Machine, Priority, Wafer};

    fn instance(wafers: &[Wafer], machines: &[Machine]) -> ProblemInstance {
        ProblemInstance::new(wafers, machines).unwrap()
    }

    #[test]
    fn variables_exist_only_for_compatible_pairs() {
        // a: A on m1, m2   b: B on m2   c: A on m1, m2
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("b", Priority::Red, "B"),
            Wafer::new("c", Priority::Red, "A"),
        ];
        let machines = vec![
            Machine::new("m1").with_recipe("A", 10),
            Machine::new("m2").with_recipe("A", 20).with_recipe("B", 5),
        ];
        let f = Formulation::build(&instance(&wafers, &machines), 1.0);

        // assign: a-m1, a-m2, b-m2, c-m1, c-m2 = 5
        assert_eq!(f.assign.len(), 5);
        // order: m1 {a,c} → 1 ; m2 {a,b,c} → 3
        assert_eq!(f.order_count, 4);
        // 3 end + 5 assign + 4 order + makespan
        assert_eq!(f.program().variable_count(), 13);
        assert_eq!(f.program().binary_count(), 9);
        // 5 min_processing + 3 one_machine + 4×3 sequencing + 3 makespan
        assert_eq!(f.program().constraints().len(), 23);
    }

    #[test]
    fn big_m_is_sum_of_compatible_durations() {
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("b", Priority::Red, "B"),
        ];
        let machines = vec![
            Machine::new("m1").with_recipe("A", 10),
            Machine::new("m2").with_recipe("A", 20).with_recipe("B", 5),
        ];
        let f = Formulation::build(&instance(&wafers, &machines), 0.5);
        assert_eq!(f.big_m, 35.0);
    }

    #[test]
    fn order_variables_follow_name_order() {
        // dispatch order puts "z" (red) before "a" (yellow); order vars must
        // still be indexed by name.
        let wafers = vec![
            Wafer::new("z", Priority::Red, "A"),
            Wafer::new("a", Priority::Yellow, "A"),
        ];
        let machines = vec![Machine::new("m1").with_recipe("A", 10)];
        let f = Formulation::build(&instance(&wafers, &machines), 1.0);
        assert!(f
            .program()
            .variables()
            .iter()
            .any(|v| v.name == "order[a,z,m1]"));
    }

    #[test]
    fn objective_weights_cycle_time_and_makespan() {
        let wafers = vec![
            Wafer::new("r", Priority::Red, "A"),
            Wafer::new("y", Priority::Yellow, "A"),
        ];
        let machines = vec![Machine::new("m1").with_recipe("A", 10)];
        let f = Formulation::build(&instance(&wafers, &machines), 0.25);
        let obj = f.program().objective();

        let coef = |var: VarId| -> f64 {
            obj.terms
                .iter()
                .filter(|(v, _)| *v == var)
                .map(|(_, c)| c)
                .sum()
        };
        assert!((coef(f.end[0]) - 0.25).abs() < 1e-12); // red weight 1.0
        assert!((coef(f.end[1]) - 0.025).abs() < 1e-12); // yellow weight 0.1
        assert!((coef(f.makespan) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn disjunctive_rows_hold_for_a_valid_sequence() {
        // a then b on m1: end[a]=10, end[b]=20, a before b (order=1).
        let wafers = vec![
            Wafer::new("a", Priority::Red, "A"),
            Wafer::new("b", Priority::Red, "A"),
        ];
        let machines = vec![Machine::new("m1").with_recipe("A", 10)];
        let f = Formulation::build(&instance(&wafers, &machines), 1.0);

        let mut values: Vec<f64> = f
            .program()
            .variables()
            .iter()
            .map(|v| match v.name.as_str() {
                "end[a]" => 10.0,
                "end[b]" => 20.0,
                "assign[a,m1]" | "assign[b,m1]" | "order[a,b,m1]" => 1.0,
                "makespan" => 20.0,
                _ => 0.0,
            })
            .collect();
        for c in f.program().constraints() {
            assert!(c.is_satisfied(&values, 1e-9), "violated: {}", c.name);
        }

        // b overlapping a must violate one of the sequencing rows
        let end_b = f
            .program()
            .variables()
            .iter()
            .position(|v| v.name == "end[b]")
            .unwrap();
        values[end_b] = 15.0;
        assert!(f
            .program()
            .constraints()
            .iter()
            .any(|c| !c.is_satisfied(&values, 1e-9)));
    }
}
