//! Schedule construction strategies.
//!
//! Two interchangeable ways to turn a set of [`Wafer`]s and [`Machine`]s
//! into a [`Schedule`]:
//!
//! * [`build_greedy_schedule`]: discrete-event list scheduling.  Wafers are
//!   dispatched in priority order whenever a compatible machine is idle;
//!   [`GreedyPolicy`] decides which idle machine is taken.
//! * [`build_exact_schedule`]: a mixed-integer model minimising a blend of
//!   priority-weighted completion time and makespan, solved by any
//!   [`MipSolver`].
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | State | Stateless entry points; all per-run state (machine availability, release queue, model) is local |
//! | Machine identity | Names are unique; duplicates are rejected up front |
//! | Iteration order | Wafers in dispatch order, machines in input order; results are deterministic |
//! | Failure | `Result<_, SchedulerError>` with typed variants; no partial schedules |
//! | Validation | Schedules are checked separately by [`crate::feasibility::check`] |
//!
//! # Example
//! ```rust,ignore
//! let greedy = build_greedy_schedule(&wafers, &machines, GreedyPolicy::BestFit)?;
//! let exact = build_exact_schedule(&wafers, &machines, &ExactSettings::default(), &MicroLpSolver::new())?;
//! ```

pub mod error;
mod exact;
mod greedy;

pub use error::SchedulerError;

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::instance::ProblemInstance;
use crate::schedule::Schedule;
use crate::solver::{MipSolver, SolveParams, SolveStatus};
use crate::wafer::{Machine, Wafer};

// ── Greedy ────────────────────────────────────────────────────────────────────

/// Which idle compatible machine a greedy dispatch takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreedyPolicy {
    /// First idle compatible machine in input order.
    FirstFit,
    /// Idle compatible machine with the shortest processing time for the
    /// wafer's recipe; ties go to the earlier machine.
    BestFit,
}

impl fmt::Display for GreedyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GreedyPolicy::FirstFit => "first_fit",
            GreedyPolicy::BestFit => "best_fit",
        })
    }
}

/// Build a schedule with the greedy list-scheduling simulation.
///
/// # Errors
/// * [`SchedulerError::DuplicateWafer`] / [`SchedulerError::DuplicateMachine`]
/// * [`SchedulerError::Infeasible`] if some wafer has no compatible machine;
///   the simulation stops instead of waiting forever.
pub fn build_greedy_schedule(
    wafers: &[Wafer],
    machines: &[Machine],
    policy: GreedyPolicy,
) -> Result<Schedule, SchedulerError> {
    let instance = ProblemInstance::new(wafers, machines)?;
    info!(
        policy = %policy,
        wafer_count = wafers.len(),
        machine_count = machines.len(),
        "=== greedy schedule ==="
    );
    greedy::schedule(&instance, policy)
}

// ── Exact ─────────────────────────────────────────────────────────────────────

/// Objective and solver parameters for the exact strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExactSettings {
    /// Relative optimality gap tolerance handed to the solver.
    pub mip_gap: f64,
    /// Wall-clock budget handed to the solver.
    pub time_limit: Duration,
    /// `α` in `α·Σ weight·end + (1 − α)·makespan`; must lie in `[0, 1]`.
    pub cycle_time_weight: f64,
}

impl Default for ExactSettings {
    fn default() -> Self {
        Self {
            mip_gap: 0.1,
            time_limit: Duration::from_secs(3600),
            cycle_time_weight: 1.0,
        }
    }
}

impl ExactSettings {
    /// Reject parameters the model cannot be built with.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !(0.0..=1.0).contains(&self.cycle_time_weight) {
            return Err(SchedulerError::InvalidCycleTimeWeight(self.cycle_time_weight));
        }
        if !self.mip_gap.is_finite() || self.mip_gap < 0.0 {
            return Err(SchedulerError::InvalidMipGap(self.mip_gap));
        }
        Ok(())
    }

    fn solve_params(&self) -> SolveParams {
        SolveParams {
            mip_gap: self.mip_gap,
            time_limit: self.time_limit,
        }
    }
}

/// Result of the exact strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactSchedule {
    pub schedule: Schedule,
    /// Solver status the schedule was extracted from: `Optimal` or `Feasible`.
    pub status: SolveStatus,
    /// Objective value of the extracted solution, in model units (minutes).
    pub objective_value: f64,
}

impl ExactSchedule {
    /// `false` when the solver stopped with an incumbent it could not prove
    /// optimal.
    pub fn proven_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

/// Build a schedule by solving the exact mixed-integer model.
///
/// # Errors
/// * [`SchedulerError::InvalidCycleTimeWeight`] / [`SchedulerError::InvalidMipGap`]
///   before any model is built.
/// * [`SchedulerError::DuplicateWafer`] / [`SchedulerError::DuplicateMachine`]
/// * [`SchedulerError::UnassignableWafers`] before the solver is invoked.
/// * [`SchedulerError::SolverFailed`] when the solver returns no solution.
/// * [`SchedulerError::MalformedSolution`] when the value vector does not
///   match the model.
pub fn build_exact_schedule(
    wafers: &[Wafer],
    machines: &[Machine],
    settings: &ExactSettings,
    solver: &dyn MipSolver,
) -> Result<ExactSchedule, SchedulerError> {
    settings.validate()?;
    let instance = ProblemInstance::new(wafers, machines)?;

    info!(
        wafer_count = wafers.len(),
        machine_count = machines.len(),
        alpha = settings.cycle_time_weight,
        mip_gap = settings.mip_gap,
        time_limit_s = settings.time_limit.as_secs_f64(),
        "=== exact schedule ==="
    );

    if instance.wafers().is_empty() {
        info!("exact: no wafers, empty schedule");
        return Ok(ExactSchedule {
            schedule: Schedule::default(),
            status: SolveStatus::Optimal,
            objective_value: 0.0,
        });
    }

    let unassignable = instance.unassignable_wafers();
    if !unassignable.is_empty() {
        return Err(SchedulerError::UnassignableWafers {
            wafers: unassignable,
        });
    }

    exact::schedule(
        &instance,
        settings.cycle_time_weight,
        &settings.solve_params(),
        solver,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
