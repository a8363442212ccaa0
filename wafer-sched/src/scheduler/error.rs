/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for schedule construction.
//!
//! [`SchedulerError`] is the single failure type returned by both
//! strategies.  The variants fall into four layers:
//!
//! * input validation: duplicate names, bad objective / solver parameters;
//! * infeasibility: a wafer no machine can ever process;
//! * solver failure: the collaborator returned no usable solution;
//! * time overflow: a start or end past the representable calendar range.
//!
//! Every variant carries the names or values involved so the caller can log
//! or report them without further parsing.  Validator failures are **not**
//! errors; see [`crate::feasibility`].

use thiserror::Error;

use crate::solver::SolveStatus;

/// Top-level error type returned by
/// [`build_greedy_schedule`](super::build_greedy_schedule) and
/// [`build_exact_schedule`](super::build_exact_schedule).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Two input wafers share a name.
    #[error("duplicate wafer name '{name}'")]
    DuplicateWafer { name: String },

    /// Two input machines share a name.
    #[error("duplicate machine name '{name}'")]
    DuplicateMachine { name: String },

    /// The greedy simulation stopped making progress: every machine is idle
    /// and the listed wafers are still waiting.  Only a wafer without any
    /// compatible machine can end up here.
    #[error("scheduling is infeasible: no machine can process wafer(s) {}", stranded.join(", "))]
    Infeasible { stranded: Vec<String> },

    /// The listed wafers have no compatible machine, detected while building
    /// the exact model (before the solver is invoked).
    #[error("wafer(s) {} cannot be assigned to any machine", wafers.join(", "))]
    UnassignableWafers { wafers: Vec<String> },

    /// The cycle-time weight `alpha` of the objective is outside `[0, 1]`.
    #[error("cycle time weight must be in [0, 1], got {0}")]
    InvalidCycleTimeWeight(f64),

    /// The optimality gap tolerance is negative or not finite.
    #[error("mip gap must be a finite, non-negative number, got {0}")]
    InvalidMipGap(f64),

    /// The solver terminated without a usable solution.
    #[error("solver terminated with status {status}: {detail}")]
    SolverFailed { status: SolveStatus, detail: String },

    /// The solver reported success but its value vector is unusable: wrong
    /// length, or a value that is NaN or infinite.
    #[error("malformed solver solution: {detail}")]
    MalformedSolution { detail: String },

    /// A decision's start or end falls outside the representable time range.
    #[error("time of wafer '{wafer}' on machine '{machine}' is out of range")]
    TimeOverflow { wafer: String, machine: String },
}
