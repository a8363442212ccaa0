/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`MipSolver`] backend on `good_lp` with the pure-Rust `microlp` engine.
//!
//! microlp runs branch-and-bound to completion, so a finished search is
//! always reported as `Optimal` and the gap tolerance has no effect.  It has
//! no time limit and no cancellation hook of its own: the search runs on a
//! worker thread and the caller waits at most `time_limit` for it.  An
//! expired budget yields `Error` with no values, since the engine exposes no
//! incumbent.
//!
//! # Abandoned searches
//!
//! A worker whose budget expired cannot be interrupted; it keeps running
//! until branch-and-bound finishes and then exits on its own.  Each
//! [`MicroLpSolver`] keeps the handle of that worker and holds at most one:
//! while it is still running, further `solve` calls on the same instance
//! return `Error` immediately instead of starting a second search.
//! [`MicroLpSolver::wait_for_abandoned`] blocks until it has exited.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use tracing::{debug, info, warn};

use super::{
    Comparison, Domain, LinearExpr, LinearProgram, MipSolver, SolveParams, SolveStatus,
    SolverOutcome,
};

#[derive(Debug, Default)]
pub struct MicroLpSolver {
    /// Worker abandoned at its time limit, possibly still searching.
    abandoned: Mutex<Option<JoinHandle<()>>>,
}

impl MicroLpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a search abandoned at its time limit is still running.
    pub fn has_running_search(&self) -> bool {
        self.lock_abandoned()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Block until the abandoned search, if any, has exited.
    pub fn wait_for_abandoned(&self) {
        let handle = self.lock_abandoned().take();
        if let Some(handle) = handle {
            debug!("microlp: waiting for abandoned search");
            let _ = handle.join();
        }
    }

    fn lock_abandoned(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guarded value is a plain handle; a poisoned lock is still usable.
        self.abandoned.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `job` on a worker thread and wait at most `params.time_limit`.
    fn run_with_budget<F>(&self, params: &SolveParams, job: F) -> SolverOutcome
    where
        F: FnOnce() -> SolverOutcome + Send + 'static,
    {
        let mut abandoned = self.lock_abandoned();
        if let Some(previous) = abandoned.take() {
            if !previous.is_finished() {
                *abandoned = Some(previous);
                warn!("microlp: previous search still running past its time limit");
                return SolverOutcome::failed(
                    SolveStatus::Error,
                    "a previous search is still running past its time limit",
                );
            }
            let _ = previous.join();
        }

        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        // The receiver is gone if the budget expired; the send result is
        // irrelevant then.
        let spawned = thread::Builder::new()
            .name("microlp-search".into())
            .spawn(move || {
                let _ = tx.send(job());
            });
        let worker = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return SolverOutcome::failed(
                    SolveStatus::Error,
                    format!("cannot start solver worker: {e}"),
                )
            }
        };

        match rx.recv_timeout(params.time_limit) {
            Ok(outcome) => {
                let _ = worker.join();
                info!(
                    status = %outcome.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "microlp: search finished"
                );
                outcome
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    time_limit_s = params.time_limit.as_secs_f64(),
                    "microlp: time limit reached without a solution; search abandoned"
                );
                *abandoned = Some(worker);
                SolverOutcome::failed(
                    SolveStatus::Error,
                    format!(
                        "time limit of {:.3}s reached before the search finished",
                        params.time_limit.as_secs_f64()
                    ),
                )
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = worker.join();
                SolverOutcome::failed(SolveStatus::Error, "solver worker terminated unexpectedly")
            }
        }
    }
}

impl MipSolver for MicroLpSolver {
    fn solve(&self, program: &LinearProgram, params: &SolveParams) -> SolverOutcome {
        info!(
            variables = program.variable_count(),
            binaries = program.binary_count(),
            constraints = program.constraints().len(),
            mip_gap = params.mip_gap,
            time_limit_s = params.time_limit.as_secs_f64(),
            "microlp: starting search"
        );
        debug!("microlp closes the gap completely; mip_gap is advisory only");

        let owned = program.clone();
        self.run_with_budget(params, move || solve_blocking(&owned))
    }
}

/// Translate `program` into a good_lp model and run it on the current thread.
fn solve_blocking(program: &LinearProgram) -> SolverOutcome {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = program
        .variables()
        .iter()
        .map(|def| {
            let v = match def.domain {
                Domain::Binary => variable().binary(),
                Domain::Continuous { lower, upper } => {
                    let mut v = variable();
                    if lower.is_finite() {
                        v = v.min(lower);
                    }
                    if upper.is_finite() {
                        v = v.max(upper);
                    }
                    v
                }
            };
            vars.add(v)
        })
        .collect();

    let objective = to_expression(program.objective(), &handles);
    let mut model = vars.minimise(objective).using(default_solver);

    for c in program.constraints() {
        let lhs = to_expression(&c.expr, &handles);
        let rhs = c.rhs;
        model = match c.comparison {
            Comparison::LessEq => model.with(constraint!(lhs <= rhs)),
            Comparison::Equal => model.with(constraint!(lhs == rhs)),
            Comparison::GreaterEq => model.with(constraint!(lhs >= rhs)),
        };
    }

    match model.solve() {
        Ok(solution) => {
            let values = handles.iter().map(|&v| solution.value(v)).collect();
            SolverOutcome::solved(SolveStatus::Optimal, values)
        }
        Err(ResolutionError::Infeasible) => {
            SolverOutcome::failed(SolveStatus::Infeasible, "problem is infeasible")
        }
        Err(e) => SolverOutcome::failed(SolveStatus::Error, e.to_string()),
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(var, coef) in &expr.terms {
        out += coef * handles[var.0];
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
