/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Solver-neutral linear / integer program model and the solver seam.
//!
//! The exact strategy never talks to an optimisation library directly.  It
//! builds a [`LinearProgram`] (variables with domains, sparse linear
//! constraints and a linear objective to minimise) and hands it to a
//! [`MipSolver`] together with [`SolveParams`] (gap tolerance, time budget).
//! The solver answers with a [`SolverOutcome`]: a [`SolveStatus`] and, for
//! `Optimal` / `Feasible`, one value per variable in declaration order.
//!
//! [`MicroLpSolver`] is the bundled backend.  Tests substitute scripted
//! solvers through the same trait.

mod microlp;

pub use microlp::MicroLpSolver;

use std::fmt;
use std::time::Duration;

// ── Variables & expressions ───────────────────────────────────────────────────

/// Handle of a variable inside one [`LinearProgram`] (its declaration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Integer in `{0, 1}`.
    Binary,
    /// Real in `[lower, upper]`; infinite bounds mean unbounded.
    Continuous { lower: f64, upper: f64 },
}

impl Domain {
    /// Unbounded real.
    pub const FREE: Domain = Domain::Continuous {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub domain: Domain,
}

/// Sparse affine expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `+ coef·var`.
    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    /// Evaluate against a full value vector.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.0])
            .sum::<f64>()
            + self.constant
    }
}

// ── Constraints & program ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessEq,
    Equal,
    GreaterEq,
}

/// `expr ◇ rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Diagnostic name, e.g. `one_machine[W1]`.
    pub name: String,
    pub expr: LinearExpr,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    /// `true` if `values` satisfy the constraint within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.comparison {
            Comparison::LessEq => lhs <= self.rhs + tolerance,
            Comparison::Equal => (lhs - self.rhs).abs() <= tolerance,
            Comparison::GreaterEq => lhs >= self.rhs - tolerance,
        }
    }
}

/// A minimisation program.  Only minimisation is needed here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, domain: Domain) -> VarId {
        self.variables.push(VariableDef {
            name: name.into(),
            domain,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        comparison: Comparison,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            comparison,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.domain == Domain::Binary)
            .count()
    }
}

// ── Solver seam ───────────────────────────────────────────────────────────────

/// Search limits handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveParams {
    /// Relative optimality gap at which the search may stop (`0.1` = 10 %).
    pub mip_gap: f64,
    /// Wall-clock budget for the search.
    pub time_limit: Duration,
}

/// Termination status reported by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proven optimal (within the gap tolerance).
    Optimal,
    /// An incumbent exists but optimality was not proven within the budget.
    Feasible,
    /// The program has no feasible solution.
    Infeasible,
    /// Anything else: unbounded, numerical trouble, budget exhausted without
    /// an incumbent.
    Error,
}

impl SolveStatus {
    /// `true` for the statuses that carry a usable solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Error => "error",
        })
    }
}

/// What a solver returns.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    /// One value per variable, in declaration order, when
    /// `status.has_solution()`.
    pub values: Option<Vec<f64>>,
    /// Human-readable detail for non-success statuses.
    pub detail: String,
}

impl SolverOutcome {
    pub fn solved(status: SolveStatus, values: Vec<f64>) -> Self {
        Self {
            status,
            values: Some(values),
            detail: String::new(),
        }
    }

    pub fn failed(status: SolveStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            values: None,
            detail: detail.into(),
        }
    }
}

/// An integer-programming solver the exact strategy can delegate to.
pub trait MipSolver {
    fn solve(&self, program: &LinearProgram, params: &SolveParams) -> SolverOutcome;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
