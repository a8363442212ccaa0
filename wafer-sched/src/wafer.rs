/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core entity types: wafers, their priority classes, and machines.
//!
//! Both types are immutable identity records.  Nothing here carries
//! per-run scheduling state: a machine's "busy until" time belongs to the
//! simulation that is currently running (see `scheduler::greedy`), never to
//! the `Machine` itself, so two runs over the same inputs cannot interfere.
//!
//! ```text
//! input collaborator ──►  Wafer / Machine  ──►  ProblemInstance  ──►  strategy
//!                          ↑ identity only       ↑ ordering + compatibility
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Processing durations and the greedy logical clock are whole minutes.
pub type Minutes = u64;

/// Recipe identifier; selects which duration a machine uses.
pub type RecipeId = String;

// ── Priority ──────────────────────────────────────────────────────────────────

/// Priority class of a wafer.
///
/// The weight is used twice: the global ordering (heaviest first) and the
/// priority-weighted cycle time objective / metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Red,
    Orange,
    Yellow,
}

impl Priority {
    /// Numeric weight: red `1.0`, orange `0.5`, yellow `0.1`.
    pub fn weight(self) -> f64 {
        match self {
            Priority::Red => 1.0,
            Priority::Orange => 0.5,
            Priority::Yellow => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Red => "red",
            Priority::Orange => "orange",
            Priority::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Wafer ─────────────────────────────────────────────────────────────────────

/// A unit of work: one wafer with a priority class and a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wafer {
    /// Unique wafer name.
    pub name: String,
    pub priority: Priority,
    pub recipe: RecipeId,
}

impl Wafer {
    pub fn new(name: impl Into<String>, priority: Priority, recipe: impl Into<RecipeId>) -> Self {
        Self {
            name: name.into(),
            priority,
            recipe: recipe.into(),
        }
    }

    /// Shorthand for `self.priority.weight()`.
    pub fn weight(&self) -> f64 {
        self.priority.weight()
    }
}

/// The global dispatch ordering shared by every strategy: descending priority
/// weight, then ascending name.
///
/// Weights are fixed constants, so comparing them with `total_cmp` is exact.
pub fn dispatch_order(a: &Wafer, b: &Wafer) -> std::cmp::Ordering {
    b.weight()
        .total_cmp(&a.weight())
        .then_with(|| a.name.cmp(&b.name))
}

// ── Machine ───────────────────────────────────────────────────────────────────

/// A processing machine and its recipe table.
///
/// A `BTreeMap` keeps the table's iteration order stable for logging and
/// serialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine name.
    pub name: String,
    /// Recipe → processing duration in minutes.
    pub processing_minutes: BTreeMap<RecipeId, Minutes>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processing_minutes: BTreeMap::new(),
        }
    }

    /// Builder-style helper adding one recipe to the table.
    pub fn with_recipe(mut self, recipe: impl Into<RecipeId>, minutes: Minutes) -> Self {
        self.processing_minutes.insert(recipe.into(), minutes);
        self
    }

    /// Processing duration of `recipe` on this machine, or `None` if the
    /// machine cannot run it.
    pub fn duration(&self, recipe: &str) -> Option<Minutes> {
        self.processing_minutes.get(recipe).copied()
    }

    /// `true` if the recipe table contains `recipe`.
    pub fn supports(&self, recipe: &str) -> bool {
        self.processing_minutes.contains_key(recipe)
    }
}

/// Names of the machines able to process `wafer`, in machine-list order.
pub fn compatible_machines<'m>(wafer: &Wafer, machines: &'m [Machine]) -> Vec<&'m str> {
    machines
        .iter()
        .filter(|m| m.supports(&wafer.recipe))
        .map(|m| m.name.as_str())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
