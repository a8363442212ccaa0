/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! wafer-sched – wafer-to-machine dispatch scheduling
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── wafer         – Wafer / Machine / Priority identity types
//! ├── instance      – validated, indexed problem shared by all strategies
//! ├── schedule      – DispatchDecision, Schedule, metrics
//! ├── scheduler/    – greedy simulation + exact MILP strategies
//! ├── solver/       – solver-neutral MILP model + microlp backend
//! ├── feasibility   – post-schedule rule checks
//! └── config/       – YAML instance loading
//! ```

pub mod config;
pub mod feasibility;
pub mod instance;
pub mod schedule;
pub mod scheduler;
pub mod solver;
pub mod wafer;
