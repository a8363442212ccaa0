/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use wafer_sched::config::InstanceConfig;
use wafer_sched::feasibility::check;
use wafer_sched::schedule::Schedule;
use wafer_sched::scheduler::{build_exact_schedule, build_greedy_schedule, GreedyPolicy};
use wafer_sched::solver::MicroLpSolver;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Which strategies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Greedy, first idle compatible machine.
    Legacy,
    /// Greedy, fastest idle compatible machine.
    Better,
    /// Exact MILP model.
    Exact,
    /// All three, one after the other.
    All,
}

/// Wafer-to-machine dispatch scheduler.
///
/// Example:
///   wafer-sched --instance demos/instance.yaml --strategy all --alpha 0.5
#[derive(Debug, Parser)]
#[command(
    name = "wafer-sched",
    about = "Wafer-to-machine dispatch scheduler",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML instance file (wafers, machines, optional solver section).
    #[arg(short = 'i', long = "instance")]
    instance: PathBuf,

    /// Strategy to run.
    #[arg(short = 's', long = "strategy", value_enum, default_value_t = Strategy::All)]
    strategy: Strategy,

    /// Override the solver's relative optimality gap.
    #[arg(long = "mip-gap")]
    mip_gap: Option<f64>,

    /// Override the solver's time limit, in seconds.
    #[arg(long = "time-limit")]
    time_limit_secs: Option<u64>,

    /// Override the cycle-time weight alpha in [0, 1].
    #[arg(long = "alpha")]
    alpha: Option<f64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        instance = %cli.instance.display(),
        strategy = ?cli.strategy,
        mip_gap  = ?cli.mip_gap,
        time_limit_secs = ?cli.time_limit_secs,
        alpha    = ?cli.alpha,
        "Configuration"
    );

    // ── Load instance ─────────────────────────────────────────────────────────
    let config = match InstanceConfig::load_from_file(&cli.instance) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load instance: {:#}", e);
            process::exit(1);
        }
    };

    let mut settings = config.solver.exact_settings();
    if let Some(gap) = cli.mip_gap {
        settings.mip_gap = gap;
    }
    if let Some(secs) = cli.time_limit_secs {
        settings.time_limit = Duration::from_secs(secs);
    }
    if let Some(alpha) = cli.alpha {
        settings.cycle_time_weight = alpha;
    }

    // ── Run strategies ────────────────────────────────────────────────────────
    let run_legacy = matches!(cli.strategy, Strategy::Legacy | Strategy::All);
    let run_better = matches!(cli.strategy, Strategy::Better | Strategy::All);
    let run_exact = matches!(cli.strategy, Strategy::Exact | Strategy::All);
    let mut failed = false;

    for (enabled, label, policy) in [
        (run_legacy, "legacy", GreedyPolicy::FirstFit),
        (run_better, "better", GreedyPolicy::BestFit),
    ] {
        if !enabled {
            continue;
        }
        match build_greedy_schedule(&config.wafers, &config.machines, policy) {
            Ok(schedule) => report(label, &schedule, &config),
            Err(e) => {
                error!(strategy = label, "Scheduling failed: {e}");
                failed = true;
            }
        }
    }

    if run_exact {
        let solver = MicroLpSolver::new();
        match build_exact_schedule(&config.wafers, &config.machines, &settings, &solver) {
            Ok(out) => {
                if !out.proven_optimal() {
                    warn!(strategy = "exact", "Solution not proven optimal");
                }
                info!(strategy = "exact", objective = out.objective_value, status = %out.status, "Solver result");
                report("exact", &out.schedule, &config);
            }
            Err(e) => {
                error!(strategy = "exact", "Scheduling failed: {e}");
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

/// Log the decisions, the checker verdicts and the headline metrics.
fn report(label: &str, schedule: &Schedule, config: &InstanceConfig) {
    info!(strategy = label, decisions = schedule.len(), "=== {label} schedule ===");
    for d in schedule.decisions() {
        info!(
            "  [{machine}]  {wafer} ({priority})  {start} → {end}",
            machine = d.machine,
            wafer = d.wafer,
            priority = d.priority,
            start = d.start,
            end = d.end,
        );
    }

    let verdict = check(schedule, &config.wafers, &config.machines);
    if !verdict.all_passed() {
        warn!(strategy = label, rules = ?verdict.to_map(), "Schedule failed validation");
    }

    let metrics = schedule.metrics();
    info!(
        strategy = label,
        makespan_h = metrics.makespan_hours,
        weighted_cycle_time_h = metrics.weighted_cycle_time_hours,
        "Metrics"
    );
}
