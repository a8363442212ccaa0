/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Greedy discrete-event dispatching.
//!
//! A logical clock (minutes from the start of the horizon) drives a two-state
//! machine, `Running → Done`.  Each step:
//!
//! 1. **Dispatch**: every waiting wafer, in dispatch order, tries to claim a
//!    free compatible machine chosen by the [`GreedyPolicy`].  A claim starts
//!    the wafer at the current clock and keeps the machine busy until
//!    `clock + duration`.
//! 2. **Release**: if any machine is busy, the clock jumps to the earliest
//!    release time and every machine releasing at that instant becomes free.
//! 3. **Terminate**: once every wafer holds a claim the run is `Done`.
//!
//! All busy-state lives in [`Simulation`], created per run: a per-machine
//! `busy_until` vector plus a min-ordered release queue.  Entities are never
//! mutated, so repeated runs on the same inputs are independent and
//! deterministic.
//!
//! # No-progress guard
//! If a step leaves wafers waiting while no machine is busy, nothing can ever
//! change again; the waiting wafers have no compatible machine.  The run
//! fails with [`SchedulerError::Infeasible`] instead of looping forever.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, info, warn};

use super::{GreedyPolicy, SchedulerError};
use crate::instance::ProblemInstance;
use crate::schedule::{reference_instant, DispatchDecision, Schedule};
use crate::wafer::Minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Done,
}

/// A wafer's claim on a machine, in clock minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Claim {
    machine: usize,
    start: Minutes,
    duration: Minutes,
}

/// Run-scoped simulation state.  Owned by exactly one run.
struct Simulation<'a> {
    instance: &'a ProblemInstance,
    policy: GreedyPolicy,
    phase: Phase,
    clock: Minutes,
    /// `Some(t)` while machine is busy until `t`.
    busy_until: Vec<Option<Minutes>>,
    /// Pending releases `(time, machine)`, earliest first.
    releases: BinaryHeap<Reverse<(Minutes, usize)>>,
    /// Claim per wafer index; `None` while waiting.
    claims: Vec<Option<Claim>>,
    waiting: usize,
}

impl<'a> Simulation<'a> {
    fn new(instance: &'a ProblemInstance, policy: GreedyPolicy) -> Self {
        let wafer_count = instance.wafers().len();
        Self {
            instance,
            policy,
            phase: if wafer_count == 0 {
                Phase::Done
            } else {
                Phase::Running
            },
            clock: 0,
            busy_until: vec![None; instance.machines().len()],
            releases: BinaryHeap::new(),
            claims: vec![None; wafer_count],
            waiting: wafer_count,
        }
    }

    fn run(mut self) -> Result<Vec<Option<Claim>>, SchedulerError> {
        let mut steps = 0usize;
        while self.phase == Phase::Running {
            steps += 1;
            let claimed = self.dispatch_waiting()?;
            let advanced = self.release_next();

            if self.waiting == 0 {
                self.phase = Phase::Done;
            } else if !advanced {
                let stranded: Vec<String> = self
                    .claims
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.is_none())
                    .map(|(w, _)| self.instance.wafer(w).name.clone())
                    .collect();
                warn!(
                    clock = self.clock,
                    claimed_this_step = claimed,
                    stranded = ?stranded,
                    "✗ no machine is busy and wafers are still waiting"
                );
                return Err(SchedulerError::Infeasible { stranded });
            }
        }
        debug!(steps = steps, clock = self.clock, "simulation done");
        Ok(self.claims)
    }

    /// Phase 1: every waiting wafer tries to claim a free machine.  Returns
    /// the number of claims made.
    fn dispatch_waiting(&mut self) -> Result<usize, SchedulerError> {
        let mut claimed = 0usize;
        for w in 0..self.claims.len() {
            if self.claims[w].is_some() {
                continue;
            }
            let Some(machine) = self.select_machine(w) else {
                continue;
            };
            // select_machine only yields compatible machines
            let Some(duration) = self.instance.duration(w, machine) else {
                continue;
            };
            let Some(end) = self.clock.checked_add(duration) else {
                return Err(SchedulerError::TimeOverflow {
                    wafer: self.instance.wafer(w).name.clone(),
                    machine: self.instance.machine(machine).name.clone(),
                });
            };
            self.busy_until[machine] = Some(end);
            self.releases.push(Reverse((end, machine)));
            self.claims[w] = Some(Claim {
                machine,
                start: self.clock,
                duration,
            });
            self.waiting -= 1;
            claimed += 1;
            debug!(
                wafer = %self.instance.wafer(w).name,
                machine = %self.instance.machine(machine).name,
                start = self.clock,
                end = end,
                "✓ claimed"
            );
        }
        Ok(claimed)
    }

    /// Choose a free compatible machine for wafer `w` according to the policy.
    fn select_machine(&self, w: usize) -> Option<usize> {
        let mut free = self
            .instance
            .compatible_machines(w)
            .iter()
            .copied()
            .filter(|&m| self.busy_until[m].is_none());

        match self.policy {
            GreedyPolicy::FirstFit => free.next(),
            GreedyPolicy::BestFit => {
                let mut best: Option<(usize, Minutes)> = None;
                for m in free {
                    let Some(d) = self.instance.duration(w, m) else {
                        continue;
                    };
                    // strict `<` keeps the first machine on ties
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((m, d));
                    }
                }
                best.map(|(m, _)| m)
            }
        }
    }

    /// Phase 2: jump to the earliest release and free every machine releasing
    /// then.  Returns `false` when no machine was busy.
    fn release_next(&mut self) -> bool {
        let Some(&Reverse((next, _))) = self.releases.peek() else {
            return false;
        };
        while let Some(&Reverse((t, m))) = self.releases.peek() {
            if t != next {
                break;
            }
            self.releases.pop();
            self.busy_until[m] = None;
        }
        self.clock = next;
        true
    }
}

/// Run the greedy simulation over a validated instance.
pub(super) fn schedule(
    instance: &ProblemInstance,
    policy: GreedyPolicy,
) -> Result<Schedule, SchedulerError> {
    info!(
        policy = %policy,
        wafers = instance.wafers().len(),
        machines = instance.machines().len(),
        "greedy: starting simulation"
    );

    let claims = Simulation::new(instance, policy).run()?;

    let anchor = reference_instant();
    let decisions: Vec<DispatchDecision> = claims
        .iter()
        .enumerate()
        .filter_map(|(w, c)| c.map(|c| (w, c)))
        .map(|(w, c)| {
            DispatchDecision::at_minute(
                anchor,
                instance.wafer(w),
                instance.machine(c.machine),
                c.start,
                c.duration,
            )
        })
        .collect::<Result<_, _>>()?;

    let schedule = Schedule::new(decisions);
    info!(
        policy = %policy,
        decisions = schedule.len(),
        makespan_h = schedule.makespan_hours(),
        "greedy: schedule complete"
    );
    Ok(schedule)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
