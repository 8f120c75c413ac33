/*
 * Copyright 2019 The Regents of the University of California
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

//!
//! Monitoring controller: owns the history table, runs the hopping-
//! strategy planner between sweeps, and paces the sampling/windowing
//! stage.
//!

use crate::hopping::{HoppingStrategy, SweepPlan};
use log::info;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Shared state through which the controller hands a new sweep plan to
/// the sampling/windowing stage and waits for it to finish visiting it.
///
/// This is the "stage context struct guarded by its own lock" pattern
/// from the concurrency model, specialized to the one producer
/// (controller) / one consumer (sampling stage) relationship between
/// these two components.
pub struct SweepControl {
    state: Mutex<SweepControlState>,
    awake: Condvar,
    done: Condvar,
}

struct SweepControlState {
    plan: SweepPlan,
    clk_off: i32,
    wake_requested: bool,
    sweep_done: bool,
    shutdown: bool,
}

impl SweepControl {
    pub fn new() -> Arc<Self> {
        Arc::new(SweepControl {
            state: Mutex::new(SweepControlState {
                plan: SweepPlan::default(),
                clk_off: 0,
                wake_requested: false,
                sweep_done: false,
                shutdown: false,
            }),
            awake: Condvar::new(),
            done: Condvar::new(),
        })
    }

    /// Publishes a new plan and clock offset, and wakes the sampling
    /// stage to visit it.
    pub fn publish_and_wake(&self, plan: SweepPlan, clk_off: i32) {
        let mut state = self.state.lock().unwrap();
        state.plan = plan;
        state.clk_off = clk_off;
        state.wake_requested = true;
        state.sweep_done = false;
        self.awake.notify_one();
    }

    /// Blocks until the sampling stage reports the current sweep
    /// complete.
    pub fn wait_for_sweep_done(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.sweep_done && !state.shutdown {
            state = self.done.wait(state).unwrap();
        }
    }

    /// Requests shutdown and wakes the sampling stage so it can observe
    /// it.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.shutdown = true;
        self.awake.notify_one();
        self.done.notify_one();
    }

    /// Sampling-stage side: blocks until woken, returning `None` once
    /// shutdown has been requested. Otherwise returns the current plan
    /// and clock offset and clears the wake request.
    pub fn wait_for_wake(&self) -> Option<(SweepPlan, i32)> {
        let mut state = self.state.lock().unwrap();
        while !state.wake_requested && !state.shutdown {
            state = self.awake.wait(state).unwrap();
        }
        if state.shutdown {
            return None;
        }
        state.wake_requested = false;
        Some((state.plan.clone(), state.clk_off))
    }

    /// Sampling-stage side: reports the current sweep complete.
    pub fn report_sweep_done(&self) {
        let mut state = self.state.lock().unwrap();
        state.sweep_done = true;
        self.done.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}

/// Gating parameters enforced between sweeps.
#[derive(Debug, Clone, Copy)]
pub struct ControllerLimits {
    /// Wall-clock seconds to run before stopping; 0 = unlimited.
    pub monitor_time: u64,
    /// Minimum seconds between the start of consecutive sweeps.
    pub min_time_res: u64,
    /// Number of sweeps to run before stopping; 0 = unlimited.
    pub number_of_sample_runs: u32,
}

/// Drives the hopping-strategy planner between sweeps and enforces the
/// monitor-time / sample-run / minimum-time-resolution gates.
pub struct Controller {
    strategy: Box<dyn HoppingStrategy>,
    control: Arc<SweepControl>,
    limits: ControllerLimits,
    clk_off: Arc<Mutex<i32>>,
}

impl Controller {
    pub fn new(
        strategy: Box<dyn HoppingStrategy>,
        control: Arc<SweepControl>,
        limits: ControllerLimits,
        clk_off: Arc<Mutex<i32>>,
    ) -> Self {
        Controller {
            strategy,
            control,
            limits,
            clk_off,
        }
    }

    /// Runs sweeps until a termination condition is met or shutdown is
    /// requested.
    pub fn run(&mut self) {
        let start = Instant::now();
        let mut sweeps_run = 0u32;
        let mut previous_sweep_start = Instant::now();

        loop {
            if self.control.is_shutdown() {
                break;
            }
            if self.limits.number_of_sample_runs > 0 && sweeps_run >= self.limits.number_of_sample_runs
            {
                info!("reached configured number_of_sample_runs, stopping");
                break;
            }
            if self.limits.monitor_time > 0
                && start.elapsed() >= Duration::from_secs(self.limits.monitor_time)
            {
                info!("reached configured monitor_time, stopping");
                break;
            }

            if self.limits.min_time_res > 0 {
                let min_gap = Duration::from_secs(self.limits.min_time_res);
                let elapsed = previous_sweep_start.elapsed();
                if elapsed < min_gap {
                    std::thread::sleep(min_gap - elapsed);
                }
            }
            previous_sweep_start = Instant::now();

            let plan = self.strategy.next_plan();
            let clk_off = *self.clk_off.lock().unwrap();
            self.control.publish_and_wake(plan, clk_off);
            self.control.wait_for_sweep_done();
            sweeps_run += 1;
        }

        self.control.shutdown();
    }
}
