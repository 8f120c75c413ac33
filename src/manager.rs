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
//! Top-level supervisor: boots the monitoring controller and the four
//! pipeline stages, schedules periodic clock correction, and handles
//! shutdown (external SIGINT-style request, or the controller's own
//! termination conditions).
//!

use crate::args::Args;
use crate::clock_correction::ClockCorrection;
use crate::controller::{Controller, ControllerLimits, SweepControl};
use crate::device;
use crate::history::History;
use crate::hopping::{
    HoppingParams, HoppingStrategy, HoppingStrategyId, RandomHopping, SequentialHopping,
    SimilarityHopping,
};
use crate::queue::bounded_queue;
use crate::stages::{AveragingStage, DumpingStage, FftStage, SamplingStage};
use crossbeam_utils::thread as cb_thread;
use log::info;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::{Duration, Instant};

/// Forced-abort deadline for graceful shutdown, per the original
/// program's `SIGALRM`-based watchdog. A dedicated thread stands in for
/// the signal handler, since arbitrary Rust code is not signal-safe.
const ABORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Granularity at which background threads re-check their shutdown
/// predicate. Short enough that shutdown feels immediate, long enough
/// that polling isn't a busy loop.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Queue capacity between adjacent pipeline stages.
fn queue_capacity(fft_batchlen: usize) -> usize {
    (10 * fft_batchlen).min(100)
}

/// Runs the full pipeline to completion: all stage threads joined, all
/// queues drained. `stop` is an externally-owned flag (set by a SIGINT
/// handler, for instance) that requests graceful shutdown.
pub struct Manager {
    args: Args,
    stop: Arc<AtomicBool>,
}

impl Manager {
    pub fn new(args: Args, stop: Arc<AtomicBool>) -> Self {
        Manager { args, stop }
    }

    pub fn run(self) -> io::Result<()> {
        let args = &self.args;
        let q_capacity = queue_capacity(args.fft_batchlen);

        let (sampling_tx, fft_rx) = bounded_queue(q_capacity);
        let (fft_tx, avg_rx) = bounded_queue(q_capacity);
        let (avg_tx, dump_rx) = bounded_queue(q_capacity);

        let history = History::new();
        let hopping_params = HoppingParams {
            min_freq: args.min_freq_hz,
            max_freq: args.max_freq_hz,
            samp_rate: args.samp_rate,
            log2_fft_size: args.log2_fft_size,
            avg_factor: args.avg_factor(),
            soverlap: args.soverlap(),
            freq_overlap: args.freq_overlap,
            window_fun_id: args.window_fun,
        };

        let (strategy, fft_similarity_history): (Box<dyn HoppingStrategy>, Option<History>) =
            match args.hopping_strategy {
                HoppingStrategyId::Sequential => {
                    (Box::new(SequentialHopping::new(hopping_params)), None)
                }
                HoppingStrategyId::Random => (Box::new(RandomHopping::new(hopping_params)), None),
                HoppingStrategyId::Similarity => {
                    let strat = SimilarityHopping::new(hopping_params, history.clone());
                    let history_handle = strat.history();
                    (Box::new(strat), Some(history_handle))
                }
            };

        let sweep_control = SweepControl::new();
        let clk_off = Arc::new(Mutex::new(args.clk_off));

        let device = device::open_default(args.dev_index)?;

        // Three parties join the startup handshake before the first sweep
        // is allowed to begin: the sampling stage, the clock-correction
        // worker, and the controller itself (run directly in this scope).
        let ready = Arc::new(Barrier::new(3));

        let sampling = SamplingStage::new(
            device,
            Arc::clone(&sweep_control),
            sampling_tx,
            args.gain,
            args.hopping_strategy,
        )
        .with_ready_barrier(Arc::clone(&ready));
        let fft_stage = FftStage::new(fft_rx, fft_tx, args.fft_batchlen, fft_similarity_history);
        let averaging = AveragingStage::new(avg_rx, avg_tx);
        let dumping = DumpingStage::new(dump_rx, io::stdout());

        let limits = ControllerLimits {
            monitor_time: args.monitor_time,
            min_time_res: args.min_time_res,
            number_of_sample_runs: args.number_of_sample_runs,
        };
        let mut controller = Controller::new(
            strategy,
            Arc::clone(&sweep_control),
            limits,
            Arc::clone(&clk_off),
        );

        let mut clock_correction = ClockCorrection::new(args.clk_off);
        let clk_corr_period = Duration::from_secs(args.clk_corr_period.max(1));

        let pipeline_done = Arc::new(AtomicBool::new(false));

        let result = cb_thread::scope(|scope| {
            scope
                .builder()
                .name("sampling".into())
                .spawn(move |_| sampling.run())
                .expect("failed to spawn sampling thread");
            scope
                .builder()
                .name("fft".into())
                .spawn(move |_| fft_stage.run())
                .expect("failed to spawn fft thread");
            scope
                .builder()
                .name("averaging".into())
                .spawn(move |_| averaging.run())
                .expect("failed to spawn averaging thread");
            scope
                .builder()
                .name("dumping".into())
                .spawn(move |_| dumping.run())
                .expect("failed to spawn dumping thread");

            {
                let stop = Arc::clone(&self.stop);
                let done = Arc::clone(&pipeline_done);
                let clk_off = Arc::clone(&clk_off);
                let ready = Arc::clone(&ready);
                scope
                    .builder()
                    .name("clock-correction".into())
                    .spawn(move |_| {
                        ready.wait();
                        run_clock_correction(&mut clock_correction, clk_corr_period, &clk_off, &stop, &done)
                    })
                    .expect("failed to spawn clock-correction thread");
            }

            {
                let stop = Arc::clone(&self.stop);
                let done = Arc::clone(&pipeline_done);
                let control = Arc::clone(&sweep_control);
                scope
                    .builder()
                    .name("shutdown-supervisor".into())
                    .spawn(move |_| run_shutdown_supervisor(&stop, &done, &control))
                    .expect("failed to spawn shutdown-supervisor thread");
            }

            // Joins the sampling stage and the clock-correction worker:
            // neither starts its real work loop until all three have
            // reached this point.
            ready.wait();
            controller.run();
            pipeline_done.store(true, Ordering::Relaxed);
        });

        result.expect("a pipeline thread panicked");
        Ok(())
    }
}

/// Periodically requests a clock-correction cycle, sleeping in short
/// increments so it notices shutdown promptly even when
/// `clk_corr_period` is large.
fn run_clock_correction(
    clock_correction: &mut ClockCorrection,
    period: Duration,
    clk_off: &Arc<Mutex<i32>>,
    stop: &Arc<AtomicBool>,
    done: &Arc<AtomicBool>,
) {
    let mut elapsed = Duration::from_secs(0);
    while !stop.load(Ordering::Relaxed) && !done.load(Ordering::Relaxed) {
        std::thread::sleep(POLL_INTERVAL);
        elapsed += POLL_INTERVAL;
        if elapsed >= period {
            elapsed = Duration::from_secs(0);
            let corrected = clock_correction.correct();
            *clk_off.lock().unwrap() = corrected;
            info!("clock correction ran, clk_off = {}", corrected);
        }
    }
}

/// Watches for external shutdown (`stop`) or natural pipeline completion
/// (`done`). On external shutdown, propagates it to the sweep control and
/// forces the process to exit if the graceful drain exceeds
/// [`ABORT_TIMEOUT`].
fn run_shutdown_supervisor(
    stop: &Arc<AtomicBool>,
    done: &Arc<AtomicBool>,
    control: &Arc<SweepControl>,
) {
    while !stop.load(Ordering::Relaxed) && !done.load(Ordering::Relaxed) {
        std::thread::sleep(POLL_INTERVAL);
    }
    if done.load(Ordering::Relaxed) {
        return;
    }

    info!("shutdown requested, finishing in-progress sweep and draining queues");
    control.shutdown();

    let deadline = Instant::now() + ABORT_TIMEOUT;
    while !done.load(Ordering::Relaxed) {
        if Instant::now() >= deadline {
            eprintln!(
                "graceful shutdown exceeded {}s, forcing exit",
                ABORT_TIMEOUT.as_secs()
            );
            std::process::exit(1);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
