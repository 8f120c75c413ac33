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
//! End-to-end pipeline tests: wires sampling (against a synthetic device),
//! FFT, averaging and dumping together through real bounded queues and
//! drives them with the real monitoring controller, one sweep at a time.
//!

extern crate rf_sweep;

use rf_sweep::controller::{Controller, ControllerLimits, SweepControl};
use rf_sweep::device::SyntheticDevice;
use rf_sweep::hopping::{HoppingParams, SequentialHopping};
use rf_sweep::queue::bounded_queue;
use rf_sweep::stages::{AveragingStage, DumpingStage, FftStage, SamplingStage};
use rf_sweep::window::WindowFunctionId;
use std::sync::{Arc, Mutex};
use std::thread;

fn seed_case_one_params() -> HoppingParams {
    HoppingParams {
        min_freq: 100_000_000,
        max_freq: 101_000_000,
        samp_rate: 1_000_000,
        log2_fft_size: 4,
        avg_factor: 1,
        soverlap: 0,
        freq_overlap: 0.0,
        window_fun_id: WindowFunctionId::Rectangular,
    }
}

/// One full sweep through every stage, with a single-run controller, ends
/// with a clean pipeline shutdown and stdout lines for every visited
/// center frequency.
#[test]
fn single_sweep_drains_cleanly_through_every_stage() {
    let (sampling_tx, fft_rx) = bounded_queue(16);
    let (fft_tx, avg_rx) = bounded_queue(16);
    let (avg_tx, dump_rx) = bounded_queue(16);

    let control = SweepControl::new();
    let device = Box::new(SyntheticDevice::open(0));
    let sampling = SamplingStage::new(
        device,
        Arc::clone(&control),
        sampling_tx,
        32.8,
        rf_sweep::hopping::HoppingStrategyId::Sequential,
    );
    let fft_stage = FftStage::new(fft_rx, fft_tx, 10, None);
    let averaging = AveragingStage::new(avg_rx, avg_tx);

    let mut out_buf = Vec::new();
    let sampling_handle = thread::spawn(move || sampling.run());
    let fft_handle = thread::spawn(move || fft_stage.run());
    let averaging_handle = thread::spawn(move || averaging.run());

    let strategy = Box::new(SequentialHopping::new(seed_case_one_params()));
    let limits = ControllerLimits {
        monitor_time: 0,
        min_time_res: 0,
        number_of_sample_runs: 1,
    };
    let mut controller = Controller::new(strategy, Arc::clone(&control), limits, Arc::new(Mutex::new(0)));
    controller.run();

    {
        let dumping = DumpingStage::new(dump_rx, &mut out_buf);
        dumping.run();
    }

    sampling_handle.join().unwrap();
    fft_handle.join().unwrap();
    averaging_handle.join().unwrap();

    // Seed case 1: min=100e6, max=101e6, samp=1e6, freq_overlap=0 -> the
    // full-plan formula (see DESIGN.md) yields two center frequencies,
    // the first of which is 100.5e6 Hz with 16 bins each.
    let text = String::from_utf8(out_buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 32, "two sweep steps x 16 bins each");

    for line in &lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 4);
        let power: f32 = fields[3].parse().unwrap();
        assert!(power.is_finite());
    }

    let first_freq: u32 = lines[0].split(',').nth(2).unwrap().parse().unwrap();
    assert!((first_freq as i64 - 100_500_000i64).unsigned_abs() <= 8 * 62_500);
}

/// Averaging collapses an `avg_factor`-sized group into exactly one Item
/// per sweep step, matching seed case 2.
#[test]
fn avg_factor_three_collapses_to_one_item_per_step() {
    let (sampling_tx, fft_rx) = bounded_queue(16);
    let (fft_tx, avg_rx) = bounded_queue(16);
    let (avg_tx, dump_rx) = bounded_queue(16);

    let control = SweepControl::new();
    let device = Box::new(SyntheticDevice::open(1));
    let sampling = SamplingStage::new(
        device,
        Arc::clone(&control),
        sampling_tx,
        32.8,
        rf_sweep::hopping::HoppingStrategyId::Sequential,
    );
    let fft_stage = FftStage::new(fft_rx, fft_tx, 10, None);
    let averaging = AveragingStage::new(avg_rx, avg_tx);

    let mut params = seed_case_one_params();
    params.avg_factor = 3;

    let sampling_handle = thread::spawn(move || sampling.run());
    let fft_handle = thread::spawn(move || fft_stage.run());
    let averaging_handle = thread::spawn(move || averaging.run());

    let strategy = Box::new(SequentialHopping::new(params));
    let limits = ControllerLimits {
        monitor_time: 0,
        min_time_res: 0,
        number_of_sample_runs: 1,
    };
    let mut controller = Controller::new(strategy, Arc::clone(&control), limits, Arc::new(Mutex::new(0)));
    controller.run();

    let mut out_buf = Vec::new();
    {
        let dumping = DumpingStage::new(dump_rx, &mut out_buf);
        dumping.run();
    }

    sampling_handle.join().unwrap();
    fft_handle.join().unwrap();
    averaging_handle.join().unwrap();

    // Two sweep steps (per the full-plan formula), 16 bins per averaged
    // Item: 32 lines, exactly as in the avg_factor=1 case, since averaging
    // collapses each step's 3 segments down to 1 before dumping.
    let text = String::from_utf8(out_buf).unwrap();
    assert_eq!(text.lines().count(), 32);
}
