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
//! Sampling/Windowing stage: tunes the SDR, reads one bulk I/Q block per
//! sweep step, segments it into overlapping windows, removes DC, applies
//! the windowing function, and emits one Item per segment.
//!

use crate::controller::SweepControl;
use crate::device::SdrDevice;
use crate::hopping::{HoppingStrategyId, SweepStep};
use crate::item::{Item, Timestamp};
use crate::queue::QueueSender;
use log::{debug, error};
use std::sync::{Arc, Barrier};

/// Driver-required read-size alignment, in bytes.
const READ_ALIGNMENT: usize = 512;

pub struct SamplingStage {
    device: Box<dyn SdrDevice>,
    control: Arc<SweepControl>,
    downstream: QueueSender<Item>,
    gain: f32,
    hopping_strategy_id: HoppingStrategyId,
    prev_samp_rate: Option<u32>,
    prev_center_freq: Option<u32>,
    ready: Option<Arc<Barrier>>,
}

impl SamplingStage {
    pub fn new(
        device: Box<dyn SdrDevice>,
        control: Arc<SweepControl>,
        downstream: QueueSender<Item>,
        gain: f32,
        hopping_strategy_id: HoppingStrategyId,
    ) -> Self {
        SamplingStage {
            device,
            control,
            downstream,
            gain,
            hopping_strategy_id,
            prev_samp_rate: None,
            prev_center_freq: None,
            ready: None,
        }
    }

    /// Registers a startup barrier: the sampling stage waits on it once
    /// its device is configured and before it waits for the first sweep
    /// plan, so the controller can hold off the first sweep until this
    /// worker (and any others sharing the barrier) are live.
    pub fn with_ready_barrier(mut self, ready: Arc<Barrier>) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Runs sweeps until the controller signals shutdown, then propagates
    /// exit downstream.
    pub fn run(mut self) {
        if let Err(e) = self.device.set_gain(self.gain) {
            error!("failed to set initial gain: {}", e);
        }
        if let Some(ready) = &self.ready {
            ready.wait();
        }

        loop {
            let (plan, clk_off) = match self.control.wait_for_wake() {
                None => break,
                Some(v) => v,
            };

            if let Err(e) = self.device.set_freq_correction(clk_off) {
                error!("failed to set clock correction: {}", e);
            }

            for step in &plan.steps {
                if let Err(e) = self.visit_step(step) {
                    error!("SDR I/O failure during sweep step: {}", e);
                    break;
                }
            }

            self.control.report_sweep_done();
        }

        self.downstream.signal_exit();
    }

    fn visit_step(&mut self, step: &SweepStep) -> std::io::Result<()> {
        if self.prev_samp_rate != Some(step.samp_rate) {
            self.device.set_sample_rate(step.samp_rate)?;
            self.prev_samp_rate = Some(step.samp_rate);
        }
        if self.prev_center_freq != Some(step.center_freq) {
            self.device.retune(step.center_freq)?;
            self.prev_center_freq = Some(step.center_freq);
        }

        let fft_size = 1usize << step.log2_fft_size;
        let soverlap = step.soverlap as usize;
        let avg_factor = step.avg_factor as usize;
        let stride = fft_size - soverlap;

        let raw_len = (stride * avg_factor + soverlap) * 2;
        let slen = align_up(raw_len, READ_ALIGNMENT);

        let mut iq_buf = vec![0u8; slen];
        self.device.read(&mut iq_buf)?;

        let timestamp = Timestamp::now();

        for j in 0..avg_factor {
            let offset = j * stride * 2;
            let segment = &iq_buf[offset..offset + 2 * fft_size];

            let mut i_sum = 0.0f32;
            let mut q_sum = 0.0f32;
            for n in 0..fft_size {
                i_sum += segment[2 * n] as f32;
                q_sum += segment[2 * n + 1] as f32;
            }
            let i_mean = i_sum / fft_size as f32;
            let q_mean = q_sum / fft_size as f32;

            let mut samples = Vec::with_capacity(2 * fft_size);
            for n in 0..fft_size {
                let i = segment[2 * n] as f32 - i_mean;
                let q = segment[2 * n + 1] as f32 - q_mean;
                let w_i = step.window_fun_id.eval(2 * n, fft_size);
                let w_q = step.window_fun_id.eval(2 * n + 1, fft_size);
                samples.push(i * w_i);
                samples.push(q * w_q);
            }

            let item = Item {
                center_freq: step.center_freq,
                timestamp,
                samp_rate: step.samp_rate,
                log2_fft_size: step.log2_fft_size,
                avg_factor: step.avg_factor,
                avg_index: step.avg_factor - j as u32,
                soverlap: step.soverlap,
                freq_overlap: step.freq_overlap,
                gain: self.gain,
                hopping_strategy_id: self.hopping_strategy_id,
                window_fun_id: step.window_fun_id,
                samples,
                freq_res: 0.0,
            };

            debug!(
                "sampling: emitting Item center_freq={} avg_index={}",
                item.center_freq, item.avg_index
            );

            if self.downstream.insert(item).is_err() {
                break;
            }
        }

        Ok(())
    }
}

fn align_up(len: usize, alignment: usize) -> usize {
    ((len + alignment - 1) / alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(511, 512), 512);
        assert_eq!(align_up(512, 512), 512);
        assert_eq!(align_up(513, 512), 1024);
    }
}
