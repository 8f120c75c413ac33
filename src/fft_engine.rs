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
//! Batched forward FFT, turning interleaved I/Q buffers into centered
//! power-in-dB magnitude buffers.
//!
//! Mirrors the plan/release-on-size-change discipline the fft stage needs:
//! a plan is only (re)built when the requested FFT size changes, and the
//! engine otherwise reuses it across calls to `forward`.
//!

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

const POWER_FLOOR: f32 = 1.0e-20;

/// Single-owner batched FFT engine. Not `Clone`/`Sync`: the fft stage is
/// the sole thread allowed to touch an engine instance.
pub struct FftEngine {
    planner: FftPlanner<f32>,
    plan: Option<Arc<dyn Fft<f32>>>,
    fft_size: usize,
}

impl FftEngine {
    pub fn new() -> Self {
        FftEngine {
            planner: FftPlanner::new(),
            plan: None,
            fft_size: 0,
        }
    }

    /// True once a plan of size `1 << log2_size` has been built.
    pub fn is_initialized_for(&self, log2_size: u32) -> bool {
        self.plan.is_some() && self.fft_size == (1usize << log2_size)
    }

    /// (Re)builds the FFT plan for `1 << log2_size`. `batch_len` is part of
    /// the upstream interface (the original engine preallocates per-batch
    /// scratch space sized by it); `rustfft`'s planner needs only the
    /// per-transform size, so it is accepted and otherwise unused here.
    pub fn init(&mut self, log2_size: u32, _batch_len: usize) {
        let fft_size = 1usize << log2_size;
        self.plan = Some(self.planner.plan_fft_forward(fft_size));
        self.fft_size = fft_size;
    }

    /// Releases the current plan. Safe to call when uninitialized.
    pub fn release(&mut self) {
        self.plan = None;
        self.fft_size = 0;
    }

    /// Runs a forward FFT over every interleaved I/Q buffer in `batch_in`
    /// (each `2 * fft_size` floats long) and returns one centered
    /// power-in-dB buffer (`fft_size` floats) per input, in the same
    /// order.
    ///
    /// Bins are fftshifted so index `0` is the most negative frequency and
    /// index `fft_size - 1` the most positive, which is what the dumping
    /// stage's symmetric `center_freq +/- i * freq_res` indexing assumes.
    pub fn forward(&mut self, batch_in: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let fft = self
            .plan
            .as_ref()
            .expect("FftEngine::forward called before init")
            .clone();
        let fft_size = self.fft_size;
        let mut out = Vec::with_capacity(batch_in.len());
        for iq in batch_in {
            debug_assert_eq!(iq.len(), 2 * fft_size);
            let mut buf: Vec<Complex32> = (0..fft_size)
                .map(|n| Complex32::new(iq[2 * n], iq[2 * n + 1]))
                .collect();
            fft.process(&mut buf);
            let mut magnitude_db: Vec<f32> = buf
                .iter()
                .map(|c| 20.0 * (c.norm().max(POWER_FLOOR)).log10())
                .collect();
            magnitude_db.rotate_left(fft_size / 2);
            out.push(magnitude_db);
        }
        out
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_is_half_of_input() {
        let mut engine = FftEngine::new();
        engine.init(3, 1); // fft_size = 8
        let iq = vec![0.0f32; 16];
        let out = engine.forward(&[iq]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 8);
    }

    #[test]
    fn dc_input_produces_finite_power() {
        let mut engine = FftEngine::new();
        engine.init(4, 1); // fft_size = 16
        let mut iq = vec![0.0f32; 32];
        for n in 0..16 {
            iq[2 * n] = 1.0;
            iq[2 * n + 1] = 0.0;
        }
        let out = engine.forward(&[iq]);
        for &v in &out[0] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn reinitializing_at_a_new_size_changes_output_length() {
        let mut engine = FftEngine::new();
        engine.init(3, 4); // fft_size = 8
        assert!(engine.is_initialized_for(3));
        engine.release();
        engine.init(5, 4); // fft_size = 32
        assert!(engine.is_initialized_for(5));
        let out = engine.forward(&[vec![0.0f32; 64]]);
        assert_eq!(out[0].len(), 32);
    }
}
