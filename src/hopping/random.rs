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

use super::{HoppingParams, HoppingStrategy, HoppingStrategyId, SweepStep};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Re-rolls every center frequency each sweep, drawn uniformly at the
/// FFT's frequency resolution across the configured band.
pub struct RandomHopping {
    params: HoppingParams,
    length: usize,
    rng: StdRng,
}

impl RandomHopping {
    pub fn new(params: HoppingParams) -> Self {
        let freq_step = (1.0 - params.freq_overlap) * params.samp_rate as f32;
        let span = (params.max_freq as f32 - params.min_freq as f32) + 1.0e6;
        let length = (span / freq_step) as usize;
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        RandomHopping {
            params,
            length,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds the random source deterministically, for reproducible tests.
    pub fn with_seed(params: HoppingParams, seed: u64) -> Self {
        let freq_step = (1.0 - params.freq_overlap) * params.samp_rate as f32;
        let span = (params.max_freq as f32 - params.min_freq as f32) + 1.0e6;
        let length = (span / freq_step) as usize;
        RandomHopping {
            params,
            length,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl HoppingStrategy for RandomHopping {
    fn next_plan(&mut self) -> super::SweepPlan {
        let freq_step = (1.0 - self.params.freq_overlap) * self.params.samp_rate as f32;
        let resolution = self.params.samp_rate / (1u32 << self.params.log2_fft_size);
        let min_f = ((self.params.min_freq as f32 + 0.5 * freq_step) / resolution as f32) as u32;
        let max_f = ((self.params.max_freq as f32 - 0.5 * freq_step + resolution as f32)
            / resolution as f32) as u32;

        let mut steps = Vec::with_capacity(self.length);
        for _ in 0..self.length {
            let offset = self.rng.gen_range(0..=(max_f - min_f));
            let center_freq = (min_f + offset) * resolution;
            steps.push(SweepStep {
                center_freq,
                samp_rate: self.params.samp_rate,
                log2_fft_size: self.params.log2_fft_size,
                avg_factor: self.params.avg_factor,
                soverlap: self.params.soverlap,
                freq_overlap: self.params.freq_overlap,
                window_fun_id: self.params.window_fun_id,
            });
        }
        super::SweepPlan { steps }
    }

    fn id(&self) -> HoppingStrategyId {
        HoppingStrategyId::Random
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowFunctionId;

    fn params() -> HoppingParams {
        HoppingParams {
            min_freq: 100_000_000,
            max_freq: 200_000_000,
            samp_rate: 2_400_000,
            log2_fft_size: 8,
            avg_factor: 5,
            soverlap: 128,
            freq_overlap: 1.0 / 6.0,
            window_fun_id: WindowFunctionId::Hanning,
        }
    }

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut a = RandomHopping::with_seed(params(), 42);
        let mut b = RandomHopping::with_seed(params(), 42);
        let plan_a = a.next_plan();
        let plan_b = b.next_plan();
        let freqs_a: Vec<u32> = plan_a.steps.iter().map(|s| s.center_freq).collect();
        let freqs_b: Vec<u32> = plan_b.steps.iter().map(|s| s.center_freq).collect();
        assert_eq!(freqs_a, freqs_b);
    }

    #[test]
    fn frequencies_stay_within_band() {
        let mut strat = RandomHopping::with_seed(params(), 7);
        let plan = strat.next_plan();
        for step in &plan.steps {
            assert!(step.center_freq >= params().min_freq);
            assert!(step.center_freq <= params().max_freq + params().samp_rate);
        }
    }
}
