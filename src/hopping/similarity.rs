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

use super::{full_plan, HoppingParams, HoppingStrategy, HoppingStrategyId, SweepPlan};
use crate::history::{self, History};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Visits only the subset of the full band whose history suggests it is
/// worth re-inspecting, skipping frequencies whose spectrum has been
/// stable across recent visits.
///
/// The full candidate plan is computed once, like [`super::SequentialHopping`].
/// Each sweep re-evaluates every candidate against the shared [`History`],
/// which the FFT stage updates through [`History::observe`] after every
/// Item it emits.
pub struct SimilarityHopping {
    full: SweepPlan,
    history: History,
    rng: StdRng,
}

impl SimilarityHopping {
    pub fn new(params: HoppingParams, history: History) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        SimilarityHopping {
            full: full_plan(&params),
            history,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds the random source deterministically, for reproducible tests.
    pub fn with_seed(params: HoppingParams, history: History, seed: u64) -> Self {
        SimilarityHopping {
            full: full_plan(&params),
            history,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Shared handle to the history table this strategy reads and the FFT
    /// stage's post-FFT callback writes.
    pub fn history(&self) -> History {
        self.history.clone()
    }
}

impl HoppingStrategy for SimilarityHopping {
    fn next_plan(&mut self) -> SweepPlan {
        let mut steps = Vec::new();
        for step in &self.full.steps {
            let key = step.center_freq;
            match self.history.similarity_of(key) {
                None => steps.push(step.clone()),
                Some(similarity) => {
                    let p = history::skip_probability(similarity);
                    // Uniform draw in [0, 100), at tenths-of-a-percent
                    // resolution, reproducing `(rand() % 1000) / 10.0`.
                    let r = (self.rng.gen_range(0..1000) as f32) / 10.0;
                    if r >= p {
                        steps.push(step.clone());
                    } else {
                        self.history.decay(key);
                    }
                }
            }
        }
        SweepPlan { steps }
    }

    fn id(&self) -> HoppingStrategyId {
        HoppingStrategyId::Similarity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowFunctionId;

    fn params() -> HoppingParams {
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

    #[test]
    fn cold_start_inspects_every_candidate() {
        let mut strat = SimilarityHopping::with_seed(params(), History::new(), 1);
        let plan = strat.next_plan();
        assert_eq!(plan.steps.len(), strat.full.steps.len());
    }

    #[test]
    fn perfect_similarity_skips_everything() {
        let history = History::new();
        let full = full_plan(&params());
        for step in &full.steps {
            history.observe(step.center_freq, &[1.0, 2.0, 3.0, 4.0]);
            history.observe(step.center_freq, &[1.0, 2.0, 3.0, 4.0]);
        }
        for step in &full.steps {
            assert!((history.similarity_of(step.center_freq).unwrap() - 100.0).abs() < 1e-2);
        }
        let mut strat = SimilarityHopping::with_seed(params(), history, 3);
        let plan = strat.next_plan();
        assert_eq!(plan.steps.len(), 0);
    }
}
