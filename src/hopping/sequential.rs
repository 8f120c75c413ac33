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

/// Visits the full band once, computed on the first call and cached for
/// every later sweep.
pub struct SequentialHopping {
    params: HoppingParams,
    cached: Option<SweepPlan>,
}

impl SequentialHopping {
    pub fn new(params: HoppingParams) -> Self {
        SequentialHopping {
            params,
            cached: None,
        }
    }
}

impl HoppingStrategy for SequentialHopping {
    fn next_plan(&mut self) -> SweepPlan {
        if self.cached.is_none() {
            self.cached = Some(full_plan(&self.params));
        }
        self.cached.clone().unwrap()
    }

    fn id(&self) -> HoppingStrategyId {
        HoppingStrategyId::Sequential
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
    fn planner_is_idempotent() {
        let mut strat = SequentialHopping::new(params());
        let a = strat.next_plan();
        let b = strat.next_plan();
        assert_eq!(a.steps.len(), b.steps.len());
        for (sa, sb) in a.steps.iter().zip(b.steps.iter()) {
            assert_eq!(sa.center_freq, sb.center_freq);
        }
    }
}
