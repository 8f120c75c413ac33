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
//! Hopping strategies: decide which center frequencies a sweep visits.
//!

mod random;
mod sequential;
mod similarity;

pub use random::RandomHopping;
pub use sequential::SequentialHopping;
pub use similarity::SimilarityHopping;

use crate::window::WindowFunctionId;
use std::str::FromStr;

/// Which hopping strategy produced a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoppingStrategyId {
    Sequential,
    Random,
    Similarity,
}

impl FromStr for HoppingStrategyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(HoppingStrategyId::Sequential),
            "random" => Ok(HoppingStrategyId::Random),
            "similarity" => Ok(HoppingStrategyId::Similarity),
            other => Err(format!("unknown hopping strategy '{}'", other)),
        }
    }
}

impl Default for HoppingStrategyId {
    fn default() -> Self {
        HoppingStrategyId::Similarity
    }
}

/// One step of a sweep plan: everything the sampling/windowing stage needs
/// to capture and emit Items for one hop.
#[derive(Debug, Clone)]
pub struct SweepStep {
    pub center_freq: u32,
    pub samp_rate: u32,
    pub log2_fft_size: u32,
    pub avg_factor: u32,
    pub soverlap: u32,
    pub freq_overlap: f32,
    pub window_fun_id: WindowFunctionId,
}

/// An ordered sequence of steps to visit during one sweep.
///
/// This supersedes the original program's parallel per-field arrays
/// (`samp_rates[i]`, `center_freqs[i]`, ...): since every field besides
/// `center_freq` is homogeneous across a sweep in every strategy this
/// crate implements, a flat `Vec<SweepStep>` carries the same information
/// without the bookkeeping of keeping N parallel arrays in sync.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    pub steps: Vec<SweepStep>,
}

/// Parameters common to every hopping strategy, taken from the CLI.
#[derive(Debug, Clone)]
pub struct HoppingParams {
    pub min_freq: u32,
    pub max_freq: u32,
    pub samp_rate: u32,
    pub log2_fft_size: u32,
    pub avg_factor: u32,
    pub soverlap: u32,
    pub freq_overlap: f32,
    pub window_fun_id: WindowFunctionId,
}

/// Computes the full candidate plan shared by the sequential and random
/// strategies (and the similarity strategy's full plan): evenly spaced
/// center frequencies covering `[min_freq, max_freq]`.
///
/// `freq_step = (1 - freq_overlap) * samp_rate`, truncated to an integer
/// before anything else is computed from it, matching the original
/// program's `unsigned int freq_step` and its subsequent integer
/// accumulation of center frequencies; the `+ 1e6` widening term is
/// preserved the same way (see `DESIGN.md`).
pub(crate) fn full_plan(params: &HoppingParams) -> SweepPlan {
    let freq_step = ((1.0 - params.freq_overlap) * params.samp_rate as f32) as u32;
    let span = (params.max_freq - params.min_freq) + 1_000_000;
    let n = span / freq_step;
    let mut steps = Vec::with_capacity(n as usize);
    let mut center = params.min_freq + freq_step / 2;
    for _ in 0..n {
        steps.push(SweepStep {
            center_freq: center,
            samp_rate: params.samp_rate,
            log2_fft_size: params.log2_fft_size,
            avg_factor: params.avg_factor,
            soverlap: params.soverlap,
            freq_overlap: params.freq_overlap,
            window_fun_id: params.window_fun_id,
        });
        center += freq_step;
    }
    SweepPlan { steps }
}

/// Selects which center frequencies a sweep visits.
///
/// A strategy owns whatever mutable state it needs between sweeps (cached
/// full plan, random source, history access); `next_plan` is called once
/// per sweep by the monitoring controller.
pub trait HoppingStrategy: Send {
    fn next_plan(&mut self) -> SweepPlan;

    fn id(&self) -> HoppingStrategyId;
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn full_plan_first_step_matches_seed_case_one() {
        // See DESIGN.md: with these exact inputs the length formula yields
        // 2 steps, not the single step the worked example in the spec
        // narrates; the first step's center frequency matches regardless.
        let plan = full_plan(&params());
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].center_freq, 100_500_000);
    }
}
