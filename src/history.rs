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
//! Per-frequency history used by the similarity hopping strategy: an EMA
//! of the last-seen spectrum at each center frequency, plus an EMA of how
//! similar consecutive visits have been.
//!

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const ALPHA_FILTER: f32 = 0.75;
const ALPHA_RECURSIVE: f32 = 0.75;
const SIMILARITY_REDUCTION: f32 = 1.0005;
const LAG_SEARCH: i32 = 2;
const SHIFT_DEGRADATION_POWER: i32 = 2;
const CORRELATION_WEIGHT: f64 = 0.8;

/// One frequency's similarity-tracking state.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// EMA-filtered post-FFT magnitude of the most recent visit.
    pub previous_signal: Vec<f32>,
    /// EMA-smoothed similarity in `[0, 100]`.
    pub similarity: f32,
}

/// Flat mapping from center frequency to history entry, shared between the
/// planner and the FFT stage's post-FFT callback.
#[derive(Clone, Default)]
pub struct History {
    table: Arc<Mutex<HashMap<u32, HistoryEntry>>>,
}

impl History {
    pub fn new() -> Self {
        History {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the smoothed similarity stored for `key`, if any.
    pub fn similarity_of(&self, key: u32) -> Option<f32> {
        self.table.lock().unwrap().get(&key).map(|e| e.similarity)
    }

    /// Divides the stored similarity for `key` by `similarity_reduction`,
    /// modelling gradual decay of confidence while a frequency is skipped.
    /// No-op if there is no entry yet.
    pub fn decay(&self, key: u32) {
        if let Some(entry) = self.table.lock().unwrap().get_mut(&key) {
            entry.similarity /= SIMILARITY_REDUCTION;
        }
    }

    /// Post-FFT callback: EMA-filters `magnitude`, compares it against the
    /// stored signal for `key` (if any), folds the resulting similarity
    /// into the entry's smoothed similarity, then replaces the stored
    /// signal. Creates a fresh zero-similarity entry on first visit.
    pub fn observe(&self, key: u32, magnitude: &[f32]) {
        let filtered = ema_filter(magnitude);
        let mut table = self.table.lock().unwrap();
        match table.get_mut(&key) {
            Some(entry) => {
                let s = similarity_estimation(&entry.previous_signal, &filtered);
                entry.similarity = ALPHA_RECURSIVE * s + (1.0 - ALPHA_RECURSIVE) * entry.similarity;
                entry.previous_signal = filtered;
            }
            None => {
                table.insert(
                    key,
                    HistoryEntry {
                        previous_signal: filtered,
                        similarity: 0.0,
                    },
                );
            }
        }
    }
}

/// Exponential moving average IIR filter: `y[0] = x[0]`, `y[n] = alpha*x[n]
/// + (1-alpha)*y[n-1]`.
fn ema_filter(x: &[f32]) -> Vec<f32> {
    let mut y = Vec::with_capacity(x.len());
    if x.is_empty() {
        return y;
    }
    y.push(x[0]);
    for n in 1..x.len() {
        let prev = y[n - 1];
        y.push(ALPHA_FILTER * x[n] + (1.0 - ALPHA_FILTER) * prev);
    }
    y
}

/// Cross-correlation of `x` and `y` at integer lag `m`, summed over the
/// valid overlap.
fn xcorr(x: &[f32], y: &[f32], m: i32) -> f64 {
    let n = x.len() as i32;
    let mut res = 0.0f64;
    if m < 0 {
        let m = -m;
        let mut i = 0;
        while i < n - m {
            res += (y[(i + m) as usize] as f64) * (x[i as usize] as f64);
            i += 1;
        }
    } else {
        let mut i = 0;
        while i < n - m {
            res += (x[(i + m) as usize] as f64) * (y[i as usize] as f64);
            i += 1;
        }
    }
    res
}

/// Shift-degradation term `Sp(m) = ((-|m|/M) + 1)^p`.
fn shift_degradation(m: i32) -> f64 {
    let m = m.abs() as f64;
    let base = (-m / LAG_SEARCH as f64) + 1.0;
    base.powi(SHIFT_DEGRADATION_POWER)
}

/// Normalized, lag-searched cross-correlation similarity between two
/// equal-length signals, expressed as a percentage in `[0, 100]`.
pub fn similarity_estimation(x: &[f32], y: &[f32]) -> f32 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }
    let sum_x_square: f64 = x.iter().map(|v| (*v as f64) * (*v as f64)).sum();
    let sum_y_square: f64 = y.iter().map(|v| (*v as f64) * (*v as f64)).sum();
    let denom = sum_x_square.sqrt() * sum_y_square.sqrt();
    let norm = if denom > 0.0 { 1.0 / denom } else { 0.0 };

    let mut best_b = 0.0f64;
    let mut best_lag = 0i32;
    for m in -LAG_SEARCH..=LAG_SEARCH {
        let t = norm * xcorr(x, y, m);
        if t > best_b {
            best_b = t;
            best_lag = m;
        }
    }
    let result = (CORRELATION_WEIGHT * best_b + (1.0 - CORRELATION_WEIGHT) * shift_degradation(best_lag)) * 100.0;
    result as f32
}

/// Probability of skipping re-inspection of a frequency with smoothed
/// similarity `similarity` (in `[0, 100]`).
pub fn skip_probability(similarity: f32) -> f32 {
    0.0001 * (1_000_000f32.ln() * similarity / 100.0).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_signal_has_similarity_100_at_zero_lag() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0];
        let s = similarity_estimation(&x, &x);
        assert!((s - 100.0).abs() < 1e-3, "got {}", s);
    }

    #[test]
    fn skip_probability_at_similarity_100_is_100() {
        let p = skip_probability(100.0);
        assert!((p - 100.0).abs() < 1e-2, "got {}", p);
    }

    #[test]
    fn decay_divides_by_similarity_reduction() {
        let history = History::new();
        history.observe(42, &[1.0, 2.0, 3.0]);
        {
            let mut table = history.table.lock().unwrap();
            table.get_mut(&42).unwrap().similarity = 50.0;
        }
        history.decay(42);
        let s = history.similarity_of(42).unwrap();
        assert!((s - 50.0 / SIMILARITY_REDUCTION).abs() < 1e-4);
    }

    #[test]
    fn decay_after_k_skips_matches_seed_case_five() {
        let history = History::new();
        history.observe(7, &[1.0, 1.0, 1.0]);
        {
            let mut table = history.table.lock().unwrap();
            table.get_mut(&7).unwrap().similarity = 80.0;
        }
        let s0 = 80.0f32;
        let k = 5;
        for _ in 0..k {
            history.decay(7);
        }
        let expected = s0 / SIMILARITY_REDUCTION.powi(k);
        let got = history.similarity_of(7).unwrap();
        assert!((got - expected).abs() < 1e-3, "got {} expected {}", got, expected);
    }

    #[test]
    fn first_observation_creates_zero_similarity_entry() {
        let history = History::new();
        history.observe(99, &[0.1, 0.2, 0.3]);
        assert_eq!(history.similarity_of(99), Some(0.0));
    }
}
