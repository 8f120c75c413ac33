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
//! The unit of work that flows through the sampling -> FFT -> averaging ->
//! dumping pipeline.
//!

use crate::hopping::HoppingStrategyId;
use crate::window::WindowFunctionId;

/// A timestamp with microsecond resolution, as read at segmentation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Seconds since the epoch
    pub sec: u32,
    /// Microseconds within the second
    pub usec: u32,
}

impl Timestamp {
    /// Returns the current wall-clock time
    pub fn now() -> Self {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            sec: since_epoch.as_secs() as u32,
            usec: since_epoch.subsec_micros(),
        }
    }
}

/// One work unit flowing through the pipeline.
///
/// Before the FFT stage, `samples` holds `2 * fft_size` interleaved I/Q
/// floats. After the FFT stage, it holds `fft_size` power-in-dB floats.
/// An Item is exclusively owned by one stage at a time; ownership transfer
/// happens atomically via queue insert/remove. No stage may mutate an Item
/// that has already been handed off.
#[derive(Debug, Clone)]
pub struct Item {
    /// Center frequency, in hertz
    pub center_freq: u32,
    /// Capture timestamp
    pub timestamp: Timestamp,
    /// Sample rate, in hertz
    pub samp_rate: u32,
    /// log2 of the FFT size
    pub log2_fft_size: u32,
    /// Number of segments averaged together to form one reading
    pub avg_factor: u32,
    /// 1-indexed position within the average group, counting down from
    /// `avg_factor` to 1 as the sampling stage emits segments
    pub avg_index: u32,
    /// Segment overlap, in samples (0 <= soverlap < fft_size)
    pub soverlap: u32,
    /// Fraction of the band discarded as guard band, in [0, 1)
    pub freq_overlap: f32,
    /// Gain setting used to capture this segment, in dB (or -1 for auto)
    pub gain: f32,
    /// Which hopping strategy produced the sweep this Item belongs to
    pub hopping_strategy_id: HoppingStrategyId,
    /// Which window function was applied to this segment
    pub window_fun_id: WindowFunctionId,
    /// Polymorphic payload: interleaved I/Q before the FFT stage, magnitude
    /// in dB after it
    pub samples: Vec<f32>,
    /// Frequency resolution in Hz/bin, filled in by the dumping stage
    pub freq_res: f32,
}

impl Item {
    /// Returns `1 << log2_fft_size`
    pub fn fft_size(&self) -> usize {
        1usize << self.log2_fft_size
    }

    /// Returns true if `samples` still holds the pre-FFT I/Q payload
    pub fn is_pre_fft(&self) -> bool {
        self.samples.len() == 2 * self.fft_size()
    }
}
