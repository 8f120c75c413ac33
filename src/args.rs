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

//! Command-line arguments.

use crate::hopping::HoppingStrategyId;
use crate::window::WindowFunctionId;
use clap::Parser;
use simplelog::LevelFilter;

/// Sweeps `min_freq_hz..=max_freq_hz`, capturing, windowing and FFT-ing
/// baseband I/Q from an SDR dongle and writing timestamped per-bin power
/// readings to standard output.
#[derive(Parser, Debug)]
#[command(name = "rf-sweep", version, about)]
pub struct Args {
    /// Lower edge of the band to sweep, in hertz
    pub min_freq_hz: u32,

    /// Upper edge of the band to sweep, in hertz
    pub max_freq_hz: u32,

    /// SDR device index
    #[arg(short = 'd', long, default_value_t = 0)]
    pub dev_index: u32,

    /// Initial clock offset, in parts per million
    #[arg(short = 'c', long, default_value_t = 0)]
    pub clk_off: i32,

    /// Clock correction period, in seconds
    #[arg(short = 'k', long, default_value_t = 3600)]
    pub clk_corr_period: u64,

    /// Tuner gain in dB, or -1 for automatic gain control
    #[arg(short = 'g', long, default_value_t = 32.8)]
    pub gain: f32,

    /// Which hopping strategy selects center frequencies to visit
    #[arg(short = 'y', long, default_value = "similarity")]
    pub hopping_strategy: HoppingStrategyId,

    /// Sample rate, in hertz
    #[arg(short = 's', long, default_value_t = 2_400_000)]
    pub samp_rate: u32,

    /// log2 of the FFT size
    #[arg(short = 'f', long, default_value_t = 8)]
    pub log2_fft_size: u32,

    /// Number of Items batched per forward FFT call
    #[arg(short = 'b', long, default_value_t = 10)]
    pub fft_batchlen: usize,

    /// Number of overlapping segments averaged into one reading
    #[arg(short = 'a', long, default_value_t = 5)]
    pub avg_factor: i64,

    /// Segment overlap, in samples (defaults to half the FFT size)
    #[arg(short = 'o', long)]
    pub soverlap: Option<i64>,

    /// Fraction of the band discarded as guard band
    #[arg(short = 'q', long, default_value_t = 1.0 / 6.0)]
    pub freq_overlap: f32,

    /// How long to monitor, in seconds (0 = run forever)
    #[arg(short = 't', long, default_value_t = 0)]
    pub monitor_time: u64,

    /// Minimum time between sweeps, in seconds
    #[arg(short = 'r', long, default_value_t = 0)]
    pub min_time_res: u64,

    /// Window function applied to each segment
    #[arg(short = 'w', long, default_value = "hanning")]
    pub window_fun: WindowFunctionId,

    /// Number of sweeps to run before stopping (0 = unlimited)
    #[arg(short = 'x', long, default_value_t = 0)]
    pub number_of_sample_runs: u32,

    /// Logging verbosity
    #[arg(long, default_value = "info")]
    pub log_level: LogLevelArg,
}

impl Args {
    /// `avg_factor` clamped to the documented minimum of 1 -- values below
    /// it are coerced to the default of 5, matching the original program.
    pub fn avg_factor(&self) -> u32 {
        if self.avg_factor < 1 {
            5
        } else {
            self.avg_factor as u32
        }
    }

    /// `soverlap`, defaulting to `fft_size / 2` and coerced to that same
    /// default when it would not leave room for at least one sample of
    /// stride (`soverlap > fft_size - 1`).
    pub fn soverlap(&self) -> u32 {
        let fft_size = 1u32 << self.log2_fft_size;
        let default = fft_size / 2;
        match self.soverlap {
            None => default,
            Some(v) if v < 0 || v as u32 > fft_size - 1 => default,
            Some(v) => v as u32,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.0
    }
}

/// Wraps `simplelog::LevelFilter` so it can be parsed directly from a CLI
/// argument string.
#[derive(Debug, Clone, Copy)]
pub struct LogLevelArg(pub LevelFilter);

impl std::str::FromStr for LogLevelArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevelArg(LevelFilter::Off)),
            "error" => Ok(LogLevelArg(LevelFilter::Error)),
            "warn" => Ok(LogLevelArg(LevelFilter::Warn)),
            "info" => Ok(LogLevelArg(LevelFilter::Info)),
            "debug" => Ok(LogLevelArg(LevelFilter::Debug)),
            "trace" => Ok(LogLevelArg(LevelFilter::Trace)),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("rf-sweep").chain(args.iter().copied()))
    }

    #[test]
    fn avg_factor_below_one_coerces_to_five() {
        let args = parse(&["100000000", "200000000", "-a", "0"]);
        assert_eq!(args.avg_factor(), 5);
    }

    #[test]
    fn soverlap_defaults_to_half_fft_size() {
        let args = parse(&["100000000", "200000000", "-f", "8"]);
        assert_eq!(args.soverlap(), 128);
    }

    #[test]
    fn soverlap_past_fft_size_coerces_to_default() {
        let args = parse(&["100000000", "200000000", "-f", "4", "-o", "100"]);
        assert_eq!(args.soverlap(), 8);
    }

    #[test]
    fn defaults_match_seed_case_one() {
        let args = parse(&["100000000", "200000000"]);
        assert_eq!(args.samp_rate, 2_400_000);
        assert_eq!(args.log2_fft_size, 8);
        assert_eq!(args.fft_batchlen, 10);
        assert!((args.freq_overlap - 1.0 / 6.0).abs() < 1e-6);
    }
}
