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
//! Clock-correction worker.
//!
//! The real drift model is out of scope; this worker only probes for an
//! optional 1-wire temperature sensor at startup (to parametrize a future
//! model) and otherwise passes the previous clock offset straight through
//! on every correction request.
//!

use log::{debug, info};
use std::fs;
use std::path::PathBuf;

const TEMP_SENSOR_ROOT: &str = "/sys/bus/w1/devices";
const TEMP_SENSOR_FILE: &str = "w1_slave";

/// Estimates the SDR oscillator's clock offset, in parts per million.
///
/// The estimator is a pass-through stub: each request returns the prior
/// estimate unchanged. The temperature sensor path, when present, is
/// logged but not yet folded into the estimate.
pub struct ClockCorrection {
    clk_off: i32,
    temp_sensor: Option<PathBuf>,
}

impl ClockCorrection {
    /// Probes `/sys/bus/w1/devices/*/w1_slave` for a 1-wire temperature
    /// sensor and starts from the given initial clock offset.
    pub fn new(initial_clk_off: i32) -> Self {
        let temp_sensor = find_temp_sensor();
        info!(
            "temperature sensor {}found",
            if temp_sensor.is_some() { "" } else { "not " }
        );
        ClockCorrection {
            clk_off: initial_clk_off,
            temp_sensor,
        }
    }

    /// Runs one correction cycle, returning the latest best estimate of
    /// `clk_off`.
    pub fn correct(&mut self) -> i32 {
        if let Some(path) = &self.temp_sensor {
            match fs::read_to_string(path) {
                Ok(contents) => debug!("temperature sensor read ({} bytes)", contents.len()),
                Err(e) => debug!("temperature sensor read failed: {}", e),
            }
        }
        self.clk_off
    }
}

fn find_temp_sensor() -> Option<PathBuf> {
    let root = fs::read_dir(TEMP_SENSOR_ROOT).ok()?;
    for entry in root.flatten() {
        let candidate = entry.path().join(TEMP_SENSOR_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_initial_offset_without_a_sensor() {
        let mut cc = ClockCorrection {
            clk_off: 17,
            temp_sensor: None,
        };
        assert_eq!(cc.correct(), 17);
        assert_eq!(cc.correct(), 17);
    }
}
