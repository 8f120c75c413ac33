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
//! Dumping stage: writes one `ts_sec,ts_usec,freq_hz,power_db` line per
//! output bin, trimming the `freq_overlap` guard band from each edge.
//!

use crate::item::Item;
use crate::queue::QueueReceiver;
use std::io::Write;

pub struct DumpingStage<W: Write> {
    upstream: QueueReceiver<Item>,
    out: W,
}

impl<W: Write> DumpingStage<W> {
    pub fn new(upstream: QueueReceiver<Item>, out: W) -> Self {
        DumpingStage { upstream, out }
    }

    pub fn run(mut self) {
        while let Some(item) = self.upstream.remove() {
            self.dump(&item);
        }
    }

    fn dump(&mut self, item: &Item) {
        let fft_size = item.fft_size();
        // Preserved for compatibility with the original program: the
        // `+ 1` is not a typo and the truncation is deliberate. See
        // DESIGN.md.
        let reduced_fft_size = ((1.0 - item.freq_overlap) * (fft_size as f32 + 1.0)) as usize;
        let reduced_fft_size = reduced_fft_size.min(fft_size);
        let freq_res = item.samp_rate as f32 / fft_size as f32;
        let t = reduced_fft_size / 2;

        // Bins are centered (see FftEngine::forward); trim symmetrically
        // from both edges to drop the discarded guard band.
        let trim = fft_size.saturating_sub(reduced_fft_size);
        let start = trim / 2;

        for i in 0..reduced_fft_size {
            let freq_hz = item.center_freq as f32 - (t as f32 - i as f32) * freq_res;
            let power_db = item.samples[start + i];
            let _ = writeln!(
                self.out,
                "{},{},{},{:.1}",
                item.timestamp.sec, item.timestamp.usec, freq_hz as u32, power_db
            );
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hopping::HoppingStrategyId;
    use crate::item::Timestamp;
    use crate::queue::bounded_queue;
    use crate::window::WindowFunctionId;

    fn make_item() -> Item {
        Item {
            center_freq: 100_500_000,
            timestamp: Timestamp { sec: 1, usec: 2 },
            samp_rate: 1_000_000,
            log2_fft_size: 4,
            avg_factor: 1,
            avg_index: 1,
            soverlap: 0,
            freq_overlap: 0.0,
            gain: 30.0,
            hopping_strategy_id: HoppingStrategyId::Sequential,
            window_fun_id: WindowFunctionId::Rectangular,
            samples: (0..16).map(|i| i as f32).collect(),
            freq_res: 0.0,
        }
    }

    #[test]
    fn emits_finite_power_and_bounded_frequency() {
        let (tx, rx) = bounded_queue::<Item>(1);
        tx.insert(make_item()).unwrap();
        tx.signal_exit();

        let mut buf = Vec::new();
        {
            let stage = DumpingStage::new(rx, &mut buf);
            stage.run();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(!lines.is_empty());
        for line in lines {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 4);
            let power: f32 = fields[3].parse().unwrap();
            assert!(power.is_finite());
        }
    }

    #[test]
    fn seed_case_one_produces_sixteen_lines() {
        let mut item = make_item();
        item.freq_overlap = 0.0;
        item.center_freq = 100_500_000;

        let (tx, rx) = bounded_queue::<Item>(1);
        tx.insert(item).unwrap();
        tx.signal_exit();

        let mut buf = Vec::new();
        {
            let stage = DumpingStage::new(rx, &mut buf);
            stage.run();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 16);
    }
}
