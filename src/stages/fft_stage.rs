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
//! FFT stage: batches same-size Items and runs them through a batched
//! forward FFT, re-initializing the plan whenever the FFT size changes
//! and flushing partial batches at transitions and on upstream exit.
//!

use crate::fft_engine::FftEngine;
use crate::history::History;
use crate::item::Item;
use crate::queue::{QueueReceiver, QueueSender};
use log::debug;

pub struct FftStage {
    upstream: QueueReceiver<Item>,
    downstream: QueueSender<Item>,
    engine: FftEngine,
    current_log2_size: Option<u32>,
    batch: Vec<Item>,
    fft_batchlen: usize,
    /// Registered only by the similarity hopping strategy; updates its
    /// history with each emitted Item's magnitude spectrum.
    similarity_callback: Option<History>,
}

impl FftStage {
    pub fn new(
        upstream: QueueReceiver<Item>,
        downstream: QueueSender<Item>,
        fft_batchlen: usize,
        similarity_callback: Option<History>,
    ) -> Self {
        FftStage {
            upstream,
            downstream,
            engine: FftEngine::new(),
            current_log2_size: None,
            batch: Vec::with_capacity(fft_batchlen),
            fft_batchlen,
            similarity_callback,
        }
    }

    pub fn run(mut self) {
        loop {
            let item = match self.upstream.remove() {
                None => break,
                Some(item) => item,
            };

            if Some(item.log2_fft_size) != self.current_log2_size {
                self.flush();
                self.engine.release();
                self.engine.init(item.log2_fft_size, self.fft_batchlen);
                self.current_log2_size = Some(item.log2_fft_size);
            }

            self.batch.push(item);
            if self.batch.len() == self.fft_batchlen {
                self.emit_batch();
            }
        }

        self.flush();
        self.engine.release();
        self.downstream.signal_exit();
    }

    /// Flushes any partial batch using a plan sized to the residue, per
    /// the size-change and shutdown flush contract.
    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let residue = self.batch.len();
        debug!("fft stage: flushing partial batch of {} items", residue);
        if let Some(log2_size) = self.current_log2_size {
            self.engine.init(log2_size, residue);
        }
        self.emit_batch();
    }

    fn emit_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let inputs: Vec<Vec<f32>> = self.batch.iter().map(|item| item.samples.clone()).collect();
        let outputs = self.engine.forward(&inputs);

        for (mut item, magnitude_db) in self.batch.drain(..).zip(outputs.into_iter()) {
            if let Some(history) = &self.similarity_callback {
                history.observe(item.center_freq, &magnitude_db);
            }
            item.samples = magnitude_db;
            if self.downstream.insert(item).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hopping::HoppingStrategyId;
    use crate::item::Timestamp;
    use crate::queue::bounded_queue;
    use crate::window::WindowFunctionId;

    fn make_item(log2_fft_size: u32) -> Item {
        let fft_size = 1usize << log2_fft_size;
        Item {
            center_freq: 100_000_000,
            timestamp: Timestamp::now(),
            samp_rate: 1_000_000,
            log2_fft_size,
            avg_factor: 1,
            avg_index: 1,
            soverlap: 0,
            freq_overlap: 0.0,
            gain: 30.0,
            hopping_strategy_id: HoppingStrategyId::Sequential,
            window_fun_id: WindowFunctionId::Rectangular,
            samples: vec![0.0f32; 2 * fft_size],
            freq_res: 0.0,
        }
    }

    #[test]
    fn output_length_is_half_input_length() {
        let (up_tx, up_rx) = bounded_queue::<Item>(4);
        let (down_tx, down_rx) = bounded_queue::<Item>(4);

        up_tx.insert(make_item(4)).unwrap();
        up_tx.signal_exit();

        let stage = FftStage::new(up_rx, down_tx, 10, None);
        stage.run();

        let out = down_rx.remove().unwrap();
        assert_eq!(out.samples.len(), 16);
        assert!(down_rx.remove().is_none());
    }

    #[test]
    fn residue_flushes_on_upstream_exit() {
        let (up_tx, up_rx) = bounded_queue::<Item>(4);
        let (down_tx, down_rx) = bounded_queue::<Item>(4);

        up_tx.insert(make_item(4)).unwrap();
        up_tx.insert(make_item(4)).unwrap();
        up_tx.signal_exit();

        let stage = FftStage::new(up_rx, down_tx, 10, None);
        stage.run();

        assert!(down_rx.remove().is_some());
        assert!(down_rx.remove().is_some());
        assert!(down_rx.remove().is_none());
    }

    #[test]
    fn size_change_flushes_previous_batch() {
        let (up_tx, up_rx) = bounded_queue::<Item>(4);
        let (down_tx, down_rx) = bounded_queue::<Item>(4);

        up_tx.insert(make_item(4)).unwrap();
        up_tx.insert(make_item(5)).unwrap();
        up_tx.signal_exit();

        let stage = FftStage::new(up_rx, down_tx, 10, None);
        stage.run();

        let first = down_rx.remove().unwrap();
        assert_eq!(first.samples.len(), 16);
        let second = down_rx.remove().unwrap();
        assert_eq!(second.samples.len(), 32);
        assert!(down_rx.remove().is_none());
    }
}
