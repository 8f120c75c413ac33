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
//! Averaging stage: coalesces `avg_factor` successive Items sharing a
//! group into one averaged Item.
//!

use crate::item::Item;
use crate::queue::{QueueReceiver, QueueSender};

pub struct AveragingStage {
    upstream: QueueReceiver<Item>,
    downstream: QueueSender<Item>,
}

impl AveragingStage {
    pub fn new(upstream: QueueReceiver<Item>, downstream: QueueSender<Item>) -> Self {
        AveragingStage {
            upstream,
            downstream,
        }
    }

    pub fn run(self) {
        loop {
            let first = match self.upstream.remove() {
                None => break,
                Some(item) => item,
            };

            let k = first.avg_index;
            let mut acc = first;
            for sample in acc.samples.iter_mut() {
                *sample /= k as f32;
            }

            let mut group_broken = false;
            for i in 1..k {
                let next = match self.upstream.remove() {
                    None => {
                        group_broken = true;
                        break;
                    }
                    Some(item) => item,
                };
                assert_eq!(
                    next.avg_index,
                    k - i,
                    "averaging stage observed an out-of-order avg_index"
                );
                for (a, s) in acc.samples.iter_mut().zip(next.samples.iter()) {
                    *a += s / k as f32;
                }
            }

            if group_broken {
                // Upstream exited mid-group: discard the partial average,
                // matching the group-abandon-on-exit contract.
                break;
            }

            if self.downstream.insert(acc).is_err() {
                break;
            }
        }

        self.downstream.signal_exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hopping::HoppingStrategyId;
    use crate::item::Timestamp;
    use crate::queue::bounded_queue;
    use crate::window::WindowFunctionId;

    fn make_item(avg_factor: u32, avg_index: u32, value: f32) -> Item {
        Item {
            center_freq: 100_000_000,
            timestamp: Timestamp::now(),
            samp_rate: 1_000_000,
            log2_fft_size: 4,
            avg_factor,
            avg_index,
            soverlap: 0,
            freq_overlap: 0.0,
            gain: 30.0,
            hopping_strategy_id: HoppingStrategyId::Sequential,
            window_fun_id: WindowFunctionId::Rectangular,
            samples: vec![value; 16],
            freq_res: 0.0,
        }
    }

    #[test]
    fn collapses_a_group_into_the_mean() {
        let (up_tx, up_rx) = bounded_queue::<Item>(8);
        let (down_tx, down_rx) = bounded_queue::<Item>(8);

        up_tx.insert(make_item(3, 3, 3.0)).unwrap();
        up_tx.insert(make_item(3, 2, 6.0)).unwrap();
        up_tx.insert(make_item(3, 1, 9.0)).unwrap();
        up_tx.signal_exit();

        let stage = AveragingStage::new(up_rx, down_tx);
        stage.run();

        let out = down_rx.remove().unwrap();
        assert_eq!(out.avg_index, 3);
        for s in &out.samples {
            assert!((s - 6.0).abs() < 1e-5);
        }
        assert!(down_rx.remove().is_none());
    }

    #[test]
    #[should_panic(expected = "out-of-order avg_index")]
    fn out_of_order_avg_index_aborts() {
        let (up_tx, up_rx) = bounded_queue::<Item>(8);
        let (down_tx, _down_rx) = bounded_queue::<Item>(8);

        up_tx.insert(make_item(2, 2, 1.0)).unwrap();
        up_tx.insert(make_item(2, 2, 1.0)).unwrap();
        up_tx.signal_exit();

        let stage = AveragingStage::new(up_rx, down_tx);
        stage.run();
    }

    #[test]
    fn partial_group_on_upstream_exit_is_discarded() {
        let (up_tx, up_rx) = bounded_queue::<Item>(8);
        let (down_tx, down_rx) = bounded_queue::<Item>(8);

        up_tx.insert(make_item(3, 3, 1.0)).unwrap();
        up_tx.signal_exit();

        let stage = AveragingStage::new(up_rx, down_tx);
        stage.run();

        assert!(down_rx.remove().is_none());
    }
}
