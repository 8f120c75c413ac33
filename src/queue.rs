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
//! Bounded FIFO queues connecting pipeline stages, with an upstream-exit
//! sentinel.
//!
//! `crossbeam_channel::bounded` already gives FIFO ordering, capacity-bound
//! backpressure (send blocks while full, recv blocks while empty) and
//! disconnect notification, which is exactly the not-full/not-empty/exit
//! contract spec'd for the queue. `QueueSender::signal_exit` consumes the
//! sender, so dropping the last clone disconnects the channel; `remove`
//! surfaces that as `None` once the queue has also drained, matching
//! "consumers that observe empty && exit terminate cleanly".
//!

use crossbeam_channel::{Receiver, Sender};

/// Creates a bounded queue with the given capacity, returning its
/// producer and consumer halves.
pub fn bounded_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (QueueSender { tx }, QueueReceiver { rx })
}

/// The producer half of a bounded queue.
///
/// Cloning is allowed so a stage can fan the same queue out to itself
/// under a join (not used by the core pipeline, but kept since nothing
/// about the design forbids multiple producers per queue).
#[derive(Clone)]
pub struct QueueSender<T> {
    tx: Sender<T>,
}

impl<T> QueueSender<T> {
    /// Inserts an item, blocking the calling thread while the queue is
    /// full. Returns `Err(item)` if every consumer has already exited.
    pub fn insert(&self, item: T) -> Result<(), T> {
        self.tx.send(item).map_err(|e| e.into_inner())
    }

    /// Signals that this producer will not insert anything else. Once
    /// every clone of this sender has done so (or been dropped), the
    /// queue is sticky-exited: pending items still drain, and after that
    /// `remove` returns `None` forever.
    pub fn signal_exit(self) {
        drop(self)
    }
}

/// The consumer half of a bounded queue.
pub struct QueueReceiver<T> {
    rx: Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Removes the item at the head of the queue, blocking while the
    /// queue is empty and not yet exited. Returns `None` once the queue
    /// is empty and every producer has signaled exit.
    pub fn remove(&self) -> Option<T> {
        self.rx.recv().ok()
    }
}
