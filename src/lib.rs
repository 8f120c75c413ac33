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
//! Adaptive wideband spectrum sweep monitor.
//!
//! This library implements the sweep and signal-processing pipeline that
//! drives an SDR dongle across a configurable frequency band: sampling and
//! windowing, batched FFT, averaging, and dumping, orchestrated by a
//! monitoring controller that picks which center frequencies to visit on
//! each sweep.
//!

#![warn(clippy::all)]
#![warn(unused)]

pub mod args;
pub mod clock_correction;
pub mod controller;
pub mod device;
pub mod fft_engine;
pub mod history;
pub mod hopping;
pub mod item;
pub mod manager;
pub mod queue;
pub mod stages;
pub mod window;

pub use crate::args::Args;
pub use crate::item::Item;
pub use crate::manager::Manager;
