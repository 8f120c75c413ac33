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

//! The four pipeline stages: sampling/windowing, FFT, averaging, dumping.

pub mod averaging;
pub mod dumping;
pub mod fft_stage;
pub mod sampling;

pub use averaging::AveragingStage;
pub use dumping::DumpingStage;
pub use fft_stage::FftStage;
pub use sampling::SamplingStage;
