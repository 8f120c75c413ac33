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
//! The SDR dongle collaborator.
//!
//! This is the external interface the sampling/windowing stage consumes,
//! per spec: `open`, `set_gain`, `set_freq_correction`, `set_sample_rate`,
//! `retune`, `read`, `close`. The device driver itself is out of scope of
//! the core pipeline; this module provides the trait boundary plus two
//! implementations: a real one backed by the `rtlsdr` crate (feature
//! `hardware`, grounded on `ccustine-airjedi-desktop`'s use of the same
//! crate) and a synthetic one that fabricates noise so the pipeline
//! builds and runs without a dongle attached.
//!

use std::io;

/// The operations the sampling/windowing stage needs from an SDR dongle.
///
/// Implementors hand back unsigned 8-bit I/Q interleaved samples from
/// `read`, matching the RTL-SDR wire format: each byte is an unsigned
/// sample centered at 127.5.
pub trait SdrDevice: Send {
    /// Sets the tuner gain, in dB. A negative value requests automatic
    /// gain control.
    fn set_gain(&mut self, gain: f32) -> io::Result<()>;

    /// Sets the crystal frequency correction, in parts per million.
    fn set_freq_correction(&mut self, ppm: i32) -> io::Result<()>;

    /// Sets the sample rate, in hertz.
    fn set_sample_rate(&mut self, hz: u32) -> io::Result<()>;

    /// Retunes to a new center frequency, in hertz.
    fn retune(&mut self, center_hz: u32) -> io::Result<()>;

    /// Reads exactly `buf.len()` unsigned 8-bit interleaved I/Q samples.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

/// Opens the default device for this build: the real RTL-SDR dongle when
/// the `hardware` feature is enabled, otherwise a synthetic noise source.
pub fn open_default(dev_index: u32) -> io::Result<Box<dyn SdrDevice>> {
    #[cfg(feature = "hardware")]
    {
        Ok(Box::new(RtlSdrDevice::open(dev_index)?))
    }
    #[cfg(not(feature = "hardware"))]
    {
        Ok(Box::new(SyntheticDevice::open(dev_index)))
    }
}

/// RTL-SDR backed device, using the `rtlsdr` crate.
#[cfg(feature = "hardware")]
pub struct RtlSdrDevice {
    inner: rtlsdr::RTLSDRDevice,
}

#[cfg(feature = "hardware")]
impl RtlSdrDevice {
    /// Opens the dongle at the given device index.
    pub fn open(dev_index: u32) -> io::Result<Self> {
        let inner = rtlsdr::open(dev_index as i32)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))?;
        Ok(RtlSdrDevice { inner })
    }
}

#[cfg(feature = "hardware")]
impl SdrDevice for RtlSdrDevice {
    fn set_gain(&mut self, gain: f32) -> io::Result<()> {
        if gain < 0.0 {
            self.inner
                .set_tuner_gain_mode(false)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
        } else {
            self.inner
                .set_tuner_gain_mode(true)
                .and_then(|_| self.inner.set_tuner_gain((gain * 10.0) as i32))
                .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
        }
    }

    fn set_freq_correction(&mut self, ppm: i32) -> io::Result<()> {
        self.inner
            .set_freq_correction(ppm)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
    }

    fn set_sample_rate(&mut self, hz: u32) -> io::Result<()> {
        self.inner
            .set_sample_rate(hz)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
    }

    fn retune(&mut self, center_hz: u32) -> io::Result<()> {
        self.inner
            .set_center_freq(center_hz)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut read = 0;
        while read < buf.len() {
            let n = self
                .inner
                .read_sync(&mut buf[read..])
                .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "SDR read returned 0 bytes"));
            }
            read += n;
        }
        Ok(())
    }
}

/// Synthetic device used when no hardware driver is linked in. It
/// produces band-limited pseudo-random noise instead of reading a real
/// dongle, so the pipeline still exercises its full data path.
pub struct SyntheticDevice {
    dev_index: u32,
    rng: rand::rngs::StdRng,
}

impl SyntheticDevice {
    /// "Opens" the synthetic device at the given index (used only for
    /// logging; there is no real hardware to select).
    pub fn open(dev_index: u32) -> Self {
        use rand::SeedableRng;
        SyntheticDevice {
            dev_index,
            rng: rand::rngs::StdRng::seed_from_u64(u64::from(dev_index) ^ 0xA5A5_A5A5),
        }
    }
}

impl SdrDevice for SyntheticDevice {
    fn set_gain(&mut self, _gain: f32) -> io::Result<()> {
        Ok(())
    }

    fn set_freq_correction(&mut self, _ppm: i32) -> io::Result<()> {
        Ok(())
    }

    fn set_sample_rate(&mut self, _hz: u32) -> io::Result<()> {
        Ok(())
    }

    fn retune(&mut self, _center_hz: u32) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<()> {
        use rand::Rng;
        self.rng.fill(buf);
        // Center the noise near the RTL-SDR's unsigned-sample midpoint
        // instead of spanning the full byte range.
        for b in buf.iter_mut() {
            *b = 127u8.wrapping_add((*b >> 2).wrapping_sub(32));
        }
        let _ = self.dev_index;
        Ok(())
    }
}
