//! # Processing Load Estimator
//!
//! Measures how much of the real-time budget each block uses. A block of
//! `n` samples at sample rate `fs` must be finished within `n / fs`
//! seconds; the ratio of the measured wall-clock time to that deadline is
//! the instantaneous load:
//!
//! ```text
//! instant = elapsed / (n / fs)        clamped to [0, 1]
//! ```
//!
//! Block-to-block timing is noisy, so the displayed value is smoothed by a
//! one-pole filter with a fixed 500 ms time constant. The filter advances by
//! `n` samples per block, so the smoothing speed in real time does not
//! depend on the host's block size:
//!
//! ```text
//! alpha = 1 - e^(-n / tau)            tau = 0.5 s * fs (in samples)
//! load += alpha * (instant - load)
//! ```
//!
//! The smoothed value is published through a [`LoadMeter`], which a display
//! thread can read at any time without locking.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Smoothing time constant of the load estimate, in seconds.
pub const LOAD_SMOOTHING_SECONDS: f32 = 0.5;

/// Lock-free holder for the published load value.
///
/// Stores the `f32` as its bit pattern in an `AtomicU32`. Every store writes
/// a complete, valid value, so a reader on another thread always gets some
/// recent estimate, never a torn one.
#[derive(Debug, Default)]
pub struct LoadMeter {
    bits: AtomicU32,
}

impl LoadMeter {
    /// The most recently published load, in `[0, 1]`.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Smooths per-block load measurements. Owned by the audio thread.
pub struct LoadEstimator {
    meter: Arc<LoadMeter>,
    sample_rate: f32,
    /// The time constant expressed in samples at the current rate.
    smoothing_samples: f32,
    value: f32,
}

impl Default for LoadEstimator {
    fn default() -> Self {
        Self {
            meter: Arc::new(LoadMeter::default()),
            sample_rate: 0.0,
            smoothing_samples: 0.0,
            value: 0.0,
        }
    }
}

impl LoadEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the published value for a display thread.
    pub fn meter(&self) -> Arc<LoadMeter> {
        self.meter.clone()
    }

    /// The current smoothed load.
    pub fn current(&self) -> f32 {
        self.value
    }

    /// Re-initialize for a new sample rate. The estimate restarts at zero
    /// and the time constant is recomputed in samples.
    pub fn prepare(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.smoothing_samples = LOAD_SMOOTHING_SECONDS * sample_rate;
        } else {
            self.sample_rate = 0.0;
            self.smoothing_samples = 0.0;
        }

        self.value = 0.0;
        self.meter.set(0.0);
    }

    /// Fold the measured processing time of one block into the estimate.
    ///
    /// Empty blocks, and any block recorded before [`prepare()`](Self::prepare),
    /// are ignored.
    pub fn record(&mut self, elapsed: Duration, num_samples: usize) {
        if num_samples == 0 || self.sample_rate <= 0.0 {
            return;
        }

        let num_samples = num_samples as f32;
        let deadline = num_samples / self.sample_rate;
        let instant = (elapsed.as_secs_f32() / deadline).clamp(0.0, 1.0);

        let alpha = 1.0 - (-num_samples / self.smoothing_samples).exp();
        self.value += alpha * (instant - self.value);
        self.value = self.value.clamp(0.0, 1.0);

        self.meter.set(self.value);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
