//! # Parameter Controller
//!
//! Once per block, before any audio is touched, the controller takes a
//! snapshot of the host parameters, sanitizes it, and pushes it into the
//! delay line. It also decides whether the block is processed at all.
//!
//! ## Bypass
//!
//! Bypass is a hard early return: the block is left exactly as the host
//! delivered it and the delay line is not touched, so its contents and
//! cursor are frozen until bypass is released. Nothing is ramped, so
//! toggling bypass on a running echo can click.

use crate::dsp::delay_line::{ProcessingMode, StereoDelayLine, MAX_DELAY_SECONDS, MAX_FEEDBACK};
use crate::params::EchoParams;

/// Default control values, shared with the host parameter declarations.
pub const DEFAULT_DELAY_SECONDS: f32 = 1.0;
pub const DEFAULT_FEEDBACK: f32 = 0.3;
pub const DEFAULT_WET: f32 = 0.5;
pub const DEFAULT_DRY: f32 = 0.5;

/// The smallest delay the host parameter offers, in seconds.
pub const MIN_DELAY_SECONDS: f32 = 0.001;

/// A per-block snapshot of every control value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub delay_seconds: f32,
    pub feedback: f32,
    pub wet: f32,
    pub dry: f32,
    pub bypass: bool,
    pub mode: ProcessingMode,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_DELAY_SECONDS,
            feedback: DEFAULT_FEEDBACK,
            wet: DEFAULT_WET,
            dry: DEFAULT_DRY,
            bypass: false,
            mode: ProcessingMode::Scalar,
        }
    }
}

impl Controls {
    /// Read the current host parameter values.
    ///
    /// Every parameter is its own atomic, so this may combine values from
    /// before and after a concurrent edit. Each one is valid on its own,
    /// which is all the delay line needs.
    pub fn from_params(params: &EchoParams) -> Self {
        Self {
            delay_seconds: params.delay_time.value(),
            feedback: params.feedback.value(),
            wet: params.wet.value(),
            dry: params.dry.value(),
            bypass: params.bypass.value(),
            mode: if params.simd.value() {
                ProcessingMode::Vectorized
            } else {
                ProcessingMode::Scalar
            },
        }
    }

    /// Clamp every value to its legal range. Non-finite values fall back to
    /// the defaults.
    pub fn clamped(self) -> Self {
        Self {
            delay_seconds: sanitize(self.delay_seconds, DEFAULT_DELAY_SECONDS)
                .clamp(0.0, MAX_DELAY_SECONDS),
            feedback: sanitize(self.feedback, DEFAULT_FEEDBACK).clamp(0.0, MAX_FEEDBACK),
            wet: sanitize(self.wet, DEFAULT_WET).clamp(0.0, 1.0),
            dry: sanitize(self.dry, DEFAULT_DRY).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Forward the clamped values to `delay_line`.
    ///
    /// Returns the kernel to run, or `None` when the block is bypassed. A
    /// bypassed block leaves the delay line completely untouched, including
    /// its parameters.
    pub fn apply_to(&self, delay_line: &mut StereoDelayLine) -> Option<ProcessingMode> {
        if self.bypass {
            return None;
        }

        let controls = self.clamped();
        delay_line.set_delay_seconds(controls.delay_seconds);
        delay_line.set_feedback(controls.feedback);
        delay_line.set_wet(controls.wet);
        delay_line.set_dry(controls.dry);

        Some(controls.mode)
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared_line() -> StereoDelayLine {
        let mut dl = StereoDelayLine::new();
        dl.prepare(48000.0, MAX_DELAY_SECONDS);
        dl
    }

    #[test]
    fn test_clamped_limits_every_value() {
        let controls = Controls {
            delay_seconds: 12.0,
            feedback: 1.2,
            wet: -0.5,
            dry: 3.0,
            ..Controls::default()
        }
        .clamped();

        assert_eq!(controls.delay_seconds, MAX_DELAY_SECONDS);
        assert_eq!(controls.feedback, MAX_FEEDBACK);
        assert_eq!(controls.wet, 0.0);
        assert_eq!(controls.dry, 1.0);
    }

    #[test]
    fn test_clamped_replaces_non_finite_with_defaults() {
        let controls = Controls {
            delay_seconds: f32::NAN,
            feedback: f32::INFINITY,
            wet: f32::NEG_INFINITY,
            dry: f32::NAN,
            ..Controls::default()
        }
        .clamped();

        assert_eq!(controls, Controls::default());
    }

    #[test]
    fn test_apply_forwards_values() {
        let mut dl = prepared_line();
        let controls = Controls {
            delay_seconds: 0.25,
            feedback: 0.6,
            wet: 0.8,
            dry: 0.2,
            bypass: false,
            mode: ProcessingMode::Vectorized,
        };

        assert_eq!(controls.apply_to(&mut dl), Some(ProcessingMode::Vectorized));
        assert_eq!(dl.delay_samples(), 12_000);
        assert_eq!(dl.feedback(), 0.6);
        assert_eq!(dl.wet(), 0.8);
        assert_eq!(dl.dry(), 0.2);
    }

    /// A bypassed block does not even update the delay line's parameters.
    #[test]
    fn test_bypass_leaves_delay_line_untouched() {
        let mut dl = prepared_line();
        Controls::default().apply_to(&mut dl);

        let bypassed = Controls {
            delay_seconds: 0.1,
            feedback: 0.9,
            bypass: true,
            ..Controls::default()
        };
        assert_eq!(bypassed.apply_to(&mut dl), None);
        assert_eq!(dl.delay_samples(), 48_000);
        assert_eq!(dl.feedback(), DEFAULT_FEEDBACK);
    }

    #[test]
    fn test_from_params_reads_defaults() {
        let params = EchoParams::default();
        assert_eq!(Controls::from_params(&params), Controls::default());
    }
}
