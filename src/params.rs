//! # Plugin Parameters
//!
//! The host-facing controls. Each parameter has a stable string ID
//! (`#[id = "..."]`) that the host uses to store presets and automation;
//! these must never change once released.
//!
//! nih-plug stores every parameter value in its own atomic, so the audio
//! thread can read them while the host or a UI writes them, without a
//! lock. The audio thread reads each value once per block through
//! [`Controls::from_params()`](crate::controller::Controls::from_params).
//!
//! No smoothing is applied here: the delay line takes new values at block
//! boundaries and relies on its hard clip to stay bounded across jumps.

use nih_plug::prelude::*;

use crate::controller::{
    DEFAULT_DELAY_SECONDS, DEFAULT_DRY, DEFAULT_FEEDBACK, DEFAULT_WET, MIN_DELAY_SECONDS,
};
use crate::dsp::delay_line::{MAX_DELAY_SECONDS, MAX_FEEDBACK};

#[derive(Params)]
pub struct EchoParams {
    /// **Delay Time** in seconds, 1 ms to 5 s.
    ///
    /// Skewed so that the first half of the knob covers the short slapback
    /// range, where small changes are easiest to hear.
    #[id = "delay"]
    pub delay_time: FloatParam,

    /// **Feedback** — the level of each repeat relative to the previous
    /// one. Capped at 99% to keep the loop decaying.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Wet Mix** — gain of the delayed signal.
    #[id = "wet"]
    pub wet: FloatParam,

    /// **Dry Mix** — gain of the original signal. Independent of the wet
    /// gain; the two don't have to add up to 100%.
    #[id = "dry"]
    pub dry: FloatParam,

    /// **Bypass** — passes audio through and freezes the delay line.
    #[id = "bypass"]
    pub bypass: BoolParam,

    /// **Use SIMD** — selects the vectorized kernel. Both kernels sound the
    /// same; this only changes CPU cost.
    #[id = "simd"]
    pub simd: BoolParam,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            delay_time: FloatParam::new(
                "Delay Time",
                DEFAULT_DELAY_SECONDS,
                FloatRange::Skewed {
                    min: MIN_DELAY_SECONDS,
                    max: MAX_DELAY_SECONDS,
                    factor: FloatRange::skew_factor(-1.5),
                },
            )
            .with_unit(" s")
            .with_step_size(0.001),

            feedback: FloatParam::new(
                "Feedback",
                DEFAULT_FEEDBACK,
                FloatRange::Linear {
                    min: 0.0,
                    max: MAX_FEEDBACK,
                },
            )
            .with_unit("%")
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            wet: FloatParam::new(
                "Wet Mix",
                DEFAULT_WET,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            dry: FloatParam::new(
                "Dry Mix",
                DEFAULT_DRY,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            // `make_bypass()` marks this as the host's bypass switch so the
            // DAW's own bypass button drives it.
            bypass: BoolParam::new("Bypass", false).make_bypass(),

            simd: BoolParam::new("Use SIMD", false),
        }
    }
}
