//! # Echo Processor
//!
//! Everything the plugin does for one block, independent of the plugin
//! host API:
//!
//! 1. The controller forwards the block's control values to the delay line
//!    (or reports a bypass, in which case nothing else happens).
//! 2. The delay line processes the block in place, with denormals flushed
//!    to zero.
//! 3. The load estimator records how long steps 1 and 2 took.

use std::sync::Arc;
use std::time::Instant;

use no_denormals::no_denormals;

use crate::controller::Controls;
use crate::dsp::delay_line::{StereoDelayLine, MAX_DELAY_SECONDS};
use crate::dsp::load::{LoadEstimator, LoadMeter};

#[derive(Default)]
pub struct EchoProcessor {
    delay_line: StereoDelayLine,
    load: LoadEstimator,
}

impl EchoProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the delay buffers for `sample_rate` and restart the load
    /// estimate. Returns `false` when no buffer could be sized for this
    /// rate.
    pub fn prepare(&mut self, sample_rate: f32) -> bool {
        self.delay_line.prepare(sample_rate, MAX_DELAY_SECONDS);
        self.load.prepare(sample_rate);
        self.delay_line.is_prepared()
    }

    /// Silence the delay line without touching parameters or capacity.
    pub fn reset(&mut self) {
        self.delay_line.reset();
    }

    pub fn delay_line(&self) -> &StereoDelayLine {
        &self.delay_line
    }

    /// The smoothed load estimate, `0.0..=1.0`.
    pub fn load(&self) -> f32 {
        self.load.current()
    }

    /// A thread-safe handle for reading the load estimate from a display.
    pub fn load_meter(&self) -> Arc<LoadMeter> {
        self.load.meter()
    }

    /// Process one stereo block in place.
    ///
    /// Returns `false` if the block was bypassed and left untouched.
    pub fn process(&mut self, controls: &Controls, left: &mut [f32], right: &mut [f32]) -> bool {
        let start = Instant::now();

        let Some(mode) = controls.apply_to(&mut self.delay_line) else {
            return false;
        };

        let delay_line = &mut self.delay_line;
        no_denormals(|| delay_line.process(left, right, mode));

        self.load.record(start.elapsed(), left.len().min(right.len()));
        true
    }

    /// How many samples the echoes keep ringing after the input stops.
    ///
    /// Each repeat is `feedback` times quieter than the last, so after `N`
    /// repeats the level is `feedback^N`. Solving for -60 dB:
    ///
    /// ```text
    /// N = log10(0.001) / log10(feedback) = -3 / log10(feedback)
    /// ```
    ///
    /// and the tail is `N` delay periods long. Without feedback there is a
    /// single echo, one delay period out.
    pub fn tail_samples(&self) -> u32 {
        let delay_samples = self.delay_line.delay_samples() as f32;
        let feedback = self.delay_line.feedback();

        let repeats = if feedback > 0.001 {
            -3.0 / feedback.log10()
        } else {
            1.0
        };

        // Float-to-int `as` saturates, so very long tails cap at u32::MAX.
        (repeats * delay_samples) as u32
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::delay_line::ProcessingMode;

    const SAMPLE_RATE: f32 = 48000.0;

    fn controls(delay_seconds: f32, feedback: f32, wet: f32, dry: f32) -> Controls {
        Controls {
            delay_seconds,
            feedback,
            wet,
            dry,
            bypass: false,
            mode: ProcessingMode::Scalar,
        }
    }

    #[test]
    fn test_prepare_reports_success() {
        let mut processor = EchoProcessor::new();
        assert!(processor.prepare(SAMPLE_RATE));
        assert_eq!(processor.delay_line().capacity(), 240_000);

        assert!(!processor.prepare(0.0));
        assert!(!processor.delay_line().is_prepared());
    }

    /// The host may call `process()` before `initialize()` in odd cases;
    /// the audio must survive unchanged.
    #[test]
    fn test_unprepared_block_passes_through() {
        let mut processor = EchoProcessor::new();
        let mut l = vec![0.25; 64];
        let mut r = vec![-0.25; 64];

        assert!(processor.process(&Controls::default(), &mut l, &mut r));
        assert!(l.iter().all(|&s| s == 0.25));
        assert!(r.iter().all(|&s| s == -0.25));
        assert_eq!(processor.load(), 0.0);
    }

    /// Controls reach the delay line before the block is processed.
    #[test]
    fn test_controls_apply_before_processing() {
        let mut processor = EchoProcessor::new();
        processor.prepare(SAMPLE_RATE);

        let c = controls(1.5 / SAMPLE_RATE, 0.0, 1.0, 0.0);
        let mut l = vec![0.0; 4];
        l[0] = 1.0;
        let mut r = l.clone();
        processor.process(&c, &mut l, &mut r);

        // One-sample delay: the impulse comes out one sample later.
        assert_eq!(l, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(r, l);
    }

    /// While bypassed the audio is untouched and the delay line doesn't
    /// move: releasing bypass resumes exactly where it left off.
    #[test]
    fn test_bypass_freezes_state() {
        let delay_seconds = 4.5 / SAMPLE_RATE;
        let active = controls(delay_seconds, 0.5, 1.0, 0.0);
        let bypassed = Controls {
            bypass: true,
            ..active
        };

        let mut frozen = EchoProcessor::new();
        let mut reference = EchoProcessor::new();
        frozen.prepare(SAMPLE_RATE);
        reference.prepare(SAMPLE_RATE);

        let input: Vec<f32> = (0..6).map(|i| 0.1 * i as f32).collect();
        for processor in [&mut frozen, &mut reference] {
            let (mut l, mut r) = (input.clone(), input.clone());
            processor.process(&active, &mut l, &mut r);
        }

        let noise: Vec<f32> = (0..37).map(|i| ((i * 7) % 11) as f32 / 11.0).collect();
        let (mut l, mut r) = (noise.clone(), noise.clone());
        assert!(!frozen.process(&bypassed, &mut l, &mut r));
        assert_eq!(l, noise);
        assert_eq!(r, noise);

        let silence = vec![0.0; 16];
        let (mut fl, mut fr) = (silence.clone(), silence.clone());
        let (mut rl, mut rr) = (silence.clone(), silence);
        frozen.process(&active, &mut fl, &mut fr);
        reference.process(&active, &mut rl, &mut rr);
        assert_eq!(fl, rl);
        assert_eq!(fr, rr);
    }

    /// Bypassed blocks are not measured: the load estimate and the shared
    /// meter hold their last value.
    #[test]
    fn test_bypass_holds_load_estimate() {
        let mut processor = EchoProcessor::new();
        processor.prepare(SAMPLE_RATE);
        let meter = processor.load_meter();

        let active = Controls::default();
        for _ in 0..20 {
            let mut l = vec![0.3; 256];
            let mut r = vec![0.3; 256];
            processor.process(&active, &mut l, &mut r);
        }
        let before = processor.load();
        assert_eq!(meter.get(), before);

        let bypassed = Controls {
            bypass: true,
            ..active
        };
        for _ in 0..20 {
            let mut l = vec![0.3; 256];
            let mut r = vec![0.3; 256];
            assert!(!processor.process(&bypassed, &mut l, &mut r));
        }

        assert_eq!(processor.load(), before);
        assert_eq!(meter.get(), before);
    }

    /// Both kernels give the same block output through the full pipeline.
    #[test]
    fn test_mode_switch_is_transparent() {
        let mut scalar = EchoProcessor::new();
        let mut vector = EchoProcessor::new();
        scalar.prepare(SAMPLE_RATE);
        vector.prepare(SAMPLE_RATE);

        let base = controls(0.003, 0.7, 0.6, 0.8);
        let vectorized = Controls {
            mode: ProcessingMode::Vectorized,
            ..base
        };

        for block in 0..50 {
            let input: Vec<f32> = (0..256)
                .map(|i| (((block * 256 + i) as f32) * 0.013).sin())
                .collect();
            let (mut sl, mut sr) = (input.clone(), input.clone());
            let (mut vl, mut vr) = (input.clone(), input);
            scalar.process(&base, &mut sl, &mut sr);
            vector.process(&vectorized, &mut vl, &mut vr);

            for i in 0..256 {
                assert!((sl[i] - vl[i]).abs() <= 1e-6, "block {block}, sample {i}");
                assert!((sr[i] - vr[i]).abs() <= 1e-6, "block {block}, sample {i}");
            }
        }
    }

    #[test]
    fn test_load_is_recorded_and_bounded() {
        let mut processor = EchoProcessor::new();
        processor.prepare(SAMPLE_RATE);
        let meter = processor.load_meter();

        for _ in 0..100 {
            let mut l = vec![0.1; 512];
            let mut r = vec![0.1; 512];
            processor.process(&Controls::default(), &mut l, &mut r);
        }

        let load = meter.get();
        assert!((0.0..=1.0).contains(&load));
        assert_eq!(load, processor.load());
    }

    #[test]
    fn test_reset_silences_echoes() {
        let mut processor = EchoProcessor::new();
        processor.prepare(SAMPLE_RATE);
        let c = controls(0.001, 0.9, 1.0, 0.0);

        let mut l = vec![0.5; 256];
        let mut r = vec![0.5; 256];
        processor.process(&c, &mut l, &mut r);

        processor.reset();
        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        processor.process(&c, &mut l, &mut r);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_tail_length() {
        let mut processor = EchoProcessor::new();
        processor.prepare(SAMPLE_RATE);

        controls(1.0, 0.0, 0.5, 0.5).apply_to(&mut processor.delay_line);
        assert_eq!(processor.tail_samples(), 48_000);

        // 0.1 feedback: -3 / log10(0.1) = 3 repeats.
        controls(1.0, 0.1, 0.5, 0.5).apply_to(&mut processor.delay_line);
        let tail = processor.tail_samples();
        assert!((143_990..=144_010).contains(&tail), "got {tail}");
    }
}
