//! # Stereo Delay Line (Ring Buffer Pair)
//!
//! Two circular buffers, one per channel, that store a decaying mix of the
//! incoming audio and its own past output. Both channels share a single
//! cursor and always move in lock-step, so the stereo image of the echoes
//! matches the stereo image of the input.
//!
//! ## The Recurrence
//!
//! For every sample, with `d` the value stored `delay` samples ago:
//!
//! ```text
//! out[n]    = in[n] * dry + d * wet
//! stored[n] = clamp(in[n] + d * feedback, -1, 1)
//! ```
//!
//! Note that the buffer stores `input + feedback * delayed`, not the wet
//! output. With `feedback < 1` this is a decaying recurrence: an impulse of
//! 1.0 comes back as 1.0, 0.5, 0.25, ... for a feedback of 0.5. The hard
//! clip keeps the stored state inside `[-1, 1]` no matter what the input or
//! a mid-block parameter change does.
//!
//! ## Cursor and Effective Length
//!
//! Unlike the usual "write head / read head" layout, this delay line reads
//! and writes at the *same* index. The trick is that the cursor wraps at the
//! effective delay length rather than at the buffer capacity:
//!
//! ```text
//! capacity = 10, delay = 4
//!
//!   [ a  b  c  d | .  .  .  .  .  . ]
//!     ^cursor      (unused until delay grows)
//! ```
//!
//! The slot under the cursor was last written exactly `delay` samples ago,
//! so reading it before overwriting it yields the delayed tap for free.
//!
//! ## Two Kernels
//!
//! [`ProcessingMode::Scalar`] walks one sample at a time and checks for the
//! wrap point after every sample. [`ProcessingMode::Vectorized`] instead
//! computes the distance to the wrap point once, processes that whole run
//! in [`LANES`]-wide chunks plus a scalar tail, and wraps exactly once per
//! run. Both kernels perform the same per-sample arithmetic in the same
//! order, so their outputs agree to within floating-point tolerance.

use nih_plug::nih_debug_assert;

/// The longest delay the buffers are sized for, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 5.0;

/// Feedback is capped below 1.0. At 1.0 the recurrence no longer decays and
/// rounding error alone can make it grow.
pub const MAX_FEEDBACK: f32 = 0.99;

/// Width of one vector step in the vectorized kernel. Eight `f32` lanes
/// fill an AVX register, or two SSE/NEON registers.
pub const LANES: usize = 8;

/// Which kernel processes a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessingMode {
    /// One sample per step, wrap check per sample.
    #[default]
    Scalar,
    /// Run-length chunking with [`LANES`]-wide steps.
    Vectorized,
}

/// Per-block snapshot of the three gains. Copied out of the delay line
/// before the kernel runs so the kernel only borrows the buffers.
#[derive(Debug, Clone, Copy)]
struct Gains {
    feedback: f32,
    wet: f32,
    dry: f32,
}

/// A stereo feedback delay line with a shared cursor.
///
/// Buffers are allocated in [`prepare()`](Self::prepare) and never resized
/// while processing. Until `prepare()` has been called with a usable sample
/// rate, processing passes audio through untouched.
pub struct StereoDelayLine {
    left: Vec<f32>,
    right: Vec<f32>,

    /// Shared read/write position. Always `< delay_samples` on entry to a
    /// kernel.
    cursor: usize,

    /// Requested delay time, kept in seconds so it can be re-converted when
    /// the sample rate changes.
    delay_seconds: f32,

    /// Effective delay length in samples, clamped to `[1, capacity]`.
    delay_samples: usize,

    feedback: f32,
    wet: f32,
    dry: f32,
    sample_rate: f32,
}

impl Default for StereoDelayLine {
    fn default() -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
            cursor: 0,
            delay_seconds: 1.0,
            delay_samples: 1,
            feedback: 0.3,
            wet: 0.5,
            dry: 0.5,
            sample_rate: 0.0,
        }
    }
}

impl StereoDelayLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate both channel buffers for `max_delay_seconds` at
    /// `sample_rate`, zero them and rewind the cursor.
    ///
    /// Calling this again (for instance after a sample rate change) throws
    /// away all stored audio. The current delay time is re-converted to
    /// samples at the new rate.
    ///
    /// If the resulting capacity is zero the delay line stays unprepared.
    pub fn prepare(&mut self, sample_rate: f32, max_delay_seconds: f32) {
        let capacity = seconds_to_samples(max_delay_seconds, sample_rate);

        self.sample_rate = if capacity > 0 { sample_rate } else { 0.0 };

        // `clear()` + `resize()` reuses the existing allocation when the
        // capacity doesn't grow.
        self.left.clear();
        self.left.resize(capacity, 0.0);
        self.right.clear();
        self.right.resize(capacity, 0.0);
        self.cursor = 0;

        self.delay_samples = self.clamp_delay(seconds_to_samples(self.delay_seconds, sample_rate));
    }

    /// `true` once buffers have been allocated.
    pub fn is_prepared(&self) -> bool {
        !self.left.is_empty()
    }

    /// Buffer capacity in samples per channel.
    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The effective delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    pub fn dry(&self) -> f32 {
        self.dry
    }

    /// Set the delay time. The sample count is truncated and clamped to
    /// `[1, capacity]`, so asking for more than the buffer holds simply
    /// gives the longest delay available.
    ///
    /// Non-finite values are ignored.
    pub fn set_delay_seconds(&mut self, seconds: f32) {
        if !seconds.is_finite() {
            return;
        }
        self.delay_seconds = seconds.max(0.0);
        self.delay_samples =
            self.clamp_delay(seconds_to_samples(self.delay_seconds, self.sample_rate));
    }

    /// Set the feedback gain, clamped to `[0, MAX_FEEDBACK]`.
    pub fn set_feedback(&mut self, gain: f32) {
        if gain.is_finite() {
            self.feedback = gain.clamp(0.0, MAX_FEEDBACK);
        }
    }

    /// Set the gain of the delayed signal, clamped to `[0, 1]`.
    pub fn set_wet(&mut self, gain: f32) {
        if gain.is_finite() {
            self.wet = gain.clamp(0.0, 1.0);
        }
    }

    /// Set the gain of the original signal, clamped to `[0, 1]`. Wet and dry
    /// are independent and need not sum to one.
    pub fn set_dry(&mut self, gain: f32) {
        if gain.is_finite() {
            self.dry = gain.clamp(0.0, 1.0);
        }
    }

    /// Silence both buffers and rewind the cursor. Parameters and capacity
    /// are left alone.
    pub fn reset(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.cursor = 0;
    }

    /// Process a stereo block in place.
    ///
    /// `left` and `right` hold the input on entry and the output on return.
    /// Only the first `min(left.len(), right.len())` samples are touched.
    /// Before [`prepare()`](Self::prepare) this is a no-op, which leaves the
    /// block as a dry pass-through.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], mode: ProcessingMode) {
        if !self.is_prepared() {
            return;
        }

        let num_samples = left.len().min(right.len());
        let left = &mut left[..num_samples];
        let right = &mut right[..num_samples];

        // The delay may have shrunk below the cursor since the last block.
        if self.cursor >= self.delay_samples {
            self.cursor = 0;
        }
        nih_debug_assert!(self.delay_samples >= 1 && self.delay_samples <= self.capacity());

        match mode {
            ProcessingMode::Scalar => self.process_scalar(left, right),
            ProcessingMode::Vectorized => self.process_vectorized(left, right),
        }
    }

    /// Out-of-place variant of [`process()`](Self::process): the inputs are
    /// copied to the outputs, which are then processed in place. When the
    /// delay line is unprepared the outputs end up holding the dry input.
    pub fn process_into(
        &mut self,
        input: [&[f32]; 2],
        output: [&mut [f32]; 2],
        mode: ProcessingMode,
    ) {
        let [in_left, in_right] = input;
        let [out_left, out_right] = output;

        let num_samples = in_left
            .len()
            .min(in_right.len())
            .min(out_left.len())
            .min(out_right.len());

        let out_left = &mut out_left[..num_samples];
        let out_right = &mut out_right[..num_samples];
        out_left.copy_from_slice(&in_left[..num_samples]);
        out_right.copy_from_slice(&in_right[..num_samples]);

        self.process(out_left, out_right, mode);
    }

    fn gains(&self) -> Gains {
        Gains {
            feedback: self.feedback,
            wet: self.wet,
            dry: self.dry,
        }
    }

    fn clamp_delay(&self, samples: usize) -> usize {
        samples.clamp(1, self.capacity().max(1))
    }

    /// One sample at a time, wrap check after each one.
    fn process_scalar(&mut self, left: &mut [f32], right: &mut [f32]) {
        let gains = self.gains();
        let len = self.delay_samples;
        let mut cursor = self.cursor;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            tick(l, &mut self.left[cursor], gains);
            tick(r, &mut self.right[cursor], gains);

            cursor += 1;
            if cursor >= len {
                cursor = 0;
            }
        }

        self.cursor = cursor;
    }

    /// Run-length chunked kernel.
    ///
    /// Each outer iteration handles the samples between the cursor and the
    /// next wrap point (or the end of the block, whichever comes first).
    /// Inside a run the buffer slice is contiguous, so it is processed in
    /// `LANES`-wide steps followed by a scalar tail, with no wrap check at
    /// all. The cursor wraps once, after the run.
    fn process_vectorized(&mut self, left: &mut [f32], right: &mut [f32]) {
        let gains = self.gains();
        let len = self.delay_samples;
        let num_samples = left.len();
        let mut cursor = self.cursor;
        let mut offset = 0;

        while offset < num_samples {
            let run = (num_samples - offset).min(len - cursor);

            let io_left = &mut left[offset..offset + run];
            let io_right = &mut right[offset..offset + run];
            let buf_left = &mut self.left[cursor..cursor + run];
            let buf_right = &mut self.right[cursor..cursor + run];

            run_lanes(io_left, buf_left, gains);
            run_lanes(io_right, buf_right, gains);

            offset += run;
            cursor += run;
            if cursor == len {
                cursor = 0;
            }
        }

        self.cursor = cursor;
    }
}

/// Convert seconds to a truncated sample count. Negative, NaN and
/// overflowing products saturate (`as` casts from float are saturating).
fn seconds_to_samples(seconds: f32, sample_rate: f32) -> usize {
    let samples = seconds * sample_rate;
    if samples.is_finite() {
        samples as usize
    } else {
        0
    }
}

/// Clip the value going back into the buffer to `[-1, 1]`.
///
/// `max`/`min` rather than `clamp`: they return the non-NaN operand, so a
/// NaN lands on -1.0 instead of circulating in the feedback loop forever.
#[inline(always)]
fn hard_clip(value: f32) -> f32 {
    value.max(-1.0).min(1.0)
}

/// The per-sample step shared by both kernels.
#[inline(always)]
fn tick(io: &mut f32, slot: &mut f32, gains: Gains) {
    let input = *io;
    let delayed = *slot;
    *io = input * gains.dry + delayed * gains.wet;
    *slot = hard_clip(input + gains.feedback * delayed);
}

/// Process one contiguous run of a single channel: whole lanes first, then
/// the leftover samples one by one. `io` and `buf` have the same length.
#[inline(always)]
fn run_lanes(io: &mut [f32], buf: &mut [f32], gains: Gains) {
    let (io_lanes, io_tail) = io.as_chunks_mut::<LANES>();
    let (buf_lanes, buf_tail) = buf.as_chunks_mut::<LANES>();

    for (io, buf) in io_lanes.iter_mut().zip(buf_lanes.iter_mut()) {
        let input = *io;
        let delayed = *buf;

        // Straight-line loops over fixed-size arrays; these compile to
        // packed multiply/add/min/max.
        for lane in 0..LANES {
            io[lane] = input[lane] * gains.dry + delayed[lane] * gains.wet;
        }
        for lane in 0..LANES {
            buf[lane] = hard_clip(input[lane] + gains.feedback * delayed[lane]);
        }
    }

    for (io, slot) in io_tail.iter_mut().zip(buf_tail.iter_mut()) {
        tick(io, slot, gains);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
