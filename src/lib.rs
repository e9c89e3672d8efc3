//! # SHARC Echo — A Stereo Feedback Delay Plugin
//!
//! A stereo echo built with [nih-plug](https://github.com/robbert-vdh/nih-plug),
//! exported as CLAP, VST3 and (through clap-wrapper) AUv2. The delay line
//! has two interchangeable kernels, a plain scalar loop and a run-length
//! chunked vectorized loop, selectable from the "Use SIMD" switch. The
//! plugin also keeps a smoothed estimate of how much of the real-time
//! budget each block uses.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬─────────────────────────────────────────── × dry ───┐
//!         │                                                     │
//!         │    ┌────────────────────────────────────────────┐   │
//!         │    │              FEEDBACK LOOP                 │   │
//!         │    │                                            │   │
//!         └──►(+)──► [clip ±1] ──► [Ring Buffer, M samples] │   │
//!              ▲                            │               │   │
//!              │                            ▼               │   │
//!              └──────────── × feedback ── delayed ─────────┘   │
//!                                           │                   │
//!                                           └──── × wet ──────►(+)──► Output
//! ```
//!
//! ## Crate Layout
//!
//! - [`dsp::delay_line`]: the stereo ring buffer and both kernels.
//! - [`dsp::load`]: the processing-load estimator.
//! - [`controller`]: per-block parameter snapshot, clamping and bypass.
//! - [`processor`]: one block, host-independent.
//! - [`params`]: host parameter declarations.

pub mod controller;
pub mod dsp;
pub mod params;
pub mod processor;

use std::num::NonZeroU32;
use std::sync::Arc;

use controller::Controls;
use dsp::load::LoadMeter;
use nih_plug::prelude::*;
use params::EchoParams;
use processor::EchoProcessor;

/// The plugin itself. Parameters are shared with the host; everything in
/// `processor` belongs to the audio thread.
pub struct SharcEcho {
    params: Arc<EchoParams>,
    processor: EchoProcessor,
}

impl Default for SharcEcho {
    fn default() -> Self {
        Self {
            params: Arc::new(EchoParams::default()),
            // Buffers are allocated in initialize(), once the sample rate
            // is known.
            processor: EchoProcessor::new(),
        }
    }
}

impl SharcEcho {
    /// The processing-load estimate, for a display running on another
    /// thread. The handle stays valid across sample rate changes.
    pub fn load_meter(&self) -> Arc<LoadMeter> {
        self.processor.load_meter()
    }
}

impl Plugin for SharcEcho {
    const NAME: &'static str = "SHARC Echo";
    const VENDOR: &'static str = "SHARC Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo only: both channels share one delay cursor.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Controls are read once per block, so there is nothing to gain from
    // splitting blocks at automation points.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called on load and on every configuration change, including sample
    /// rate changes. Reallocates the delay buffers and restarts the load
    /// estimate. Returning `false` rejects the configuration.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let sample_rate = buffer_config.sample_rate;

        if !self.processor.prepare(sample_rate) {
            nih_log!("Cannot allocate a delay buffer at {sample_rate} Hz");
            return false;
        }

        nih_log!(
            "Prepared at {sample_rate} Hz, {} samples per channel",
            self.processor.delay_line().capacity()
        );
        true
    }

    /// Called when playback restarts. Stale echoes are dropped; the
    /// parameters stay as they are.
    fn reset(&mut self) {
        self.processor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let controls = Controls::from_params(&self.params);

        let [left, right] = buffer.as_slice() else {
            return ProcessStatus::Normal;
        };

        if !self.processor.process(&controls, left, right) {
            // Bypassed: the delay line is frozen, so there is no tail.
            return ProcessStatus::Normal;
        }

        ProcessStatus::Tail(self.processor.tail_samples())
    }
}

impl ClapPlugin for SharcEcho {
    const CLAP_ID: &'static str = "com.sharc-audio.sharc-echo";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Stereo feedback delay with scalar and SIMD kernels");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for SharcEcho {
    const VST3_CLASS_ID: [u8; 16] = *b"SharcEchoDly_001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(SharcEcho);
nih_export_vst3!(SharcEcho);

// AUv2 entry point for hosts that only load Audio Units.
clap_wrapper::export_auv2!();
