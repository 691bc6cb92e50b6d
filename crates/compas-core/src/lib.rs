//! Compás Core - sample buffer codec and DSP operators for the playback engine
//!
//! This crate holds everything that touches raw samples: format conversion
//! between the engine's mix format and soundcard PCM, and the per-voice DSP
//! operators the signal processor drives once per buffer period.
//!
//! # Buffer Codec
//!
//! - [`SampleFormat`] / [`CopyMode`] - the supported PCM formats and the
//!   source→destination pairing of a copy
//! - [`copy`] / [`copy_buffer_to_buffer`] - additive, stride-aware copies
//!   with format conversion
//! - [`SampleSlice`] / [`SampleSliceMut`] - dynamically typed buffer views
//!   for soundcard-facing code
//! - [`correct_byte_order`] - endianness fixup for foreign-order buffers
//!
//! # DSP Operators
//!
//! Each operator is a small struct holding its parameters and whatever state
//! must survive between buffer periods:
//!
//! - [`Volume`] - linear gain
//! - [`Synth`] - five-waveform additive oscillator
//! - [`FmSynth`] - the oscillator with an LFO modulating its phase
//! - [`Noise`] - sample-and-hold white noise
//! - [`PitchShifter`] - fixed-point resampling with selectable
//!   interpolation quality and a vibrato LFO
//! - [`IirFilter`] - resonant low-pass/high-pass biquad
//! - [`Chorus`] - LFO-swept detuned overlay
//!
//! Oscillators derive every sample from a global frame index, so rendering a
//! note buffer by buffer is bit-identical to rendering it in one call. The
//! stateful operators (pitch, filter, chorus) carry their accumulators and
//! history across calls instead; resetting those mid-note is audible.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! compas-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use compas_core::{Synth, Volume, Waveform};
//!
//! let mut synth = Synth::new(44100);
//! synth.set_waveform(Waveform::Sawtooth);
//! synth.set_frequency(220.0);
//!
//! let mut buffer = [0.0f64; 256];
//! synth.compute(&mut buffer);
//!
//! let mut volume = Volume::new();
//! volume.set_volume(0.5);
//! volume.compute_in_place(&mut buffer);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod chorus;
pub mod fm_synth;
pub mod iir_filter;
pub mod noise;
pub mod pitch;
pub mod synth;
pub mod volume;

// Re-export main types at crate root
pub use buffer::{
    ByteOrder, Complex, CopyMode, PcmSample, S24, SampleFormat, SampleSlice, SampleSliceMut,
    clear, copy, copy_buffer_to_buffer, copy_complex, correct_byte_order, scale_factor,
};
pub use chorus::Chorus;
pub use fm_synth::FmSynth;
pub use iir_filter::{FilterType, IirFilter};
pub use noise::Noise;
pub use pitch::{Interpolation, PitchShifter};
pub use synth::{Synth, Waveform};
pub use volume::Volume;
