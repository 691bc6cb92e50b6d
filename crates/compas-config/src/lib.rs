//! Song and engine configuration for the compas sequencer.
//!
//! This crate maps TOML documents onto the engine: a [`Song`] file carries
//! engine parameters, a synth rack and note tracks, and builds straight into
//! a ready-to-run processor.
//!
//! # Features
//!
//! - **Song Files**: Load and save complete songs from TOML files
//! - **Engine Parameters**: Sample rate, period size, mix format and output
//!   channels with validated ranges
//! - **Synth Rack**: Oscillator, noise, pitch, filter and chorus settings
//!   applied onto a processor's ports
//! - **Validation**: Reject out-of-range values with the offending field and
//!   value in the error
//!
//! # Example
//!
//! ```rust,no_run
//! use compas_config::Song;
//!
//! let song = Song::load("demo.toml").unwrap();
//! let mut processor = song.build_processor().unwrap();
//! processor.run_inter();
//! ```

mod engine;
mod error;
mod song;
mod synth;

pub use engine::{EngineConfig, MixFormat};
pub use error::ConfigError;
pub use song::{Song, Track};
pub use synth::{
    ChorusConfig, FilterConfig, InterpolationConfig, NoiseConfig, OscillatorConfig, PitchConfig,
    SynthConfig, VibratoConfig, WaveformConfig,
};
