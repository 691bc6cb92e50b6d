//! Soundcard client bridge and WAV export for the compas engine.
//!
//! The engine renders voices into [`compas_engine::AudioSignal`] streams;
//! this crate moves those samples to the outside world. Two paths exist:
//!
//! - **Live playback**: a [`PeriodMixer`] drains voice streams into an
//!   [`AppBufferRing`] one period at a time, and an [`OutputStream`] copies
//!   rotated ring buffers to the soundcard under a two-phase
//!   [`PeriodHandshake`]. The device callback never renders audio itself.
//! - **Offline render**: the same mixer output is collected and written to
//!   a WAV file via [`write_wav`].
//!
//! Format conversion at both edges goes through the `compas-core` codec, so
//! the device always receives properly scaled samples regardless of the
//! engine's mix format.

pub mod cpal_backend;
pub mod handshake;
pub mod playback;
pub mod ring;
pub mod wav;

use thiserror::Error;

/// Errors from device discovery, streaming, and WAV export.
#[derive(Error, Debug)]
pub enum IoError {
    /// hound failed to read or write a WAV file.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    /// The platform audio stream failed to build or start.
    #[error("audio stream error: {0}")]
    Stream(String),
    /// No output device is available at all.
    #[error("no audio output device available")]
    NoDevice,
    /// The requested stream or file shape cannot be produced.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// No device matched the requested name or index.
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    /// Underlying filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for this crate's fallible functions.
pub type Result<T> = std::result::Result<T, IoError>;

pub use cpal_backend::{
    AudioDevice, OutputStream, StreamConfig, default_output_device, list_output_devices,
    run_device_period,
};
pub use handshake::PeriodHandshake;
pub use playback::{PeriodMixer, signal_samples};
pub use ring::{AppBufferMode, AppBufferRing, SharedAppBufferRing};
pub use wav::{WavSpec, read_wav, write_wav};
