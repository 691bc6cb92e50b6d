//! Engine parameters shared by offline rendering and live playback.

use std::path::Path;

use compas_core::SampleFormat;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::synth::SynthConfig;

/// Mix buffer format selector as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MixFormat {
    /// Signed 16-bit integer.
    S16,
    /// Signed 24-bit integer.
    S24,
    /// Signed 32-bit integer.
    S32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    #[default]
    F64,
}

impl MixFormat {
    /// The engine sample format this selects.
    pub fn sample_format(self) -> SampleFormat {
        match self {
            MixFormat::S16 => SampleFormat::S16,
            MixFormat::S24 => SampleFormat::S24,
            MixFormat::S32 => SampleFormat::S32,
            MixFormat::F32 => SampleFormat::F32,
            MixFormat::F64 => SampleFormat::F64,
        }
    }
}

/// Engine parameters for a song or a live session.
///
/// Stored as the `[engine]` table of a song file:
///
/// ```toml
/// [engine]
/// samplerate = 48000
/// buffer_size = 512
/// format = "f64"
/// pcm_channels = 2
///
/// [engine.synth]
/// [[engine.synth.oscillators]]
/// waveform = "sawtooth"
/// ```
///
/// Every field has a default, so an empty table is a valid engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub samplerate: u32,
    /// Frames per period.
    pub buffer_size: usize,
    /// Mix buffer format.
    pub format: MixFormat,
    /// Interleaved output channels.
    pub pcm_channels: u16,
    /// Output device name or index; `None` picks the default device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Synth rack settings.
    pub synth: SynthConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            samplerate: 48_000,
            buffer_size: 512,
            format: MixFormat::F64,
            pcm_channels: 2,
            device: None,
            synth: SynthConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads an engine config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&contents)
    }

    /// Saves the engine config to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Parses an engine config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serializes the engine config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that the parameters describe a runnable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samplerate == 0 {
            return Err(ConfigError::invalid_value(
                "samplerate",
                self.samplerate,
                "must be greater than zero",
            ));
        }
        if !self.buffer_size.is_power_of_two() || !(16..=8192).contains(&self.buffer_size) {
            return Err(ConfigError::invalid_value(
                "buffer_size",
                self.buffer_size,
                "must be a power of two between 16 and 8192",
            ));
        }
        if !(1..=16).contains(&self.pcm_channels) {
            return Err(ConfigError::invalid_value(
                "pcm_channels",
                self.pcm_channels,
                "must be between 1 and 16",
            ));
        }
        self.synth.validate()
    }
}
