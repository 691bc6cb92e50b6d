//! Error types for engine setup operations.
//!
//! The real-time path never returns errors; everything here surfaces at
//! voice or graph setup time.

use thiserror::Error;

/// Errors that can occur while assembling the playback graph.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The processor was created without any audio channels.
    #[error("processor needs at least one audio channel")]
    NoAudioChannels,

    /// A notation or recycling referenced a channel the audio does not have.
    #[error("audio channel {audio_channel} out of range (audio has {audio_channels})")]
    ChannelOutOfRange {
        /// The requested channel.
        audio_channel: u32,
        /// Number of channels the processor was built with.
        audio_channels: u32,
    },

    /// A plugin host was created without any audio lines.
    #[error("plugin host needs at least one line")]
    NoLines,

    /// A plugin descriptor refused to instantiate a voice.
    #[error("plugin '{plugin}' failed to instantiate")]
    PluginInstantiate {
        /// Name reported by the descriptor.
        plugin: String,
    },
}

impl EngineError {
    /// Channel bounds error for `audio_channel` against a channel count.
    pub fn channel_out_of_range(audio_channel: u32, audio_channels: u32) -> Self {
        Self::ChannelOutOfRange {
            audio_channel,
            audio_channels,
        }
    }

    /// Instantiation failure for the named plugin.
    pub fn plugin_instantiate(plugin: impl Into<String>) -> Self {
        Self::PluginInstantiate {
            plugin: plugin.into(),
        }
    }
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
