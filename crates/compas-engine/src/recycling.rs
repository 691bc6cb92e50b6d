//! Sample-storage containers owning one channel's audio signals.

use std::sync::{Arc, Mutex};

use crate::audio_signal::SharedAudioSignal;
use crate::recall_id::RecallId;

/// Shared handle to a recycling.
pub type SharedRecycling = Arc<Mutex<Recycling>>;

/// Owns every audio signal currently playing on one audio channel.
///
/// Voices attach a signal here at key-on and detach it when the voice is
/// released; consumers (the soundcard bridge, offline render) walk the
/// signals of the scope they are draining.
#[derive(Debug, Default)]
pub struct Recycling {
    audio_channel: u32,
    audio_signals: Vec<SharedAudioSignal>,
}

impl Recycling {
    /// Empty recycling for `audio_channel`.
    pub fn new(audio_channel: u32) -> Self {
        Self {
            audio_channel,
            audio_signals: Vec::new(),
        }
    }

    /// The channel this recycling stores signals for.
    pub fn audio_channel(&self) -> u32 {
        self.audio_channel
    }

    /// All attached signals.
    pub fn audio_signals(&self) -> &[SharedAudioSignal] {
        &self.audio_signals
    }

    /// Number of attached signals.
    pub fn len(&self) -> usize {
        self.audio_signals.len()
    }

    /// True when no signal is attached.
    pub fn is_empty(&self) -> bool {
        self.audio_signals.is_empty()
    }

    /// Attaches a signal.
    pub fn add_audio_signal(&mut self, audio_signal: SharedAudioSignal) {
        self.audio_signals.push(audio_signal);
    }

    /// Detaches `audio_signal` by identity. Returns whether it was attached.
    pub fn remove_audio_signal(&mut self, audio_signal: &SharedAudioSignal) -> bool {
        if let Some(at) = self
            .audio_signals
            .iter()
            .position(|existing| Arc::ptr_eq(existing, audio_signal))
        {
            self.audio_signals.remove(at);
            true
        } else {
            false
        }
    }

    /// First signal tagged with `recall_id`.
    pub fn find_by_recall_id(&self, recall_id: RecallId) -> Option<SharedAudioSignal> {
        self.audio_signals
            .iter()
            .find(|signal| signal.lock().unwrap().recall_id() == Some(recall_id))
            .cloned()
    }
}
