//! Per-scope, per-channel voice state.
//!
//! Each playback scope keeps its own array of channel states so overlapping
//! passes never share DSP accumulators. Within a channel the pitch, filter
//! and chorus units carry their internal state across buffer boundaries for
//! the whole life of a note; only the per-MIDI-note slots track which notes
//! are currently held.

use compas_core::{Chorus, FmSynth, IirFilter, Noise, PitchShifter};

/// Number of MIDI note slots per channel.
pub const KEY_COUNT: usize = 128;

/// Key-on bookkeeping for one MIDI note slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    key_on: u32,
}

impl InputData {
    /// Number of overlapping notes currently holding this key.
    pub fn key_on(&self) -> u32 {
        self.key_on
    }

    /// Marks one more note holding this key.
    pub fn increment_key_on(&mut self) {
        self.key_on += 1;
    }

    /// Releases one note; the count floors at zero.
    pub fn decrement_key_on(&mut self) {
        self.key_on = self.key_on.saturating_sub(1);
    }
}

/// DSP units and note slots for one audio channel in one scope.
#[derive(Debug)]
pub struct ChannelData {
    /// The three stacked oscillators.
    pub synth: [FmSynth; 3],
    /// White noise source.
    pub noise: Noise,
    /// Pitch shifter; phase and vibrato offset persist across buffers.
    pub pitch: PitchShifter,
    /// Low-pass stage.
    pub low_pass: IirFilter,
    /// High-pass stage.
    pub high_pass: IirFilter,
    /// Chorus stage.
    pub chorus: Chorus,
    chorus_destination: Vec<f64>,
    input_data: [InputData; KEY_COUNT],
}

impl ChannelData {
    /// Fresh state for one channel.
    pub fn new(samplerate: u32, buffer_size: usize) -> Self {
        Self {
            synth: core::array::from_fn(|_| FmSynth::new(samplerate)),
            noise: Noise::new(samplerate),
            pitch: PitchShifter::new(samplerate),
            low_pass: IirFilter::new(samplerate),
            high_pass: IirFilter::new(samplerate),
            chorus: Chorus::new(samplerate),
            chorus_destination: vec![0.0; buffer_size],
            input_data: [InputData::default(); KEY_COUNT],
        }
    }

    /// Note slot for `midi_note`.
    pub fn input_data(&self, midi_note: usize) -> &InputData {
        &self.input_data[midi_note]
    }

    /// Mutable note slot for `midi_note`.
    pub fn input_data_mut(&mut self, midi_note: usize) -> &mut InputData {
        &mut self.input_data[midi_note]
    }

    /// Takes the chorus scratch buffer; pair with
    /// [`restore_chorus_destination`](Self::restore_chorus_destination).
    pub(crate) fn take_chorus_destination(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.chorus_destination)
    }

    pub(crate) fn restore_chorus_destination(&mut self, destination: Vec<f64>) {
        self.chorus_destination = destination;
    }
}

/// One scope's channel array.
#[derive(Debug)]
pub struct ScopeData {
    channel_data: Vec<ChannelData>,
}

impl ScopeData {
    /// Channel states for `audio_channels` channels.
    pub fn new(audio_channels: u32, samplerate: u32, buffer_size: usize) -> Self {
        Self {
            channel_data: (0..audio_channels)
                .map(|_| ChannelData::new(samplerate, buffer_size))
                .collect(),
        }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channel_data.len()
    }

    /// True when the scope has no channels.
    pub fn is_empty(&self) -> bool {
        self.channel_data.is_empty()
    }

    /// State for `audio_channel`.
    pub fn channel_data(&self, audio_channel: usize) -> &ChannelData {
        &self.channel_data[audio_channel]
    }

    /// Mutable state for `audio_channel`.
    pub fn channel_data_mut(&mut self, audio_channel: usize) -> &mut ChannelData {
        &mut self.channel_data[audio_channel]
    }
}
