//! Audio-loop side of the bridge: drain voice streams into mixed periods.

use std::sync::Arc;

use compas_core::{clear, copy};
use compas_engine::{AudioSignal, NotationProcessor, SharedAudioSignal};

/// One adopted voice stream with its private read position.
#[derive(Debug)]
struct SignalTap {
    audio_channel: u32,
    signal: SharedAudioSignal,
    position: usize,
}

/// Mixes every sounding voice of a processor into interleaved periods.
///
/// Signals appear in a channel's recycling at key-on; the mixer adopts each
/// one at read position zero and walks it one buffer per period, in lockstep
/// with the render cursor. A fully drained signal is detached from its
/// recycling, which is what finally frees a released voice.
///
/// Call [`mix_period`](Self::mix_period) once after every
/// [`run_inter`](NotationProcessor::run_inter).
#[derive(Debug)]
pub struct PeriodMixer {
    pcm_channels: usize,
    taps: Vec<SignalTap>,
}

impl PeriodMixer {
    /// A mixer producing `pcm_channels` interleaved output channels.
    pub fn new(pcm_channels: usize) -> Self {
        Self {
            pcm_channels: pcm_channels.max(1),
            taps: Vec::new(),
        }
    }

    /// Interleaved channels per output frame.
    pub fn pcm_channels(&self) -> usize {
        self.pcm_channels
    }

    /// Number of streams currently being drained.
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// True when no stream has frames left to drain.
    pub fn is_idle(&self) -> bool {
        self.taps.is_empty()
    }

    /// Clears `out` and mixes one period of every adopted stream into it.
    ///
    /// `out` holds `pcm_channels x buffer_size` interleaved samples; audio
    /// channels beyond `pcm_channels` fold onto `channel % pcm_channels`.
    pub fn mix_period(&mut self, processor: &NotationProcessor, out: &mut [f64]) {
        let count = out.len();
        clear(out, 1, count);

        self.adopt_new_signals(processor);

        let pcm_channels = self.pcm_channels;
        let buffer_size = processor.buffer_size();
        self.taps.retain_mut(|tap| {
            let lane = tap.audio_channel as usize % pcm_channels;
            let drained = {
                let signal = tap.signal.lock().unwrap();
                match signal.stream_buffer(tap.position) {
                    Some(buffer) => {
                        if let Some(dest) = out.get_mut(lane..) {
                            let frames = buffer
                                .len()
                                .min(buffer_size)
                                .min(dest.len().div_ceil(pcm_channels));
                            copy(dest, pcm_channels, buffer, 1, frames);
                        }
                        false
                    }
                    None => true,
                }
            };

            if drained {
                if let Some(recycling) = processor.recycling(tap.audio_channel) {
                    recycling.lock().unwrap().remove_audio_signal(&tap.signal);
                }
                false
            } else {
                tap.position += 1;
                true
            }
        });
    }

    fn adopt_new_signals(&mut self, processor: &NotationProcessor) {
        for audio_channel in 0..processor.audio_channels() {
            let Some(recycling) = processor.recycling(audio_channel) else {
                continue;
            };
            let signals: Vec<SharedAudioSignal> =
                recycling.lock().unwrap().audio_signals().to_vec();

            for signal in signals {
                let adopted = self
                    .taps
                    .iter()
                    .any(|tap| Arc::ptr_eq(&tap.signal, &signal));
                if !adopted {
                    self.taps.push(SignalTap {
                        audio_channel,
                        signal,
                        position: 0,
                    });
                }
            }
        }
    }
}

/// Flattens a signal's stream into one contiguous sample vector.
///
/// Trailing pad frames beyond the signal's frame count are dropped.
pub fn signal_samples(signal: &AudioSignal) -> Vec<f64> {
    let mut samples = Vec::with_capacity(signal.stream_len() * signal.buffer_size());
    for index in 0..signal.stream_len() {
        if let Some(buffer) = signal.stream_buffer(index) {
            samples.extend_from_slice(buffer);
        }
    }
    if signal.frame_count() > 0 {
        samples.truncate(signal.frame_count());
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use compas_engine::{Notation, Note};

    const SAMPLERATE: u32 = 48000;
    const BUFFER_SIZE: usize = 512;

    fn processor(audio_channels: u32) -> NotationProcessor {
        let mut processor =
            NotationProcessor::new(SAMPLERATE, BUFFER_SIZE, audio_channels).unwrap();
        processor.set_delay(2.0);
        processor
    }

    fn add_note(processor: &mut NotationProcessor, audio_channel: u32, x0: u64, x1: u64, y: u32) {
        let notation = processor.add_notation(Notation::new(audio_channel)).unwrap();
        notation.lock().unwrap().add_note(Note::new(x0, x1, y));
    }

    #[test]
    fn mix_clears_before_accumulating() {
        let processor = processor(1);
        let mut mixer = PeriodMixer::new(1);
        let mut out = vec![9.0; BUFFER_SIZE];

        mixer.mix_period(&processor, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(mixer.is_idle());
    }

    #[test]
    fn mixer_follows_a_voice_in_lockstep() {
        let mut processor = processor(1);
        add_note(&mut processor, 0, 0, 1, 69);
        let mut mixer = PeriodMixer::new(1);
        let mut out = vec![0.0; BUFFER_SIZE];

        processor.run_inter();
        mixer.mix_period(&processor, &mut out);
        assert_eq!(mixer.tap_count(), 1);

        let rendered = {
            let recycling = processor.recycling(0).unwrap();
            let signals = recycling.lock().unwrap().audio_signals().to_vec();
            let signal = signals[0].lock().unwrap();
            signal.stream_buffer(0).unwrap().to_vec()
        };
        assert!(rendered.iter().any(|&s| s != 0.0));
        assert_eq!(out, rendered);
    }

    #[test]
    fn drained_signal_detaches_from_recycling() {
        let mut processor = processor(1);
        add_note(&mut processor, 0, 0, 1, 69);
        let mut mixer = PeriodMixer::new(1);
        let mut out = vec![0.0; BUFFER_SIZE];

        // A one-offset note at delay 2.0 spans 1024 frames, stored as
        // three buffers including the pad. One extra period drains it.
        for _ in 0..4 {
            processor.run_inter();
            mixer.mix_period(&processor, &mut out);
        }

        assert!(mixer.is_idle());
        let recycling = processor.recycling(0).unwrap();
        assert!(recycling.lock().unwrap().is_empty());
    }

    #[test]
    fn channels_land_in_their_own_lane() {
        let mut processor = processor(2);
        add_note(&mut processor, 1, 0, 1, 69);
        let mut mixer = PeriodMixer::new(2);
        let mut out = vec![0.0; 2 * BUFFER_SIZE];

        processor.run_inter();
        mixer.mix_period(&processor, &mut out);

        let left_energy: f64 = out.iter().step_by(2).map(|s| s * s).sum();
        let right_energy: f64 = out.iter().skip(1).step_by(2).map(|s| s * s).sum();
        assert_eq!(left_energy, 0.0);
        assert!(right_energy > 0.0);
    }

    #[test]
    fn excess_channels_fold_onto_available_lanes() {
        let mut processor = processor(2);
        add_note(&mut processor, 1, 0, 1, 69);
        let mut mixer = PeriodMixer::new(1);
        let mut out = vec![0.0; BUFFER_SIZE];

        processor.run_inter();
        mixer.mix_period(&processor, &mut out);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn signal_samples_drops_the_pad() {
        let mut processor = processor(1);
        add_note(&mut processor, 0, 0, 1, 69);
        processor.run_inter();

        let recycling = processor.recycling(0).unwrap();
        let signals = recycling.lock().unwrap().audio_signals().to_vec();
        let signal = signals[0].lock().unwrap();

        let samples = signal_samples(&signal);
        assert_eq!(samples.len(), signal.frame_count());
        assert!(samples.len() < signal.stream_len() * BUFFER_SIZE);
    }
}
