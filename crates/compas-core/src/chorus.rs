//! LFO-modulated chorus.
//!
//! The wet branch is a slightly detuned copy of the source, produced by the
//! pitch shifter into an internal mix buffer sized by the detune ratio. An
//! LFO then sweeps a read position through that buffer, up to `delay` frames
//! away from the dry position, and the output blends dry and wet through a
//! folded mix law. Positions the sweep pushes outside the mix buffer come
//! out as silence.
//!
//! The LFO phase is a global frame offset that persists across calls; the
//! caller advances through a note buffer by buffer and the sweep continues
//! seamlessly.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use libm::{exp2, floor, fmod, sin};

use core::f64::consts::PI;

use crate::pitch::PitchShifter;
use crate::synth::Waveform;

/// Impulse comparison threshold: `sin(2π · 3/5)`.
fn impulse_threshold() -> f64 {
    sin(2.0 * PI * 3.0 / 5.0)
}

/// Chorus with an internal pitch-shifted mix buffer.
///
/// `depth` detunes the wet branch by up to a quarter semitone, `delay` sets
/// the sweep width in frames and `mix` balances dry against wet (0.5 is all
/// dry, 1.0 all wet). `base_key` names the key the voice is sounding so the
/// mix buffer can be sized to whole detuned periods.
#[derive(Debug, Clone)]
pub struct Chorus {
    samplerate: u32,
    offset: u64,
    base_key: f64,
    input_volume: f64,
    output_volume: f64,
    lfo_oscillator: Waveform,
    lfo_frequency: f64,
    depth: f64,
    mix: f64,
    delay: f64,
    pitch_shifter: PitchShifter,
    pitch_mix_buffer: Vec<f64>,
}

impl Chorus {
    /// Creates a neutral chorus at the given sample rate.
    pub fn new(samplerate: u32) -> Self {
        Self {
            samplerate,
            offset: 0,
            base_key: 0.0,
            input_volume: 1.0,
            output_volume: 1.0,
            lfo_oscillator: Waveform::Sine,
            lfo_frequency: 10.0,
            depth: 0.0,
            mix: 0.5,
            delay: 0.0,
            pitch_shifter: PitchShifter::new(samplerate),
            pitch_mix_buffer: Vec::new(),
        }
    }

    /// Sets the sample rate in Hz.
    pub fn set_samplerate(&mut self, samplerate: u32) {
        self.samplerate = samplerate;
        self.pitch_shifter.set_samplerate(samplerate);
    }

    /// Sets the key the voice is sounding, where 0 maps to 440 Hz.
    pub fn set_base_key(&mut self, base_key: f64) {
        self.base_key = base_key;
    }

    /// Sets the gain applied to both branches before mixing.
    pub fn set_input_volume(&mut self, input_volume: f64) {
        self.input_volume = input_volume;
    }

    /// Sets the gain applied to the blended output.
    pub fn set_output_volume(&mut self, output_volume: f64) {
        self.output_volume = output_volume;
    }

    /// Sets the sweep LFO waveform.
    pub fn set_lfo_oscillator(&mut self, lfo_oscillator: Waveform) {
        self.lfo_oscillator = lfo_oscillator;
    }

    /// Sets the sweep LFO frequency in Hz.
    pub fn set_lfo_frequency(&mut self, lfo_frequency: f64) {
        self.lfo_frequency = lfo_frequency;
    }

    /// Sets the detune amount, 1.0 being a quarter semitone.
    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
    }

    /// Sets the dry/wet balance, from 0.5 (dry) to 1.0 (wet).
    pub fn set_mix(&mut self, mix: f64) {
        self.mix = mix;
    }

    /// Sets the sweep width in frames.
    pub fn set_delay(&mut self, delay: f64) {
        self.delay = delay;
    }

    /// Sets the global frame position of the next buffer.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Current global frame position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Produces one chorused buffer from `source` into `destination`.
    ///
    /// Overwrites the destination; the caller decides how the result folds
    /// back into the voice. Either slice being empty is a silent no-op.
    pub fn compute_into(&mut self, destination: &mut [f64], source: &[f64]) {
        if destination.is_empty() || source.is_empty() {
            return;
        }

        let buffer_length = destination.len().min(source.len());
        let rate = f64::from(self.samplerate);

        let ratio = self.lfo_frequency / rate;

        // Quarter-semitone detune at full depth.
        let tuning = self.depth * 0.25;

        let base_freq = exp2(self.base_key / 12.0) * 440.0;
        let pitch_freq = exp2((self.base_key - tuning) / 12.0) * 440.0;

        let freq_period = 2.0 * PI * rate / base_freq;
        let pitch_freq_period = rate / pitch_freq;

        let pitch_mix_buffer_length = ((freq_period / pitch_freq_period) * buffer_length as f64)
            as usize;

        // Detuned copy of the source, whole buffer at a time.
        self.pitch_mix_buffer.resize(pitch_mix_buffer_length, 0.0);
        self.pitch_shifter.set_base_key(self.base_key);
        self.pitch_shifter.set_tuning(-100.0 * tuning);
        self.pitch_shifter.set_phase(0.0);
        self.pitch_shifter
            .compute_into(&mut self.pitch_mix_buffer, &source[..buffer_length]);

        let mut mix_a = self.mix;
        let mut mix_b = self.mix - 0.5;

        if mix_a > 0.5 {
            mix_a = 0.5 - (-1.0 * (0.5 - mix_a));
        }

        if mix_b < 0.0 {
            mix_b = 0.5 - (-1.0 * mix_b);
        }

        mix_a *= 2.0;
        mix_b *= 2.0;

        for i in 0..buffer_length {
            let frame = (self.offset + i as u64) as f64;

            let lfo = match self.lfo_oscillator {
                Waveform::Sine => sin(frame * 2.0 * PI * self.lfo_frequency / rate),
                Waveform::Sawtooth => fmod(frame * ratio, 1.0) * 2.0 - 1.0,
                Waveform::Triangle => {
                    let cycle = frame * ratio - floor(frame * ratio);

                    if cycle < 0.5 {
                        4.0 * cycle - 1.0
                    } else {
                        3.0 - 4.0 * cycle
                    }
                }
                Waveform::Square => {
                    if sin(frame * 2.0 * PI * self.lfo_frequency / rate) >= 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Waveform::Impulse => {
                    if sin(frame * 2.0 * PI * self.lfo_frequency / rate) >= impulse_threshold() {
                        1.0
                    } else {
                        -1.0
                    }
                }
            };

            let position = i as i64 + floor(self.delay * lfo) as i64;

            destination[i] = if position >= 0 && (position as usize) < pitch_mix_buffer_length {
                self.output_volume
                    * (mix_a * (self.input_volume * source[i])
                        + mix_b * (self.input_volume * self.pitch_mix_buffer[position as usize]))
            } else {
                0.0
            };
        }

        self.offset += buffer_length as u64;
    }
}
