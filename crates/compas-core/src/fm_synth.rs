//! Frequency-modulated oscillator operator.
//!
//! Same additive contract as [`Synth`](crate::Synth), with an LFO phase
//! modulator and a cents-tuning control on top. Voices stack three of these
//! per channel for the classic layered FM patch.
//!
//! Unlike the plain oscillators, every waveform here is evaluated from a
//! continuous cycle position so the LFO term can bend it smoothly; at zero
//! depth the sine carrier is sample-identical to the plain sine.

use libm::{exp2, floor, sin};

use crate::synth::Waveform;
use core::f64::consts::PI;

/// One FM oscillator: carrier waveform, LFO modulator, cents tuning.
#[derive(Debug, Clone)]
pub struct FmSynth {
    waveform: Waveform,
    frequency: f64,
    phase: f64,
    volume: f64,
    samplerate: u32,
    offset: u64,
    lfo_waveform: Waveform,
    lfo_frequency: f64,
    lfo_depth: f64,
    /// Carrier detune in cents.
    tuning: f64,
}

impl FmSynth {
    /// Creates an FM oscillator with the LFO disabled (zero depth).
    pub fn new(samplerate: u32) -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 440.0,
            phase: 0.0,
            volume: 1.0,
            samplerate,
            offset: 0,
            lfo_waveform: Waveform::Sine,
            lfo_frequency: 6.0,
            lfo_depth: 0.0,
            tuning: 0.0,
        }
    }

    /// Sets the carrier waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Sets the carrier frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Sets the carrier phase in frames.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Sets the linear gain.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    /// Sets the sample rate in Hz.
    pub fn set_samplerate(&mut self, samplerate: u32) {
        self.samplerate = samplerate;
    }

    /// Sets the global frame position of the next buffer.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Sets the LFO waveform.
    pub fn set_lfo_waveform(&mut self, waveform: Waveform) {
        self.lfo_waveform = waveform;
    }

    /// Sets the LFO rate in Hz.
    pub fn set_lfo_frequency(&mut self, frequency: f64) {
        self.lfo_frequency = frequency;
    }

    /// Sets the modulation index (radians of phase swing at full LFO).
    pub fn set_lfo_depth(&mut self, depth: f64) {
        self.lfo_depth = depth;
    }

    /// Sets the carrier detune in cents.
    pub fn set_tuning(&mut self, tuning: f64) {
        self.tuning = tuning;
    }

    /// Current gain.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sums one buffer of the modulated carrier onto `buffer`.
    pub fn compute(&self, buffer: &mut [f64]) {
        if buffer.is_empty() || self.frequency <= 0.0 {
            return;
        }

        let rate = f64::from(self.samplerate);
        let carrier_freq = self.frequency * exp2(self.tuning / 1200.0);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;

            let lfo = if self.lfo_depth != 0.0 {
                shape(
                    self.lfo_waveform,
                    idx * 2.0 * PI * self.lfo_frequency / rate,
                )
            } else {
                0.0
            };

            let theta =
                (idx + self.phase) * 2.0 * PI * carrier_freq / rate + self.lfo_depth * lfo;
            *sample += shape(self.waveform, theta) * self.volume;
        }
    }
}

/// Evaluates a waveform at angle `theta` (radians), range [-1, 1].
fn shape(waveform: Waveform, theta: f64) -> f64 {
    match waveform {
        Waveform::Sine => sin(theta),
        Waveform::Sawtooth => {
            let cycle = cycle_fraction(theta);
            2.0 * cycle - 1.0
        }
        Waveform::Triangle => {
            let cycle = cycle_fraction(theta);
            if cycle < 0.5 {
                4.0 * cycle - 1.0
            } else {
                3.0 - 4.0 * cycle
            }
        }
        Waveform::Square => {
            if sin(theta) >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Impulse => {
            if sin(theta) >= sin(2.0 * PI * 3.0 / 5.0) {
                1.0
            } else {
                -1.0
            }
        }
    }
}

#[inline]
fn cycle_fraction(theta: f64) -> f64 {
    let t = theta / (2.0 * PI);
    t - floor(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Synth;

    #[test]
    fn zero_depth_sine_matches_plain_sine() {
        let mut fm = FmSynth::new(48000);
        fm.set_frequency(440.0);

        let mut plain = Synth::new(48000);
        plain.set_frequency(440.0);

        let mut a = vec![0.0; 512];
        let mut b = vec![0.0; 512];
        fm.compute(&mut a);
        plain.compute(&mut b);

        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn tuning_of_octave_doubles_frequency() {
        let rate = 48000;
        let count = |buffer: &[f64]| {
            buffer
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count()
        };

        let mut base = FmSynth::new(rate);
        base.set_frequency(220.0);
        let mut low = vec![0.0; rate as usize];
        base.compute(&mut low);

        let mut detuned = FmSynth::new(rate);
        detuned.set_frequency(220.0);
        detuned.set_tuning(1200.0);
        let mut high = vec![0.0; rate as usize];
        detuned.compute(&mut high);

        let low_crossings = count(&low) as f64;
        let high_crossings = count(&high) as f64;
        assert!(
            (high_crossings / low_crossings - 2.0).abs() < 0.05,
            "octave detune: {low_crossings} vs {high_crossings} crossings"
        );
    }

    #[test]
    fn modulation_perturbs_the_carrier() {
        let mut fm = FmSynth::new(48000);
        fm.set_frequency(440.0);
        fm.set_lfo_frequency(30.0);
        fm.set_lfo_depth(4.0);

        let mut modulated = vec![0.0; 4096];
        fm.compute(&mut modulated);

        let mut plain = vec![0.0; 4096];
        let mut synth = Synth::new(48000);
        synth.set_frequency(440.0);
        synth.compute(&mut plain);

        let diff: f64 = modulated
            .iter()
            .zip(plain.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 1.0, "modulation had no effect");
    }

    #[test]
    fn split_compute_matches_single_compute() {
        let make = || {
            let mut fm = FmSynth::new(48000);
            fm.set_frequency(330.0);
            fm.set_lfo_depth(2.0);
            fm.set_lfo_frequency(5.5);
            fm
        };

        let mut full = vec![0.0; 1024];
        make().compute(&mut full);

        let mut split = make();
        let mut halves = vec![0.0; 1024];
        split.compute(&mut halves[..512]);
        split.set_offset(512);
        split.compute(&mut halves[512..]);

        assert_eq!(full, halves);
    }
}
