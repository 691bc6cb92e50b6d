//! Oscillator synthesis operators.
//!
//! Five waveform generators that sum into an audio buffer: sine, sawtooth,
//! triangle, square and impulse. All of them derive the sample value from a
//! global frame index (`offset + i`) plus a phase in frames, so a caller can
//! render a long tone across many buffer periods by advancing `offset`
//! between calls and get the identical samples a single call would produce.

use libm::{ceil, floor, sin};

use core::f64::consts::PI;

/// Waveform selector shared by the synth operators and the LFOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Rising sawtooth.
    Sawtooth,
    /// Triangle.
    Triangle,
    /// Square (sign of a sine).
    Square,
    /// Impulse train (sine compared against a fixed high threshold).
    Impulse,
}

impl Waveform {
    /// All waveforms, in selector order.
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Sawtooth,
        Waveform::Triangle,
        Waveform::Square,
        Waveform::Impulse,
    ];

    /// Waveform from its port index, if valid.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Additive oscillator over a buffer region.
///
/// Parameters mirror the classic analog set: `frequency` in Hz, `phase` in
/// frames, `volume` as linear gain. `offset` is the global frame position of
/// the next buffer; the operator never advances it itself.
#[derive(Debug, Clone)]
pub struct Synth {
    waveform: Waveform,
    frequency: f64,
    phase: f64,
    volume: f64,
    samplerate: u32,
    offset: u64,
}

/// Impulse comparison threshold: `sin(2π · 3/5)`.
fn impulse_threshold() -> f64 {
    sin(2.0 * PI * 3.0 / 5.0)
}

impl Synth {
    /// Creates an oscillator with unity volume at the given sample rate.
    pub fn new(samplerate: u32) -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 440.0,
            phase: 0.0,
            volume: 1.0,
            samplerate,
            offset: 0,
        }
    }

    /// Sets the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Sets the frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Sets the phase in frames.
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

    /// Current global frame position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Current gain.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sums one buffer of the configured waveform onto `buffer`.
    ///
    /// An empty buffer or non-positive frequency is a silent no-op.
    pub fn compute(&self, buffer: &mut [f64]) {
        if buffer.is_empty() || self.frequency <= 0.0 {
            return;
        }

        match self.waveform {
            Waveform::Sine => self.compute_sine(buffer),
            Waveform::Sawtooth => self.compute_sawtooth(buffer),
            Waveform::Triangle => self.compute_triangle(buffer),
            Waveform::Square => self.compute_square(buffer),
            Waveform::Impulse => self.compute_impulse(buffer),
        }
    }

    fn compute_sine(&self, buffer: &mut [f64]) {
        let rate = f64::from(self.samplerate);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;
            *sample += sin((idx + self.phase) * 2.0 * PI * self.frequency / rate) * self.volume;
        }
    }

    /// Sawtooth counts frames modulo the rounded-up period length, so the
    /// phase has to be re-expressed in whole periods first.
    fn compute_sawtooth(&self, buffer: &mut [f64]) {
        let rate = f64::from(self.samplerate);
        let period = ceil(rate / self.frequency) as i64;
        if period <= 0 {
            return;
        }

        let mut phase = (ceil(self.phase) as i64 % ceil(self.frequency).max(1.0) as i64) as f64;
        phase = ceil(phase / self.frequency) * ceil(rate / self.frequency);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;
            let step = ceil(idx + phase) as i64 % period;
            *sample += ((step as f64 * 2.0 * self.frequency / rate) - 1.0) * self.volume;
        }
    }

    fn compute_triangle(&self, buffer: &mut [f64]) {
        let rate = f64::from(self.samplerate);

        let mut phase = (ceil(self.phase) as i64 % ceil(self.frequency).max(1.0) as i64) as f64;
        phase = ceil(phase / self.frequency) * ceil(rate / self.frequency);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;
            let t = (phase + idx) * self.frequency / rate;
            let cycle = t - floor(t);
            let level = if cycle < 0.5 {
                4.0 * cycle - 1.0
            } else {
                3.0 - 4.0 * cycle
            };
            *sample += level * self.volume;
        }
    }

    fn compute_square(&self, buffer: &mut [f64]) {
        let rate = f64::from(self.samplerate);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;
            let level = if sin((idx + self.phase) * 2.0 * PI * self.frequency / rate) >= 0.0 {
                1.0
            } else {
                -1.0
            };
            *sample += level * self.volume;
        }
    }

    fn compute_impulse(&self, buffer: &mut [f64]) {
        let rate = f64::from(self.samplerate);
        let threshold = impulse_threshold();

        for (i, sample) in buffer.iter_mut().enumerate() {
            let idx = (self.offset + i as u64) as f64;
            let level = if sin((idx + self.phase) * 2.0 * PI * self.frequency / rate) >= threshold {
                1.0
            } else {
                -1.0
            };
            *sample += level * self.volume;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(buffer: &[f64]) -> usize {
        buffer
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count()
    }

    #[test]
    fn sine_440_crosses_880_times_per_second() {
        let rate = 44100;
        let mut synth = Synth::new(rate);
        synth.set_frequency(440.0);

        let mut buffer = vec![0.0; rate as usize];
        synth.compute(&mut buffer);

        let crossings = zero_crossings(&buffer);
        assert!(
            (crossings as i64 - 880).abs() <= 2,
            "expected ~880 zero crossings, got {crossings}"
        );
    }

    #[test]
    fn oscillators_are_additive() {
        let mut synth = Synth::new(48000);
        synth.set_frequency(100.0);
        synth.set_volume(0.5);

        let mut once = vec![0.0; 256];
        synth.compute(&mut once);

        let mut twice = vec![0.0; 256];
        synth.compute(&mut twice);
        synth.compute(&mut twice);

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((2.0 * a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn split_compute_matches_single_compute() {
        for waveform in Waveform::ALL {
            let mut whole = Synth::new(48000);
            whole.set_waveform(waveform);
            whole.set_frequency(523.25);

            let mut full = vec![0.0; 1024];
            whole.compute(&mut full);

            let mut split = Synth::new(48000);
            split.set_waveform(waveform);
            split.set_frequency(523.25);

            let mut halves = vec![0.0; 1024];
            split.compute(&mut halves[..512]);
            split.set_offset(512);
            split.compute(&mut halves[512..]);

            assert_eq!(full, halves, "{waveform:?} diverged across a split");
        }
    }

    #[test]
    fn square_is_bivalued() {
        let mut synth = Synth::new(48000);
        synth.set_waveform(Waveform::Square);
        synth.set_frequency(440.0);
        synth.set_volume(0.25);

        let mut buffer = vec![0.0; 4800];
        synth.compute(&mut buffer);

        for &sample in &buffer {
            assert!(sample == 0.25 || sample == -0.25);
        }
    }

    #[test]
    fn impulse_duty_cycle_is_seventy_percent() {
        // sin(x) >= sin(216°) holds on 70% of the cycle.
        let mut synth = Synth::new(48000);
        synth.set_waveform(Waveform::Impulse);
        synth.set_frequency(100.0);

        let mut buffer = vec![0.0; 48000];
        synth.compute(&mut buffer);

        let positive = buffer.iter().filter(|&&s| s > 0.0).count();
        let duty = positive as f64 / buffer.len() as f64;
        assert!((duty - 0.7).abs() < 0.02, "duty cycle {duty}");
    }

    #[test]
    fn sawtooth_spans_full_range() {
        let mut synth = Synth::new(48000);
        synth.set_waveform(Waveform::Sawtooth);
        synth.set_frequency(100.0);

        let mut buffer = vec![0.0; 4800];
        synth.compute(&mut buffer);

        let max = buffer.iter().cloned().fold(f64::MIN, f64::max);
        let min = buffer.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max > 0.9 && min < -0.9, "range [{min}, {max}]");
    }

    #[test]
    fn zero_frequency_is_noop() {
        let mut synth = Synth::new(48000);
        synth.set_frequency(0.0);

        let mut buffer = vec![0.5; 16];
        synth.compute(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.5));
    }
}
