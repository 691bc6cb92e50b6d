//! White noise operator.

/// Additive noise source with a sample-and-hold frequency control.
///
/// `frequency` sets how often a new random value is drawn: `rate / frequency`
/// frames share one value, so low frequencies give coarse "gritty" noise and
/// `frequency >= rate` gives full-bandwidth white noise. Values come from a
/// xorshift32 generator; a given seed always produces the same sequence as
/// long as computes cover contiguous frame ranges.
#[derive(Debug, Clone)]
pub struct Noise {
    volume: f64,
    frequency: f64,
    samplerate: u32,
    offset: u64,
    state: u32,
    current_step: Option<u64>,
    current_value: f64,
}

const DEFAULT_SEED: u32 = 0x9e3779b9;

#[inline]
fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

impl Noise {
    /// Creates a silent (zero volume) noise source.
    pub fn new(samplerate: u32) -> Self {
        Self {
            volume: 0.0,
            frequency: f64::from(samplerate),
            samplerate,
            offset: 0,
            state: DEFAULT_SEED,
            current_step: None,
            current_value: 0.0,
        }
    }

    /// Sets the linear gain. Zero silences (and short-circuits) the operator.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    /// Current gain.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sets the redraw frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Sets the sample rate in Hz.
    pub fn set_samplerate(&mut self, samplerate: u32) {
        self.samplerate = samplerate;
    }

    /// Sets the global frame position of the next buffer.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Reseeds the generator and forgets the held value.
    pub fn set_seed(&mut self, seed: u32) {
        self.state = if seed == 0 { DEFAULT_SEED } else { seed };
        self.current_step = None;
    }

    /// Sums noise onto `buffer`. No-op at zero volume.
    pub fn compute(&mut self, buffer: &mut [f64]) {
        if self.volume == 0.0 || buffer.is_empty() || self.frequency <= 0.0 {
            return;
        }

        let hold = (f64::from(self.samplerate) / self.frequency).max(1.0) as u64;

        for (i, sample) in buffer.iter_mut().enumerate() {
            let step = (self.offset + i as u64) / hold;
            if self.current_step != Some(step) {
                self.current_step = Some(step);
                let raw = xorshift32(&mut self.state);
                self.current_value = (f64::from(raw) / f64::from(u32::MAX)) * 2.0 - 1.0;
            }
            *sample += self.volume * self.current_value;
        }
    }
}
