//! Volume scaling operator.

/// Per-sample gain applied over a buffer.
///
/// The simplest of the buffer operators; unity gain by default.
#[derive(Debug, Clone)]
pub struct Volume {
    volume: f64,
}

impl Volume {
    /// Creates a unity-gain operator.
    pub fn new() -> Self {
        Self { volume: 1.0 }
    }

    /// Sets the gain (1.0 = unity).
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    /// Current gain.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Scales `source` into `destination`. Empty slices are a no-op.
    pub fn compute(&self, destination: &mut [f64], source: &[f64]) {
        let n = destination.len().min(source.len());

        for i in 0..n {
            destination[i] = self.volume * source[i];
        }
    }

    /// Scales `buffer` in place.
    pub fn compute_in_place(&self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample *= self.volume;
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}
