//! Resonant IIR low-pass and high-pass filtering.
//!
//! A biquad in Direct Form II built from the Bristow-Johnson cookbook
//! equations. The cutoff is expressed on an absolute-cents scale (the
//! SoundFont convention) and converted to Hz through a segmented
//! cents-to-Hz table, then clamped to `[5 Hz, 0.45 · samplerate]` so the
//! filter doubles as an anti-aliasing stage at low sample rates.
//!
//! The two history taps persist across calls. Parameter changes after
//! startup do not jump the coefficients; they ramp over a fixed number of
//! samples, scaling the history along with large gain steps so the filter
//! cannot blow up mid-transition.

use libm::{cos, exp2, fabs, sin};

use core::f64::consts::PI;

/// Filter response selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Pass the signal through untouched.
    #[default]
    Disabled,
    /// Attenuate above the cutoff.
    Lowpass,
    /// Attenuate below the cutoff.
    Highpass,
}

/// Samples over which a coefficient change is smeared.
const TRANSITION_SAMPLES: u32 = 64;

/// Absolute cents to Hz, on the segmented SoundFont scale.
///
/// Each octave segment anchors an exact power-of-two base frequency so the
/// `exp2` argument stays within ±0.25 octaves of the segment center.
fn ct2hz_real(cents: f64) -> f64 {
    if cents < 0.0 {
        return 1.0;
    }

    for k in 0..12u32 {
        let upper = 900.0 + 1200.0 * f64::from(k);

        if cents < upper {
            let base = 6.875 * exp2(f64::from(k));
            let center = 600.0 + 1200.0 * f64::from(k);

            return base * exp2((cents - center) / 1200.0);
        }
    }

    1.0
}

/// Cutoff cents to Hz with the SoundFont filter-frequency limits applied.
fn ct2hz(cents: f64) -> f64 {
    ct2hz_real(cents.clamp(1500.0, 13500.0))
}

/// Resonant biquad filter with persistent history.
///
/// `fres` is the cutoff in absolute cents (13500 keeps the filter nearly
/// open), `q_lin` the linear resonance amount and `filter_gain` a linear
/// output gain. A `q_lin` of zero or the [`FilterType::Disabled`] response
/// turns the filter into a no-op.
#[derive(Debug, Clone)]
pub struct IirFilter {
    filter_type: FilterType,
    samplerate: u32,
    fres: f64,
    last_fres: f64,
    q_lin: f64,
    filter_gain: f64,
    startup: bool,
    a1: f64,
    a2: f64,
    b02: f64,
    b1: f64,
    a1_incr: f64,
    a2_incr: f64,
    b02_incr: f64,
    b1_incr: f64,
    incr_count: u32,
    compensate_incr: bool,
    hist1: f64,
    hist2: f64,
}

impl IirFilter {
    /// Creates a disabled filter at the given sample rate.
    pub fn new(samplerate: u32) -> Self {
        Self {
            filter_type: FilterType::Disabled,
            samplerate,
            fres: 13500.0,
            last_fres: 0.0,
            q_lin: 1.0,
            filter_gain: 1.0,
            startup: true,
            a1: 0.0,
            a2: 0.0,
            b02: 0.0,
            b1: 0.0,
            a1_incr: 0.0,
            a2_incr: 0.0,
            b02_incr: 0.0,
            b1_incr: 0.0,
            incr_count: 0,
            compensate_incr: false,
            hist1: 0.0,
            hist2: 0.0,
        }
    }

    /// Sets the filter response.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        if filter_type != self.filter_type {
            self.filter_type = filter_type;
            self.last_fres = -1.0;
        }
    }

    /// Current filter response.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Sets the sample rate in Hz.
    pub fn set_samplerate(&mut self, samplerate: u32) {
        if samplerate != self.samplerate {
            self.samplerate = samplerate;
            self.last_fres = -1.0;
        }
    }

    /// Sets the cutoff in absolute cents.
    pub fn set_fres(&mut self, fres: f64) {
        self.fres = fres;
    }

    /// Current cutoff in absolute cents.
    pub fn fres(&self) -> f64 {
        self.fres
    }

    /// Sets the linear resonance. Zero switches the filter off.
    pub fn set_q_lin(&mut self, q_lin: f64) {
        if q_lin != self.q_lin {
            self.q_lin = q_lin;
            self.last_fres = -1.0;
        }
    }

    /// Current linear resonance.
    pub fn q_lin(&self) -> f64 {
        self.q_lin
    }

    /// Sets the linear output gain.
    pub fn set_filter_gain(&mut self, filter_gain: f64) {
        if filter_gain != self.filter_gain {
            self.filter_gain = filter_gain;
            self.last_fres = -1.0;
        }
    }

    /// Current linear output gain.
    pub fn filter_gain(&self) -> f64 {
        self.filter_gain
    }

    /// Clears the history taps for a new note. The next buffer applies
    /// fresh coefficients without a transition ramp.
    pub fn reset(&mut self) {
        self.hist1 = 0.0;
        self.hist2 = 0.0;
        self.incr_count = 0;
        self.startup = true;
        self.last_fres = -1.0;
    }

    /// Filters `buffer` in place.
    ///
    /// A disabled response or zero resonance leaves the buffer untouched.
    pub fn compute(&mut self, buffer: &mut [f64]) {
        if self.filter_type == FilterType::Disabled || self.q_lin == 0.0 || buffer.is_empty() {
            return;
        }

        self.calc(0.0);

        let mut hist1 = self.hist1;
        let mut hist2 = self.hist2;

        let mut a1 = self.a1;
        let mut a2 = self.a2;
        let mut b02 = self.b02;
        let mut b1 = self.b1;

        let mut incr_count = self.incr_count;

        if incr_count > 0 {
            // Coefficients are still moving towards their new setting.
            for sample in buffer.iter_mut() {
                let centernode = *sample - a1 * hist1 - a2 * hist2;

                *sample = b02 * (centernode + hist2) + b1 * hist1;

                hist2 = hist1;
                hist1 = centernode;

                if incr_count > 0 {
                    incr_count -= 1;

                    let old_b02 = b02;

                    a1 += self.a1_incr;
                    a2 += self.a2_incr;
                    b02 += self.b02_incr;
                    b1 += self.b1_incr;

                    // Scale the history with large gain steps, otherwise a
                    // big frequency jump sends the filter haywire.
                    if self.compensate_incr && fabs(b02) > 0.001 {
                        let compensate = old_b02 / b02;

                        hist1 *= compensate;
                        hist2 *= compensate;
                    }
                }
            }
        } else {
            for sample in buffer.iter_mut() {
                let centernode = *sample - a1 * hist1 - a2 * hist2;

                *sample = b02 * (centernode + hist2) + b1 * hist1;

                hist2 = hist1;
                hist1 = centernode;
            }
        }

        self.hist1 = hist1;
        self.hist2 = hist2;

        self.a1 = a1;
        self.a2 = a2;
        self.b02 = b02;
        self.b1 = b1;

        self.incr_count = incr_count;
    }

    /// Re-derives the resonant frequency and recalculates coefficients when
    /// it moved by more than a hundredth of a Hz.
    fn calc(&mut self, fres_mod: f64) {
        let output_rate = f64::from(self.samplerate);

        let mut tmp_fres = ct2hz(self.fres + fres_mod);

        if tmp_fres > 0.45 * output_rate {
            tmp_fres = 0.45 * output_rate;
        } else if tmp_fres < 5.0 {
            tmp_fres = 5.0;
        }

        if fabs(tmp_fres - self.last_fres) > 0.01 {
            self.last_fres = tmp_fres;

            self.calculate_coefficients(TRANSITION_SAMPLES);
        }
    }

    fn calculate_coefficients(&mut self, transition_samples: u32) {
        if self.q_lin == 0.0 {
            return;
        }

        // Bristow-Johnson cookbook biquad, normalized by a0.
        let omega = 2.0 * PI * (self.last_fres / f64::from(self.samplerate));
        let sin_coeff = sin(omega);
        let cos_coeff = cos(omega);
        let alpha_coeff = sin_coeff / (2.0 * self.q_lin);
        let a0_inv = 1.0 / (1.0 + alpha_coeff);

        let a1_temp = -2.0 * cos_coeff * a0_inv;
        let a2_temp = (1.0 - alpha_coeff) * a0_inv;

        let (b02_temp, b1_temp) = match self.filter_type {
            FilterType::Highpass => {
                let b1 = (1.0 + cos_coeff) * a0_inv * self.filter_gain;

                (b1 * 0.5, -b1)
            }
            FilterType::Lowpass => {
                let b1 = (1.0 - cos_coeff) * a0_inv * self.filter_gain;

                (b1 * 0.5, b1)
            }
            FilterType::Disabled => {
                return;
            }
        };

        self.compensate_incr = false;

        if self.startup || transition_samples == 0 {
            // Voice start applies the coefficients without a ramp.
            self.a1 = a1_temp;
            self.a2 = a2_temp;
            self.b02 = b02_temp;
            self.b1 = b1_temp;

            self.incr_count = 0;
            self.startup = false;
        } else {
            let samples = f64::from(transition_samples);

            self.a1_incr = (a1_temp - self.a1) / samples;
            self.a2_incr = (a2_temp - self.a2) / samples;
            self.b02_incr = (b02_temp - self.b02) / samples;
            self.b1_incr = (b1_temp - self.b1) / samples;

            if fabs(self.b02) > 0.0001 {
                let quota = b02_temp / self.b02;

                self.compensate_incr = quota < 0.5 || quota > 2.0;
            }

            self.incr_count = transition_samples;
        }
    }
}
