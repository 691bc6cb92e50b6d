//! Phase-accumulator pitch shifting.
//!
//! Resamples a buffer through a 64-bit fixed-point phase accumulator
//! (32-bit sample index, 32-bit fraction) at one of four interpolation
//! quality levels. The fraction's top 8 bits select one of 256 coefficient
//! rows, so interpolation weights are quantized to 1/256th of a sample.
//!
//! The accumulator and the vibrato LFO position persist across calls. A held
//! note is resampled buffer by buffer, and clearing either mid-note produces
//! an audible discontinuity, so the caller only ever resets them when a new
//! note starts.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::{cos, exp2, fabs, floor, sin};

use core::f64::consts::PI;

/// Interpolation quality for the pitch shifter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Round the phase to the nearest source sample.
    None,
    /// Two-point linear interpolation.
    Linear,
    /// Four-point Hermite interpolation.
    #[default]
    FourthOrder,
    /// Seven-point windowed-sinc interpolation.
    SeventhOrder,
}

impl Interpolation {
    /// All interpolation modes, in selector order.
    pub const ALL: [Interpolation; 4] = [
        Interpolation::None,
        Interpolation::Linear,
        Interpolation::FourthOrder,
        Interpolation::SeventhOrder,
    ];

    /// Interpolation from its port index, if valid.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Number of quantized coefficient rows per table.
const INTERP_ROWS: usize = 256;

/// Tap count of the windowed-sinc kernel.
const SINC_ORDER: usize = 7;

/// Bits holding the integer sample index.
const PHASE_INDEX_SHIFT: u32 = 32;

/// Mask of the fractional phase bits.
const PHASE_FRACT_MASK: u64 = 0xffff_ffff;

/// Shift from the fraction down to a coefficient row.
const PHASE_TABLE_SHIFT: u32 = 24;

fn phase_from_f64(value: f64) -> u64 {
    let index = floor(value);

    ((index as u64) << PHASE_INDEX_SHIFT) | ((value - index) * 4_294_967_296.0) as u64
}

fn phase_index(phase: u64) -> usize {
    (phase >> PHASE_INDEX_SHIFT) as usize
}

fn phase_tablerow(phase: u64) -> usize {
    ((phase & PHASE_FRACT_MASK) >> PHASE_TABLE_SHIFT) as usize
}

fn clamp_tap(index: usize, offset: i64, end_index: usize) -> usize {
    let tap = index as i64 + offset;

    if tap < 0 {
        0
    } else {
        (tap as usize).min(end_index)
    }
}

fn linear_table() -> Vec<[f64; 2]> {
    (0..INTERP_ROWS)
        .map(|i| {
            let x = i as f64 / INTERP_ROWS as f64;

            [1.0 - x, x]
        })
        .collect()
}

fn fourth_order_table() -> Vec<[f64; 4]> {
    (0..INTERP_ROWS)
        .map(|i| {
            let x = i as f64 / INTERP_ROWS as f64;

            [
                x * (-0.5 + x * (1.0 - 0.5 * x)),
                1.0 + x * x * (1.5 * x - 2.5),
                x * (0.5 + x * (2.0 - 1.5 * x)),
                0.5 * x * x * (x - 1.0),
            ]
        })
        .collect()
}

/// Windowed-sinc coefficients, one row per subsample offset. Rows are stored
/// in reverse subsample order so that a row lookup by phase fraction lands on
/// the kernel centered for that fraction.
fn seventh_order_table() -> Vec<[f64; 7]> {
    let mut table = vec![[0.0; SINC_ORDER]; INTERP_ROWS];

    for i in 0..SINC_ORDER {
        for i2 in 0..INTERP_ROWS {
            let shifted = i as f64 - SINC_ORDER as f64 / 2.0 + i2 as f64 / INTERP_ROWS as f64;

            // sinc(0) needs its limit value
            let value = if fabs(shifted) > 0.000001 {
                let arg = PI * shifted;

                sin(arg) / arg * 0.5 * (1.0 + cos(2.0 * arg / SINC_ORDER as f64))
            } else {
                1.0
            };

            table[INTERP_ROWS - i2 - 1][i] = value;
        }
    }

    table
}

/// Resampling pitch shifter with optional vibrato.
///
/// `tuning` shifts the pitch in cents relative to `base_key` (a MIDI-style
/// key number where 48 maps to 440 Hz). When vibrato is enabled the playback
/// speed is recomputed every output sample from a sine LFO, so the shift
/// wobbles around `tuning` by up to `100 · gain · depth` cents.
///
/// [`compute_into`](Self::compute_into) is the windowed primitive: it keeps
/// producing output samples until either the destination is full or the
/// accumulator runs off the end of the source, and leaves the accumulator
/// where it stopped. Splitting one call into two over the same source yields
/// identical output. [`compute`](Self::compute) wraps it for in-place use on
/// a stream buffer and re-anchors the integer index to the next buffer
/// afterwards, carrying the fraction (and any whole-frame overshoot) forward.
#[derive(Debug, Clone)]
pub struct PitchShifter {
    interpolation: Interpolation,
    samplerate: u32,
    base_key: f64,
    tuning: f64,
    vibrato_enabled: bool,
    vibrato_gain: f64,
    vibrato_lfo_depth: f64,
    vibrato_lfo_freq: f64,
    vibrato_lfo_offset: u64,
    phase: u64,
    scratch: Vec<f64>,
    coeff_linear: Vec<[f64; 2]>,
    coeff_fourth: Vec<[f64; 4]>,
    coeff_seventh: Vec<[f64; 7]>,
}

impl PitchShifter {
    /// Creates a pitch shifter at the given sample rate.
    pub fn new(samplerate: u32) -> Self {
        Self {
            interpolation: Interpolation::default(),
            samplerate,
            base_key: 0.0,
            tuning: 0.0,
            vibrato_enabled: false,
            vibrato_gain: 1.0,
            vibrato_lfo_depth: 1.0,
            vibrato_lfo_freq: 8.172,
            vibrato_lfo_offset: 0,
            phase: 0,
            scratch: Vec::new(),
            coeff_linear: linear_table(),
            coeff_fourth: fourth_order_table(),
            coeff_seventh: seventh_order_table(),
        }
    }

    /// Sets the interpolation quality.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Current interpolation quality.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Sets the sample rate in Hz.
    pub fn set_samplerate(&mut self, samplerate: u32) {
        self.samplerate = samplerate;
    }

    /// Sets the base key, where 48 maps to 440 Hz.
    pub fn set_base_key(&mut self, base_key: f64) {
        self.base_key = base_key;
    }

    /// Current base key.
    pub fn base_key(&self) -> f64 {
        self.base_key
    }

    /// Sets the pitch shift in cents.
    pub fn set_tuning(&mut self, tuning: f64) {
        self.tuning = tuning;
    }

    /// Current pitch shift in cents.
    pub fn tuning(&self) -> f64 {
        self.tuning
    }

    /// Enables or disables the vibrato LFO.
    pub fn set_vibrato_enabled(&mut self, enabled: bool) {
        self.vibrato_enabled = enabled;
    }

    /// Sets the vibrato gain applied on top of the LFO depth.
    pub fn set_vibrato_gain(&mut self, gain: f64) {
        self.vibrato_gain = gain;
    }

    /// Sets the vibrato LFO depth, in units of a semitone.
    pub fn set_vibrato_lfo_depth(&mut self, depth: f64) {
        self.vibrato_lfo_depth = depth;
    }

    /// Sets the vibrato LFO frequency in Hz.
    pub fn set_vibrato_lfo_freq(&mut self, freq: f64) {
        self.vibrato_lfo_freq = freq;
    }

    /// Sets the vibrato LFO position in frames.
    pub fn set_vibrato_lfo_offset(&mut self, offset: u64) {
        self.vibrato_lfo_offset = offset;
    }

    /// Current vibrato LFO position in frames.
    pub fn vibrato_lfo_offset(&self) -> u64 {
        self.vibrato_lfo_offset
    }

    /// Sets the phase accumulator from a source position in frames.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase_from_f64(phase);
    }

    /// Current accumulator position in frames.
    pub fn phase(&self) -> f64 {
        phase_index(self.phase) as f64
            + (self.phase & PHASE_FRACT_MASK) as f64 / 4_294_967_296.0
    }

    /// Clears the accumulator and LFO position for a new note.
    pub fn reset(&mut self) {
        self.phase = 0;
        self.vibrato_lfo_offset = 0;
    }

    /// Pitch-shifts `buffer` in place.
    ///
    /// The source is snapshotted first, so taps never read samples the same
    /// call already wrote. Frames the accumulator never reaches keep their
    /// original contents. Afterwards the integer index is re-anchored to the
    /// start of the next buffer.
    pub fn compute(&mut self, buffer: &mut [f64]) {
        if buffer.is_empty() {
            return;
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(buffer);

        let scratch = core::mem::take(&mut self.scratch);
        self.fill(buffer, &scratch);
        self.scratch = scratch;

        self.rebase(buffer.len());
    }

    /// Resamples `source` into `destination`, continuing from the current
    /// accumulator position.
    ///
    /// Stops early when the accumulator passes the last source sample and
    /// fills the remaining destination frames with silence. Either slice
    /// being empty is a silent no-op.
    pub fn compute_into(&mut self, destination: &mut [f64], source: &[f64]) {
        if destination.is_empty() || source.is_empty() {
            return;
        }

        let produced = self.fill(destination, source);

        destination[produced..].fill(0.0);
    }

    fn fill(&mut self, destination: &mut [f64], source: &[f64]) -> usize {
        if destination.is_empty() || source.is_empty() {
            return 0;
        }

        let end_index = source.len() - 1;
        let rate = f64::from(self.samplerate);

        // Without vibrato the increment is the same for every sample.
        let constant_increment = if self.vibrato_active() {
            None
        } else {
            Some(self.phase_increment_at(0, rate))
        };

        let mut produced = 0;

        while produced < destination.len() {
            let value = match self.interpolation {
                Interpolation::None => {
                    let index = phase_index(self.phase + (1 << 31));
                    if index > end_index {
                        break;
                    }

                    source[index]
                }
                Interpolation::Linear => {
                    let index = phase_index(self.phase);
                    if index > end_index {
                        break;
                    }

                    let row = &self.coeff_linear[phase_tablerow(self.phase)];

                    row[0] * source[index] + row[1] * source[(index + 1).min(end_index)]
                }
                Interpolation::FourthOrder => {
                    let index = phase_index(self.phase);
                    if index > end_index {
                        break;
                    }

                    let row = &self.coeff_fourth[phase_tablerow(self.phase)];

                    row[0] * source[clamp_tap(index, -1, end_index)]
                        + row[1] * source[index]
                        + row[2] * source[clamp_tap(index, 1, end_index)]
                        + row[3] * source[clamp_tap(index, 2, end_index)]
                }
                Interpolation::SeventhOrder => {
                    let index = phase_index(self.phase);
                    if index > end_index {
                        break;
                    }

                    let row = &self.coeff_seventh[phase_tablerow(self.phase)];

                    row[0] * source[clamp_tap(index, -3, end_index)]
                        + row[1] * source[clamp_tap(index, -2, end_index)]
                        + row[2] * source[clamp_tap(index, -1, end_index)]
                        + row[3] * source[index]
                        + row[4] * source[clamp_tap(index, 1, end_index)]
                        + row[5] * source[clamp_tap(index, 2, end_index)]
                        + row[6] * source[clamp_tap(index, 3, end_index)]
                }
            };

            destination[produced] = value;

            let increment = match constant_increment {
                Some(increment) => increment,
                None => self.phase_increment_at(produced, rate),
            };
            self.phase = self.phase.wrapping_add(increment);

            produced += 1;
        }

        self.vibrato_lfo_offset += destination.len() as u64;

        produced
    }

    fn vibrato_active(&self) -> bool {
        self.vibrato_enabled && self.vibrato_lfo_depth != 0.0
    }

    fn phase_increment_at(&self, i: usize, rate: f64) -> u64 {
        let cents = if self.vibrato_active() {
            let lfo = sin(
                (self.vibrato_lfo_offset + i as u64) as f64 * 2.0 * PI * self.vibrato_lfo_freq
                    / rate,
            );

            self.tuning + 100.0 * self.vibrato_gain * lfo * self.vibrato_lfo_depth
        } else {
            self.tuning
        };

        let speed = exp2((self.base_key - 48.0 + cents / 100.0) / 12.0)
            / exp2((self.base_key - 48.0) / 12.0);

        phase_from_f64(speed)
    }

    /// Re-anchors the integer index to the next buffer window, keeping the
    /// fraction and any whole-frame overshoot.
    fn rebase(&mut self, frames: usize) {
        let span = (frames as u64) << PHASE_INDEX_SHIFT;

        if self.phase >= span {
            self.phase -= span;
        } else {
            self.phase &= PHASE_FRACT_MASK;
        }
    }
}
