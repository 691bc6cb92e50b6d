//! Synth rack configuration applied onto a processor's ports.

use compas_core::{Interpolation, Waveform};
use compas_engine::{PortValue, SynthPorts};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Waveform selector as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WaveformConfig {
    /// Sine wave.
    #[default]
    Sine,
    /// Rising sawtooth.
    Sawtooth,
    /// Triangle wave.
    Triangle,
    /// Square wave.
    Square,
    /// Single-sample impulse train.
    Impulse,
}

impl WaveformConfig {
    /// The engine waveform this selects.
    pub fn waveform(self) -> Waveform {
        match self {
            WaveformConfig::Sine => Waveform::Sine,
            WaveformConfig::Sawtooth => Waveform::Sawtooth,
            WaveformConfig::Triangle => Waveform::Triangle,
            WaveformConfig::Square => Waveform::Square,
            WaveformConfig::Impulse => Waveform::Impulse,
        }
    }

    fn port_index(self) -> u64 {
        match self {
            WaveformConfig::Sine => 0,
            WaveformConfig::Sawtooth => 1,
            WaveformConfig::Triangle => 2,
            WaveformConfig::Square => 3,
            WaveformConfig::Impulse => 4,
        }
    }
}

/// Pitch interpolation selector as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationConfig {
    /// Nearest sample, no interpolation.
    None,
    /// Two-point linear.
    Linear,
    /// Four-point polynomial.
    #[default]
    FourthOrder,
    /// Seven-point polynomial.
    SeventhOrder,
}

impl InterpolationConfig {
    /// The engine interpolation this selects.
    pub fn interpolation(self) -> Interpolation {
        match self {
            InterpolationConfig::None => Interpolation::None,
            InterpolationConfig::Linear => Interpolation::Linear,
            InterpolationConfig::FourthOrder => Interpolation::FourthOrder,
            InterpolationConfig::SeventhOrder => Interpolation::SeventhOrder,
        }
    }

    fn port_index(self) -> u64 {
        match self {
            InterpolationConfig::None => 0,
            InterpolationConfig::Linear => 1,
            InterpolationConfig::FourthOrder => 2,
            InterpolationConfig::SeventhOrder => 3,
        }
    }
}

/// One oscillator of the three-voice rack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscillatorConfig {
    /// Waveform.
    pub waveform: WaveformConfig,
    /// Octave shift added to the note key.
    pub octave: f64,
    /// Semitone shift added to the note key.
    pub key: f64,
    /// Start phase in frames.
    pub phase: f64,
    /// Linear gain summed onto the voice.
    pub volume: f64,
    /// LFO waveform.
    pub lfo_waveform: WaveformConfig,
    /// LFO rate in Hz.
    pub lfo_frequency: f64,
    /// Frequency modulation depth.
    pub lfo_depth: f64,
    /// Detune in cents.
    pub tuning: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            waveform: WaveformConfig::Sine,
            octave: 0.0,
            key: 0.0,
            phase: 0.0,
            volume: 1.0,
            lfo_waveform: WaveformConfig::Sine,
            lfo_frequency: 6.0,
            lfo_depth: 0.0,
            tuning: 0.0,
        }
    }
}

/// Noise stage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    /// Noise gain; `0.0` keeps the stage out of the chain.
    pub gain: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { gain: 0.0 }
    }
}

/// Vibrato settings inside the pitch stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VibratoConfig {
    /// Enables vibrato.
    pub enabled: bool,
    /// Vibrato intensity.
    pub gain: f64,
    /// Vibrato LFO depth.
    pub lfo_depth: f64,
    /// Vibrato LFO rate in Hz.
    pub lfo_freq: f64,
}

impl Default for VibratoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gain: 1.0,
            lfo_depth: 1.0,
            lfo_freq: 8.172,
        }
    }
}

/// Pitch-shift stage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PitchConfig {
    /// Interpolation quality.
    pub interpolation: InterpolationConfig,
    /// Pitch shift in cents; `0.0` keeps the stage out of the chain.
    pub tuning: f64,
    /// Vibrato settings.
    pub vibrato: VibratoConfig,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationConfig::FourthOrder,
            tuning: 0.0,
            vibrato: VibratoConfig::default(),
        }
    }
}

/// One biquad filter stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Enables the stage.
    pub enabled: bool,
    /// Resonance as linear Q.
    pub q_lin: f64,
    /// Output gain.
    pub gain: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            q_lin: 1.0,
            gain: 1.0,
        }
    }
}

/// Chorus stage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChorusConfig {
    /// Enables the stage.
    pub enabled: bool,
    /// Chorus LFO waveform.
    pub lfo_waveform: WaveformConfig,
    /// Chorus LFO rate in Hz.
    pub lfo_frequency: f64,
    /// Detune depth; `0.0` keeps the stage out of the chain.
    pub depth: f64,
    /// Dry/wet balance.
    pub mix: f64,
    /// Delay amount.
    pub delay: f64,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lfo_waveform: WaveformConfig::Sine,
            lfo_frequency: 10.0,
            depth: 0.0,
            mix: 0.5,
            delay: 0.0,
        }
    }
}

/// The whole synth rack as stored in a config or song file.
///
/// [`apply`](Self::apply) writes every value onto a processor's ports, so
/// a loaded file fully determines the rack. At most three oscillators are
/// used; unlisted oscillators are muted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthConfig {
    /// Oscillators, first to third.
    pub oscillators: Vec<OscillatorConfig>,
    /// Noise stage.
    pub noise: NoiseConfig,
    /// Pitch-shift stage.
    pub pitch: PitchConfig,
    /// Low-pass filter stage.
    pub low_pass: FilterConfig,
    /// High-pass filter stage.
    pub high_pass: FilterConfig,
    /// Chorus stage.
    pub chorus: ChorusConfig,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            oscillators: vec![OscillatorConfig::default()],
            noise: NoiseConfig::default(),
            pitch: PitchConfig::default(),
            low_pass: FilterConfig::default(),
            high_pass: FilterConfig::default(),
            chorus: ChorusConfig::default(),
        }
    }
}

impl SynthConfig {
    /// Number of oscillator slots on the rack.
    pub const OSCILLATOR_SLOTS: usize = 3;

    /// Checks the rack against the processor's capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oscillators.len() > Self::OSCILLATOR_SLOTS {
            return Err(ConfigError::invalid_value(
                "synth.oscillators",
                self.oscillators.len(),
                "at most three oscillators are supported",
            ));
        }
        Ok(())
    }

    /// Writes every configured value onto `ports`.
    pub fn apply(&self, ports: &SynthPorts) {
        for (slot, ports) in ports.synth.iter().enumerate() {
            match self.oscillators.get(slot) {
                Some(osc) => {
                    ports
                        .oscillator
                        .safe_write(PortValue::U64(osc.waveform.port_index()));
                    ports.octave.safe_write(PortValue::F64(osc.octave));
                    ports.key.safe_write(PortValue::F64(osc.key));
                    ports.phase.safe_write(PortValue::F64(osc.phase));
                    ports.volume.safe_write(PortValue::F64(osc.volume));
                    ports
                        .lfo_oscillator
                        .safe_write(PortValue::U64(osc.lfo_waveform.port_index()));
                    ports
                        .lfo_frequency
                        .safe_write(PortValue::F64(osc.lfo_frequency));
                    ports.lfo_depth.safe_write(PortValue::F64(osc.lfo_depth));
                    ports.tuning.safe_write(PortValue::F64(osc.tuning));
                }
                None => {
                    ports.volume.safe_write(PortValue::F64(0.0));
                }
            }
        }

        ports.noise_gain.safe_write(PortValue::F64(self.noise.gain));

        ports
            .pitch_type
            .safe_write(PortValue::U64(self.pitch.interpolation.port_index()));
        ports
            .pitch_tuning
            .safe_write(PortValue::F64(self.pitch.tuning));
        ports
            .vibrato_enabled
            .safe_write(PortValue::Bool(self.pitch.vibrato.enabled));
        ports
            .vibrato_gain
            .safe_write(PortValue::F64(self.pitch.vibrato.gain));
        ports
            .vibrato_lfo_depth
            .safe_write(PortValue::F64(self.pitch.vibrato.lfo_depth));
        ports
            .vibrato_lfo_freq
            .safe_write(PortValue::F64(self.pitch.vibrato.lfo_freq));

        ports
            .low_pass_enabled
            .safe_write(PortValue::Bool(self.low_pass.enabled));
        ports
            .low_pass_q_lin
            .safe_write(PortValue::F64(self.low_pass.q_lin));
        ports
            .low_pass_filter_gain
            .safe_write(PortValue::F64(self.low_pass.gain));
        ports
            .high_pass_enabled
            .safe_write(PortValue::Bool(self.high_pass.enabled));
        ports
            .high_pass_q_lin
            .safe_write(PortValue::F64(self.high_pass.q_lin));
        ports
            .high_pass_filter_gain
            .safe_write(PortValue::F64(self.high_pass.gain));

        ports
            .chorus_enabled
            .safe_write(PortValue::Bool(self.chorus.enabled));
        ports
            .chorus_lfo_oscillator
            .safe_write(PortValue::U64(self.chorus.lfo_waveform.port_index()));
        ports
            .chorus_lfo_frequency
            .safe_write(PortValue::F64(self.chorus.lfo_frequency));
        ports
            .chorus_depth
            .safe_write(PortValue::F64(self.chorus.depth));
        ports.chorus_mix.safe_write(PortValue::F64(self.chorus.mix));
        ports
            .chorus_delay
            .safe_write(PortValue::F64(self.chorus.delay));
    }
}
