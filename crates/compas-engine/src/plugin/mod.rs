//! Instrument plugin adapter.
//!
//! Safe traits mirroring the LADSPA/DSSI descriptor shape, plus a host that
//! runs instances as notation voices. The mapping to the native API:
//!
//! | Here | LADSPA/DSSI |
//! |------|-------------|
//! | [`PortDescriptor`] | `LADSPA_PortDescriptor` |
//! | [`PortHint`] | `LADSPA_PortRangeHint` |
//! | [`PluginInstance::connect_control_port`] | `connect_port()` |
//! | [`PluginInstance::run_synth`] | `run_synth()` |
//! | [`PluginInstance::select_program`] | `select_program()` |
//!
//! No dynamic loading happens here. Implementations are ordinary Rust types
//! and [`PluginHost`] drives them one buffer at a time.

mod host;

pub use host::{ControlBinding, PluginHost, VoiceMode};

use std::sync::{Arc, Mutex};

/// Port classification flags.
///
/// Combine direction and kind the way the native descriptors do: an audio
/// input is `AUDIO | INPUT`, a parameter is `CONTROL | INPUT`.
///
/// # Example
///
/// ```rust
/// use compas_engine::plugin::PortDescriptor;
///
/// let port = PortDescriptor::CONTROL.union(PortDescriptor::INPUT);
/// assert!(port.contains(PortDescriptor::CONTROL));
/// assert!(!port.contains(PortDescriptor::AUDIO));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortDescriptor(u32);

impl PortDescriptor {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Data flows into the plugin.
    pub const INPUT: Self = Self(1 << 0);
    /// Data flows out of the plugin.
    pub const OUTPUT: Self = Self(1 << 1);
    /// Single value read once per block.
    pub const CONTROL: Self = Self(1 << 2);
    /// Audio-rate sample buffer.
    pub const AUDIO: Self = Self(1 << 3);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Declared value range of a control port.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortHint {
    /// Lower bound, when the plugin declares one.
    pub lower: Option<f32>,
    /// Upper bound, when the plugin declares one.
    pub upper: Option<f32>,
    /// Value the host writes before the first run.
    pub default: Option<f32>,
}

impl PortHint {
    /// A fully specified hint.
    pub fn bounded(lower: f32, upper: f32, default: f32) -> Self {
        PortHint {
            lower: Some(lower),
            upper: Some(upper),
            default: Some(default),
        }
    }

    /// Clamps `value` into the declared range.
    pub fn constrain(&self, value: f32) -> f32 {
        let mut value = value;

        if let Some(lower) = self.lower {
            value = value.max(lower);
        }

        if let Some(upper) = self.upper {
            value = value.min(upper);
        }

        value
    }
}

/// Note events handed to [`PluginInstance::run_synth`].
///
/// Events apply at the start of the block; sub-buffer timing is not carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Key pressed.
    NoteOn {
        /// MIDI note number.
        key: u32,
        /// Velocity, `0..=127`.
        velocity: u32,
    },
    /// Key released.
    NoteOff {
        /// MIDI note number.
        key: u32,
    },
}

impl MidiEvent {
    /// The note the event addresses.
    pub fn key(&self) -> u32 {
        match *self {
            MidiEvent::NoteOn { key, .. } | MidiEvent::NoteOff { key } => key,
        }
    }
}

/// Shared cell connecting one control port to the host.
///
/// The host writes its per-period control snapshot into the cell; the
/// instance reads it during [`run`](PluginInstance::run). Cloning shares
/// the underlying value.
#[derive(Debug, Clone, Default)]
pub struct ControlValue(Arc<Mutex<f32>>);

impl ControlValue {
    /// A cell starting at `value`.
    pub fn new(value: f32) -> Self {
        ControlValue(Arc::new(Mutex::new(value)))
    }

    /// Current value.
    pub fn get(&self) -> f32 {
        *self.0.lock().unwrap()
    }

    /// Replaces the value.
    pub fn set(&self, value: f32) {
        *self.0.lock().unwrap() = value;
    }
}

/// Static description of a plugin: identity, port layout, instantiation.
pub trait PluginDescriptor: Send + Sync {
    /// Human-readable plugin name.
    fn name(&self) -> &str;

    /// Number of ports.
    fn port_count(&self) -> usize;

    /// Classification of one port.
    fn port_descriptor(&self, index: usize) -> PortDescriptor;

    /// Label of one port.
    fn port_name(&self, index: usize) -> &str;

    /// Value range of one port. The default covers plugins without hints.
    fn port_hint(&self, _index: usize) -> PortHint {
        PortHint::default()
    }

    /// Creates one runnable instance at the given sample rate.
    ///
    /// Returns `None` when the plugin cannot run at that rate.
    fn instantiate(&self, samplerate: u32) -> Option<Box<dyn PluginInstance>>;
}

/// One runnable plugin voice.
pub trait PluginInstance: Send {
    /// Connects a control port and returns its value cell.
    fn connect_control_port(&mut self, index: usize) -> ControlValue;

    /// Called once after instantiation, before the first run.
    fn activate(&mut self) {}

    /// Called before the host drops the instance.
    fn deactivate(&mut self) {}

    /// Renders one block. Output slices arrive zeroed.
    fn run(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize);

    /// Renders one block with note events applying at frame zero.
    ///
    /// Effects without note handling keep the default, which drops the
    /// events and delegates to [`run`](Self::run).
    fn run_synth(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: usize,
        _events: &[MidiEvent],
    ) {
        self.run(inputs, outputs, frames);
    }

    /// Switches to a factory program. The default ignores the request.
    fn select_program(&mut self, _bank: u32, _program: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_flags_combine() {
        let port = PortDescriptor::AUDIO.union(PortDescriptor::OUTPUT);

        assert!(port.contains(PortDescriptor::AUDIO));
        assert!(port.contains(PortDescriptor::OUTPUT));
        assert!(!port.contains(PortDescriptor::CONTROL));
        assert!(PortDescriptor::NONE.contains(PortDescriptor::NONE));
    }

    #[test]
    fn hint_constrains_to_bounds() {
        let hint = PortHint::bounded(0.0, 1.0, 0.5);

        assert_eq!(hint.constrain(-2.0), 0.0);
        assert_eq!(hint.constrain(0.25), 0.25);
        assert_eq!(hint.constrain(7.0), 1.0);

        // Unhinted ports pass values through.
        assert_eq!(PortHint::default().constrain(7.0), 7.0);
    }

    #[test]
    fn control_value_is_shared() {
        let cell = ControlValue::new(0.25);
        let clone = cell.clone();

        clone.set(0.75);

        assert_eq!(cell.get(), 0.75);
    }
}
