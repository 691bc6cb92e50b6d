//! Thread-safe control parameter cells.
//!
//! A [`Port`] is what the editor writes and the processor reads: a typed
//! value behind the port's own mutex. Readers copy the value out under the
//! lock and release it before touching anything else, so a port can be
//! written from a non-real-time thread while the processor snapshots it.

use std::sync::{Arc, Mutex};

/// Shared handle to a port.
pub type SharedPort = Arc<Port>;

/// A typed port payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PortValue {
    /// On/off switch.
    Bool(bool),
    /// Signed integer value.
    I64(i64),
    /// Unsigned integer value, used for selector ports.
    U64(u64),
    /// Single precision value.
    F32(f32),
    /// Double precision value.
    F64(f64),
    /// Vector of doubles, one slot per line.
    F64Vec(Vec<f64>),
}

impl PortValue {
    /// Boolean payload, if this is a switch port.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PortValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Selector payload as an index.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PortValue::U64(value) => Some(*value),
            PortValue::I64(value) if *value >= 0 => Some(*value as u64),
            _ => None,
        }
    }

    /// Continuous payload widened to double.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PortValue::F64(value) => Some(*value),
            PortValue::F32(value) => Some(f64::from(*value)),
            _ => None,
        }
    }
}

/// Linear mapping between a control surface range and the stored range.
///
/// Writes run the forward mapping, reads run the reverse, so a caller that
/// round-trips through the same port sees its own value back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearConversion {
    /// Value mapped from 0.0.
    pub lower: f64,
    /// Value mapped from 1.0.
    pub upper: f64,
}

impl LinearConversion {
    /// Converts `value` through the mapping; `reverse` undoes it.
    pub fn convert(&self, value: f64, reverse: bool) -> f64 {
        let span = self.upper - self.lower;
        if span == 0.0 {
            return if reverse { 0.0 } else { self.lower };
        }

        if reverse {
            (value - self.lower) / span
        } else {
            self.lower + value * span
        }
    }
}

/// A mutex-guarded control cell.
#[derive(Debug)]
pub struct Port {
    specifier: String,
    value: Mutex<PortValue>,
    conversion: Option<LinearConversion>,
}

impl Port {
    /// A port holding `value`, addressed by `specifier`.
    pub fn new(specifier: impl Into<String>, value: PortValue) -> Self {
        Self {
            specifier: specifier.into(),
            value: Mutex::new(value),
            conversion: None,
        }
    }

    /// A port whose float payloads pass through `conversion`.
    pub fn with_conversion(
        specifier: impl Into<String>,
        value: PortValue,
        conversion: LinearConversion,
    ) -> Self {
        Self {
            specifier: specifier.into(),
            value: Mutex::new(value),
            conversion: Some(conversion),
        }
    }

    /// The port's name.
    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// Copies the value out under the lock, reversing any conversion.
    pub fn safe_read(&self) -> PortValue {
        let value = self.value.lock().unwrap().clone();
        self.apply_conversion(value, true)
    }

    /// Replaces the value under the lock, applying any conversion first.
    pub fn safe_write(&self, value: PortValue) {
        let value = self.apply_conversion(value, false);
        *self.value.lock().unwrap() = value;
    }

    fn apply_conversion(&self, value: PortValue, reverse: bool) -> PortValue {
        let Some(conversion) = self.conversion else {
            return value;
        };

        match value {
            PortValue::F64(v) => PortValue::F64(conversion.convert(v, reverse)),
            PortValue::F32(v) => {
                PortValue::F32(conversion.convert(f64::from(v), reverse) as f32)
            }
            PortValue::F64Vec(v) => PortValue::F64Vec(
                v.into_iter()
                    .map(|element| conversion.convert(element, reverse))
                    .collect(),
            ),
            other => other,
        }
    }
}
