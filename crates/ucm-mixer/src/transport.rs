//! The mixer transport seam.

use crate::error::MixerResult;

/// Type of a hardware control element, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Boolean,
    Integer { min: i64, max: i64 },
    Enumerated { options: Vec<String> },
}

impl ControlKind {
    /// Scale a percentage into this control's value range.
    pub fn scale_percent(&self, percent: i64) -> i64 {
        let pct = percent.clamp(0, 100);
        match self {
            Self::Boolean => i64::from(pct != 0),
            Self::Integer { min, max } => min + (max - min) * pct / 100,
            Self::Enumerated { .. } => pct,
        }
    }
}

/// Static description of a control element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    pub kind: ControlKind,
    /// Number of value slots (channels) the element carries.
    pub count: usize,
}

/// Current value of a control element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlState {
    Values(Vec<i64>),
    Option(String),
}

/// Reads and writes named control elements on one sound card.
///
/// Elements are addressed by name at index 0.
pub trait MixerTransport: Send {
    fn control_info(&self, name: &str) -> MixerResult<ControlInfo>;

    fn read(&self, name: &str) -> MixerResult<ControlState>;

    /// Write raw values into the leading slots of an element.
    fn write_values(&mut self, name: &str, values: &[i64]) -> MixerResult<()>;

    /// Select an enumerated option by its label.
    fn select(&mut self, name: &str, option: &str) -> MixerResult<()>;

    /// Release the transport; called once when the card closes.
    fn close(&mut self) {}
}
