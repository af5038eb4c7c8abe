//! Control sequences: ordered mixer mutations from descriptor text.

use std::fmt;

/// Payload of a multi-value control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiValue {
    /// One raw number per value slot.
    Raw(Vec<i64>),
    /// A single percentage applied to every slot.
    Percent(i64),
}

/// Value written by one control mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    /// Percentage for integer/boolean elements, option index for enumerated ones.
    Int(i64),
    /// Enumerated option label.
    Str(String),
    Multi(MultiValue),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Multi(MultiValue::Percent(p)) => write!(f, "{}%", p),
            Self::Multi(MultiValue::Raw(values)) => {
                let parts: Vec<String> = values.iter().map(|v| format!("{:#x}", v)).collect();
                write!(f, "[{}]", parts.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMutation {
    pub control: String,
    pub value: ControlValue,
}

impl ControlMutation {
    pub fn new(control: impl Into<String>, value: ControlValue) -> Self {
        Self {
            control: control.into(),
            value,
        }
    }

    pub fn int(control: impl Into<String>, value: i64) -> Self {
        Self::new(control, ControlValue::Int(value))
    }

    pub fn select(control: impl Into<String>, option: impl Into<String>) -> Self {
        Self::new(control, ControlValue::Str(option.into()))
    }
}

/// Ordered list of mutations applied as one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSequence {
    mutations: Vec<ControlMutation>,
}

impl ControlSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: ControlMutation) {
        self.mutations.push(mutation);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ControlMutation> {
        self.mutations.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ControlMutation> {
        self.mutations.iter()
    }
}

impl FromIterator<ControlMutation> for ControlSequence {
    fn from_iter<I: IntoIterator<Item = ControlMutation>>(iter: I) -> Self {
        Self {
            mutations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ControlSequence {
    type Item = &'a ControlMutation;
    type IntoIter = std::slice::Iter<'a, ControlMutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}
