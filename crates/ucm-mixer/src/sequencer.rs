//! Control sequencer.
//!
//! Applies a `ControlSequence` mutation by mutation. Before each write the
//! element's current value is read into a journal, so a sequence that fails
//! at step N can be undone exactly: the journal holds the N-1 prior values
//! and restoring it rewrites them in reverse order.

use tracing::{debug, trace, warn};
use ucm_core::UcmError;

use crate::control::{ControlMutation, ControlSequence, ControlValue, MultiValue};
use crate::error::{MixerError, MixerResult};
use crate::transport::{ControlKind, ControlState, MixerTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub control: String,
    pub prior: ControlState,
}

/// Prior values of the elements a sequence has overwritten, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }
}

/// A sequence stopped at `index`; `journal` covers the steps before it.
#[derive(Debug)]
pub struct SequenceFailure {
    pub index: usize,
    pub control: String,
    pub source: MixerError,
    pub journal: Journal,
}

impl SequenceFailure {
    /// Surface the failure as a routing error for the named descriptor.
    pub fn into_error(self, descriptor: &str) -> UcmError {
        UcmError::ControlWrite {
            descriptor: descriptor.to_string(),
            control: self.control,
            index: self.index,
            reason: self.source.to_string(),
        }
    }
}

/// Writes control sequences through a borrowed transport.
pub struct Sequencer<'a> {
    transport: &'a mut dyn MixerTransport,
}

impl<'a> Sequencer<'a> {
    pub fn new(transport: &'a mut dyn MixerTransport) -> Self {
        Self { transport }
    }

    /// Apply every mutation in order, stopping at the first failure.
    pub fn apply(&mut self, sequence: &ControlSequence) -> Result<Journal, SequenceFailure> {
        let mut journal = Journal::default();
        for (index, mutation) in sequence.iter().enumerate() {
            let step = self
                .transport
                .read(&mutation.control)
                .and_then(|prior| self.write(mutation).map(|()| prior));
            match step {
                Ok(prior) => journal.entries.push(JournalEntry {
                    control: mutation.control.clone(),
                    prior,
                }),
                Err(source) => {
                    debug!(index, control = %mutation.control, error = %source, "sequence stopped");
                    return Err(SequenceFailure {
                        index,
                        control: mutation.control.clone(),
                        source,
                        journal,
                    });
                }
            }
        }
        Ok(journal)
    }

    /// Apply every mutation, logging and skipping the ones that fail.
    ///
    /// Returns the number of failed mutations.
    pub fn apply_best_effort(&mut self, sequence: &ControlSequence) -> usize {
        let mut failures = 0;
        for mutation in sequence {
            if let Err(e) = self.write(mutation) {
                warn!(control = %mutation.control, error = %e, "control write failed during teardown");
                failures += 1;
            }
        }
        failures
    }

    /// Rewrite journaled values in reverse order. Returns the number of
    /// entries that could not be restored.
    pub fn restore(&mut self, journal: Journal) -> usize {
        let mut failures = 0;
        for entry in journal.entries.into_iter().rev() {
            let result = match &entry.prior {
                ControlState::Values(values) => self.transport.write_values(&entry.control, values),
                ControlState::Option(option) => self.transport.select(&entry.control, option),
            };
            if let Err(e) = result {
                warn!(control = %entry.control, error = %e, "could not restore control");
                failures += 1;
            }
        }
        failures
    }

    fn write(&mut self, mutation: &ControlMutation) -> MixerResult<()> {
        let name = mutation.control.as_str();
        trace!(control = name, value = %mutation.value, "write");
        match &mutation.value {
            ControlValue::Str(option) => self.transport.select(name, option),
            ControlValue::Int(value) => {
                let info = self.transport.control_info(name)?;
                if let ControlKind::Enumerated { options } = &info.kind {
                    let option = usize::try_from(*value)
                        .ok()
                        .and_then(|i| options.get(i))
                        .ok_or_else(|| MixerError::InvalidValue {
                            control: name.to_string(),
                            detail: format!("option index {} out of range", value),
                        })?;
                    return self.transport.select(name, option);
                }
                let scaled = info.kind.scale_percent(*value);
                self.transport.write_values(name, &vec![scaled; info.count.max(1)])
            }
            ControlValue::Multi(MultiValue::Percent(percent)) => {
                let info = self.transport.control_info(name)?;
                let scaled = info.kind.scale_percent(*percent);
                self.transport.write_values(name, &vec![scaled; info.count.max(1)])
            }
            ControlValue::Multi(MultiValue::Raw(values)) => self.transport.write_values(name, values),
        }
    }
}
