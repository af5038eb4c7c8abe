//! Enabled-identifier bookkeeping.

use serde::Serialize;
use ucm_core::{Capability, Result, UcmError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    /// Hardware has been switched on. An entry is present but inactive only
    /// while its own enable sequence is running.
    pub active: bool,
    pub capability: Capability,
}

/// Ordered list of enabled devices or modifiers, in enable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierList {
    entries: Vec<Entry>,
}

impl IdentifierList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an inactive entry. Duplicates are rejected.
    pub fn append(&mut self, name: &str, capability: Capability) -> Result<()> {
        if self.contains(name) {
            return Err(UcmError::State(format!("\"{}\" is already listed", name)));
        }
        self.entries.push(Entry {
            name: name.to_string(),
            active: false,
            capability,
        });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Entry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| UcmError::NotFound(name.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Active flag; false for names not in the list.
    pub fn status(&self, name: &str) -> bool {
        self.get(name).map(|e| e.active).unwrap_or(false)
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| UcmError::NotFound(name.to_string()))?;
        entry.active = active;
        Ok(())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
