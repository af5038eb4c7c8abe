//! Catalog data model.
//!
//! Names are resolved to typed ids while the catalog is built; combined
//! descriptors are keyed by `(Scope, DeviceId)` so routing never splits or
//! concatenates names.

use std::collections::HashMap;

use ucm_core::{is_voice_call, Capability, UseCaseClass};
use ucm_mixer::ControlSequence;

use crate::loader::CardInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerbId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(pub(crate) usize);

/// Owner of a bare sequence and of combined descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Verb,
    Modifier(ModifierId),
}

/// One parsed section: control sequences plus optional metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub enable: ControlSequence,
    pub disable: ControlSequence,
    pub playback_pcm: Option<String>,
    pub capture_pcm: Option<String>,
    pub acdb_id: Option<i32>,
    pub capability: Capability,
    pub effects_mixer_ctl: Option<String>,
}

impl Descriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A verb's own descriptor or a modifier, with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseCase {
    pub descriptor: Descriptor,
    pub class: UseCaseClass,
    pub voice_call: bool,
}

impl UseCase {
    pub fn new(descriptor: Descriptor) -> Self {
        let class = UseCaseClass::classify(&descriptor.name);
        let voice_call = is_voice_call(&descriptor.name);
        Self {
            descriptor,
            class,
            voice_call,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// A top-level scenario with its own device and modifier tables.
#[derive(Debug, Clone)]
pub struct Verb {
    pub(crate) use_case: UseCase,
    pub(crate) devices: Vec<Descriptor>,
    pub(crate) modifiers: Vec<UseCase>,
    pub(crate) combined: HashMap<(Scope, DeviceId), Descriptor>,
    /// Sections that are neither the verb, a device, a modifier nor a
    /// decomposable combination; reachable by name only.
    pub(crate) auxiliary: Vec<Descriptor>,
}

impl Verb {
    pub fn name(&self) -> &str {
        self.use_case.name()
    }

    pub fn use_case(&self) -> &UseCase {
        &self.use_case
    }

    pub fn device_id(&self, name: &str) -> Option<DeviceId> {
        self.devices.iter().position(|d| d.name == name).map(DeviceId)
    }

    pub fn device(&self, id: DeviceId) -> &Descriptor {
        &self.devices[id.0]
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Descriptor)> {
        self.devices.iter().enumerate().map(|(i, d)| (DeviceId(i), d))
    }

    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    pub fn modifier_id(&self, name: &str) -> Option<ModifierId> {
        self.modifiers.iter().position(|m| m.name() == name).map(ModifierId)
    }

    pub fn modifier(&self, id: ModifierId) -> &UseCase {
        &self.modifiers[id.0]
    }

    pub fn modifier_names(&self) -> Vec<String> {
        self.modifiers.iter().map(|m| m.name().to_string()).collect()
    }

    /// The verb itself or one of its modifiers.
    pub fn scope(&self, scope: Scope) -> &UseCase {
        match scope {
            Scope::Verb => &self.use_case,
            Scope::Modifier(id) => self.modifier(id),
        }
    }

    /// Resolve a verb or modifier name to its scope.
    pub fn scope_named(&self, name: &str) -> Option<Scope> {
        if name == self.name() {
            Some(Scope::Verb)
        } else {
            self.modifier_id(name).map(Scope::Modifier)
        }
    }

    pub fn combined(&self, scope: Scope, device: DeviceId) -> Option<&Descriptor> {
        self.combined.get(&(scope, device))
    }

    /// Any descriptor of this verb by its section name.
    pub fn descriptor_named(&self, name: &str) -> Option<&Descriptor> {
        if name == self.name() {
            return Some(&self.use_case.descriptor);
        }
        self.modifiers
            .iter()
            .map(|m| &m.descriptor)
            .chain(self.devices.iter())
            .chain(self.combined.values())
            .chain(self.auxiliary.iter())
            .find(|d| d.name == name)
    }
}

/// Every verb known for one card.
///
/// The primary verb is always `VerbId(0)`; a catalog completed by the
/// background parser extends the primary catalog, so ids stay valid.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub(crate) card: CardInfo,
    pub(crate) verbs: Vec<Verb>,
}

impl Catalog {
    pub fn card(&self) -> &CardInfo {
        &self.card
    }

    pub fn verb_id(&self, name: &str) -> Option<VerbId> {
        self.verbs.iter().position(|v| v.name() == name).map(VerbId)
    }

    pub fn verb(&self, id: VerbId) -> &Verb {
        &self.verbs[id.0]
    }

    pub fn verbs(&self) -> impl Iterator<Item = (VerbId, &Verb)> {
        self.verbs.iter().enumerate().map(|(i, v)| (VerbId(i), v))
    }

    pub fn verb_names(&self) -> Vec<String> {
        self.verbs.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    pub fn primary(&self) -> Option<VerbId> {
        if self.verbs.is_empty() {
            None
        } else {
            Some(VerbId(0))
        }
    }
}
