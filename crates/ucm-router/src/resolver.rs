//! Use-case resolver.
//!
//! `CardState` is the mutable half of a card: current verb, enabled devices
//! and modifiers, the mixer transport and the calibration coupler. Every
//! method runs under the card lock held by `CardManager`.
//!
//! A device takes part in the verb scope and in every enabled modifier
//! scope. For each (scope, device) pair the combined descriptor is applied
//! when the catalog has one; otherwise the scope's bare sequence is used,
//! reference counted so it is applied for the first such device and undone
//! after the last one leaves.
//!
//! Enables run inside a `Transaction`: on failure the partial step is
//! restored from the sequencer journal, completed steps are undone through
//! their disable sequences and the bookkeeping snapshot is put back.
//! Disables are best-effort.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};
use ucm_catalog::{Catalog, CatalogHandle, Descriptor, Scope, Verb, VerbId};
use ucm_core::{Capability, Result, UcmError, VERB_INACTIVE};
use ucm_mixer::{ControlSequence, MixerTransport, Sequencer};

use crate::calibration::CalibrationCoupler;
use crate::state::IdentifierList;

/// Bookkeeping restored wholesale when an enable is rolled back.
#[derive(Debug, Clone, Default)]
struct Routing {
    verb: Option<VerbId>,
    devices: IdentifierList,
    modifiers: IdentifierList,
    /// Devices currently relying on each scope's bare sequence.
    bare_users: HashMap<Scope, BTreeSet<String>>,
}

/// Disable sequences of the steps an enable call has completed.
#[derive(Default)]
struct Transaction {
    undo: Vec<(String, ControlSequence)>,
}

/// Verb whose device table names are checked against.
pub(crate) fn routing_verb(catalog: &Catalog, current: Option<VerbId>) -> Result<&Verb> {
    current
        .or_else(|| catalog.primary())
        .map(|id| catalog.verb(id))
        .ok_or_else(|| UcmError::State(format!("card {} has no verbs", catalog.card().name)))
}

fn active_verb(catalog: &Catalog, current: Option<VerbId>) -> Result<&Verb> {
    current
        .map(|id| catalog.verb(id))
        .ok_or_else(|| UcmError::State("no verb is active".into()))
}

/// Device descriptor by name, preferring the given verb's table.
fn find_device<'c>(catalog: &'c Catalog, preferred: Option<VerbId>, name: &str) -> Option<&'c Descriptor> {
    let lookup = |verb: &'c Verb| verb.device_id(name).map(|id| verb.device(id));
    preferred
        .or_else(|| catalog.primary())
        .and_then(|id| lookup(catalog.verb(id)))
        .or_else(|| catalog.verbs().find_map(|(_, verb)| lookup(verb)))
}

pub(crate) struct CardState {
    catalog: Arc<CatalogHandle>,
    transport: Box<dyn MixerTransport>,
    calibration: CalibrationCoupler,
    routing: Routing,
    closed: bool,
}

impl CardState {
    pub(crate) fn new(
        catalog: Arc<CatalogHandle>,
        transport: Box<dyn MixerTransport>,
        calibration: CalibrationCoupler,
    ) -> Self {
        Self {
            catalog,
            transport,
            calibration,
            routing: Routing::default(),
            closed: false,
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(UcmError::State(format!("card {} is closed", self.catalog.card().name)));
        }
        Ok(())
    }

    pub(crate) fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    pub(crate) fn verb_id(&self) -> Option<VerbId> {
        self.routing.verb
    }

    pub(crate) fn verb_name(&self) -> String {
        match self.routing.verb {
            Some(id) => self.catalog.current().verb(id).name().to_string(),
            None => VERB_INACTIVE.to_string(),
        }
    }

    pub(crate) fn devices(&self) -> &IdentifierList {
        &self.routing.devices
    }

    pub(crate) fn modifiers(&self) -> &IdentifierList {
        &self.routing.modifiers
    }

    pub(crate) fn calibration(&self) -> &CalibrationCoupler {
        &self.calibration
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    // --- Verb ---

    pub(crate) fn set_verb(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        let target = if name == VERB_INACTIVE {
            None
        } else {
            Some(catalog.find_verb(name)?.1)
        };
        if target == self.routing.verb {
            debug!(verb = name, "verb already current");
            return Ok(());
        }

        let previous = self.verb_name();
        let snapshot = self.routing.clone();
        if let Some(old) = self.routing.verb {
            self.teardown_verb(catalog.current().verb(old));
        }
        self.routing.verb = target;

        if let Some(new) = target {
            let verb = catalog.current().verb(new);
            let mut tx = Transaction::default();
            if let Err(e) = self.attach_verb(&mut tx, verb) {
                warn!(verb = name, error = %e, "verb change failed, restoring {}", previous);
                self.rollback(tx, snapshot);
                if let Some(old) = self.routing.verb {
                    self.reattach(catalog.current().verb(old));
                }
                self.sync_calibration(None);
                return Err(e);
            }
        }

        info!(card = %catalog.card().name, from = %previous, to = name, "verb changed");
        self.sync_calibration(None);
        Ok(())
    }

    /// Modifier scopes first (reverse order), then the verb scope. The
    /// modifier list itself survives; the next verb picks it up again.
    fn teardown_verb(&mut self, verb: &Verb) {
        for scope in self.modifier_scopes(verb).into_iter().rev() {
            self.detach_all(verb, scope);
        }
        self.detach_all(verb, Scope::Verb);
        self.routing.bare_users.clear();
    }

    /// Verb scope, then every listed modifier the verb knows about.
    fn attach_verb(&mut self, tx: &mut Transaction, verb: &Verb) -> Result<()> {
        self.attach_all(tx, verb, Scope::Verb)?;
        for scope in self.modifier_scopes(verb) {
            self.attach_all(tx, verb, scope)?;
        }
        Ok(())
    }

    /// Scopes of the enabled modifiers present in `verb`, in enable order.
    fn modifier_scopes(&self, verb: &Verb) -> Vec<Scope> {
        self.routing
            .modifiers
            .iter()
            .filter_map(|m| verb.modifier_id(&m.name))
            .map(Scope::Modifier)
            .collect()
    }

    /// Re-apply a verb's scopes after a failed verb change. The bookkeeping
    /// is already back in place; only the hardware needs it again.
    fn reattach(&mut self, verb: &Verb) {
        let mut scopes = vec![Scope::Verb];
        scopes.extend(self.modifier_scopes(verb));
        let devices: Vec<(String, Capability)> = self
            .routing
            .devices
            .iter()
            .filter(|e| e.active)
            .map(|e| (e.name.clone(), e.capability))
            .collect();

        for scope in scopes {
            let use_case = verb.scope(scope);
            for (name, caps) in &devices {
                if !use_case.class.accepts(*caps) {
                    continue;
                }
                if let Some(combined) = verb.device_id(name).and_then(|id| verb.combined(scope, id)) {
                    self.reapply(combined);
                }
            }
            let bare_in_use = self
                .routing
                .bare_users
                .get(&scope)
                .map(|users| !users.is_empty())
                .unwrap_or(false);
            if bare_in_use {
                self.reapply(&use_case.descriptor);
            }
        }
    }

    // --- Devices ---

    pub(crate) fn enable_device(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        if self.enable_device_inner(name)? {
            self.sync_calibration(Some(name));
        }
        Ok(())
    }

    /// Returns false when the device was already enabled.
    fn enable_device_inner(&mut self, name: &str) -> Result<bool> {
        let catalog = Arc::clone(&self.catalog);
        let verb = routing_verb(catalog.current(), self.routing.verb)?;
        let device = verb
            .device_id(name)
            .map(|id| verb.device(id))
            .ok_or_else(|| UcmError::UnknownDevice(name.to_string()))?;
        if self.routing.devices.contains(name) {
            debug!(device = name, "device already enabled");
            return Ok(false);
        }

        let snapshot = self.routing.clone();
        let mut tx = Transaction::default();
        if let Err(e) = self.attach_device(&mut tx, verb, device) {
            self.rollback(tx, snapshot);
            return Err(e);
        }
        info!(device = name, capability = %device.capability, "device enabled");
        Ok(true)
    }

    /// Own enable first, then the verb scope, then each enabled modifier.
    fn attach_device(&mut self, tx: &mut Transaction, verb: &Verb, device: &Descriptor) -> Result<()> {
        let name = device.name.as_str();
        let caps = device.capability;
        self.routing.devices.append(name, caps)?;
        self.enable_step(tx, device)?;
        self.routing.devices.set_active(name, true)?;

        if self.routing.verb.is_some() {
            self.attach(tx, verb, Scope::Verb, name, caps)?;
            for modifier in self.routing.modifiers.names() {
                if let Some(id) = verb.modifier_id(&modifier) {
                    self.attach(tx, verb, Scope::Modifier(id), name, caps)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn disable_device(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        let verb = routing_verb(catalog.current(), self.routing.verb)?;
        if !self.routing.devices.contains(name) {
            return Err(UcmError::State(format!("device \"{}\" is not enabled", name)));
        }
        if self.is_load_bearing(verb, name) {
            info!(device = name, "device carries the active voice call, left enabled");
            return Ok(());
        }
        self.detach_device(catalog.current(), verb, name);
        info!(device = name, "device disabled");
        self.sync_calibration(None);
        Ok(())
    }

    /// Scope teardown (modifiers in reverse, then the verb) strictly before
    /// the device's own disable.
    fn detach_device(&mut self, catalog: &Catalog, verb: &Verb, name: &str) {
        let Some(entry) = self.routing.devices.get(name).cloned() else {
            return;
        };
        if entry.active && self.routing.verb.is_some() {
            let modifiers = self.routing.modifiers.names();
            for modifier in modifiers.iter().rev() {
                if let Some(id) = verb.modifier_id(modifier) {
                    self.detach(verb, Scope::Modifier(id), name, entry.capability);
                }
            }
            self.detach(verb, Scope::Verb, name, entry.capability);
        }
        match find_device(catalog, self.routing.verb, name) {
            Some(device) => self.disable_step(device),
            None => warn!(device = name, "no descriptor for enabled device"),
        }
        if let Err(e) = self.routing.devices.remove(name) {
            warn!(device = name, error = %e, "device vanished from enabled list");
        }
    }

    pub(crate) fn switch_device(&mut self, old: &str, new: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        let verb = routing_verb(catalog.current(), self.routing.verb)?;
        if verb.device_id(new).is_none() {
            return Err(UcmError::UnknownDevice(new.to_string()));
        }
        if old == new {
            return self.enable_device(new);
        }

        let had_old = self.routing.devices.contains(old);
        if had_old {
            self.detach_device(catalog.current(), verb, old);
        }
        if let Err(e) = self.enable_device_inner(new) {
            if had_old {
                if let Err(restore) = self.enable_device_inner(old) {
                    warn!(device = old, error = %restore, "could not restore device after failed switch");
                }
            }
            self.sync_calibration(None);
            return Err(e);
        }
        info!(from = old, to = new, "device switched");
        self.sync_calibration(Some(new));
        Ok(())
    }

    /// A voice call is up and no other enabled device carries this one's
    /// direction.
    fn is_load_bearing(&self, verb: &Verb, name: &str) -> bool {
        if self.routing.verb.is_none() || self.voice_scope(verb).is_none() {
            return false;
        }
        let Some(entry) = self.routing.devices.get(name) else {
            return false;
        };
        [Capability::RX, Capability::TX].into_iter().any(|dir| {
            entry.capability.contains(dir)
                && !self
                    .routing
                    .devices
                    .iter()
                    .any(|other| other.name != name && other.active && other.capability.contains(dir))
        })
    }

    // --- Modifiers ---

    pub(crate) fn enable_modifier(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        if self.enable_modifier_inner(name)? {
            self.sync_calibration(None);
        }
        Ok(())
    }

    fn enable_modifier_inner(&mut self, name: &str) -> Result<bool> {
        let catalog = Arc::clone(&self.catalog);
        let verb = active_verb(catalog.current(), self.routing.verb)?;
        let id = verb
            .modifier_id(name)
            .ok_or_else(|| UcmError::UnknownModifier(name.to_string()))?;
        if self.routing.modifiers.contains(name) {
            debug!(modifier = name, "modifier already enabled");
            return Ok(false);
        }

        let snapshot = self.routing.clone();
        let mut tx = Transaction::default();
        let modifier = verb.modifier(id);
        let result = self
            .routing
            .modifiers
            .append(name, modifier.descriptor.capability)
            .and_then(|()| self.attach_all(&mut tx, verb, Scope::Modifier(id)))
            .and_then(|()| self.routing.modifiers.set_active(name, true));
        if let Err(e) = result {
            self.rollback(tx, snapshot);
            return Err(e);
        }
        info!(modifier = name, verb = verb.name(), "modifier enabled");
        Ok(true)
    }

    /// A modifier carried over from an earlier verb can be dropped while
    /// the card is inactive; there is no scope to tear down then.
    pub(crate) fn disable_modifier(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        if !self.routing.modifiers.contains(name) {
            return Err(UcmError::State(format!("modifier \"{}\" is not enabled", name)));
        }
        let verb = self.routing.verb.map(|id| catalog.current().verb(id));
        self.detach_modifier(verb, name);
        info!(modifier = name, "modifier disabled");
        self.sync_calibration(None);
        Ok(())
    }

    fn detach_modifier(&mut self, verb: Option<&Verb>, name: &str) {
        if let Some((verb, id)) = verb.and_then(|v| v.modifier_id(name).map(|id| (v, id))) {
            self.detach_all(verb, Scope::Modifier(id));
            self.routing.bare_users.remove(&Scope::Modifier(id));
        }
        if let Err(e) = self.routing.modifiers.remove(name) {
            warn!(modifier = name, error = %e, "modifier vanished from enabled list");
        }
    }

    pub(crate) fn switch_modifier(&mut self, old: &str, new: &str) -> Result<()> {
        self.ensure_open()?;
        let catalog = Arc::clone(&self.catalog);
        let verb = active_verb(catalog.current(), self.routing.verb)?;
        if verb.modifier_id(new).is_none() {
            return Err(UcmError::UnknownModifier(new.to_string()));
        }
        if old == new {
            return self.enable_modifier(new);
        }

        let had_old = self.routing.modifiers.contains(old);
        if had_old {
            self.detach_modifier(Some(verb), old);
        }
        if let Err(e) = self.enable_modifier_inner(new) {
            if had_old {
                if let Err(restore) = self.enable_modifier_inner(old) {
                    warn!(modifier = old, error = %restore, "could not restore modifier after failed switch");
                }
            }
            self.sync_calibration(None);
            return Err(e);
        }
        info!(from = old, to = new, "modifier switched");
        self.sync_calibration(None);
        Ok(())
    }

    // --- Reset / close ---

    pub(crate) fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.teardown();
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.teardown();
        self.transport.close();
        self.closed = true;
        info!(card = %self.catalog.card().name, "card closed");
        Ok(())
    }

    /// Modifiers, then the verb, then every device in reverse enable order.
    fn teardown(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        let current = catalog.current();
        let verb = self.routing.verb;
        if let Some(id) = verb {
            self.teardown_verb(current.verb(id));
        }
        for name in self.routing.devices.names().iter().rev() {
            match find_device(current, verb, name) {
                Some(device) => self.disable_step(device),
                None => warn!(device = %name, "no descriptor for enabled device"),
            }
        }
        self.routing = Routing::default();
        self.calibration.reset();
        info!(card = %current.card().name, "card reset");
    }

    // --- Scope plumbing ---

    fn attach_all(&mut self, tx: &mut Transaction, verb: &Verb, scope: Scope) -> Result<()> {
        let devices: Vec<(String, Capability)> = self
            .routing
            .devices
            .iter()
            .filter(|e| e.active)
            .map(|e| (e.name.clone(), e.capability))
            .collect();
        for (name, caps) in devices {
            self.attach(tx, verb, scope, &name, caps)?;
        }
        Ok(())
    }

    fn detach_all(&mut self, verb: &Verb, scope: Scope) {
        let devices: Vec<(String, Capability)> = self
            .routing
            .devices
            .iter()
            .filter(|e| e.active)
            .map(|e| (e.name.clone(), e.capability))
            .collect();
        for (name, caps) in devices.iter().rev() {
            self.detach(verb, scope, name, *caps);
        }
    }

    fn attach(
        &mut self,
        tx: &mut Transaction,
        verb: &Verb,
        scope: Scope,
        device: &str,
        caps: Capability,
    ) -> Result<()> {
        let use_case = verb.scope(scope);
        if !use_case.class.accepts(caps) {
            return Ok(());
        }
        if let Some(combined) = verb.device_id(device).and_then(|id| verb.combined(scope, id)) {
            return self.enable_step(tx, combined);
        }
        let users = self.routing.bare_users.entry(scope).or_default();
        let first = users.is_empty();
        users.insert(device.to_string());
        if first {
            self.enable_step(tx, &use_case.descriptor)?;
        }
        Ok(())
    }

    fn detach(&mut self, verb: &Verb, scope: Scope, device: &str, caps: Capability) {
        let use_case = verb.scope(scope);
        if !use_case.class.accepts(caps) {
            return;
        }
        if let Some(combined) = verb.device_id(device).and_then(|id| verb.combined(scope, id)) {
            self.disable_step(combined);
            return;
        }
        let Some(users) = self.routing.bare_users.get_mut(&scope) else {
            return;
        };
        if users.remove(device) && users.is_empty() {
            self.routing.bare_users.remove(&scope);
            self.disable_step(&use_case.descriptor);
        }
    }

    // --- Sequencing ---

    fn enable_step(&mut self, tx: &mut Transaction, descriptor: &Descriptor) -> Result<()> {
        debug!(descriptor = %descriptor.name, steps = descriptor.enable.len(), "enable sequence");
        let mut sequencer = Sequencer::new(self.transport.as_mut());
        match sequencer.apply(&descriptor.enable) {
            Ok(_) => {
                tx.undo.push((descriptor.name.clone(), descriptor.disable.clone()));
                Ok(())
            }
            Err(mut failure) => {
                let journal = std::mem::take(&mut failure.journal);
                let restored = journal.len();
                let unrestored = sequencer.restore(journal);
                warn!(
                    descriptor = %descriptor.name,
                    index = failure.index,
                    control = %failure.control,
                    restored,
                    unrestored,
                    "enable sequence failed, rolling back"
                );
                Err(failure.into_error(&descriptor.name))
            }
        }
    }

    fn disable_step(&mut self, descriptor: &Descriptor) {
        debug!(descriptor = %descriptor.name, steps = descriptor.disable.len(), "disable sequence");
        let failures = Sequencer::new(self.transport.as_mut()).apply_best_effort(&descriptor.disable);
        if failures > 0 {
            warn!(descriptor = %descriptor.name, failures, "disable sequence incomplete");
        }
    }

    fn reapply(&mut self, descriptor: &Descriptor) {
        let failures = Sequencer::new(self.transport.as_mut()).apply_best_effort(&descriptor.enable);
        if failures > 0 {
            warn!(descriptor = %descriptor.name, failures, "could not fully restore descriptor");
        }
    }

    fn rollback(&mut self, tx: Transaction, snapshot: Routing) {
        for (name, sequence) in tx.undo.into_iter().rev() {
            debug!(descriptor = %name, "undoing completed step");
            Sequencer::new(self.transport.as_mut()).apply_best_effort(&sequence);
        }
        self.routing = snapshot;
    }

    // --- Calibration ---

    /// The verb itself when it is a voice call, else the first enabled
    /// voice-call modifier.
    fn voice_scope(&self, verb: &Verb) -> Option<Scope> {
        self.routing.verb?;
        if verb.use_case().voice_call {
            return Some(Scope::Verb);
        }
        self.routing
            .modifiers
            .iter()
            .filter_map(|m| verb.modifier_id(&m.name))
            .find(|id| verb.modifier(*id).voice_call)
            .map(Scope::Modifier)
    }

    /// First RX and first TX calibration id among the enabled devices.
    ///
    /// A combined descriptor declaring its own mask supplies the directions
    /// it declares ahead of any device; one without a mask overrides only
    /// its device's id.
    fn calibration_ids(&self, verb: &Verb, scope: Scope) -> (Option<i32>, Option<i32>) {
        let mut rx = None;
        let mut tx = None;
        let active: Vec<_> = self.routing.devices.iter().filter(|e| e.active).collect();
        let combined = |name: &str| verb.device_id(name).and_then(|id| verb.combined(scope, id));

        for entry in &active {
            let Some(desc) = combined(entry.name.as_str()) else { continue };
            let Some(id) = desc.acdb_id else { continue };
            if rx.is_none() && desc.capability.contains(Capability::RX) {
                rx = Some(id);
            }
            if tx.is_none() && desc.capability.contains(Capability::TX) {
                tx = Some(id);
            }
        }
        for entry in &active {
            let own = verb.device_id(&entry.name).and_then(|id| verb.device(id).acdb_id);
            let id = combined(entry.name.as_str())
                .filter(|desc| desc.capability.is_empty())
                .and_then(|desc| desc.acdb_id)
                .or(own);
            let Some(id) = id else { continue };
            if rx.is_none() && entry.capability.contains(Capability::RX) {
                rx = Some(id);
            }
            if tx.is_none() && entry.capability.contains(Capability::TX) {
                tx = Some(id);
            }
        }
        (rx, tx)
    }

    fn sync_calibration(&mut self, enabled: Option<&str>) {
        let catalog = Arc::clone(&self.catalog);
        let current = catalog.current();
        let voice = self.routing.verb.map(|id| current.verb(id)).and_then(|verb| {
            self.voice_scope(verb)
                .map(|scope| self.calibration_ids(verb, scope))
        });
        let in_call = voice.is_some();
        self.calibration.sync_voice(voice);
        if in_call {
            return;
        }
        let device = enabled.and_then(|name| find_device(current, self.routing.verb, name));
        if let Some(device) = device {
            if let Some(id) = device.acdb_id {
                if !device.capability.is_empty() {
                    self.calibration.apply_generic(id, device.capability);
                }
            }
        }
    }
}

impl std::fmt::Debug for CardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardState")
            .field("card", self.catalog.card())
            .field("verb", &self.verb_name())
            .field("devices", &self.routing.devices.names())
            .field("modifiers", &self.routing.modifiers.names())
            .field("closed", &self.closed)
            .finish()
    }
}
