//! Card manager: the public face of one opened sound card.
//!
//! All routing state sits behind a single `parking_lot::Mutex`; every
//! operation, including status reads, takes it. Distinct cards are
//! independent managers.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info};
use ucm_catalog::{CardInfo, CatalogHandle, CatalogLoader, Descriptor};
use ucm_core::{Result, UcmError, VERB_INACTIVE};
use ucm_mixer::MixerTransport;

use crate::calibration::{CalibrationCoupler, CalibrationLoader};
use crate::config::{default_remap_rules, CardQuirks, PlatformConfig, RemapRule};
use crate::identifier::{Action, Identifier, IdentifierKind, PcmDirection};
use crate::resolver::{routing_verb, CardState};

/// Per-card options taken from the platform configuration.
#[derive(Debug, Clone)]
pub struct CardOptions {
    pub quirks: CardQuirks,
    pub remap_rules: Vec<RemapRule>,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            quirks: CardQuirks::default(),
            remap_rules: default_remap_rules(),
        }
    }
}

/// Serializable view of a card's routing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSnapshot {
    pub card: CardInfo,
    pub verb: String,
    pub devices: Vec<String>,
    pub modifiers: Vec<String>,
    pub calibration: Option<(i32, i32)>,
    pub catalog_complete: bool,
    pub closed: bool,
}

impl CardSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| UcmError::State(format!("failed to serialize card snapshot: {}", e)))
    }
}

/// One opened card.
#[derive(Debug)]
pub struct CardManager {
    card: CardInfo,
    state: Mutex<CardState>,
}

impl CardManager {
    /// Open `card_name` as described by the platform configuration.
    ///
    /// The primary verb is parsed before this returns; other verbs of an
    /// indexed catalog finish on a background thread.
    pub fn open(
        config: &PlatformConfig,
        card_name: &str,
        transport: Box<dyn MixerTransport>,
        calibration: Box<dyn CalibrationLoader>,
    ) -> Result<Self> {
        let profile = config.card(card_name).ok_or_else(|| {
            error!(card = card_name, "card not in platform configuration");
            UcmError::Config(format!("unknown card {}", card_name))
        })?;
        let loader = CatalogLoader::new(&config.config_dir);
        let catalog = loader.open(&profile.info()).map_err(|e| {
            error!(card = card_name, error = %e, "failed to open card");
            e
        })?;
        let options = CardOptions {
            quirks: profile.quirks.clone(),
            remap_rules: config.remap_rules.clone(),
        };
        Ok(Self::with_catalog(catalog, transport, calibration, options))
    }

    /// Wrap an already loaded catalog.
    pub fn with_catalog(
        catalog: CatalogHandle,
        transport: Box<dyn MixerTransport>,
        calibration: Box<dyn CalibrationLoader>,
        options: CardOptions,
    ) -> Self {
        let card = catalog.card().clone();
        let coupler = CalibrationCoupler::new(calibration)
            .with_rules(options.remap_rules)
            .with_external_voice(options.quirks.voice_calibration_external);
        info!(card = %card.name, number = card.number, "card opened");
        Self {
            card,
            state: Mutex::new(CardState::new(Arc::new(catalog), transport, coupler)),
        }
    }

    pub fn card(&self) -> &CardInfo {
        &self.card
    }

    // --- Routing ---

    pub fn set_verb(&self, name: &str) -> Result<()> {
        self.join_for_verb(name)?;
        self.state.lock().set_verb(name)
    }

    pub fn enable_device(&self, name: &str) -> Result<()> {
        self.state.lock().enable_device(name)
    }

    pub fn disable_device(&self, name: &str) -> Result<()> {
        self.state.lock().disable_device(name)
    }

    /// Disable `old` and enable `new` under one lock acquisition.
    pub fn switch_device(&self, old: &str, new: &str) -> Result<()> {
        self.state.lock().switch_device(old, new)
    }

    pub fn enable_modifier(&self, name: &str) -> Result<()> {
        self.state.lock().enable_modifier(name)
    }

    pub fn disable_modifier(&self, name: &str) -> Result<()> {
        self.state.lock().disable_modifier(name)
    }

    pub fn switch_modifier(&self, old: &str, new: &str) -> Result<()> {
        self.state.lock().switch_modifier(old, new)
    }

    /// Tear everything down and return to the inactive verb.
    pub fn reset(&self) -> Result<()> {
        self.state.lock().reset()
    }

    /// Reset, then release the mixer. Later calls fail with a state error.
    pub fn close(&self) -> Result<()> {
        self.state.lock().close()
    }

    // --- Queries ---

    pub fn current_verb(&self) -> String {
        self.state.lock().verb_name()
    }

    pub fn enabled_devices(&self) -> Vec<String> {
        self.state.lock().devices().names()
    }

    pub fn enabled_modifiers(&self) -> Vec<String> {
        self.state.lock().modifiers().names()
    }

    /// True when the device or modifier is enabled and switched on.
    pub fn is_active(&self, name: &str) -> bool {
        let state = self.state.lock();
        state.devices().status(name) || state.modifiers().status(name)
    }

    /// Block until background catalog parsing has finished.
    /// Resolve `name` against the catalog without the card lock, so a verb
    /// still being parsed is joined here rather than under the lock.
    fn join_for_verb(&self, name: &str) -> Result<()> {
        if name == VERB_INACTIVE {
            return Ok(());
        }
        let catalog = {
            let state = self.state.lock();
            state.ensure_open()?;
            Arc::clone(state.catalog())
        };
        catalog.find_verb(name)?;
        Ok(())
    }

    pub fn wait_for_parsing(&self) -> Result<()> {
        let catalog = Arc::clone(self.state.lock().catalog());
        catalog.wait_for_parsing().map(|_| ())
    }

    pub fn snapshot(&self) -> CardSnapshot {
        let state = self.state.lock();
        CardSnapshot {
            card: self.card.clone(),
            verb: state.verb_name(),
            devices: state.devices().names(),
            modifiers: state.modifiers().names(),
            calibration: state.calibration().last_pair(),
            catalog_complete: state.catalog().is_complete(),
            closed: state.is_closed(),
        }
    }

    // --- Identifier dispatch ---

    pub fn get(&self, identifier: &str) -> Result<String> {
        let id: Identifier = identifier.parse()?;
        if id.kind() != IdentifierKind::Text {
            return Err(UcmError::InvalidIdentifier(identifier.to_string()));
        }
        let state = self.state.lock();
        state.ensure_open()?;
        self.text_value(&state, &id)
    }

    pub fn get_int(&self, identifier: &str) -> Result<i64> {
        let id: Identifier = identifier.parse()?;
        let state = self.state.lock();
        state.ensure_open()?;
        match &id {
            Identifier::DeviceStatus(name) => Ok(i64::from(state.devices().status(name))),
            Identifier::ModifierStatus(name) => Ok(i64::from(state.modifiers().status(name))),
            Identifier::AcdbId(name) => {
                let catalog = Arc::clone(state.catalog());
                let verb = routing_verb(catalog.current(), state.verb_id())?;
                let device = verb
                    .device_id(name)
                    .map(|d| verb.device(d))
                    .ok_or_else(|| UcmError::UnknownDevice(name.clone()))?;
                device
                    .acdb_id
                    .map(i64::from)
                    .ok_or_else(|| UcmError::NotFound(identifier.to_string()))
            }
            _ => Err(UcmError::InvalidIdentifier(identifier.to_string())),
        }
    }

    pub fn list(&self, identifier: &str) -> Result<Vec<String>> {
        let id: Identifier = identifier.parse()?;
        // Joining the parser must not happen under the card lock.
        if id == Identifier::Verbs {
            let catalog = {
                let state = self.state.lock();
                state.ensure_open()?;
                Arc::clone(state.catalog())
            };
            return catalog.wait_for_parsing().map(|c| c.verb_names());
        }
        let state = self.state.lock();
        state.ensure_open()?;
        match id {
            Identifier::EnabledDevices => Ok(state.devices().names()),
            Identifier::EnabledModifiers => Ok(state.modifiers().names()),
            Identifier::Devices | Identifier::Modifiers => {
                let catalog = Arc::clone(state.catalog());
                let current = catalog.current();
                let verb = state
                    .verb_id()
                    .map(|v| current.verb(v))
                    .ok_or_else(|| UcmError::State("no verb is active".into()))?;
                Ok(if id == Identifier::Devices {
                    verb.device_names()
                } else {
                    verb.modifier_names()
                })
            }
            _ => Err(UcmError::InvalidIdentifier(identifier.to_string())),
        }
    }

    /// Apply a state change addressed by identifier, with `value` naming
    /// the verb, device or modifier.
    pub fn set(&self, identifier: &str, value: &str) -> Result<()> {
        let action: Action = identifier.parse()?;
        if action == Action::SetVerb {
            self.join_for_verb(value)?;
        }
        let mut state = self.state.lock();
        match action {
            Action::SetVerb => state.set_verb(value),
            Action::EnableDevice => state.enable_device(value),
            Action::DisableDevice => state.disable_device(value),
            Action::EnableModifier => state.enable_modifier(value),
            Action::DisableModifier => state.disable_modifier(value),
            Action::SwitchDevice(old) => state.switch_device(&old, value),
            Action::SwitchModifier(old) => state.switch_modifier(&old, value),
        }
    }

    fn text_value(&self, state: &CardState, id: &Identifier) -> Result<String> {
        let not_found = || UcmError::NotFound(id.to_string());
        match id {
            Identifier::Card => Ok(self.card.name.clone()),
            Identifier::Verb => Ok(state.verb_name()),
            Identifier::ControlNode(_) => Ok(format!("/dev/snd/controlC{}", self.card.number)),
            Identifier::EffectsMixerCtl(name) => {
                let catalog = Arc::clone(state.catalog());
                let verb = routing_verb(catalog.current(), state.verb_id())?;
                let device = verb
                    .device_id(name)
                    .map(|d| verb.device(d))
                    .ok_or_else(|| UcmError::UnknownDevice(name.clone()))?;
                device.effects_mixer_ctl.clone().ok_or_else(not_found)
            }
            Identifier::Pcm {
                direction,
                use_case,
                device,
            } => {
                let catalog = Arc::clone(state.catalog());
                let verb = routing_verb(catalog.current(), state.verb_id())?;
                let pick = |d: &Descriptor| match direction {
                    PcmDirection::Playback => d.playback_pcm.clone(),
                    PcmDirection::Capture => d.capture_pcm.clone(),
                };

                let Some(scope) = verb.scope_named(use_case) else {
                    return verb
                        .descriptor_named(use_case)
                        .and_then(pick)
                        .ok_or_else(not_found);
                };
                let combined = device
                    .as_deref()
                    .and_then(|name| verb.device_id(name))
                    .and_then(|d| verb.combined(scope, d))
                    .and_then(pick);
                combined
                    .or_else(|| pick(&verb.scope(scope).descriptor))
                    .ok_or_else(not_found)
            }
            _ => Err(UcmError::InvalidIdentifier(id.to_string())),
        }
    }
}

impl Drop for CardManager {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.is_closed() {
            if let Err(e) = state.close() {
                error!(card = %self.card.name, error = %e, "failed to close card");
            }
        }
    }
}
