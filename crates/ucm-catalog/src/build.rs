//! Turns parsed sections into a `Verb`, resolving combined names.

use std::collections::HashMap;

use tracing::debug;
use ucm_core::{Result, UcmError};

use crate::model::{Descriptor, DeviceId, ModifierId, Scope, UseCase, Verb};

/// Longest `owner` such that `name == owner ++ device` for a known device.
fn split_combined<'a>(
    name: &str,
    owners: impl Iterator<Item = &'a str>,
    devices: &HashMap<&str, DeviceId>,
) -> Option<(&'a str, DeviceId)> {
    owners
        .filter(|owner| *owner != name)
        .filter_map(|owner| {
            let rest = name.strip_prefix(owner)?;
            devices.get(rest).map(|id| (owner, *id))
        })
        .max_by_key(|(owner, _)| owner.len())
}

pub(crate) fn build_verb(
    name: &str,
    verb_sections: Vec<Descriptor>,
    devices: Vec<Descriptor>,
    modifier_sections: Vec<Descriptor>,
    origin: &str,
) -> Result<Verb> {
    let mut device_ids: HashMap<&str, DeviceId> = HashMap::new();
    for (idx, device) in devices.iter().enumerate() {
        if device_ids.insert(device.name.as_str(), DeviceId(idx)).is_some() {
            return Err(UcmError::Config(format!(
                "{}: duplicate device \"{}\"",
                origin, device.name
            )));
        }
    }

    // Modifier sections named <modifier><device> are combined descriptors.
    let all_modifier_names: Vec<&str> = modifier_sections.iter().map(|m| m.name.as_str()).collect();
    let mut modifiers: Vec<UseCase> = Vec::new();
    let mut combined_modifiers: Vec<(String, DeviceId, Descriptor)> = Vec::new();
    for section in &modifier_sections {
        match split_combined(&section.name, all_modifier_names.iter().copied(), &device_ids) {
            Some((owner, device)) => {
                combined_modifiers.push((owner.to_string(), device, section.clone()));
            }
            None => {
                if modifiers.iter().any(|m| m.name() == section.name) {
                    return Err(UcmError::Config(format!(
                        "{}: duplicate modifier \"{}\"",
                        origin, section.name
                    )));
                }
                modifiers.push(UseCase::new(section.clone()));
            }
        }
    }

    let mut combined: HashMap<(Scope, DeviceId), Descriptor> = HashMap::new();
    let mut insert = |key: (Scope, DeviceId), desc: Descriptor| -> Result<()> {
        let section = desc.name.clone();
        if combined.insert(key, desc).is_some() {
            return Err(UcmError::Config(format!(
                "{}: duplicate section \"{}\"",
                origin, section
            )));
        }
        Ok(())
    };

    for (owner, device, desc) in combined_modifiers {
        match modifiers.iter().position(|m| m.name() == owner) {
            Some(idx) => insert((Scope::Modifier(ModifierId(idx)), device), desc)?,
            // Owner is itself a combination; nothing can reach this section.
            None => debug!(section = %desc.name, "dropping nested combination"),
        }
    }

    let mut own: Option<Descriptor> = None;
    let mut auxiliary = Vec::new();
    for section in verb_sections {
        if section.name == name && own.is_none() {
            own = Some(section);
            continue;
        }
        let split = section
            .name
            .strip_prefix(name)
            .and_then(|rest| device_ids.get(rest).copied());
        match split {
            Some(device) => insert((Scope::Verb, device), section)?,
            None => auxiliary.push(section),
        }
    }
    let own = match own {
        Some(desc) => desc,
        None if !auxiliary.is_empty() => {
            let mut desc = auxiliary.remove(0);
            debug!(verb = name, section = %desc.name, "using first verb section as the verb");
            desc.name = name.to_string();
            desc
        }
        None => Descriptor::named(name),
    };

    Ok(Verb {
        use_case: UseCase::new(own),
        devices,
        modifiers,
        combined,
        auxiliary,
    })
}
