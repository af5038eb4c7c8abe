//! Identifier grammar for the `get`/`get_int`/`list`/`set` dispatchers.
//!
//! Identifiers are plain strings at the API boundary and are parsed once
//! into these enums; the router never matches on raw text.

use std::fmt;
use std::str::FromStr;

use ucm_core::UcmError;

/// PCM direction addressed by `PlaybackPCM`/`CapturePCM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmDirection {
    Playback,
    Capture,
}

/// Something `get`, `get_int` or `list` can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Card,
    Verb,
    Pcm {
        direction: PcmDirection,
        use_case: String,
        device: Option<String>,
    },
    ControlNode(PcmDirection),
    EffectsMixerCtl(String),
    AcdbId(String),
    DeviceStatus(String),
    ModifierStatus(String),
    Verbs,
    Devices,
    Modifiers,
    EnabledDevices,
    EnabledModifiers,
}

/// What `get` and friends return for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Text,
    Int,
    List,
}

impl Identifier {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::AcdbId(_) | Self::DeviceStatus(_) | Self::ModifierStatus(_) => IdentifierKind::Int,
            Self::Verbs
            | Self::Devices
            | Self::Modifiers
            | Self::EnabledDevices
            | Self::EnabledModifiers => IdentifierKind::List,
            _ => IdentifierKind::Text,
        }
    }
}

fn invalid(text: &str) -> UcmError {
    UcmError::InvalidIdentifier(text.to_string())
}

fn argument(text: &str, arg: Option<&str>) -> Result<String, UcmError> {
    match arg {
        Some(arg) if !arg.is_empty() => Ok(arg.to_string()),
        _ => Err(invalid(text)),
    }
}

impl FromStr for Identifier {
    type Err = UcmError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (head, arg) = match text.split_once('/') {
            Some((head, arg)) => (head, Some(arg)),
            None => (text, None),
        };
        let bare = |id: Identifier| if arg.is_none() { Ok(id) } else { Err(invalid(text)) };

        match head {
            "_card" => bare(Self::Card),
            "_verb" => bare(Self::Verb),
            "_verbs" => bare(Self::Verbs),
            "_devices" => bare(Self::Devices),
            "_modifiers" => bare(Self::Modifiers),
            "_enadevs" => bare(Self::EnabledDevices),
            "_enamods" => bare(Self::EnabledModifiers),
            "PlaybackCTL" => bare(Self::ControlNode(PcmDirection::Playback)),
            "CaptureCTL" => bare(Self::ControlNode(PcmDirection::Capture)),
            "PlaybackPCM" | "CapturePCM" => {
                let direction = if head == "PlaybackPCM" {
                    PcmDirection::Playback
                } else {
                    PcmDirection::Capture
                };
                let arg = argument(text, arg)?;
                let (use_case, device) = match arg.split_once('/') {
                    Some((uc, dev)) if !uc.is_empty() && !dev.is_empty() => {
                        (uc.to_string(), Some(dev.to_string()))
                    }
                    Some(_) => return Err(invalid(text)),
                    None => (arg, None),
                };
                Ok(Self::Pcm {
                    direction,
                    use_case,
                    device,
                })
            }
            "EffectsMixerCTL" => Ok(Self::EffectsMixerCtl(argument(text, arg)?)),
            "ACDBID" => Ok(Self::AcdbId(argument(text, arg)?)),
            "_devstatus" => Ok(Self::DeviceStatus(argument(text, arg)?)),
            "_modstatus" => Ok(Self::ModifierStatus(argument(text, arg)?)),
            _ => Err(invalid(text)),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pcm = |d: &PcmDirection| match d {
            PcmDirection::Playback => "Playback",
            PcmDirection::Capture => "Capture",
        };
        match self {
            Self::Card => write!(f, "_card"),
            Self::Verb => write!(f, "_verb"),
            Self::Pcm {
                direction,
                use_case,
                device: Some(device),
            } => write!(f, "{}PCM/{}/{}", pcm(direction), use_case, device),
            Self::Pcm {
                direction,
                use_case,
                device: None,
            } => write!(f, "{}PCM/{}", pcm(direction), use_case),
            Self::ControlNode(direction) => write!(f, "{}CTL", pcm(direction)),
            Self::EffectsMixerCtl(dev) => write!(f, "EffectsMixerCTL/{}", dev),
            Self::AcdbId(dev) => write!(f, "ACDBID/{}", dev),
            Self::DeviceStatus(dev) => write!(f, "_devstatus/{}", dev),
            Self::ModifierStatus(m) => write!(f, "_modstatus/{}", m),
            Self::Verbs => write!(f, "_verbs"),
            Self::Devices => write!(f, "_devices"),
            Self::Modifiers => write!(f, "_modifiers"),
            Self::EnabledDevices => write!(f, "_enadevs"),
            Self::EnabledModifiers => write!(f, "_enamods"),
        }
    }
}

/// A state change requested through `set(identifier, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetVerb,
    EnableDevice,
    DisableDevice,
    EnableModifier,
    DisableModifier,
    /// Replace the named device with the value.
    SwitchDevice(String),
    /// Replace the named modifier with the value.
    SwitchModifier(String),
}

impl FromStr for Action {
    type Err = UcmError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.split_once('/') {
            Some(("_swdev", old)) if !old.is_empty() => Ok(Self::SwitchDevice(old.to_string())),
            Some(("_swmod", old)) if !old.is_empty() => Ok(Self::SwitchModifier(old.to_string())),
            Some(_) => Err(invalid(text)),
            None => match text {
                "_verb" => Ok(Self::SetVerb),
                "_enadev" => Ok(Self::EnableDevice),
                "_disdev" => Ok(Self::DisableDevice),
                "_enamod" => Ok(Self::EnableModifier),
                "_dismod" => Ok(Self::DisableModifier),
                _ => Err(invalid(text)),
            },
        }
    }
}
