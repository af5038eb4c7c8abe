//! Use-case classification.
//!
//! Every verb and modifier is classified once, when the catalog is built,
//! so steady-state routing never compares names.

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::names::{modifiers, verbs};

/// Direction class of a verb or modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseCaseClass {
    Playback,
    Capture,
    Voice,
}

const PLAYBACK: &[&str] = &[
    verbs::HIFI,
    verbs::HIFI_LOWLATENCY_MUSIC,
    verbs::HIFI_LOW_POWER,
    verbs::HIFI_TUNNEL,
    verbs::HIFI2,
    verbs::DIGITAL_RADIO,
    modifiers::PLAY_MUSIC,
    modifiers::PLAY_LOWLATENCY_MUSIC,
    modifiers::PLAY_MUSIC2,
    modifiers::PLAY_LPA,
    modifiers::PLAY_TUNNEL,
    modifiers::PLAY_FM,
];

const CAPTURE: &[&str] = &[
    verbs::HIFI_REC,
    verbs::FM_REC,
    verbs::FM_A2DP_REC,
    verbs::HIFI_LOWLATENCY_REC,
    modifiers::CAPTURE_MUSIC,
    modifiers::CAPTURE_LOWLATENCY_MUSIC,
    modifiers::CAPTURE_FM,
    modifiers::CAPTURE_A2DP_FM,
];

/// Use cases that drive voice calibration.
const VOICE_CALL: &[&str] = &[
    verbs::VOICECALL,
    verbs::IP_VOICECALL,
    modifiers::PLAY_VOICE,
    modifiers::PLAY_VOIP,
];

impl UseCaseClass {
    /// Classify a verb or modifier name. Unknown names are treated as voice.
    pub fn classify(name: &str) -> Self {
        if PLAYBACK.contains(&name) {
            Self::Playback
        } else if CAPTURE.contains(&name) {
            Self::Capture
        } else {
            Self::Voice
        }
    }

    /// The capability bit a device needs to take part in this use case.
    pub fn capability(self) -> Capability {
        match self {
            Self::Playback => Capability::RX,
            Self::Capture => Capability::TX,
            Self::Voice => Capability::VOICE,
        }
    }

    /// Whether a device with `caps` takes part in a use case of this class.
    pub fn accepts(self, caps: Capability) -> bool {
        self == Self::Voice || caps.is_voice_or_empty() || caps.contains(self.capability())
    }
}

/// True for the verbs and modifiers whose routing pushes voice calibration.
pub fn is_voice_call(name: &str) -> bool {
    VOICE_CALL.contains(&name)
}
