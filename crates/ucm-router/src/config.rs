//! Platform configuration.
//!
//! One JSON document describes where descriptor files live, which sound
//! cards exist and which quirks they carry, the calibration remap rules and
//! the optional endpoint features of the platform. Every field has a
//! default, so an empty object is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ucm_catalog::CardInfo;
use ucm_core::{Result, UcmError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Directory holding the per-card master descriptor files.
pub const DEFAULT_CONFIG_DIR: &str = "/system/etc/snd_soc_msm";

/// Per-card behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardQuirks {
    /// Voice calibration is pushed by another component; the pair is only
    /// tracked.
    pub voice_calibration_external: bool,
}

/// A card the platform knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardProfile {
    pub name: String,
    pub number: u32,
    #[serde(default)]
    pub quirks: CardQuirks,
}

impl CardProfile {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            quirks: CardQuirks::default(),
        }
    }

    pub fn info(&self) -> CardInfo {
        CardInfo::new(self.name.clone(), self.number)
    }
}

/// Rewrites the TX calibration id for a speaker/handset-mic mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapRule {
    /// RX ids the rule applies to.
    pub rx: Vec<i32>,
    /// TX id to replace.
    pub tx: i32,
    pub replacement: i32,
}

impl RemapRule {
    pub fn matches(&self, rx: i32, tx: i32) -> bool {
        self.tx == tx && self.rx.contains(&rx)
    }
}

/// Speaker RX (mono 14, stereo 15) paired with a handset mic moves to the
/// matching speaker mic.
pub fn default_remap_rules() -> Vec<RemapRule> {
    vec![
        RemapRule {
            rx: vec![14, 15],
            tx: 4,
            replacement: 11,
        },
        RemapRule {
            rx: vec![14, 15],
            tx: 40,
            replacement: 41,
        },
    ]
}

/// Optional endpoints the platform was built with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformFeatures {
    pub anc_headset: bool,
    pub fm_tx: bool,
    pub fm_rx: bool,
    pub proxy: bool,
    pub usb_audio: bool,
    pub ssr_quad_mic: bool,
    /// Fluence dual-mic selection also applies during calls.
    pub fluence_incall: bool,
    /// Voice recognition and camcorder capture have their own endpoints.
    pub separated_audio_input: bool,
    /// VoIP direct output keeps the current RX endpoint.
    pub voip: bool,
}

fn default_cards() -> Vec<CardProfile> {
    vec![
        CardProfile::new("snd_soc_msm", 0),
        CardProfile::new("snd_soc_msm_2x", 0),
        CardProfile {
            quirks: CardQuirks {
                voice_calibration_external: true,
            },
            ..CardProfile::new("snd_soc_msm_2x_Fusion3", 0)
        },
        CardProfile::new("snd_soc_msm_Sitar", 0),
        CardProfile::new("snd_soc_msm_I2S", 0),
        CardProfile::new("snd_soc_msm_Taiko", 0),
    ]
}

/// Top-level platform configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub version: u32,
    pub config_dir: PathBuf,
    pub cards: Vec<CardProfile>,
    pub remap_rules: Vec<RemapRule>,
    pub features: PlatformFeatures,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            cards: default_cards(),
            remap_rules: default_remap_rules(),
            features: PlatformFeatures::default(),
        }
    }
}

impl PlatformConfig {
    pub fn card(&self, name: &str) -> Option<&CardProfile> {
        self.cards.iter().find(|c| c.name == name)
    }

    /// Names of every configured card, in registry order.
    pub fn card_names(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.name.clone()).collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| UcmError::Config(format!("failed to serialize platform config: {}", e)))
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| UcmError::Config(format!("invalid platform config: {}", e)))?;
        if config.version > CURRENT_VERSION {
            return Err(UcmError::Config(format!(
                "platform config version {} is newer than supported version {}",
                config.version, CURRENT_VERSION
            )));
        }
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Names of the cards a configuration can open.
pub fn list_cards(config: &PlatformConfig) -> Vec<String> {
    config.card_names()
}
