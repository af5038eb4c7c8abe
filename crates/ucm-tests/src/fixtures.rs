//! Shared catalog text, mixer setup and on-disk layouts.

use std::path::Path;
use std::sync::Once;

use tracing_subscriber::EnvFilter;
use ucm_catalog::{parse_catalog, CardInfo, CatalogHandle};
use ucm_mixer::{ControlState, SimulatedMixer};
use ucm_router::{CardManager, CardOptions, RecordingCalibration};

pub const CARD: &str = "snd_soc_msm";

const HIFI: &str = r#"
SectionVerb
    Name "HiFi"
    PlaybackPCM 0
    EnableSequence
        'HiFi Route':1:1
        'HiFi Volume':1:75
    EndSequence
    DisableSequence
        'HiFi Volume':1:0
        'HiFi Route':1:0
    EndSequence
EndSection
SectionVerb
    Name "HiFiHeadset"
    EnableSequence
        'HiFi Headset Route':1:1
    EndSequence
    DisableSequence
        'HiFi Headset Route':1:0
    EndSequence
EndSection
"#;

const VOICE_CALL: &str = r#"
SectionVerb
    Name "Voice Call"
    PlaybackPCM 2
    CapturePCM 2
    EnableSequence
        'Voice Route':1:1
    EndSequence
    DisableSequence
        'Voice Route':1:0
    EndSequence
EndSection
SectionVerb
    Name "Voice CallSpeaker"
    ACDBID 4:2
    EnableSequence
        'Voice Speaker Route':1:1
    EndSequence
    DisableSequence
        'Voice Speaker Route':1:0
    EndSequence
EndSection
"#;

const ENDPOINTS: &str = r#"
SectionDevice
    Name "Speaker"
    ACDBID 15:1
    EffectsMixerCTL "SRS TruMedia"
    EnableSequence
        'Speaker Switch':1:1
        'Speaker Volume':1:80
        'Speaker Mode':0:Stereo
    EndSequence
    DisableSequence
        'Speaker Mode':0:Off
        'Speaker Volume':1:0
        'Speaker Switch':1:0
    EndSequence
EndSection
SectionDevice
    Name "Headset"
    ACDBID 10:1
    EnableSequence
        'Headset Switch':1:1
    EndSequence
    DisableSequence
        'Headset Switch':1:0
    EndSequence
EndSection
SectionDevice
    Name "Line"
    ACDBID 20:1
    EnableSequence
        'Line Switch':1:1
    EndSequence
    DisableSequence
        'Line Switch':1:0
    EndSequence
EndSection
SectionDevice
    Name "Handset"
    ACDBID 4:2
    EnableSequence
        'Handset Mic':1:1
    EndSequence
    DisableSequence
        'Handset Mic':1:0
    EndSequence
EndSection
SectionDevice
    Name "TTY Full Rx"
    ACDBID 17:1
    EnableSequence
        'TTY Rx Switch':1:1
    EndSequence
    DisableSequence
        'TTY Rx Switch':1:0
    EndSequence
EndSection
SectionDevice
    Name "TTY Full Tx"
    ACDBID 16:2
    EnableSequence
        'TTY Tx Switch':1:1
    EndSequence
    DisableSequence
        'TTY Tx Switch':1:0
    EndSequence
EndSection
SectionModifier
    Name "Play Music"
    PlaybackPCM 1
    EnableSequence
        'Music Route':1:1
    EndSequence
    DisableSequence
        'Music Route':1:0
    EndSequence
EndSection
"#;

const SWITCHES: &[&str] = &[
    "HiFi Route",
    "HiFi Headset Route",
    "Voice Route",
    "Voice Speaker Route",
    "Speaker Switch",
    "Headset Switch",
    "Line Switch",
    "Handset Mic",
    "TTY Rx Switch",
    "TTY Tx Switch",
    "Music Route",
];

/// Route logs into the test harness output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn card() -> CardInfo {
    CardInfo::new(CARD, 0)
}

/// Both verbs and the shared endpoint sections in one document.
pub fn single_file() -> String {
    format!(
        "SectionUseCase.\"HiFi\" {{\n}}\n{}\nSectionUseCase.\"Voice Call\" {{\n}}\n{}\n{}",
        HIFI, VOICE_CALL, ENDPOINTS
    )
}

/// Master index plus one file per verb, each carrying the endpoints.
pub fn write_indexed(dir: &Path) {
    let master = "SectionUseCase.\"HiFi\" {\n    File \"HiFi\"\n}\n\
                  SectionUseCase.\"Voice Call\" {\n    File \"VoiceCall\"\n}\n";
    std::fs::write(dir.join(CARD), master).unwrap();
    std::fs::write(dir.join("HiFi"), format!("{}{}", HIFI, ENDPOINTS)).unwrap();
    std::fs::write(dir.join("VoiceCall"), format!("{}{}", VOICE_CALL, ENDPOINTS)).unwrap();
}

pub fn write_single(dir: &Path) {
    std::fs::write(dir.join(CARD), single_file()).unwrap();
}

/// Strict mixer with every control the catalog touches.
pub fn mixer() -> SimulatedMixer {
    let mixer = SimulatedMixer::new();
    for name in SWITCHES {
        mixer.add_boolean(name);
    }
    mixer.add_integer("HiFi Volume", 0, 100, 2);
    mixer.add_integer("Speaker Volume", 0, 124, 2);
    mixer.add_enumerated("Speaker Mode", &["Off", "Mono", "Stereo"]);
    mixer
}

pub struct Rig {
    pub manager: CardManager,
    pub mixer: SimulatedMixer,
    pub calibration: RecordingCalibration,
}

pub fn rig() -> Rig {
    init_tracing();
    let catalog = parse_catalog(&single_file(), &card()).unwrap();
    let mixer = mixer();
    let calibration = RecordingCalibration::new();
    let manager = CardManager::with_catalog(
        CatalogHandle::from_catalog(catalog),
        Box::new(mixer.clone()),
        Box::new(calibration.clone()),
        CardOptions::default(),
    );
    Rig {
        manager,
        mixer,
        calibration,
    }
}

/// How many times `control` was switched on.
pub fn times_enabled(mixer: &SimulatedMixer, control: &str) -> usize {
    mixer
        .writes()
        .iter()
        .filter(|w| w.control == control && w.state == ControlState::Values(vec![1]))
        .count()
}

pub fn controls(mixer: &SimulatedMixer) -> Vec<String> {
    mixer.writes().into_iter().map(|w| w.control).collect()
}
