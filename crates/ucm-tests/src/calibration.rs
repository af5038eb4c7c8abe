//! Integration tests for the calibration coupling of voice routes.

use proptest::prelude::*;
use ucm_catalog::{parse_catalog, CatalogHandle};
use ucm_core::Capability;
use ucm_router::{CalibrationCall, CardManager, CardOptions, CardQuirks, RecordingCalibration};

use crate::fixtures::{card, mixer, rig, single_file};

// ── Voice pairs ────────────────────────────────────────────────

#[test]
fn voice_call_pushes_remapped_pair() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.set_verb("Voice Call").unwrap();

    // Speaker RX 15 with the combined descriptor's handset-mic TX 4.
    assert_eq!(rig.calibration.voice_calls(), vec![(15, 11)]);
    assert_eq!(rig.manager.snapshot().calibration, Some((15, 11)));
}

#[test]
fn pair_follows_endpoint_changes() {
    let rig = rig();
    rig.manager.set_verb("Voice Call").unwrap();
    rig.manager.enable_device("Headset").unwrap();
    assert!(rig.calibration.voice_calls().is_empty());

    rig.manager.enable_device("Handset").unwrap();
    assert_eq!(rig.calibration.voice_calls(), vec![(10, 4)]);

    rig.manager.switch_device("Headset", "Line").unwrap();
    assert_eq!(rig.calibration.voice_calls(), vec![(10, 4), (20, 4)]);
}

#[test]
fn leaving_the_call_clears_the_cache() {
    let rig = rig();
    rig.manager.set_verb("Voice Call").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.enable_device("Handset").unwrap();
    assert_eq!(rig.calibration.voice_calls(), vec![(15, 11)]);

    rig.manager.set_verb("HiFi").unwrap();
    assert_eq!(rig.manager.snapshot().calibration, None);

    rig.manager.set_verb("Voice Call").unwrap();
    assert_eq!(rig.calibration.voice_calls(), vec![(15, 11), (15, 11)]);
}

#[test]
fn load_bearing_endpoint_survives_disable() {
    let rig = rig();
    rig.manager.set_verb("Voice Call").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.enable_device("Handset").unwrap();
    let writes = rig.mixer.write_count();

    rig.manager.disable_device("Handset").unwrap();
    assert_eq!(rig.mixer.write_count(), writes);
    assert_eq!(rig.manager.enabled_devices(), vec!["Speaker", "Handset"]);
}

#[test]
fn generic_calibration_outside_calls() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Headset").unwrap();
    rig.manager.enable_device("Headset").unwrap();

    assert_eq!(
        rig.calibration.calls(),
        vec![CalibrationCall::Generic {
            id: 10,
            capability: Capability::RX,
        }]
    );
}

#[test]
fn external_voice_calibration_is_tracked_only() {
    let catalog = parse_catalog(&single_file(), &card()).unwrap();
    let mixer = mixer();
    let calibration = RecordingCalibration::new();
    let options = CardOptions {
        quirks: CardQuirks {
            voice_calibration_external: true,
        },
        ..CardOptions::default()
    };
    let manager = CardManager::with_catalog(
        CatalogHandle::from_catalog(catalog),
        Box::new(mixer),
        Box::new(calibration.clone()),
        options,
    );

    manager.set_verb("Voice Call").unwrap();
    manager.enable_device("Speaker").unwrap();
    assert!(calibration.voice_calls().is_empty());
    assert_eq!(manager.snapshot().calibration, Some((15, 11)));
}

#[test]
fn failing_loader_retries_on_next_change() {
    let rig = rig();
    rig.calibration.set_failing(true);
    rig.manager.set_verb("Voice Call").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    assert_eq!(rig.manager.snapshot().calibration, None);

    rig.calibration.set_failing(false);
    rig.manager.enable_device("Handset").unwrap();
    assert_eq!(rig.calibration.voice_calls(), vec![(15, 11)]);
}

// ── Suppression ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    EnableSpeaker,
    EnableHandset,
    EnableLine,
    DisableLine,
    EnableMusic,
    DisableMusic,
    DisableSpeaker,
    StayInCall,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::EnableSpeaker),
        Just(Op::EnableHandset),
        Just(Op::EnableLine),
        Just(Op::DisableLine),
        Just(Op::EnableMusic),
        Just(Op::DisableMusic),
        Just(Op::DisableSpeaker),
        Just(Op::StayInCall),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Speaker stays the first RX endpoint and the combined descriptor pins
    /// TX, so the pair never changes.
    #[test]
    fn unchanged_pair_is_pushed_once(ops in proptest::collection::vec(op(), 1..24)) {
        let rig = rig();
        rig.manager.set_verb("Voice Call").unwrap();
        rig.manager.enable_device("Speaker").unwrap();

        for op in ops {
            let manager = &rig.manager;
            // Disabling something not enabled is a state error; that is fine here.
            let _ = match op {
                Op::EnableSpeaker => manager.enable_device("Speaker"),
                Op::EnableHandset => manager.enable_device("Handset"),
                Op::EnableLine => manager.enable_device("Line"),
                Op::DisableLine => manager.disable_device("Line"),
                Op::EnableMusic => manager.enable_modifier("Play Music"),
                Op::DisableMusic => manager.disable_modifier("Play Music"),
                Op::DisableSpeaker => {
                    if manager.is_active("Line") {
                        Ok(())
                    } else {
                        manager.disable_device("Speaker")
                    }
                }
                Op::StayInCall => manager.set_verb("Voice Call"),
            };
        }

        prop_assert_eq!(rig.calibration.voice_calls(), vec![(15, 11)]);
    }
}
