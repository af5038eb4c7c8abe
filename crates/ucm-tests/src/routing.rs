//! Integration tests for verb/device/modifier routing.
//!
//! Drives a `CardManager` over the shared fixture catalog and a strict
//! simulated mixer, checking the hardware-visible effect of each call.

use proptest::prelude::*;
use ucm_core::UcmError;
use ucm_mixer::ControlState;

use crate::fixtures::{controls, rig, times_enabled};

// ── Basic routing ──────────────────────────────────────────────

#[test]
fn hifi_speaker_applies_endpoint_before_verb() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();

    assert_eq!(
        controls(&rig.mixer),
        vec!["Speaker Switch", "Speaker Volume", "Speaker Mode", "HiFi Route", "HiFi Volume"]
    );
    assert_eq!(rig.manager.current_verb(), "HiFi");
    assert_eq!(rig.manager.enabled_devices(), vec!["Speaker"]);
    assert_eq!(
        rig.mixer.state("Speaker Volume"),
        Some(ControlState::Values(vec![99, 99]))
    );
    assert_eq!(
        rig.mixer.state("Speaker Mode"),
        Some(ControlState::Option("Stereo".into()))
    );
}

#[test]
fn disable_tears_down_verb_before_endpoint() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.mixer.clear_log();

    rig.manager.disable_device("Speaker").unwrap();
    assert_eq!(
        controls(&rig.mixer),
        vec!["HiFi Volume", "HiFi Route", "Speaker Mode", "Speaker Volume", "Speaker Switch"]
    );
    assert!(rig.manager.enabled_devices().is_empty());
}

#[test]
fn enable_is_idempotent() {
    let once = rig();
    once.manager.set_verb("HiFi").unwrap();
    once.manager.enable_device("Speaker").unwrap();

    let twice = rig();
    twice.manager.set_verb("HiFi").unwrap();
    twice.manager.enable_device("Speaker").unwrap();
    twice.manager.enable_device("Speaker").unwrap();

    assert_eq!(twice.manager.enabled_devices(), once.manager.enabled_devices());
    assert_eq!(twice.mixer.write_count(), once.mixer.write_count());
}

#[test]
fn bare_verb_sequence_applied_once_for_many_devices() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.enable_device("Line").unwrap();

    assert_eq!(times_enabled(&rig.mixer, "HiFi Route"), 1);
    assert_eq!(rig.manager.enabled_devices(), vec!["Speaker", "Line"]);
}

#[test]
fn combined_descriptor_takes_precedence() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Headset").unwrap();

    assert_eq!(controls(&rig.mixer), vec!["Headset Switch", "HiFi Headset Route"]);
    assert_eq!(times_enabled(&rig.mixer, "HiFi Route"), 0);
}

#[test]
fn modifier_lifecycle_through_set_dispatch() {
    let rig = rig();
    rig.manager.set("_verb", "HiFi").unwrap();
    rig.manager.set("_enadev", "Speaker").unwrap();
    rig.manager.set("_enamod", "Play Music").unwrap();
    assert_eq!(rig.manager.get_int("_modstatus/Play Music").unwrap(), 1);
    assert_eq!(times_enabled(&rig.mixer, "Music Route"), 1);

    rig.manager.set("_swdev/Speaker", "Headset").unwrap();
    assert_eq!(rig.manager.list("_enadevs").unwrap(), vec!["Headset"]);
    assert_eq!(rig.manager.list("_enamods").unwrap(), vec!["Play Music"]);

    rig.manager.set("_verb", "Voice Call").unwrap();
    assert_eq!(rig.manager.enabled_modifiers(), vec!["Play Music"]);
    assert_eq!(times_enabled(&rig.mixer, "Music Route"), 2);
    assert_eq!(rig.mixer.state("Music Route"), Some(ControlState::Values(vec![1])));

    rig.manager.set("_dismod", "Play Music").unwrap();
    assert_eq!(rig.mixer.state("Music Route"), Some(ControlState::Values(vec![0])));
    assert!(rig.manager.enabled_modifiers().is_empty());
}

#[test]
fn modifier_survives_verb_round_trip() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.enable_modifier("Play Music").unwrap();
    let settled = rig.mixer.snapshot();

    rig.manager.set_verb("Voice Call").unwrap();
    assert_eq!(rig.manager.get_int("_modstatus/Play Music").unwrap(), 1);
    rig.manager.set_verb("HiFi").unwrap();

    assert_eq!(rig.manager.enabled_modifiers(), vec!["Play Music"]);
    assert_eq!(rig.mixer.snapshot(), settled);
    rig.manager.disable_modifier("Play Music").unwrap();
    assert_eq!(rig.mixer.state("Music Route"), Some(ControlState::Values(vec![0])));
}

#[test]
fn reset_and_close_quiesce_the_card() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.manager.enable_device("Headset").unwrap();
    rig.manager.enable_modifier("Play Music").unwrap();

    rig.manager.reset().unwrap();
    assert_eq!(rig.manager.current_verb(), "Inactive");
    assert!(rig.manager.enabled_devices().is_empty());
    assert!(rig
        .mixer
        .snapshot()
        .values()
        .all(|state| matches!(state, ControlState::Values(v) if v.iter().all(|x| *x == 0))
            || *state == ControlState::Option("Off".into())));

    rig.manager.close().unwrap();
    assert!(rig.mixer.is_closed());
    assert!(matches!(rig.manager.set_verb("HiFi"), Err(UcmError::State(_))));
}

#[test]
fn dropping_manager_closes_transport() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    let mixer = rig.mixer.clone();
    drop(rig);
    assert!(mixer.is_closed());
}

// ── Rollback ───────────────────────────────────────────────────

#[test]
fn failed_enable_rolls_back_every_prefix() {
    // Speaker's own sequence is three writes, HiFi's bare sequence two.
    for n in 1..=5 {
        let rig = rig();
        rig.manager.set_verb("HiFi").unwrap();
        let before = rig.mixer.snapshot();
        rig.mixer.clear_log();
        rig.mixer.fail_nth_write(n);

        let err = rig.manager.enable_device("Speaker").unwrap_err();
        assert!(matches!(err, UcmError::ControlWrite { .. }), "n={n}: {err:?}");
        assert_eq!(rig.mixer.snapshot(), before, "n={n}");
        assert_eq!(rig.mixer.write_count(), 2 * (n - 1), "n={n}");
        assert!(rig.manager.enabled_devices().is_empty());
        assert_eq!(rig.manager.get_int("_devstatus/Speaker").unwrap(), 0);
    }
}

#[test]
fn failure_names_descriptor_and_control() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.mixer.fail_control("HiFi Volume");

    match rig.manager.enable_device("Speaker").unwrap_err() {
        UcmError::ControlWrite {
            descriptor,
            control,
            index,
            ..
        } => {
            assert_eq!(descriptor, "HiFi");
            assert_eq!(control, "HiFi Volume");
            assert_eq!(index, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn failed_verb_change_keeps_old_verb() {
    let rig = rig();
    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device("Speaker").unwrap();
    rig.mixer.fail_control("Voice Speaker Route");

    assert!(rig.manager.set_verb("Voice Call").is_err());
    rig.mixer.clear_faults();
    assert_eq!(rig.manager.current_verb(), "HiFi");
    assert_eq!(rig.mixer.state("HiFi Route"), Some(ControlState::Values(vec![1])));
    assert_eq!(
        rig.mixer.state("Voice Speaker Route"),
        Some(ControlState::Values(vec![0]))
    );
}

// ── Properties ─────────────────────────────────────────────────

const DEVICES: [&str; 4] = ["Speaker", "Headset", "Line", "Handset"];
const VERBS: [&str; 2] = ["HiFi", "Voice Call"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn verb_round_trip_restores_controls(
        mask in 0usize..16,
        first in 0usize..2,
        second in 0usize..2,
        music in any::<bool>(),
    ) {
        let rig = rig();
        rig.manager.set_verb(VERBS[first]).unwrap();
        for (bit, device) in DEVICES.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                rig.manager.enable_device(device).unwrap();
            }
        }
        if music {
            rig.manager.enable_modifier("Play Music").unwrap();
        }
        let settled = rig.mixer.snapshot();
        let enabled = rig.manager.enabled_devices();
        let modifiers = rig.manager.enabled_modifiers();

        rig.manager.set_verb(VERBS[second]).unwrap();
        rig.manager.set_verb(VERBS[first]).unwrap();

        prop_assert_eq!(rig.mixer.snapshot(), settled);
        prop_assert_eq!(rig.manager.enabled_devices(), enabled);
        prop_assert_eq!(rig.manager.enabled_modifiers(), modifiers);
    }
}
