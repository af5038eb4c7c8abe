//! Integration tests for endpoint selection feeding the card manager.

use ucm_router::{
    EndpointSelector, InputDevices, OutputDevices, PlatformFeatures, RouteSettings, TtyMode,
};

use crate::fixtures::rig;

fn in_call(tty: TtyMode) -> RouteSettings {
    RouteSettings {
        in_call: true,
        tty,
        ..RouteSettings::default()
    }
}

#[test]
fn tty_wins_over_wired_headset() {
    let selector = EndpointSelector::default();
    let (rx, tx) = selector.route(
        OutputDevices::WIRED_HEADSET,
        InputDevices::WIRED_HEADSET,
        &in_call(TtyMode::Full),
    );
    assert_eq!(rx.as_deref(), Some("TTY Full Rx"));
    assert_eq!(tx.as_deref(), Some("TTY Full Tx"));

    let (rx, tx) = selector.route(
        OutputDevices::WIRED_HEADSET,
        InputDevices::WIRED_HEADSET,
        &in_call(TtyMode::Off),
    );
    assert_eq!(rx.as_deref(), Some("Voice Headphones"));
    assert_eq!(tx.as_deref(), Some("Voice Headset"));
}

#[test]
fn tty_needs_an_active_call() {
    let selector = EndpointSelector::default();
    let settings = RouteSettings {
        tty: TtyMode::Full,
        ..RouteSettings::default()
    };
    assert_eq!(
        selector
            .output_device(OutputDevices::WIRED_HEADSET, &settings)
            .as_deref(),
        Some("Headphones")
    );
}

#[test]
fn selected_tty_endpoints_route_a_call() {
    let rig = rig();
    let selector = EndpointSelector::new(PlatformFeatures::default());
    let (rx, tx) = selector.route(
        OutputDevices::WIRED_HEADSET,
        InputDevices::WIRED_HEADSET,
        &in_call(TtyMode::Full),
    );
    let (rx, tx) = (rx.unwrap(), tx.unwrap());

    rig.manager.set_verb("Voice Call").unwrap();
    rig.manager.enable_device(&rx).unwrap();
    rig.manager.enable_device(&tx).unwrap();

    assert_eq!(rig.manager.enabled_devices(), vec![rx, tx]);
    assert_eq!(rig.calibration.voice_calls(), vec![(17, 16)]);
}

#[test]
fn speaker_selection_reaches_hardware() {
    let rig = rig();
    let selector = EndpointSelector::default();
    let rx = selector
        .output_device(OutputDevices::SPEAKER, &RouteSettings::default())
        .unwrap();
    assert_eq!(rx, "Speaker");

    rig.manager.set_verb("HiFi").unwrap();
    rig.manager.enable_device(&rx).unwrap();
    assert_eq!(rig.manager.get_int(&format!("_devstatus/{rx}")).unwrap(), 1);
    assert_eq!(
        rig.manager.get(&format!("EffectsMixerCTL/{rx}")).unwrap(),
        "SRS TruMedia"
    );
}
