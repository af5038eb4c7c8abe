//! Endpoint selection.
//!
//! Maps the audio HAL's device bitmasks plus the current call and mic
//! settings to catalog device names. Precedence follows the order of the
//! checks below: TTY routing is decided before any generic wired-headset
//! match, combined speaker endpoints before single ones.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ucm_core::names::devices;
use ucm_core::UcmError;

use crate::config::PlatformFeatures;

macro_rules! device_mask {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $bit:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: Self = Self(0);
            $(pub const $flag: Self = Self($bit);)*

            pub fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

device_mask!(
    /// HAL output device bits.
    OutputDevices {
        EARPIECE = 0x1,
        SPEAKER = 0x2,
        WIRED_HEADSET = 0x4,
        WIRED_HEADPHONE = 0x8,
        BLUETOOTH_SCO = 0x10,
        BLUETOOTH_SCO_HEADSET = 0x20,
        BLUETOOTH_SCO_CARKIT = 0x40,
        BLUETOOTH_A2DP = 0x80,
        BLUETOOTH_A2DP_HEADPHONES = 0x100,
        BLUETOOTH_A2DP_SPEAKER = 0x200,
        AUX_DIGITAL = 0x400,
        ANLG_DOCK_HEADSET = 0x800,
        DGTL_DOCK_HEADSET = 0x1000,
        ANC_HEADSET = 0x10000,
        ANC_HEADPHONE = 0x20000,
        FM_TX = 0x40000,
        DIRECT_OUTPUT = 0x80000,
        PROXY = 0x100000,
        DEFAULT = 0x8000_0000,
    }
);

device_mask!(
    /// HAL input device bits.
    InputDevices {
        COMMUNICATION = 0x10000,
        AMBIENT = 0x20000,
        BUILTIN_MIC = 0x40000,
        BLUETOOTH_SCO_HEADSET = 0x80000,
        WIRED_HEADSET = 0x100000,
        AUX_DIGITAL = 0x200000,
        VOICE_CALL = 0x400000,
        BACK_MIC = 0x800000,
        ANC_HEADSET = 0x2000000,
        FM_RX = 0x4000000,
        FM_RX_A2DP = 0x8000000,
        ANLG_DOCK_HEADSET = 0x10000000,
        PROXY = 0x20000000,
    }
);

/// TTY mode requested for the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TtyMode {
    #[default]
    Off,
    Full,
    /// Voice carry-over: the user speaks, reads the reply.
    Vco,
    /// Hearing carry-over: the user hears, types the reply.
    Hco,
}

impl FromStr for TtyMode {
    type Err = UcmError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "tty_off" => Ok(Self::Off),
            "tty_full" => Ok(Self::Full),
            "tty_vco" => Ok(Self::Vco),
            "tty_hco" => Ok(Self::Hco),
            _ => Err(UcmError::InvalidIdentifier(format!("tty mode '{}'", text))),
        }
    }
}

impl fmt::Display for TtyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Off => "tty_off",
            Self::Full => "tty_full",
            Self::Vco => "tty_vco",
            Self::Hco => "tty_hco",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FluenceMode {
    #[default]
    None,
    Endfire,
    Broadside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputSource {
    #[default]
    Default,
    VoiceRecognition,
    Camcorder,
}

/// Call and microphone state the selector consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSettings {
    pub in_call: bool,
    pub tty: TtyMode,
    pub anc: bool,
    pub dmic: bool,
    pub qmic: bool,
    pub ssr_qmic: bool,
    pub fluence: FluenceMode,
    /// Bluetooth SCO runs at 16 kHz.
    pub btsco_wideband: bool,
    pub analog_mic: bool,
    pub input_source: InputSource,
    /// Carrier variant with its own earpiece and endfire tuning.
    pub tmus: bool,
    pub current_rx: Option<String>,
    pub current_tx: Option<String>,
}

/// Picks catalog device names for HAL device masks.
#[derive(Debug, Clone, Default)]
pub struct EndpointSelector {
    features: PlatformFeatures,
}

impl EndpointSelector {
    pub fn new(features: PlatformFeatures) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &PlatformFeatures {
        &self.features
    }

    /// RX device for an output mask.
    pub fn output_device(&self, out: OutputDevices, s: &RouteSettings) -> Option<String> {
        self.select_output(out, s).map(str::to_string)
    }

    /// TX device for an input mask. `rx_device` is the RX endpoint being
    /// routed alongside, if any.
    pub fn input_device(
        &self,
        input: InputDevices,
        s: &RouteSettings,
        rx_device: Option<&str>,
    ) -> Option<String> {
        self.select_input(input, s, rx_device).map(str::to_string)
    }

    /// RX and TX devices for one routing request.
    pub fn route(
        &self,
        out: OutputDevices,
        input: InputDevices,
        s: &RouteSettings,
    ) -> (Option<String>, Option<String>) {
        let rx = self.output_device(out, s);
        let tx = self.input_device(input, s, rx.as_deref());
        (rx, tx)
    }

    fn select_output<'s>(&self, out: OutputDevices, s: &'s RouteSettings) -> Option<&'s str> {
        use OutputDevices as O;
        let wired = out.intersects(O::WIRED_HEADSET | O::WIRED_HEADPHONE);
        let anc = self.features.anc_headset && out.intersects(O::ANC_HEADSET | O::ANC_HEADPHONE);
        let speaker = out.intersects(O::SPEAKER);

        if s.tty != TtyMode::Off && s.in_call && (wired || anc) {
            return Some(match s.tty {
                TtyMode::Vco => devices::TTY_HEADSET_RX,
                TtyMode::Hco => devices::TTY_HANDSET_RX,
                _ => devices::TTY_FULL_RX,
            });
        }
        if out.intersects(O::ANLG_DOCK_HEADSET | O::DGTL_DOCK_HEADSET) {
            return Some(devices::PROXY_RX);
        }
        if speaker && wired {
            return Some(if s.anc {
                devices::SPEAKER_ANC_HEADSET
            } else {
                devices::SPEAKER_HEADSET
            });
        }
        if speaker && out.intersects(O::AUX_DIGITAL) {
            return Some(devices::HDMI_SPEAKER);
        }
        if speaker && anc {
            return Some(devices::SPEAKER_ANC_HEADSET);
        }
        if speaker && self.features.fm_tx && out.intersects(O::FM_TX) {
            return Some(devices::SPEAKER_FM_TX);
        }
        if out.intersects(O::EARPIECE) {
            return Some(match (s.in_call, s.tmus) {
                (true, true) => devices::VOC_EARPIECE_TMUS,
                (true, false) => devices::VOC_EARPIECE,
                _ => devices::EARPIECE,
            });
        }
        if speaker {
            return Some(if s.in_call {
                devices::VOC_SPEAKER
            } else {
                devices::SPEAKER
            });
        }
        if wired {
            return Some(match (s.anc, s.in_call) {
                (true, true) => devices::VOC_ANC_HEADSET,
                (true, false) => devices::ANC_HEADSET,
                (false, true) => devices::VOC_HEADPHONE,
                (false, false) => devices::HEADPHONES,
            });
        }
        if anc {
            return Some(if s.in_call {
                devices::VOC_ANC_HEADSET
            } else {
                devices::ANC_HEADSET
            });
        }
        if out.intersects(O::BLUETOOTH_SCO | O::BLUETOOTH_SCO_HEADSET | O::BLUETOOTH_SCO_CARKIT) {
            return Some(if s.btsco_wideband {
                devices::BTSCO_WB_RX
            } else {
                devices::BTSCO_NB_RX
            });
        }
        let mut a2dp = O::BLUETOOTH_A2DP | O::BLUETOOTH_A2DP_HEADPHONES | O::BLUETOOTH_A2DP_SPEAKER;
        if self.features.voip {
            a2dp = a2dp | O::DIRECT_OUTPUT;
        }
        if out.intersects(a2dp) {
            // Rendered elsewhere; keep whatever RX endpoint is up.
            return s.current_rx.as_deref();
        }
        if out.intersects(O::AUX_DIGITAL) {
            return Some(devices::HDMI);
        }
        if self.features.proxy && out.intersects(O::PROXY) {
            return Some(devices::PROXY_RX);
        }
        if self.features.fm_tx && out.intersects(O::FM_TX) {
            return Some(devices::FM_TX);
        }
        if out.intersects(O::DEFAULT) {
            return Some(if s.in_call {
                devices::VOC_SPEAKER
            } else {
                devices::SPEAKER
            });
        }
        tracing::debug!(devices = out.0, "no output endpoint for device mask");
        None
    }

    fn select_input<'s>(
        &self,
        input: InputDevices,
        s: &'s RouteSettings,
        rx_device: Option<&str>,
    ) -> Option<&'s str> {
        use InputDevices as I;
        let anc = self.features.anc_headset && input.intersects(I::ANC_HEADSET);

        if s.tty != TtyMode::Off && s.in_call && (input.intersects(I::WIRED_HEADSET) || anc) {
            return Some(match s.tty {
                TtyMode::Hco => devices::TTY_HEADSET_TX,
                TtyMode::Vco if s.analog_mic => devices::TTY_HANDSET_ANALOG_TX,
                TtyMode::Vco => devices::TTY_HANDSET_TX,
                _ => devices::TTY_FULL_TX,
            });
        }
        if input.intersects(I::BUILTIN_MIC) {
            return Some(self.builtin_mic(s, rx_device));
        }
        if input.intersects(I::AUX_DIGITAL) {
            return Some(devices::HDMI_TX);
        }
        if anc {
            return Some(devices::HEADSET);
        }
        if input.intersects(I::WIRED_HEADSET) {
            return Some(if s.in_call {
                devices::VOC_HEADSET
            } else {
                devices::HEADSET
            });
        }
        if input.intersects(I::BLUETOOTH_SCO_HEADSET) {
            return Some(if s.btsco_wideband {
                devices::BTSCO_WB_TX
            } else {
                devices::BTSCO_NB_TX
            });
        }
        if self.features.usb_audio && input.intersects(I::ANLG_DOCK_HEADSET | I::PROXY) {
            return Some(devices::PROXY_TX);
        }
        if input.intersects(I::COMMUNICATION | I::VOICE_CALL) {
            return s.current_tx.as_deref();
        }
        if self.features.fm_rx && input.intersects(I::FM_RX | I::FM_RX_A2DP) {
            return Some(s.current_tx.as_deref().unwrap_or(devices::DUMMY_TX));
        }
        if input.intersects(I::AMBIENT | I::BACK_MIC) {
            if s.analog_mic {
                return Some(devices::HANDSET);
            }
            if s.in_call {
                return Some(devices::VOC_LINE);
            }
            if self.features.separated_audio_input && s.input_source == InputSource::Camcorder {
                return Some(devices::CAMCORDER_TX);
            }
            return Some(devices::LINE);
        }
        tracing::debug!(devices = input.0, "no input endpoint for device mask");
        None
    }

    fn builtin_mic(&self, s: &RouteSettings, rx_device: Option<&str>) -> &'static str {
        if s.analog_mic {
            return devices::HANDSET;
        }
        if s.dmic {
            if s.in_call && self.features.fluence_incall {
                return match s.fluence {
                    FluenceMode::Endfire if s.tmus => devices::DUAL_MIC_ENDFIRE_TMUS,
                    FluenceMode::Endfire => devices::DUAL_MIC_ENDFIRE,
                    FluenceMode::Broadside => devices::DUAL_MIC_BROADSIDE,
                    FluenceMode::None => devices::HANDSET,
                };
            }
            let on_speaker = rx_device == Some(devices::SPEAKER)
                || s.current_rx.as_deref() == Some(devices::SPEAKER);
            let vrec = s.input_source == InputSource::VoiceRecognition;
            match (s.fluence, vrec, on_speaker) {
                (FluenceMode::Endfire, true, _) => return devices::DUAL_MIC_ENDFIRE_VREC,
                (FluenceMode::Endfire, false, true) => return devices::SPEAKER_DUAL_MIC_ENDFIRE,
                (FluenceMode::Endfire, false, false) => return devices::DUAL_MIC_ENDFIRE,
                (FluenceMode::Broadside, true, _) => return devices::DUAL_MIC_BROADSIDE_VREC,
                (FluenceMode::Broadside, false, true) => return devices::SPEAKER_DUAL_MIC_BROADSIDE,
                (FluenceMode::Broadside, false, false) => return devices::DUAL_MIC_BROADSIDE,
                (FluenceMode::None, _, _) => {}
            }
        } else if s.qmic {
            return devices::QUAD_MIC;
        } else if s.ssr_qmic && self.features.ssr_quad_mic {
            return devices::SSR_QUAD_MIC;
        }
        if self.features.separated_audio_input && s.input_source == InputSource::VoiceRecognition {
            return devices::VOICE_RECOGNITION;
        }
        devices::HANDSET
    }
}
