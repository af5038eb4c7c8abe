//! Well-known verb, modifier and device names.
//!
//! Catalogs may define any names they like; these are the ones the
//! classifier and the endpoint selector know about.

pub mod verbs {
    pub const HIFI: &str = "HiFi";
    pub const HIFI_LOW_POWER: &str = "HiFi Low Power";
    pub const HIFI_LOWLATENCY_MUSIC: &str = "HiFi Lowlatency";
    pub const HIFI_TUNNEL: &str = "HiFi Tunnel";
    pub const HIFI2: &str = "HiFi2";
    pub const DIGITAL_RADIO: &str = "Digital Radio";
    pub const HIFI_REC: &str = "HiFi Rec";
    pub const HIFI_LOWLATENCY_REC: &str = "HiFi Lowlatency Rec";
    pub const FM_REC: &str = "FM REC";
    pub const FM_A2DP_REC: &str = "FM A2DP REC";
    pub const VOICECALL: &str = "Voice Call";
    pub const IP_VOICECALL: &str = "Voice Call IP";
    pub const DL_REC: &str = "DL REC";
    pub const UL_DL_REC: &str = "UL DL REC";
    pub const INCALL_REC: &str = "Incall REC";
    pub const VOLTE: &str = "VoLTE";
}

pub mod modifiers {
    pub const PLAY_MUSIC: &str = "Play Music";
    pub const PLAY_LOWLATENCY_MUSIC: &str = "Play Lowlatency Music";
    pub const PLAY_MUSIC2: &str = "Play Music2";
    pub const PLAY_LPA: &str = "Play LPA";
    pub const PLAY_TUNNEL: &str = "Play Tunnel";
    pub const PLAY_FM: &str = "Play FM";
    pub const CAPTURE_MUSIC: &str = "Capture Music";
    pub const CAPTURE_LOWLATENCY_MUSIC: &str = "Capture Lowlatency Music";
    pub const CAPTURE_FM: &str = "Capture FM";
    pub const CAPTURE_A2DP_FM: &str = "Capture A2DP FM";
    pub const PLAY_VOICE: &str = "Play Voice";
    pub const PLAY_VOIP: &str = "Play VoIP";
    pub const CAPTURE_VOICE_DL: &str = "Capture Voice Downlink";
    pub const CAPTURE_VOICE_UL_DL: &str = "Capture Voice Uplink Downlink";
    pub const PLAY_VOLTE: &str = "Play VoLTE";
}

pub mod devices {
    pub const EARPIECE: &str = "Earpiece";
    pub const SPEAKER: &str = "Speaker";
    pub const HEADPHONES: &str = "Headphones";
    pub const HEADSET: &str = "Headset";
    pub const HANDSET: &str = "Handset";
    pub const LINE: &str = "Line";
    pub const ANC_HEADSET: &str = "ANC Headset";
    pub const SPEAKER_HEADSET: &str = "Speaker Headset";
    pub const SPEAKER_ANC_HEADSET: &str = "Speaker ANC Headset";
    pub const SPEAKER_FM_TX: &str = "Speaker FM Tx";
    pub const HDMI: &str = "HDMI";
    pub const HDMI_TX: &str = "HDMI Tx";
    pub const HDMI_SPEAKER: &str = "HDMI Speaker";
    pub const PROXY_RX: &str = "PROXY Rx";
    pub const PROXY_TX: &str = "PROXY Tx";
    pub const FM_TX: &str = "FM Tx";
    pub const BTSCO_NB_RX: &str = "BT SCO Rx";
    pub const BTSCO_NB_TX: &str = "BT SCO Tx";
    pub const BTSCO_WB_RX: &str = "BT SCO WB Rx";
    pub const BTSCO_WB_TX: &str = "BT SCO WB Tx";
    pub const TTY_HEADSET_RX: &str = "TTY Headset Rx";
    pub const TTY_HEADSET_TX: &str = "TTY Headset Tx";
    pub const TTY_FULL_RX: &str = "TTY Full Rx";
    pub const TTY_FULL_TX: &str = "TTY Full Tx";
    pub const TTY_HANDSET_RX: &str = "TTY Handset Rx";
    pub const TTY_HANDSET_TX: &str = "TTY Handset Tx";
    pub const TTY_HANDSET_ANALOG_TX: &str = "TTY Handset Analog Tx";
    pub const VOC_EARPIECE: &str = "Voice Earpiece";
    pub const VOC_EARPIECE_TMUS: &str = "Voice Earpiece TMUS";
    pub const VOC_SPEAKER: &str = "Voice Speaker";
    pub const VOC_HEADPHONE: &str = "Voice Headphones";
    pub const VOC_HEADSET: &str = "Voice Headset";
    pub const VOC_ANC_HEADSET: &str = "Voice ANC Headset";
    pub const VOC_LINE: &str = "Voice Line";
    pub const DUAL_MIC_ENDFIRE: &str = "DMIC Endfire";
    pub const DUAL_MIC_ENDFIRE_TMUS: &str = "DMIC Endfire TMUS";
    pub const DUAL_MIC_BROADSIDE: &str = "DMIC Broadside";
    pub const DUAL_MIC_ENDFIRE_VREC: &str = "DMIC Endfire Voice Rec";
    pub const DUAL_MIC_BROADSIDE_VREC: &str = "DMIC Broadside Voice Rec";
    pub const SPEAKER_DUAL_MIC_ENDFIRE: &str = "Speaker DMIC Endfire";
    pub const SPEAKER_DUAL_MIC_BROADSIDE: &str = "Speaker DMIC Broadside";
    pub const QUAD_MIC: &str = "QMIC";
    pub const SSR_QUAD_MIC: &str = "SSR QMIC";
    pub const VOICE_RECOGNITION: &str = "Voice Recognition";
    pub const CAMCORDER_TX: &str = "Camcorder Tx";
    pub const DUMMY_TX: &str = "Dummy Tx";
}
