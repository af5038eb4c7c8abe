//! UCM Router - use-case resolution for one or more sound cards
//!
//! - `CardManager`: one opened card; verbs, devices and modifiers are
//!   enabled and disabled transactionally through its mixer transport
//! - `CalibrationCoupler`: pushes RX/TX calibration pairs when routing changes
//! - `EndpointSelector`: picks device names from output/input masks and
//!   call settings
//! - `PlatformConfig`: JSON platform description (cards, quirks, features)

pub mod calibration;
pub mod config;
pub mod endpoint;
pub mod identifier;
pub mod manager;
pub mod state;

mod resolver;

pub use calibration::{
    CalibrationCall, CalibrationCoupler, CalibrationLoader, NoCalibration, RecordingCalibration,
};
pub use config::{
    default_remap_rules, list_cards, CardProfile, CardQuirks, PlatformConfig, PlatformFeatures,
    RemapRule, CURRENT_VERSION, DEFAULT_CONFIG_DIR,
};
pub use endpoint::{
    EndpointSelector, FluenceMode, InputDevices, InputSource, OutputDevices, RouteSettings, TtyMode,
};
pub use identifier::{Action, Identifier, IdentifierKind, PcmDirection};
pub use manager::{CardManager, CardOptions, CardSnapshot};
pub use state::{Entry, IdentifierList};
