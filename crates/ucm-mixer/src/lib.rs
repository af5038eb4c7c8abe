//! UCM Mixer - control sequences and the transport they are written through
//!
//! - `MixerTransport`: the seam to the hardware mixer (kernel ioctl layer lives elsewhere)
//! - `ControlSequence`: ordered control mutations parsed from descriptor text
//! - `Sequencer`: applies sequences, journals prior values for exact rollback
//! - `SimulatedMixer`: in-memory transport with fault injection

pub mod control;
pub mod error;
pub mod sequencer;
pub mod simulated;
pub mod transport;

pub use control::{ControlMutation, ControlSequence, ControlValue, MultiValue};
pub use error::{MixerError, MixerResult};
pub use sequencer::{Journal, SequenceFailure, Sequencer};
pub use simulated::{SimulatedMixer, WriteRecord};
pub use transport::{ControlInfo, ControlKind, ControlState, MixerTransport};
