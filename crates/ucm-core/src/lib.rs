//! UCM Core - Foundation types for use-case routing
//!
//! This crate provides the types shared by every layer of the resolver:
//! - Error taxonomy (UcmError, Result)
//! - Capability masks for endpoints and use cases
//! - Use-case classification and the well-known verb/modifier/device names

pub mod capability;
pub mod error;
pub mod names;
pub mod usecase;

pub use capability::Capability;
pub use error::{Result, UcmError};
pub use usecase::{is_voice_call, UseCaseClass};

/// Sentinel verb name meaning "no verb active".
pub const VERB_INACTIVE: &str = "Inactive";

/// Sentinel that terminates name lists in descriptor text.
pub const END_OF_LIST: &str = "end";
