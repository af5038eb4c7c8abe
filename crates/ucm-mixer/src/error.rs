//! Mixer transport errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MixerError {
    #[error("no such control: {0}")]
    NoSuchControl(String),
    #[error("invalid value for {control}: {detail}")]
    InvalidValue { control: String, detail: String },
    #[error("transport failure on {control}: {detail}")]
    Transport { control: String, detail: String },
}

pub type MixerResult<T> = std::result::Result<T, MixerError>;
