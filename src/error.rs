//! Error types shared across the crate.
//!
//! Framing problems live in [`ProtocolError`](crate::protocol::error::ProtocolError);
//! everything an axis operation can fail with is folded into [`Error`] so
//! callers can use `?` across the codec, registry and transport layers.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::protocol::error::ProtocolError;

/// A parameter write outside the documented hardware bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Value {value} out of range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("Register {register} expects a {expected} value")]
    WrongKind {
        register: u8,
        expected: &'static str,
    },
    #[error("Motion target {0} is not a finite number")]
    NotFinite(f64),
    #[error("Not an MCC-2 command: {0:?}")]
    UnknownCommand(String),
}

/// Static configuration that cannot be mapped onto the hardware.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Unsupported movement unit: {0} (allowed: step, mm, inch, degree)")]
    UnsupportedUnit(String),
    #[error("Unsupported encoder type: {0}")]
    UnsupportedEncoder(String),
    #[error("Unknown register P{0}")]
    UnknownRegister(u8),
    #[error("Module address {0} outside 0..=15")]
    InvalidAddress(u8),
    #[error("Invalid axis selector: {0}")]
    InvalidSelector(String),
    #[error("Unsupported serial line setting: {0}")]
    InvalidLineSetting(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("Unexpected firmware identification: {0:?}")]
    FirmwareMismatch(String),
    #[error("Axis {0} is not initialized")]
    NotInitialized(String),
    #[error("Invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Cannot read configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Whether this failure happened on the wire and must fault the axis.
    pub fn is_link_failure(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Transport(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
