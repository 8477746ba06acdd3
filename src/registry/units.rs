use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Unit the controller uses for positions and distances (register P2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementUnit {
    Step,
    Mm,
    Inch,
    Degree,
}

impl MovementUnit {
    pub const ALL: [MovementUnit; 4] = [
        MovementUnit::Step,
        MovementUnit::Mm,
        MovementUnit::Inch,
        MovementUnit::Degree,
    ];

    pub fn raw(self) -> u8 {
        match self {
            MovementUnit::Step => 1,
            MovementUnit::Mm => 2,
            MovementUnit::Inch => 3,
            MovementUnit::Degree => 4,
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw).checked_sub(1)?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementUnit::Step => "step",
            MovementUnit::Mm => "mm",
            MovementUnit::Inch => "inch",
            MovementUnit::Degree => "degree",
        }
    }

    /// Label used next to a displayed position.
    pub fn display_label(self) -> &'static str {
        match self {
            MovementUnit::Step => "steps",
            other => other.as_str(),
        }
    }
}

impl FromStr for MovementUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "step" | "steps" => Ok(MovementUnit::Step),
            "mm" => Ok(MovementUnit::Mm),
            "inch" => Ok(MovementUnit::Inch),
            "degree" | "deg" => Ok(MovementUnit::Degree),
            _ => Err(ConfigurationError::UnsupportedUnit(s.to_string())),
        }
    }
}

impl fmt::Display for MovementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoder attached to an axis (register P34).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    #[default]
    None,
    Incremental,
    /// SSI encoder with plain binary code.
    AbsoluteBinary,
    /// SSI encoder with Gray code.
    AbsoluteGray,
}

impl EncoderKind {
    pub const ALL: [EncoderKind; 4] = [
        EncoderKind::None,
        EncoderKind::Incremental,
        EncoderKind::AbsoluteBinary,
        EncoderKind::AbsoluteGray,
    ];

    pub fn raw(self) -> u8 {
        match self {
            EncoderKind::None => 0,
            EncoderKind::Incremental => 1,
            EncoderKind::AbsoluteBinary => 2,
            EncoderKind::AbsoluteGray => 3,
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw)).copied()
    }

    pub fn is_absolute(self) -> bool {
        matches!(self, EncoderKind::AbsoluteBinary | EncoderKind::AbsoluteGray)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EncoderKind::None => "none",
            EncoderKind::Incremental => "incremental",
            EncoderKind::AbsoluteBinary => "absolute_binary",
            EncoderKind::AbsoluteGray => "absolute_gray",
        }
    }
}

impl FromStr for EncoderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(EncoderKind::None),
            "incremental" => Ok(EncoderKind::Incremental),
            "absolute_binary" | "ssi_binary" => Ok(EncoderKind::AbsoluteBinary),
            "absolute_gray" | "ssi_gray" => Ok(EncoderKind::AbsoluteGray),
            _ => Err(ConfigurationError::UnsupportedEncoder(s.to_string())),
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
