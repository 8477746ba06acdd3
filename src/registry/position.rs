use serde::{Deserialize, Serialize};

use super::units::EncoderKind;

/// Firmware families differ in which counter register holds what.
///
/// Before V3.0, P21 is the mechanical zero counter and P20 the electrical
/// one; from V3.0 on the two are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmwareGeneration {
    PreV3,
    #[default]
    V3,
}

impl FirmwareGeneration {
    /// Derive the generation from an `IVR` answer such as `MCC2 V3.1`.
    ///
    /// Returns `None` when the answer carries no `major.minor` token.
    pub fn from_version(version: &str) -> Option<Self> {
        version.split_whitespace().find_map(|token| {
            let numeric = token.trim_start_matches(|c: char| !c.is_ascii_digit());
            let (major, _minor) = numeric.split_once('.')?;
            let major: u32 = major.parse().ok()?;
            Some(if major >= 3 {
                FirmwareGeneration::V3
            } else {
                FirmwareGeneration::PreV3
            })
        })
    }
}

/// Counter that is authoritative for an axis' current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Pick from the encoder kind: the encoder counter for absolute
    /// encoders, the mechanical zero counter otherwise.
    #[default]
    Auto,
    /// Reset to zero by every reference run.
    MechanicalZero,
    /// Never reset automatically.
    ElectricalZero,
    Encoder,
}

/// Register numbers of the position counters for one firmware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRegisters {
    pub mechanical_zero: u8,
    pub electrical_zero: u8,
    pub encoder: u8,
}

impl PositionRegisters {
    pub fn for_firmware(firmware: FirmwareGeneration) -> Self {
        match firmware {
            FirmwareGeneration::PreV3 => Self {
                mechanical_zero: 21,
                electrical_zero: 20,
                encoder: 22,
            },
            FirmwareGeneration::V3 => Self {
                mechanical_zero: 20,
                electrical_zero: 21,
                encoder: 22,
            },
        }
    }

    pub fn select(&self, source: PositionSource, encoder: EncoderKind) -> u8 {
        match resolve_source(source, encoder) {
            PositionSource::ElectricalZero => self.electrical_zero,
            PositionSource::Encoder => self.encoder,
            PositionSource::MechanicalZero | PositionSource::Auto => self.mechanical_zero,
        }
    }
}

fn resolve_source(source: PositionSource, encoder: EncoderKind) -> PositionSource {
    match source {
        PositionSource::Auto if encoder.is_absolute() => PositionSource::Encoder,
        PositionSource::Auto => PositionSource::MechanicalZero,
        explicit => explicit,
    }
}

/// Register to read for the position of an axis.
pub fn position_register(
    firmware: FirmwareGeneration,
    encoder: EncoderKind,
    source: PositionSource,
) -> u8 {
    PositionRegisters::for_firmware(firmware).select(source, encoder)
}
