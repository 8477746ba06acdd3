use serde::{Deserialize, Serialize};

use crate::protocol::frame::AxisSelector;
use crate::registry::position::{FirmwareGeneration, PositionSource};
use crate::registry::units::EncoderKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub name: String,
    pub selector: AxisSelector,
    /// Persisted by the collaborator and handed over at startup.
    #[serde(default)]
    pub inverted: bool,
    /// Read from P34 during initialization when unset.
    #[serde(default)]
    pub encoder: Option<EncoderKind>,
    #[serde(default)]
    pub position_source: PositionSource,
    /// Detected from the version answer when unset.
    #[serde(default)]
    pub firmware: Option<FirmwareGeneration>,
    #[serde(default = "default_firmware_marker")]
    pub firmware_marker: String,
}

fn default_firmware_marker() -> String {
    "MCC".to_string()
}

impl AxisConfig {
    pub fn new(name: impl Into<String>, selector: AxisSelector) -> Self {
        Self {
            name: name.into(),
            selector,
            inverted: false,
            encoder: None,
            position_source: PositionSource::default(),
            firmware: None,
            firmware_marker: default_firmware_marker(),
        }
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderKind) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_position_source(mut self, source: PositionSource) -> Self {
        self.position_source = source;
        self
    }

    pub fn with_firmware(mut self, firmware: FirmwareGeneration) -> Self {
        self.firmware = Some(firmware);
        self
    }
}
