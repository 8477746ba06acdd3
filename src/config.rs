use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::axis::config::AxisConfig;
use crate::error::{Error, Result};
use crate::motor_controller::Mcc2Module;
use crate::protocol::frame::ModuleAddress;
use crate::transport::config::TransportConfig;
use crate::transport::serial::SerialTransport;
use crate::transport::{self, SharedTransport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub address: ModuleAddress,
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
}

/// One serial bus and the modules daisy-chained on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl BusConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|source| Error::ConfigFile {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let config: BusConfig = serde_json::from_str(&text)?;
        info!(
            path = %path.as_ref().display(),
            modules = config.modules.len(),
            "Loaded bus configuration"
        );
        Ok(config)
    }

    /// Build the modules on top of an existing transport.
    pub fn build_modules(&self, transport: SharedTransport) -> Vec<Mcc2Module> {
        self.modules
            .iter()
            .map(|module| {
                Mcc2Module::new(
                    module.name.clone(),
                    module.address,
                    module.axes.clone(),
                    transport.clone(),
                    self.transport.read_timeout(),
                )
            })
            .collect()
    }

    /// Build the modules on the configured serial port. The port is opened
    /// when the first axis initializes.
    pub fn connect_serial(&self) -> Vec<Mcc2Module> {
        let transport = transport::shared(SerialTransport::new(self.transport.clone()));
        self.build_modules(transport)
    }
}
