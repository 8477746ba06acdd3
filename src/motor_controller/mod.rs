use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::axis::{
    client::Mcc2Axis, config::AxisConfig, movement_parameters::MovementParams, state::DeviceState,
    state_info::AxisStateInfo, Axis,
};
use crate::error::Result;
use crate::protocol::frame::{AxisSelector, ModuleAddress};
use crate::transport::SharedTransport;

#[async_trait::async_trait]
pub trait MotorController: Send + Sync {
    fn name(&self) -> &str;

    fn axes(&self) -> Vec<Arc<dyn Axis>>;
    fn get_axis(&self, axis: &str) -> anyhow::Result<Arc<dyn Axis>> {
        self.axes()
            .iter()
            .find(|a| a.name() == axis)
            .ok_or_else(|| {
                anyhow::anyhow!("Axis not found: {} in controller {}", axis, self.name())
            })
            .cloned()
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        for axis in self.axes() {
            axis.stop().await?;
        }
        Ok(())
    }

    async fn start(
        &self,
        axis: &str,
        target: f64,
        params: Option<MovementParams>,
    ) -> anyhow::Result<()> {
        let ax = self.get_axis(axis)?;
        ax.start(target, params).await
    }

    async fn stop(&self, axis: &str) -> anyhow::Result<()> {
        let ax = self.get_axis(axis)?;
        ax.stop().await
    }

    async fn state(&self, axis: &str) -> anyhow::Result<AxisStateInfo> {
        let ax = self.get_axis(axis)?;
        ax.get_state().await
    }

    async fn get_attribute(&self, axis: &str, attribute: &str) -> anyhow::Result<f64> {
        let supported_attributes = self.get_available_attributes(axis).await?;
        if !supported_attributes.contains(&attribute.to_string()) {
            return Err(anyhow::anyhow!("Attribute not supported: {}", attribute));
        }

        let ax = self.get_axis(axis)?;
        ax.get_attribute(attribute).await
    }

    async fn set_attribute(&self, axis: &str, attribute: &str, value: f64) -> anyhow::Result<()> {
        let ax = self.get_axis(axis)?;
        ax.set_attribute(attribute, value).await
    }

    async fn get_available_attributes(&self, axis: &str) -> anyhow::Result<Vec<String>> {
        let ax = self.get_axis(axis)?;
        ax.get_available_params().await
    }

    async fn get_supported_movement_params(&self, axis: &str) -> anyhow::Result<Vec<String>> {
        let ax = self.get_axis(axis)?;
        ax.get_supported_movement_params().await
    }
}

/// One MCC-2 module on the bus: a module address and up to two axes.
pub struct Mcc2Module {
    name: String,
    address: ModuleAddress,
    axes: Vec<Arc<Mcc2Axis>>,
}

impl Mcc2Module {
    pub fn new(
        name: impl Into<String>,
        address: ModuleAddress,
        axes: Vec<AxisConfig>,
        transport: SharedTransport,
        read_timeout: Duration,
    ) -> Self {
        let axes = axes
            .into_iter()
            .map(|config| {
                Arc::new(Mcc2Axis::new(
                    address,
                    config,
                    transport.clone(),
                    read_timeout,
                ))
            })
            .collect();
        Self {
            name: name.into(),
            address,
            axes,
        }
    }

    pub fn address(&self) -> ModuleAddress {
        self.address
    }

    pub fn axis(&self, selector: AxisSelector) -> Option<&Arc<Mcc2Axis>> {
        self.axes.iter().find(|axis| axis.selector() == selector)
    }

    pub fn mcc2_axes(&self) -> &[Arc<Mcc2Axis>] {
        &self.axes
    }

    /// Initialize every axis. Returns the first failure; axes that failed
    /// stay `Off` while the others are usable.
    pub async fn init(&self) -> Result<()> {
        let mut first_error = None;
        for axis in &self.axes {
            if let Err(e) = axis.init().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!(module = %self.name, address = %self.address, axes = self.axes.len(), "Module ready");
                Ok(())
            }
        }
    }

    /// Write the current register values of the module to flash.
    pub async fn save_parameters(&self) -> Result<()> {
        match self.axes.first() {
            Some(axis) => axis.save_parameters().await,
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl MotorController for Mcc2Module {
    fn name(&self) -> &str {
        &self.name
    }

    fn axes(&self) -> Vec<Arc<dyn Axis>> {
        self.axes
            .iter()
            .map(|axis| axis.clone() as Arc<dyn Axis>)
            .collect()
    }

    /// Axes that never came up are skipped; stopping them would only fail.
    async fn shutdown(&self) -> anyhow::Result<()> {
        info!(module = %self.name, "Shutting down module");
        for axis in &self.axes {
            if axis.state().await == DeviceState::Off {
                continue;
            }
            if let Err(e) = axis.stop().await {
                warn!(axis = %axis.name(), error = %e, "Failed to stop axis");
                return Err(e.into());
            }
        }
        Ok(())
    }
}
