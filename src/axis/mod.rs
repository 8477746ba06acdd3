pub mod client;
pub mod config;
pub mod limit_switches;
pub mod movement_parameters;
pub mod state;
pub mod state_info;

use anyhow::Context;
use tracing::info;

use crate::registry::{self, ParameterValue, Scaling, REGISTERS};
use client::Mcc2Axis;
use limit_switches::LimitSwitches;
use movement_parameters::MovementParams;
use state::DeviceState;
use state_info::AxisStateInfo;

/// Attributes every axis exposes besides its registers.
const STATUS_ATTRIBUTES: [&str; 4] = ["position", "limit_minus", "limit_plus", "moving"];

#[async_trait::async_trait]
pub trait Axis: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self, target: f64, params: Option<MovementParams>) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;

    async fn get_state(&self) -> anyhow::Result<AxisStateInfo>;
    async fn get_attribute(&self, name: &str) -> anyhow::Result<f64>;
    async fn set_attribute(&self, name: &str, value: f64) -> anyhow::Result<()>;

    async fn get_position(&self) -> anyhow::Result<f64> {
        self.get_attribute("position").await
    }

    async fn get_available_params(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["position".to_string()])
    }

    async fn get_supported_movement_params(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["velocity".to_string(), "acceleration".to_string()])
    }
}

#[async_trait::async_trait]
impl Axis for Mcc2Axis {
    fn name(&self) -> &str {
        Mcc2Axis::name(self)
    }

    async fn start(&self, target: f64, params: Option<MovementParams>) -> anyhow::Result<()> {
        if let Some(params) = params {
            if let Some(velocity) = params.velocity {
                self.write_parameter(registry::VELOCITY, velocity).await?;
            }
            if let Some(acceleration) = params.acceleration {
                self.write_parameter(registry::ACCELERATION, acceleration)
                    .await?;
            }
        }
        info!(axis = %self.name(), target, "Starting move");
        self.move_absolute(target).await?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Mcc2Axis::stop(self).await?;
        Ok(())
    }

    /// Polls the controller. A failed poll is reported as a faulted state
    /// rather than an error so the caller can keep displaying the axis.
    async fn get_state(&self) -> anyhow::Result<AxisStateInfo> {
        if self.state().await == DeviceState::Off {
            let info = AxisStateInfo::new(DeviceState::Off);
            return Ok(match self.last_error().await {
                Some(message) => info.with_message(message),
                None => info,
            });
        }

        match self.read_status().await {
            Ok(status) => Ok(AxisStateInfo::new(self.state().await)
                .with_limit_switches(LimitSwitches::from_status(&status))),
            Err(e) => Ok(AxisStateInfo::new(DeviceState::Fault)
                .with_message(e.to_string())
                .with_limit_switches(LimitSwitches::from_status(&self.last_status().await))),
        }
    }

    async fn get_attribute(&self, name: &str) -> anyhow::Result<f64> {
        let flag = |set: bool| if set { 1.0 } else { 0.0 };
        match name {
            "position" => Ok(self.read_position().await?),
            "limit_minus" => Ok(flag(self.read_status().await?.limit_minus)),
            "limit_plus" => Ok(flag(self.read_status().await?.limit_plus)),
            "moving" => Ok(flag(self.read_status().await?.moving)),
            _ => {
                let spec = registry::by_name(name)
                    .with_context(|| format!("Unknown attribute: {}", name))?;
                Ok(self.read_parameter(spec.number).await?.to_f64())
            }
        }
    }

    async fn set_attribute(&self, name: &str, value: f64) -> anyhow::Result<()> {
        if name == "position" {
            self.set_position(value).await?;
            return Ok(());
        }
        let spec = registry::by_name(name)
            .with_context(|| format!("Unknown attribute: {}", name))?;
        // Unit and encoder registers take their raw code.
        let value = match spec.scaling {
            Scaling::Unit | Scaling::Encoder => spec.decode(value)?,
            _ => ParameterValue::Number(value),
        };
        self.write_parameter(spec.number, value).await?;
        Ok(())
    }

    async fn get_available_params(&self) -> anyhow::Result<Vec<String>> {
        Ok(STATUS_ATTRIBUTES
            .iter()
            .copied()
            .chain(REGISTERS.iter().map(|spec| spec.name))
            .map(str::to_string)
            .collect())
    }
}
