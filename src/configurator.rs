//! Compare an axis' registers against the factory defaults and restore them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::axis::client::Mcc2Axis;
use crate::error::Result;
use crate::registry;

/// Factory default of one register, as a raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultEntry {
    pub register: u8,
    pub value: f64,
}

const fn entry(register: u8, value: f64) -> DefaultEntry {
    DefaultEntry { register, value }
}

pub static DEFAULT_CONFIG: &[DefaultEntry] = &[
    entry(1, 0.0),
    entry(2, 1.0),
    entry(3, 1.0),
    entry(4, 400.0),
    entry(7, 100_000.0),
    entry(8, 4000.0),
    entry(9, 4000.0),
    entry(10, 400.0),
    entry(11, 0.0),
    entry(12, 0.0),
    entry(13, 20.0),
    entry(14, 4000.0),
    entry(15, 4000.0),
    entry(16, 20.0),
    entry(17, 0.0),
    entry(19, 0.0),
    entry(20, 0.0),
    entry(21, 0.0),
    entry(22, 0.0),
    entry(23, 0.0),
    entry(24, 0.0),
    entry(25, 0.0),
    entry(27, 0.0),
    entry(34, 0.0),
    entry(35, 10.0),
    entry(36, 0.0),
    entry(38, 0.0),
    entry(39, 0.0),
    entry(40, 2.0),
    entry(41, 6.0),
    entry(42, 10.0),
    entry(43, 20.0),
    entry(45, 4.0),
    entry(46, 1.0),
    entry(47, 1.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigRow {
    pub register: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub default: f64,
    pub current: f64,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigReport {
    pub rows: Vec<ConfigRow>,
}

impl ConfigReport {
    pub fn changed(&self) -> impl Iterator<Item = &ConfigRow> {
        self.rows.iter().filter(|row| row.changed)
    }

    pub fn is_default(&self) -> bool {
        self.changed().next().is_none()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ConfigReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<6} {:>12} {:>12}  {:<8} description",
            "param", "default", "current", "compare"
        )?;
        writeln!(f, "{}", "=".repeat(70))?;
        for row in &self.rows {
            writeln!(
                f,
                "P{:02}:   {:>12.2} {:>12.2}  {:<8} {}",
                row.register,
                row.default,
                row.current,
                if row.changed { "changed" } else { "same" },
                row.description
            )?;
        }
        Ok(())
    }
}

/// Register values keyed by register number.
pub type RegisterDump = BTreeMap<u8, f64>;

pub struct Configurator<'a> {
    axis: &'a Mcc2Axis,
}

impl<'a> Configurator<'a> {
    pub fn new(axis: &'a Mcc2Axis) -> Self {
        Self { axis }
    }

    /// Read every register that has a factory default.
    pub async fn read_current_config(&self) -> Result<RegisterDump> {
        let mut dump = RegisterDump::new();
        for entry in DEFAULT_CONFIG {
            let value = self.axis.read_raw(entry.register).await?;
            debug!(axis = %self.axis.name(), register = entry.register, value, "Read register");
            dump.insert(entry.register, value);
        }
        Ok(dump)
    }

    /// Registers missing from `current` are reported as changed with a NaN value.
    pub fn compare(current: &RegisterDump) -> ConfigReport {
        let rows = DEFAULT_CONFIG
            .iter()
            .map(|entry| {
                let (name, description) = registry::lookup(entry.register)
                    .map(|spec| (spec.name, spec.description))
                    .unwrap_or(("", ""));
                let current = current.get(&entry.register).copied().unwrap_or(f64::NAN);
                ConfigRow {
                    register: entry.register,
                    name,
                    description,
                    default: entry.value,
                    current,
                    changed: current != entry.value,
                }
            })
            .collect();
        ConfigReport { rows }
    }

    pub async fn compare_with_device(&self) -> Result<ConfigReport> {
        let current = self.read_current_config().await?;
        Ok(Self::compare(&current))
    }

    /// Write every factory default back to the axis. Returns the number of
    /// registers written. Values live in RAM until [`Self::save_to_flash`].
    pub async fn reset_to_default(&self) -> Result<usize> {
        for entry in DEFAULT_CONFIG {
            self.axis.write_raw(entry.register, entry.value).await?;
        }
        info!(axis = %self.axis.name(), registers = DEFAULT_CONFIG.len(), "Registers reset to defaults");
        Ok(DEFAULT_CONFIG.len())
    }

    pub async fn save_to_flash(&self) -> Result<()> {
        self.axis.save_parameters().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::axis::config::AxisConfig;
    use crate::protocol::frame::{AxisSelector, ModuleAddress};
    use crate::transport::{self, sim::SimulatedBus};

    async fn ready_axis() -> (SimulatedBus, Mcc2Axis) {
        let address = ModuleAddress::new(3).unwrap();
        let bus = SimulatedBus::new().with_module(address, "MCC2 V2.6");
        let axis = Mcc2Axis::new(
            address,
            AxisConfig::new("x", AxisSelector::X),
            transport::shared(bus.transport()),
            Duration::from_millis(50),
        );
        axis.init().await.unwrap();
        bus.clear_log();
        (bus, axis)
    }

    #[test]
    fn test_defaults_are_valid_register_values() {
        for entry in DEFAULT_CONFIG {
            let spec = registry::lookup(entry.register).unwrap();
            assert!(
                spec.validate_raw(entry.value).is_ok(),
                "P{} default {} rejected",
                entry.register,
                entry.value
            );
        }
    }

    #[test]
    fn test_compare_flags_differences() {
        let mut current: RegisterDump = DEFAULT_CONFIG
            .iter()
            .map(|entry| (entry.register, entry.value))
            .collect();
        assert!(Configurator::compare(&current).is_default());

        current.insert(registry::RUN_CURRENT, 12.0);
        current.remove(&registry::BACKLASH);
        let report = Configurator::compare(&current);
        let changed: Vec<u8> = report.changed().map(|row| row.register).collect();
        assert_eq!(changed, vec![registry::BACKLASH, registry::RUN_CURRENT]);

        let table = report.to_string();
        assert!(table.starts_with("param"));
        assert!(table.contains("P41:"));
        assert!(table.contains("Run current"));
    }

    #[tokio::test]
    async fn test_device_comparison_and_reset() {
        let (bus, axis) = ready_axis().await;
        let address = axis.address();
        bus.set_register(address, AxisSelector::X, registry::VELOCITY, 1500.0);

        let configurator = Configurator::new(&axis);
        let report = configurator.compare_with_device().await.unwrap();
        let changed: Vec<&ConfigRow> = report.changed().collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "velocity");
        assert_eq!(changed[0].current, 1500.0);
        assert_eq!(bus.log().len(), DEFAULT_CONFIG.len());

        let written = configurator.reset_to_default().await.unwrap();
        assert_eq!(written, DEFAULT_CONFIG.len());
        assert_eq!(
            bus.register(address, AxisSelector::X, registry::VELOCITY),
            Some(4000.0)
        );
        assert!(configurator.compare_with_device().await.unwrap().is_default());

        bus.clear_log();
        configurator.save_to_flash().await.unwrap();
        assert_eq!(bus.log(), vec!["3SA"]);
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let (_bus, axis) = ready_axis().await;
        let report = Configurator::new(&axis).compare_with_device().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["rows"][0]["register"], 1);
        assert_eq!(json["rows"][0]["changed"], false);
    }
}
