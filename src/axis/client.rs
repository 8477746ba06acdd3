//! Command dispatcher for one motor axis.
//!
//! Inversion is applied here and nowhere else: positions are negated on the
//! way in and out, jog/home directions are reversed, and the limit switch
//! flags are swapped by the status decoder. Callers above this layer never
//! see the physical wiring.

use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::config::AxisConfig;
use super::state::{AxisStateMachine, DeviceState};
use crate::error::{Error, ProtocolError, Result, ValidationError};
use crate::protocol::frame::{AxisSelector, Literal, ModuleAddress, Target};
use crate::protocol::opcode::{Direction, Opcode};
use crate::protocol::{decode_response, encode_request};
use crate::registry::position::{position_register, FirmwareGeneration};
use crate::registry::units::{EncoderKind, MovementUnit};
use crate::registry::{self, ParameterValue};
use crate::status::{decode_status, Status};
use crate::transport::{self, SharedTransport};

/// How a position should be rendered for this axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFormat {
    pub unit: MovementUnit,
    pub decimals: usize,
}

impl DisplayFormat {
    pub fn format(&self, value: f64) -> String {
        format!(
            "{:8.*} {}",
            self.decimals,
            value,
            self.unit.display_label()
        )
    }
}

fn finite(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite(value))
    }
}

/// Result of one [`Mcc2Axis::refresh`] cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSnapshot {
    pub state: DeviceState,
    pub position: f64,
    pub status: Status,
}

#[derive(Debug)]
struct AxisRuntime {
    machine: AxisStateMachine,
    initializing: bool,
    status: Status,
    firmware: FirmwareGeneration,
    encoder: EncoderKind,
    unit: MovementUnit,
    /// Raw spindle pitch (P3), kept for display formatting only.
    pitch: Option<f64>,
}

pub struct Mcc2Axis {
    config: AxisConfig,
    address: ModuleAddress,
    read_timeout: Duration,
    transport: SharedTransport,
    runtime: RwLock<AxisRuntime>,
}

impl Mcc2Axis {
    pub fn new(
        address: ModuleAddress,
        config: AxisConfig,
        transport: SharedTransport,
        read_timeout: Duration,
    ) -> Self {
        let runtime = AxisRuntime {
            machine: AxisStateMachine::new(),
            initializing: false,
            status: Status::default(),
            firmware: config.firmware.unwrap_or_default(),
            encoder: config.encoder.unwrap_or_default(),
            unit: MovementUnit::Step,
            pitch: None,
        };
        Self {
            config,
            address,
            read_timeout,
            transport,
            runtime: RwLock::new(runtime),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn address(&self) -> ModuleAddress {
        self.address
    }

    pub fn selector(&self) -> AxisSelector {
        self.config.selector
    }

    pub fn is_inverted(&self) -> bool {
        self.config.inverted
    }

    pub async fn state(&self) -> DeviceState {
        self.runtime.read().await.machine.state()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.runtime
            .read()
            .await
            .machine
            .last_error()
            .map(str::to_string)
    }

    /// Flags of the most recent status poll.
    pub async fn last_status(&self) -> Status {
        self.runtime.read().await.status
    }

    pub async fn encoder(&self) -> EncoderKind {
        self.runtime.read().await.encoder
    }

    pub async fn firmware(&self) -> FirmwareGeneration {
        self.runtime.read().await.firmware
    }

    pub async fn movement_unit(&self) -> MovementUnit {
        self.runtime.read().await.unit
    }

    pub async fn steps_per_unit(&self) -> Option<f64> {
        self.runtime.read().await.pitch.map(|pitch| 1.0 / pitch)
    }

    /// Whole numbers when the spindle pitch is integral, three decimals otherwise.
    pub async fn display_format(&self) -> DisplayFormat {
        let runtime = self.runtime.read().await;
        let integral = runtime.pitch.map_or(true, |pitch| pitch.fract() == 0.0);
        DisplayFormat {
            unit: runtime.unit,
            decimals: if integral { 0 } else { 3 },
        }
    }

    fn invert(&self, value: f64) -> f64 {
        if self.config.inverted {
            -value
        } else {
            value
        }
    }

    /// Bring the axis from `Off` to `On`.
    ///
    /// Opens the transport if needed and checks the firmware marker in the
    /// version answer. Any failure leaves the axis `Off`; the caller is
    /// expected to treat that as fatal for this axis.
    pub async fn init(&self) -> Result<()> {
        self.runtime.write().await.initializing = true;
        let result = self.run_init().await;

        let mut runtime = self.runtime.write().await;
        runtime.initializing = false;
        match &result {
            Ok(()) => {
                runtime.machine.initialized();
                info!(
                    axis = %self.config.name,
                    address = %self.address,
                    selector = %self.config.selector,
                    encoder = %runtime.encoder,
                    unit = %runtime.unit,
                    "Axis initialized"
                );
            }
            Err(e) => {
                error!(axis = %self.config.name, error = %e, "Axis initialization failed");
                runtime.machine.init_failed(e.to_string());
            }
        }
        result
    }

    async fn run_init(&self) -> Result<()> {
        transport::ensure_open(&self.transport).await?;

        let version = self.firmware_version().await?;
        if !version.contains(&self.config.firmware_marker) {
            return Err(Error::FirmwareMismatch(version));
        }
        let firmware = self
            .config
            .firmware
            .or_else(|| FirmwareGeneration::from_version(&version))
            .unwrap_or_default();
        self.runtime.write().await.firmware = firmware;
        debug!(axis = %self.config.name, version = %version, ?firmware, "Firmware identified");

        if self.config.encoder.is_none() {
            self.read_parameter(registry::ENCODER_TYPE).await?;
        }
        self.read_parameter(registry::MOVEMENT_UNIT).await?;
        self.read_parameter(registry::STEPS_PER_UNIT).await?;
        self.read_position().await?;
        self.read_status().await?;
        Ok(())
    }

    /// Single exchange with the controller.
    ///
    /// Holds the transport lock for the full round trip and feeds the
    /// outcome into the state machine.
    async fn send(&self, target: Target, opcode: Opcode, literal: Option<Literal>) -> Result<String> {
        {
            let runtime = self.runtime.read().await;
            if runtime.machine.state() == DeviceState::Off && !runtime.initializing {
                return Err(Error::NotInitialized(self.config.name.clone()));
            }
        }

        let frame = encode_request(self.address, target, opcode, literal);
        debug!(
            axis = %self.config.name,
            request = %String::from_utf8_lossy(&frame[1..frame.len() - 1]),
            "Sending request"
        );

        let result = {
            let mut transport = self.transport.lock().await;
            transport.write_read(&frame, self.read_timeout).await
        }
        .and_then(|raw| decode_response(&raw).map_err(Error::from));

        match &result {
            Ok(answer) => {
                debug!(axis = %self.config.name, answer = %answer, "Acknowledged");
                self.runtime.write().await.machine.acknowledged(opcode);
            }
            Err(e) => {
                warn!(axis = %self.config.name, %opcode, error = %e, "Request failed");
                self.runtime.write().await.machine.failed(e.to_string());
            }
        }
        result
    }

    async fn send_axis(&self, opcode: Opcode, literal: Option<Literal>) -> Result<String> {
        self.send(Target::Axis(self.config.selector), opcode, literal)
            .await
    }

    /// Fault the axis for an acknowledged answer that cannot be interpreted.
    async fn checked<T>(&self, result: Result<T, ProtocolError>) -> Result<T> {
        if let Err(e) = &result {
            warn!(axis = %self.config.name, error = %e, "Unusable answer");
            self.runtime.write().await.machine.failed(e.to_string());
        }
        Ok(result?)
    }

    /// Send command text such as `XP14R` or `SE` and return the answer.
    ///
    /// The module address is added here; an axis selector in the text is
    /// taken as given.
    pub async fn send_command(&self, text: &str) -> Result<String> {
        let text = text.trim();
        let unknown = || ValidationError::UnknownCommand(text.to_string());
        let (target, body) = match text.chars().next() {
            Some(c @ ('X' | 'x' | 'Y' | 'y')) => {
                let selector = c.to_string().parse().map_err(|_| unknown())?;
                (Target::Axis(selector), &text[1..])
            }
            _ => (Target::Module, text),
        };
        let (opcode, literal) = Opcode::parse(body).map_err(|_| unknown())?;
        if opcode.is_module_wide() != (target == Target::Module) {
            return Err(unknown().into());
        }
        if let Opcode::ReadRegister(register) | Opcode::WriteRegister(register) = opcode {
            let spec = registry::lookup(register)?;
            if let Some(literal) = literal {
                spec.validate_raw(literal.as_f64())?;
            }
        }
        if let Some(literal) = literal {
            finite(literal.as_f64())?;
        }

        let answer = self.send(target, opcode, literal).await?;
        if let (Opcode::WriteRegister(register), Some(literal)) = (opcode, literal) {
            self.remember(register, literal.as_f64()).await;
        }
        Ok(answer)
    }

    pub async fn firmware_version(&self) -> Result<String> {
        self.send(Target::Module, Opcode::FirmwareVersion, None).await
    }

    /// Persist all register values of the module to its flash memory.
    pub async fn save_parameters(&self) -> Result<()> {
        self.send(Target::Module, Opcode::SaveParameters, None)
            .await?;
        info!(address = %self.address, "Parameters written to flash");
        Ok(())
    }

    /// Raw register value, without scaling.
    pub async fn read_raw(&self, register: u8) -> Result<f64> {
        registry::lookup(register)?;
        let answer = self
            .send_axis(Opcode::ReadRegister(register), None)
            .await?;
        let parsed = answer.trim().parse::<f64>().map_err(|_| {
            ProtocolError::Malformed(format!("P{} answered {:?}", register, answer))
        });
        self.checked(parsed).await
    }

    /// Write a raw register value after checking it against the register bounds.
    pub async fn write_raw(&self, register: u8, raw: f64) -> Result<()> {
        let literal = registry::lookup(register)?.validate_raw(raw)?;
        self.send_axis(Opcode::WriteRegister(register), Some(literal))
            .await?;
        self.remember(register, raw).await;
        Ok(())
    }

    pub async fn read_parameter(&self, register: u8) -> Result<ParameterValue> {
        let spec = registry::lookup(register)?;
        let raw = self.read_raw(register).await?;
        let value = self.checked(spec.decode(raw)).await?;
        self.remember(register, raw).await;
        Ok(value)
    }

    /// Validate, encode and write an engineering value.
    ///
    /// Out-of-range values are rejected before anything is sent.
    pub async fn write_parameter(
        &self,
        register: u8,
        value: impl Into<ParameterValue>,
    ) -> Result<()> {
        let spec = registry::lookup(register)?;
        let literal = spec.encode(value.into())?;
        self.send_axis(Opcode::WriteRegister(register), Some(literal))
            .await?;
        self.remember(register, literal.as_f64()).await;
        Ok(())
    }

    /// Write a value given as text, e.g. `"mm"` for the movement unit.
    pub async fn write_parameter_str(&self, register: u8, text: &str) -> Result<()> {
        let value = registry::lookup(register)?.parse_value(text)?;
        self.write_parameter(register, value).await
    }

    /// Keep the few register values needed locally in sync with the controller.
    async fn remember(&self, register: u8, raw: f64) {
        let mut runtime = self.runtime.write().await;
        match register {
            registry::MOVEMENT_UNIT => {
                if let Some(unit) = u8::try_from(raw as i64).ok().and_then(MovementUnit::from_raw) {
                    runtime.unit = unit;
                }
            }
            registry::STEPS_PER_UNIT if raw != 0.0 => runtime.pitch = Some(raw),
            registry::ENCODER_TYPE if self.config.encoder.is_none() => {
                if let Some(kind) = u8::try_from(raw as i64).ok().and_then(EncoderKind::from_raw) {
                    runtime.encoder = kind;
                }
            }
            _ => {}
        }
    }

    pub async fn set_movement_unit(&self, unit: MovementUnit) -> Result<()> {
        self.write_parameter(registry::MOVEMENT_UNIT, unit).await
    }

    pub async fn set_steps_per_unit(&self, steps_per_unit: f64) -> Result<()> {
        self.write_parameter(registry::STEPS_PER_UNIT, steps_per_unit)
            .await
    }

    /// Register that holds the authoritative position for this axis.
    pub async fn position_register(&self) -> u8 {
        let runtime = self.runtime.read().await;
        position_register(
            runtime.firmware,
            runtime.encoder,
            self.config.position_source,
        )
    }

    pub async fn read_position(&self) -> Result<f64> {
        let register = self.position_register().await;
        let raw = self.read_raw(register).await?;
        Ok(self.invert(raw))
    }

    /// Overwrite the position counter without moving.
    pub async fn set_position(&self, value: f64) -> Result<()> {
        let register = self.position_register().await;
        self.write_parameter(register, self.invert(value)).await
    }

    /// Start a move to `target`; completion is observed through status polls.
    ///
    /// Axes with an incremental encoder cannot be targeted absolutely, so the
    /// distance to the current position is sent as a relative move instead.
    pub async fn move_absolute(&self, target: f64) -> Result<()> {
        let raw_target = self.invert(finite(target)?);
        if self.encoder().await == EncoderKind::Incremental {
            let register = self.position_register().await;
            let current = self.read_raw(register).await?;
            return self.move_relative_raw(raw_target - current).await;
        }
        self.send_axis(Opcode::MoveAbsolute, Some(Literal::from_f64(raw_target)))
            .await?;
        Ok(())
    }

    pub async fn move_relative(&self, distance: f64) -> Result<()> {
        self.move_relative_raw(self.invert(distance)).await
    }

    async fn move_relative_raw(&self, delta: f64) -> Result<()> {
        let delta = finite(delta)?;
        let direction = if delta < 0.0 {
            Direction::Minus
        } else {
            Direction::Plus
        };
        self.send_axis(
            Opcode::MoveRelative(direction),
            Some(Literal::from_f64(delta.abs())),
        )
        .await?;
        Ok(())
    }

    /// Run continuously in `direction` until stopped.
    pub async fn jog(&self, direction: Direction) -> Result<()> {
        let direction = direction.apply_inversion(self.config.inverted);
        self.send_axis(Opcode::Jog(direction), None).await?;
        Ok(())
    }

    /// Reference run towards the limit switch in `direction`.
    pub async fn home(&self, direction: Direction) -> Result<()> {
        let opcode = Opcode::Home {
            direction: direction.apply_inversion(self.config.inverted),
            encoder_sync: self.encoder().await == EncoderKind::Incremental,
        };
        self.send_axis(opcode, None).await?;
        Ok(())
    }

    /// Stop with the programmed deceleration ramp.
    pub async fn stop(&self) -> Result<()> {
        self.send_axis(Opcode::Stop, None).await?;
        Ok(())
    }

    /// Stop immediately.
    pub async fn abort(&self) -> Result<()> {
        self.send_axis(Opcode::Abort, None).await?;
        Ok(())
    }

    /// Poll the extended status and update the device state.
    pub async fn read_status(&self) -> Result<Status> {
        let answer = self
            .send(Target::Module, Opcode::ExtendedStatus, None)
            .await?;
        let status = self
            .checked(decode_status(
                &answer,
                self.config.selector,
                self.config.inverted,
            ))
            .await?;

        let mut runtime = self.runtime.write().await;
        runtime.status = status;
        runtime.machine.status_polled(status.moving);
        Ok(status)
    }

    /// Position read followed by a status poll; meant to be called at a
    /// regular cadence by the owner of the axis.
    pub async fn refresh(&self) -> Result<AxisSnapshot> {
        let position = self.read_position().await?;
        let status = self.read_status().await?;
        Ok(AxisSnapshot {
            state: self.state().await,
            position,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigurationError, ValidationError};
    use crate::transport::sim::SimulatedBus;

    const FIRMWARE: &str = "MCC2 V3.1";

    fn addr() -> ModuleAddress {
        ModuleAddress::new(0).unwrap()
    }

    fn setup(config: AxisConfig) -> (SimulatedBus, Mcc2Axis) {
        let bus = SimulatedBus::new().with_module(addr(), FIRMWARE);
        let transport = transport::shared(bus.transport());
        let axis = Mcc2Axis::new(addr(), config, transport, Duration::from_millis(50));
        (bus, axis)
    }

    async fn ready(config: AxisConfig) -> (SimulatedBus, Mcc2Axis) {
        let (bus, axis) = setup(config);
        axis.init().await.unwrap();
        bus.clear_log();
        (bus, axis)
    }

    #[tokio::test]
    async fn test_init_reads_configuration() {
        let (bus, axis) = setup(AxisConfig::new("x", AxisSelector::X));
        bus.set_register(addr(), AxisSelector::X, registry::MOVEMENT_UNIT, 2.0);
        bus.set_register(addr(), AxisSelector::X, registry::STEPS_PER_UNIT, 0.0025);
        bus.set_register(addr(), AxisSelector::X, registry::ENCODER_TYPE, 2.0);

        axis.init().await.unwrap();

        assert_eq!(axis.state().await, DeviceState::On);
        assert_eq!(axis.movement_unit().await, MovementUnit::Mm);
        assert_eq!(axis.encoder().await, EncoderKind::AbsoluteBinary);
        assert_eq!(axis.steps_per_unit().await, Some(400.0));
        assert_eq!(axis.display_format().await.decimals, 3);
        assert_eq!(axis.position_register().await, 22);
        assert_eq!(bus.log()[0], "0IVR");
    }

    #[tokio::test]
    async fn test_init_without_marker_stays_off() {
        let bus = SimulatedBus::new().with_module(addr(), "SMC 1.0");
        let transport = transport::shared(bus.transport());
        let axis = Mcc2Axis::new(
            addr(),
            AxisConfig::new("x", AxisSelector::X),
            transport,
            Duration::from_millis(50),
        );

        let result = axis.init().await;
        assert!(matches!(result, Err(Error::FirmwareMismatch(_))));
        assert_eq!(axis.state().await, DeviceState::Off);

        bus.clear_log();
        assert!(matches!(
            axis.stop().await,
            Err(Error::NotInitialized(_))
        ));
        assert!(bus.log().is_empty());
    }

    #[tokio::test]
    async fn test_init_fails_when_port_cannot_open() {
        let (bus, axis) = setup(AxisConfig::new("x", AxisSelector::X));
        bus.set_fail_open(true);
        assert!(matches!(axis.init().await, Err(Error::Transport(_))));
        assert_eq!(axis.state().await, DeviceState::Off);
        assert!(axis.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_run_current_out_of_range_sends_nothing() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;

        let result = axis.write_parameter(registry::RUN_CURRENT, 2.6).await;
        match result {
            Err(Error::Validation(ValidationError::OutOfRange { min, max, .. })) => {
                assert_eq!((min, max), (0.0, 2.5));
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert!(bus.log().is_empty());
        assert_eq!(axis.state().await, DeviceState::On);

        axis.write_parameter(registry::RUN_CURRENT, 2.5).await.unwrap();
        assert_eq!(bus.log(), vec!["0XP41S25"]);
        assert_eq!(
            axis.read_parameter(registry::RUN_CURRENT).await.unwrap(),
            ParameterValue::Number(2.5)
        );
    }

    #[tokio::test]
    async fn test_movement_unit_round_trip() {
        let (_bus, axis) = ready(AxisConfig::new("x", AxisSelector::Y)).await;

        axis.write_parameter_str(registry::MOVEMENT_UNIT, "mm")
            .await
            .unwrap();
        let unit = axis.read_parameter(registry::MOVEMENT_UNIT).await.unwrap();
        assert_eq!(unit.to_string(), "mm");
        assert_eq!(axis.movement_unit().await, MovementUnit::Mm);

        let result = axis
            .write_parameter_str(registry::MOVEMENT_UNIT, "cubit")
            .await;
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::UnsupportedUnit(_)))
        ));
    }

    #[tokio::test]
    async fn test_steps_per_unit_writes_reciprocal() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;
        axis.set_steps_per_unit(200.0).await.unwrap();
        assert_eq!(bus.log(), vec!["0XP3S0.005"]);
        assert_eq!(axis.display_format().await.decimals, 3);
    }

    #[tokio::test]
    async fn test_large_steps_per_unit_survives_round_trip() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;

        axis.set_steps_per_unit(50_000.0).await.unwrap();
        assert_eq!(bus.log(), vec!["0XP3S0.00002"]);
        assert_eq!(
            bus.register(addr(), AxisSelector::X, registry::STEPS_PER_UNIT),
            Some(0.00002)
        );
        let value = axis
            .read_parameter(registry::STEPS_PER_UNIT)
            .await
            .unwrap()
            .to_f64();
        assert!((value - 50_000.0).abs() < 1e-6);
        assert_eq!(axis.state().await, DeviceState::On);

        axis.set_steps_per_unit(3.0).await.unwrap();
        let value = axis
            .read_parameter(registry::STEPS_PER_UNIT)
            .await
            .unwrap()
            .to_f64();
        assert!((value - 3.0).abs() < 1e-9);
        assert!((axis.steps_per_unit().await.unwrap() - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_non_finite_targets_are_rejected_locally() {
        let config = AxisConfig::new("x", AxisSelector::X);
        let (bus, axis) = ready(config).await;

        for target in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                axis.move_absolute(target).await,
                Err(Error::Validation(ValidationError::NotFinite(_)))
            ));
            assert!(matches!(
                axis.move_relative(target).await,
                Err(Error::Validation(ValidationError::NotFinite(_)))
            ));
        }
        assert!(bus.log().is_empty());
        assert_eq!(axis.state().await, DeviceState::On);

        let config = AxisConfig::new("x", AxisSelector::Y).with_encoder(EncoderKind::Incremental);
        let (bus, axis) = ready(config).await;
        assert!(axis.move_absolute(f64::NAN).await.is_err());
        assert!(bus.log().is_empty());
    }

    #[tokio::test]
    async fn test_send_command_passes_through() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::Y)).await;

        assert_eq!(axis.send_command("YP14R").await.unwrap(), "4000");
        assert_eq!(axis.send_command("IVR").await.unwrap(), FIRMWARE);
        axis.send_command("YP2S2").await.unwrap();
        assert_eq!(axis.movement_unit().await, MovementUnit::Mm);

        axis.send_command("Y+10").await.unwrap();
        assert_eq!(axis.state().await, DeviceState::Moving);
        assert_eq!(bus.log(), vec!["0YP14R", "0IVR", "0YP2S2", "0Y+10"]);

        bus.clear_log();
        for bad in ["YP41S30", "YANaN", "hello", "YSE", "XP99R"] {
            assert!(axis.send_command(bad).await.is_err(), "{} accepted", bad);
        }
        assert!(bus.log().is_empty());
    }

    #[tokio::test]
    async fn test_send_command_faults_on_nak() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;
        bus.reject_next(1);
        assert!(matches!(
            axis.send_command("XS").await,
            Err(Error::Protocol(ProtocolError::NotAcknowledged))
        ));
        assert_eq!(axis.state().await, DeviceState::Fault);
    }

    #[tokio::test]
    async fn test_inverted_axis_negates_positions() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X).inverted(true)).await;

        axis.move_absolute(10.0).await.unwrap();
        assert_eq!(bus.log(), vec!["0XA-10"]);
        assert_eq!(bus.register(addr(), AxisSelector::X, 20), Some(-10.0));
        assert_eq!(axis.read_position().await.unwrap(), 10.0);

        bus.clear_log();
        axis.set_position(3.5).await.unwrap();
        assert_eq!(bus.log(), vec!["0XP20S-3.5"]);
        assert_eq!(axis.read_position().await.unwrap(), 3.5);
    }

    #[tokio::test]
    async fn test_inverted_axis_reverses_directions() {
        let (bus, axis) = ready(AxisConfig::new("y", AxisSelector::Y).inverted(true)).await;
        axis.jog(Direction::Plus).await.unwrap();
        axis.stop().await.unwrap();
        axis.home(Direction::Minus).await.unwrap();
        assert_eq!(bus.log(), vec!["0YL-", "0YS", "0Y0+"]);
    }

    #[tokio::test]
    async fn test_incremental_encoder_moves_relative() {
        let config = AxisConfig::new("x", AxisSelector::X).with_encoder(EncoderKind::Incremental);
        let (bus, axis) = ready(config).await;
        bus.set_register(addr(), AxisSelector::X, 20, 4.0);

        axis.move_absolute(1.5).await.unwrap();
        assert_eq!(bus.log(), vec!["0XP20R", "0X-2.5000"]);
        assert_eq!(axis.state().await, DeviceState::Moving);

        bus.clear_log();
        axis.home(Direction::Plus).await.unwrap();
        assert_eq!(bus.log(), vec!["0X0+^I"]);
    }

    #[tokio::test]
    async fn test_nak_faults_then_recovers() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;

        bus.reject_next(1);
        let result = axis.read_parameter(registry::VELOCITY).await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::NotAcknowledged))
        ));
        assert_eq!(axis.state().await, DeviceState::Fault);

        axis.read_parameter(registry::VELOCITY).await.unwrap();
        assert_eq!(axis.state().await, DeviceState::On);
    }

    #[tokio::test]
    async fn test_silent_bus_times_out_and_faults() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;
        bus.set_silent(true);
        assert!(matches!(
            axis.read_status().await,
            Err(Error::Protocol(ProtocolError::Timeout(_)))
        ));
        assert_eq!(axis.state().await, DeviceState::Fault);
    }

    #[tokio::test]
    async fn test_status_poll_uses_inverted_limits() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X).inverted(true)).await;
        bus.set_limits(addr(), AxisSelector::X, false, true);
        let status = axis.read_status().await.unwrap();
        assert!(status.limit_minus);
        assert!(!status.limit_plus);
        assert_eq!(axis.last_status().await, status);
    }

    #[tokio::test]
    async fn test_unknown_register_is_rejected_locally() {
        let (bus, axis) = ready(AxisConfig::new("x", AxisSelector::X)).await;
        assert!(matches!(
            axis.read_raw(18).await,
            Err(Error::Configuration(ConfigurationError::UnknownRegister(18)))
        ));
        assert!(bus.log().is_empty());
    }
}
