//! Static description of the MCC-2 parameter registers.
//!
//! Each register has a raw representation on the wire and an engineering
//! representation exposed to callers. [`ParameterSpec::encode`] validates the
//! engineering value before anything is sent; [`ParameterSpec::decode`]
//! interprets a raw value read back from the controller.

pub mod position;
pub mod units;

use std::fmt;

use serde::Serialize;

use crate::error::{ConfigurationError, Error, ProtocolError, ValidationError};
use crate::protocol::frame::Literal;
use units::{EncoderKind, MovementUnit};

pub const MOVEMENT_TYPE: u8 = 1;
pub const MOVEMENT_UNIT: u8 = 2;
pub const STEPS_PER_UNIT: u8 = 3;
pub const VELOCITY: u8 = 14;
pub const ACCELERATION: u8 = 15;
pub const BACKLASH: u8 = 25;
pub const ENCODER_TYPE: u8 = 34;
pub const HOLD_CURRENT: u8 = 40;
pub const RUN_CURRENT: u8 = 41;
pub const BOOST_CURRENT: u8 = 42;

const MAX_FREQUENCY_HZ: f64 = 40_000.0;
const MIN_RAMP_HZ_S: f64 = 4_000.0;
const MAX_RAMP_HZ_S: f64 = 500_000.0;
const MAX_CURRENT_A: f64 = 2.5;
const COUNTER_LIMIT: f64 = 2_147_483_647.0;

/// How a register's raw value maps onto its engineering value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Raw integer, no scaling.
    Integer,
    /// Raw decimal number, no scaling.
    Decimal,
    /// Amps; raw value is tenths of an amp.
    Tenths,
    /// Engineering value is the reciprocal of the raw value.
    Reciprocal,
    Unit,
    Encoder,
}

/// Engineering value of a register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Unit(MovementUnit),
    Encoder(EncoderKind),
}

impl ParameterValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            ParameterValue::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric form used by the collaborator-facing attribute accessors.
    pub fn to_f64(self) -> f64 {
        match self {
            ParameterValue::Number(v) => v,
            ParameterValue::Unit(unit) => f64::from(unit.raw()),
            ParameterValue::Encoder(kind) => f64::from(kind.raw()),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<MovementUnit> for ParameterValue {
    fn from(unit: MovementUnit) -> Self {
        ParameterValue::Unit(unit)
    }
}

impl From<EncoderKind> for ParameterValue {
    fn from(kind: EncoderKind) -> Self {
        ParameterValue::Encoder(kind)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(v) => write!(f, "{}", v),
            ParameterValue::Unit(unit) => write!(f, "{}", unit),
            ParameterValue::Encoder(kind) => write!(f, "{}", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub number: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub scaling: Scaling,
    /// Inclusive bounds of the engineering value.
    pub min: f64,
    pub max: f64,
}

impl ParameterSpec {
    const fn new(
        number: u8,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
        scaling: Scaling,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            number,
            name,
            description,
            unit,
            scaling,
            min,
            max,
        }
    }

    fn check_range(&self, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ValidationError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn wrong_kind(&self) -> ValidationError {
        let expected = match self.scaling {
            Scaling::Unit => "movement unit",
            Scaling::Encoder => "encoder type",
            _ => "numeric",
        };
        ValidationError::WrongKind {
            register: self.number,
            expected,
        }
    }

    /// Convert an engineering value into the literal written to the register.
    pub fn encode(&self, value: ParameterValue) -> Result<Literal, ValidationError> {
        match (self.scaling, value) {
            (Scaling::Unit, ParameterValue::Unit(unit)) => Ok(Literal::Int(unit.raw().into())),
            (Scaling::Encoder, ParameterValue::Encoder(kind)) => {
                Ok(Literal::Int(kind.raw().into()))
            }
            (Scaling::Integer, ParameterValue::Number(v)) => {
                self.check_range(v)?;
                Ok(Literal::Int(v.round() as i64))
            }
            (Scaling::Decimal, ParameterValue::Number(v)) => {
                self.check_range(v)?;
                Ok(Literal::exact(v))
            }
            (Scaling::Tenths, ParameterValue::Number(amps)) => {
                self.check_range(amps)?;
                Ok(Literal::Int((amps * 10.0).round() as i64))
            }
            (Scaling::Reciprocal, ParameterValue::Number(v)) => {
                self.check_range(v)?;
                let raw = 1.0 / v;
                if raw == 0.0 || !raw.is_finite() {
                    return Err(ValidationError::OutOfRange {
                        value: v,
                        min: self.min,
                        max: self.max,
                    });
                }
                Ok(Literal::exact(raw))
            }
            _ => Err(self.wrong_kind()),
        }
    }

    /// Interpret a raw register value read from the controller.
    pub fn decode(&self, raw: f64) -> Result<ParameterValue, ProtocolError> {
        let bad_raw = || {
            ProtocolError::Malformed(format!("P{} returned invalid value {}", self.number, raw))
        };
        match self.scaling {
            Scaling::Integer | Scaling::Decimal => Ok(ParameterValue::Number(raw)),
            Scaling::Tenths => Ok(ParameterValue::Number(raw / 10.0)),
            Scaling::Reciprocal if raw == 0.0 => Err(bad_raw()),
            Scaling::Reciprocal => Ok(ParameterValue::Number(1.0 / raw)),
            Scaling::Unit => as_small_int(raw)
                .and_then(MovementUnit::from_raw)
                .map(ParameterValue::Unit)
                .ok_or_else(bad_raw),
            Scaling::Encoder => as_small_int(raw)
                .and_then(EncoderKind::from_raw)
                .map(ParameterValue::Encoder)
                .ok_or_else(bad_raw),
        }
    }

    /// Check a raw value against the register bounds, for bulk writes that
    /// bypass the engineering representation.
    pub fn validate_raw(&self, raw: f64) -> Result<Literal, ValidationError> {
        let value = self.decode(raw).map_err(|_| ValidationError::OutOfRange {
            value: raw,
            min: self.min,
            max: self.max,
        })?;
        if let ParameterValue::Number(v) = value {
            self.check_range(v)?;
        }
        Ok(Literal::exact(raw))
    }

    /// Parse text entered by an operator, e.g. `"mm"` or `"1.5"`.
    pub fn parse_value(&self, text: &str) -> Result<ParameterValue, Error> {
        match self.scaling {
            Scaling::Unit => Ok(ParameterValue::Unit(text.parse()?)),
            Scaling::Encoder => Ok(ParameterValue::Encoder(text.parse()?)),
            _ => text
                .trim()
                .parse::<f64>()
                .map(ParameterValue::Number)
                .map_err(|_| self.wrong_kind().into()),
        }
    }
}

fn as_small_int(raw: f64) -> Option<u8> {
    (raw.fract() == 0.0 && (0.0..=255.0).contains(&raw)).then_some(raw as u8)
}

use Scaling::{Decimal, Encoder, Integer, Reciprocal, Tenths, Unit};

pub static REGISTERS: &[ParameterSpec] = &[
    ParameterSpec::new(1, "movement_type", "Type of movement", "", Integer, 0.0, 1.0),
    ParameterSpec::new(2, "movement_unit", "Measuring units of movement", "", Unit, 1.0, 4.0),
    ParameterSpec::new(
        3,
        "steps_per_unit",
        "Conversion factor for the thread",
        "steps/unit",
        Reciprocal,
        0.0001,
        1_000_000.0,
    ),
    ParameterSpec::new(4, "start_stop_frequency", "Start/stop frequency", "Hz", Integer, 0.0, MAX_FREQUENCY_HZ),
    ParameterSpec::new(7, "emergency_stop_ramp", "Emergency stop ramp", "Hz/s", Integer, MIN_RAMP_HZ_S, MAX_RAMP_HZ_S),
    ParameterSpec::new(8, "homing_frequency", "fmax MOP (mechanical zero point)", "Hz", Integer, 0.0, MAX_FREQUENCY_HZ),
    ParameterSpec::new(9, "homing_ramp", "Ramp MOP", "Hz/s", Integer, MIN_RAMP_HZ_S, MAX_RAMP_HZ_S),
    ParameterSpec::new(10, "homing_leave_frequency", "fmin MOP for leaving the limit switch range", "Hz", Integer, 0.0, MAX_FREQUENCY_HZ),
    ParameterSpec::new(11, "homing_offset_plus", "MOP offset for limit switch direction +", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(12, "homing_offset_minus", "MOP offset for limit switch direction -", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(13, "homing_recovery_time", "Recovery time MOP", "ms", Integer, 0.0, 65_535.0),
    ParameterSpec::new(14, "velocity", "fmax run frequency during program operation", "Hz", Integer, 0.0, MAX_FREQUENCY_HZ),
    ParameterSpec::new(15, "acceleration", "Ramp for run frequency", "Hz/s", Integer, MIN_RAMP_HZ_S, MAX_RAMP_HZ_S),
    ParameterSpec::new(16, "position_recovery_time", "Recovery time position", "ms", Integer, 0.0, 65_535.0),
    ParameterSpec::new(17, "boost", "Boost (defined in P42)", "", Integer, 0.0, 1.0),
    ParameterSpec::new(19, "electrical_zero_counter", "Electrical zero counter", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(20, "mechanical_zero_counter", "Mechanical zero counter", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(21, "absolute_counter", "Absolute counter", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(22, "encoder_counter", "Encoder counter", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(23, "software_limit_plus", "Axial limitation pos. direction +", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(24, "software_limit_minus", "Axial limitation neg. direction -", "unit", Decimal, -COUNTER_LIMIT, COUNTER_LIMIT),
    ParameterSpec::new(25, "backlash", "Compensation for play", "unit", Decimal, 0.0, COUNTER_LIMIT),
    ParameterSpec::new(27, "initiator_type", "Initiator type", "", Integer, 0.0, 1.0),
    ParameterSpec::new(34, "encoder_type", "Encoder type", "", Encoder, 0.0, 3.0),
    ParameterSpec::new(35, "encoder_resolution", "Encoder resolution for SSI encoder", "bit", Integer, 0.0, 32.0),
    ParameterSpec::new(36, "encoder_function", "Encoder function", "", Integer, 0.0, 1.0),
    ParameterSpec::new(38, "encoder_direction", "Encoder preferential direction of rotation", "", Integer, 0.0, 1.0),
    ParameterSpec::new(39, "encoder_conversion_factor", "Encoder conversion factor", "", Decimal, 0.0, 1_000_000.0),
    ParameterSpec::new(40, "hold_current", "Stop current", "A", Tenths, 0.0, MAX_CURRENT_A),
    ParameterSpec::new(41, "run_current", "Run current", "A", Tenths, 0.0, MAX_CURRENT_A),
    ParameterSpec::new(42, "boost_current", "Boost current", "A", Tenths, 0.0, MAX_CURRENT_A),
    ParameterSpec::new(43, "current_delay_time", "Current delay time", "ms", Integer, 0.0, 65_535.0),
    ParameterSpec::new(45, "step_resolution", "Step resolution 1 to 256", "", Integer, 1.0, 256.0),
    ParameterSpec::new(46, "current_shaping", "Current shaping", "", Integer, 0.0, 1.0),
    ParameterSpec::new(47, "chopper_frequency", "Chopper frequency", "", Integer, 0.0, 15.0),
];

pub fn lookup(number: u8) -> Result<&'static ParameterSpec, ConfigurationError> {
    REGISTERS
        .iter()
        .find(|spec| spec.number == number)
        .ok_or(ConfigurationError::UnknownRegister(number))
}

pub fn by_name(name: &str) -> Option<&'static ParameterSpec> {
    REGISTERS.iter().find(|spec| spec.name == name)
}
