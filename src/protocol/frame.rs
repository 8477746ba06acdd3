use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::opcode::Opcode;
use crate::error::ConfigurationError;

/// RS-485 address of one MCC-2 module on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ModuleAddress(u8);

impl ModuleAddress {
    pub const MAX: u8 = 15;

    pub fn new(address: u8) -> Result<Self, ConfigurationError> {
        if address > Self::MAX {
            return Err(ConfigurationError::InvalidAddress(address));
        }
        Ok(Self(address))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ModuleAddress {
    type Error = ConfigurationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleAddress> for u8 {
    fn from(address: ModuleAddress) -> Self {
        address.0
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two motor outputs of a module a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisSelector {
    /// Motor 0, upper connector.
    X,
    /// Motor 1, lower connector.
    Y,
}

impl AxisSelector {
    pub fn from_index(index: u8) -> Result<Self, ConfigurationError> {
        match index {
            0 => Ok(AxisSelector::X),
            1 => Ok(AxisSelector::Y),
            other => Err(ConfigurationError::InvalidSelector(other.to_string())),
        }
    }

    pub fn index(self) -> usize {
        match self {
            AxisSelector::X => 0,
            AxisSelector::Y => 1,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            AxisSelector::X => 'X',
            AxisSelector::Y => 'Y',
        }
    }
}

impl FromStr for AxisSelector {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" | "0" => Ok(AxisSelector::X),
            "Y" | "y" | "1" => Ok(AxisSelector::Y),
            other => Err(ConfigurationError::InvalidSelector(other.to_string())),
        }
    }
}

impl fmt::Display for AxisSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Addressee of a command inside one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Module-wide command such as the extended status query.
    Module,
    Axis(AxisSelector),
}

/// Numeric argument appended after the opcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    /// Motion target, sent with four decimals.
    Float(f64),
    /// Register value, sent with every significant digit.
    Exact(f64),
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

impl Literal {
    /// Motion target; integral values are sent without a fractional part.
    pub fn from_f64(value: f64) -> Self {
        if is_integral(value) {
            Literal::Int(value as i64)
        } else {
            Literal::Float(value)
        }
    }

    /// Register value; the controller must store exactly what was asked for.
    pub fn exact(value: f64) -> Self {
        if is_integral(value) {
            Literal::Int(value as i64)
        } else {
            Literal::Exact(value)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Literal::Int(v) => v as f64,
            Literal::Float(v) | Literal::Exact(v) => v,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:.4}", v),
            // shortest round-trip form, never exponent notation
            Literal::Exact(v) => write!(f, "{}", v),
        }
    }
}

/// One request as it travels to the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub address: ModuleAddress,
    pub target: Target,
    pub opcode: Opcode,
    pub literal: Option<Literal>,
}

impl Request {
    pub fn new(address: ModuleAddress, target: Target, opcode: Opcode) -> Self {
        Self {
            address,
            target,
            opcode,
            literal: None,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    /// Command text without framing, e.g. `0XP14S4000`.
    pub fn command_text(&self) -> String {
        let mut text = self.address.to_string();
        if let Target::Axis(selector) = self.target {
            text.push(selector.as_char());
        }
        text.push_str(&self.opcode.to_string());
        if let Some(literal) = self.literal {
            text.push_str(&literal.to_string());
        }
        text
    }
}
