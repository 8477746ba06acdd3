use std::fmt;

use serde::{Deserialize, Serialize};

use super::frame::Literal;
use super::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Plus => Direction::Minus,
            Direction::Minus => Direction::Plus,
        }
    }

    /// Reverse the direction for axes wired the other way round.
    pub fn apply_inversion(self, inverted: bool) -> Self {
        if inverted {
            self.reversed()
        } else {
            self
        }
    }

    pub fn sign(self) -> char {
        match self {
            Direction::Plus => '+',
            Direction::Minus => '-',
        }
    }

    fn from_sign(c: char) -> Option<Self> {
        match c {
            '+' => Some(Direction::Plus),
            '-' => Some(Direction::Minus),
            _ => None,
        }
    }
}

/// Controller command mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ReadRegister(u8),
    WriteRegister(u8),
    MoveAbsolute,
    /// Relative move; the literal carries the distance magnitude.
    MoveRelative(Direction),
    Jog(Direction),
    Home {
        direction: Direction,
        encoder_sync: bool,
    },
    /// Stop with the programmed deceleration ramp.
    Stop,
    /// Stop immediately without a ramp.
    Abort,
    ExtendedStatus,
    FirmwareVersion,
    SaveParameters,
}

/// Suffix that makes a reference run also zero the incremental encoder.
pub const ENCODER_SYNC_FLAG: &str = "^I";

impl Opcode {
    pub fn is_motion(self) -> bool {
        matches!(
            self,
            Opcode::MoveAbsolute | Opcode::MoveRelative(_) | Opcode::Jog(_) | Opcode::Home { .. }
        )
    }

    pub fn is_halt(self) -> bool {
        matches!(self, Opcode::Stop | Opcode::Abort)
    }

    /// Whether the opcode addresses the module rather than one axis.
    pub fn is_module_wide(self) -> bool {
        matches!(
            self,
            Opcode::ExtendedStatus | Opcode::FirmwareVersion | Opcode::SaveParameters
        )
    }

    /// Parse the opcode and trailing literal of a command body.
    pub fn parse(body: &str) -> Result<(Opcode, Option<Literal>), ProtocolError> {
        let malformed = || ProtocolError::Malformed(format!("unknown command {:?}", body));

        let fixed = [
            ("IVR", Opcode::FirmwareVersion),
            ("SE", Opcode::ExtendedStatus),
            ("SA", Opcode::SaveParameters),
            ("SN", Opcode::Abort),
            ("S", Opcode::Stop),
        ];
        for (mnemonic, opcode) in fixed {
            if body == mnemonic {
                return Ok((opcode, None));
            }
        }

        if let Some(rest) = body.strip_prefix('P') {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let register: u8 = digits.parse().map_err(|_| malformed())?;
            let tail = &rest[digits.len()..];
            return match tail.split_at_checked(1) {
                Some(("R", "")) => Ok((Opcode::ReadRegister(register), None)),
                Some(("S", value)) => Ok((
                    Opcode::WriteRegister(register),
                    Some(parse_literal(value, Literal::Exact).ok_or_else(malformed)?),
                )),
                _ => Err(malformed()),
            };
        }

        if let Some(value) = body.strip_prefix('A') {
            return Ok((
                Opcode::MoveAbsolute,
                Some(parse_literal(value, Literal::Float).ok_or_else(malformed)?),
            ));
        }

        if let Some(rest) = body.strip_prefix('L') {
            let direction = single_sign(rest).ok_or_else(malformed)?;
            return Ok((Opcode::Jog(direction), None));
        }

        if let Some(rest) = body.strip_prefix('0') {
            let (sign, flag) = rest.split_at_checked(1).ok_or_else(malformed)?;
            let direction = single_sign(sign).ok_or_else(malformed)?;
            let encoder_sync = match flag {
                "" => false,
                ENCODER_SYNC_FLAG => true,
                _ => return Err(malformed()),
            };
            return Ok((
                Opcode::Home {
                    direction,
                    encoder_sync,
                },
                None,
            ));
        }

        let mut chars = body.chars();
        if let Some(direction) = chars.next().and_then(Direction::from_sign) {
            let value = parse_literal(chars.as_str(), Literal::Float).ok_or_else(malformed)?;
            return Ok((Opcode::MoveRelative(direction), Some(value)));
        }

        Err(malformed())
    }
}

fn single_sign(s: &str) -> Option<Direction> {
    let mut chars = s.chars();
    let direction = chars.next().and_then(Direction::from_sign)?;
    chars.next().is_none().then_some(direction)
}

fn parse_literal(s: &str, fractional: fn(f64) -> Literal) -> Option<Literal> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(Literal::Int(v));
    }
    s.parse::<f64>().ok().map(fractional)
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::ReadRegister(n) => write!(f, "P{}R", n),
            Opcode::WriteRegister(n) => write!(f, "P{}S", n),
            Opcode::MoveAbsolute => write!(f, "A"),
            Opcode::MoveRelative(direction) => write!(f, "{}", direction.sign()),
            Opcode::Jog(direction) => write!(f, "L{}", direction.sign()),
            Opcode::Home {
                direction,
                encoder_sync,
            } => {
                write!(f, "0{}", direction.sign())?;
                if *encoder_sync {
                    write!(f, "{}", ENCODER_SYNC_FLAG)?;
                }
                Ok(())
            }
            Opcode::Stop => write!(f, "S"),
            Opcode::Abort => write!(f, "SN"),
            Opcode::ExtendedStatus => write!(f, "SE"),
            Opcode::FirmwareVersion => write!(f, "IVR"),
            Opcode::SaveParameters => write!(f, "SA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::ReadRegister(20).to_string(), "P20R");
        assert_eq!(Opcode::WriteRegister(41).to_string(), "P41S");
        assert_eq!(Opcode::Jog(Direction::Minus).to_string(), "L-");
        assert_eq!(
            Opcode::Home {
                direction: Direction::Plus,
                encoder_sync: true
            }
            .to_string(),
            "0+^I"
        );
        assert_eq!(Opcode::Abort.to_string(), "SN");
    }

    #[test]
    fn test_parse_register_commands() {
        assert_eq!(
            Opcode::parse("P2R").unwrap(),
            (Opcode::ReadRegister(2), None)
        );
        assert_eq!(
            Opcode::parse("P15S4000").unwrap(),
            (Opcode::WriteRegister(15), Some(Literal::Int(4000)))
        );
        assert_eq!(
            Opcode::parse("P3S0.5000").unwrap(),
            (Opcode::WriteRegister(3), Some(Literal::Exact(0.5)))
        );
        assert!(Opcode::parse("P15X").is_err());
    }

    #[test]
    fn test_parse_motion_commands() {
        assert_eq!(
            Opcode::parse("A-12.5000").unwrap(),
            (Opcode::MoveAbsolute, Some(Literal::Float(-12.5)))
        );
        assert_eq!(
            Opcode::parse("-200").unwrap(),
            (Opcode::MoveRelative(Direction::Minus), Some(Literal::Int(200)))
        );
        assert_eq!(
            Opcode::parse("0-").unwrap(),
            (
                Opcode::Home {
                    direction: Direction::Minus,
                    encoder_sync: false
                },
                None
            )
        );
        assert_eq!(
            Opcode::parse("L+").unwrap(),
            (Opcode::Jog(Direction::Plus), None)
        );
        assert_eq!(Opcode::parse("SN").unwrap(), (Opcode::Abort, None));
        assert!(Opcode::parse("Q").is_err());
    }

    #[test]
    fn test_direction_inversion() {
        assert_eq!(Direction::Plus.apply_inversion(true), Direction::Minus);
        assert_eq!(Direction::Plus.apply_inversion(false), Direction::Plus);
    }
}
