//! Decoding of the extended status (`SE`) answer.
//!
//! One answer covers both axes of a module. Axis 0 reports its motion digit
//! at offset 1 and its limit digit at offset 2; axis 1 uses offsets 5 and 6.

use serde::Serialize;

use crate::error::ProtocolError;
use crate::protocol::frame::AxisSelector;

const MOTION_STOPPED: u8 = 0x1;
const LIMIT_MINUS: u8 = 0x1;
const LIMIT_PLUS: u8 = 0x2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Status {
    pub limit_minus: bool,
    pub limit_plus: bool,
    pub moving: bool,
}

/// Character offsets of the motion and limit digits for one axis.
fn offsets(axis: AxisSelector) -> (usize, usize) {
    match axis {
        AxisSelector::X => (1, 2),
        AxisSelector::Y => (5, 6),
    }
}

fn nibble(answer: &str, offset: usize) -> Result<u8, ProtocolError> {
    answer
        .as_bytes()
        .get(offset)
        .and_then(|&b| (b as char).to_digit(16))
        .map(|d| d as u8)
        .ok_or_else(|| {
            ProtocolError::Malformed(format!(
                "extended status {:?} has no digit at offset {}",
                answer, offset
            ))
        })
}

/// Decode the flags of `axis` from an extended status answer.
///
/// The controller reports "stopped" with the motion bit set. On an
/// inverted axis the minus and plus switches are physically swapped.
pub fn decode_status(
    answer: &str,
    axis: AxisSelector,
    inverted: bool,
) -> Result<Status, ProtocolError> {
    let (motion_at, limit_at) = offsets(axis);
    let motion = nibble(answer, motion_at)?;
    let limits = nibble(answer, limit_at)?;

    let minus = limits & LIMIT_MINUS != 0;
    let plus = limits & LIMIT_PLUS != 0;
    let (limit_minus, limit_plus) = if inverted { (plus, minus) } else { (minus, plus) };

    Ok(Status {
        limit_minus,
        limit_plus,
        moving: motion & MOTION_STOPPED == 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_axis_on_plus_limit() {
        let status = decode_status("E1200000", AxisSelector::X, false).unwrap();
        assert_eq!(
            status,
            Status {
                limit_minus: false,
                limit_plus: true,
                moving: false
            }
        );
    }

    #[test]
    fn test_inversion_swaps_limits() {
        let status = decode_status("E1200000", AxisSelector::X, true).unwrap();
        assert_eq!(
            status,
            Status {
                limit_minus: true,
                limit_plus: false,
                moving: false
            }
        );
    }

    #[test]
    fn test_second_axis_offsets() {
        let answer = "E1000010";
        let x = decode_status(answer, AxisSelector::X, false).unwrap();
        let y = decode_status(answer, AxisSelector::Y, false).unwrap();
        assert!(!x.moving);
        assert!(y.moving);
        assert!(y.limit_minus && !y.limit_plus);
    }

    #[test]
    fn test_both_limits_survive_inversion() {
        let status = decode_status("E1300000", AxisSelector::X, true).unwrap();
        assert!(status.limit_minus && status.limit_plus);
    }

    #[test]
    fn test_short_or_garbled_answer_is_malformed() {
        assert!(matches!(
            decode_status("E12", AxisSelector::Y, false),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_status("E?200000", AxisSelector::X, false),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
