//! Framing of the MCC-2 ASCII protocol.
//!
//! Requests are `STX address [X|Y] opcode [literal] ETX`; the controller
//! answers `STX ACK payload ETX` or a lone `NAK`.

pub mod codec;
pub mod error;
pub mod frame;
pub mod opcode;

use error::ProtocolError;
use frame::{AxisSelector, Literal, ModuleAddress, Request, Target};
use opcode::Opcode;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

pub fn encode_request(
    address: ModuleAddress,
    target: Target,
    opcode: Opcode,
    literal: Option<Literal>,
) -> Vec<u8> {
    let request = Request {
        address,
        target,
        opcode,
        literal,
    };
    encode(&request)
}

pub fn encode(request: &Request) -> Vec<u8> {
    let text = request.command_text();
    let mut frame = Vec::with_capacity(text.len() + 2);
    frame.push(STX);
    frame.extend_from_slice(text.as_bytes());
    frame.push(ETX);
    frame
}

/// Extract the payload of an acknowledged response.
///
/// Acknowledged frames end in ETX, so a trailing NAK is a rejection no
/// matter what precedes it.
pub fn decode_response(raw: &[u8]) -> Result<String, ProtocolError> {
    if raw.last() == Some(&NAK) {
        return Err(ProtocolError::NotAcknowledged);
    }

    if let Some(ack) = raw.iter().position(|&b| b == ACK) {
        let mut payload = &raw[ack + 1..];
        while let Some((&last, rest)) = payload.split_last() {
            if last == ETX || last == b'\r' || last == b'\n' {
                payload = rest;
            } else {
                break;
            }
        }
        return std::str::from_utf8(payload)
            .map(str::to_string)
            .map_err(|_| ProtocolError::malformed(raw));
    }

    if raw.is_empty() {
        return Err(ProtocolError::Malformed("empty response".to_string()));
    }
    Err(ProtocolError::malformed(raw))
}

/// Controller-side acknowledged response carrying `payload`.
pub fn encode_ack(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(STX);
    frame.push(ACK);
    frame.extend_from_slice(payload.as_bytes());
    frame.push(ETX);
    frame
}

pub fn encode_nak() -> Vec<u8> {
    vec![NAK]
}

/// Parse a framed request back into its parts.
pub fn parse_request(raw: &[u8]) -> Result<Request, ProtocolError> {
    let body = raw
        .strip_prefix(&[STX])
        .and_then(|r| r.strip_suffix(&[ETX]))
        .ok_or_else(|| ProtocolError::malformed(raw))?;
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::malformed(raw))?;

    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    let address = text[..digits]
        .parse::<u8>()
        .ok()
        .and_then(|a| ModuleAddress::new(a).ok())
        .ok_or_else(|| ProtocolError::Malformed(format!("bad address in {:?}", text)))?;

    let rest = &text[digits..];
    let (target, body) = match rest.chars().next() {
        Some('X') => (Target::Axis(AxisSelector::X), &rest[1..]),
        Some('Y') => (Target::Axis(AxisSelector::Y), &rest[1..]),
        _ => (Target::Module, rest),
    };

    let (opcode, literal) = Opcode::parse(body)?;
    Ok(Request {
        address,
        target,
        opcode,
        literal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcode::Direction;

    fn addr(n: u8) -> ModuleAddress {
        ModuleAddress::new(n).unwrap()
    }

    #[test]
    fn test_encode_read_register() {
        let frame = encode_request(
            addr(0),
            Target::Axis(AxisSelector::X),
            Opcode::ReadRegister(20),
            None,
        );
        assert_eq!(frame, b"\x020XP20R\x03");
    }

    #[test]
    fn test_encode_module_command_has_no_selector() {
        let frame = encode_request(addr(12), Target::Module, Opcode::ExtendedStatus, None);
        assert_eq!(frame, b"\x0212SE\x03");
    }

    #[test]
    fn test_frames_carry_markers_address_and_selector_once() {
        for n in 0..=ModuleAddress::MAX {
            for selector in [AxisSelector::X, AxisSelector::Y] {
                let frame = encode_request(
                    addr(n),
                    Target::Axis(selector),
                    Opcode::MoveAbsolute,
                    Some(Literal::Float(12.5)),
                );
                assert_eq!(frame.first(), Some(&STX));
                assert_eq!(frame.last(), Some(&ETX));

                let text = std::str::from_utf8(&frame[1..frame.len() - 1]).unwrap();
                let prefix = format!("{}{}", n, selector);
                assert!(text.starts_with(&prefix));
                assert_eq!(text.matches(selector.as_char()).count(), 1);
            }
        }
    }

    #[test]
    fn test_decode_ack_payload() {
        assert_eq!(decode_response(b"\x02\x06400\x03").unwrap(), "400");
        assert_eq!(decode_response(b"\x02\x06\x03").unwrap(), "");
    }

    #[test]
    fn test_ack_round_trip() {
        for payload in ["", "0", "-1234.5", "MCC2 V3.1", "E0010001"] {
            assert_eq!(decode_response(&encode_ack(payload)).unwrap(), payload);
        }
    }

    #[test]
    fn test_decode_nak_even_after_garbage() {
        assert_eq!(decode_response(&[NAK]), Err(ProtocolError::NotAcknowledged));
        assert_eq!(
            decode_response(&[0xff, b'x', 0x00, NAK]),
            Err(ProtocolError::NotAcknowledged)
        );
        assert_eq!(
            decode_response(&[ACK, NAK]),
            Err(ProtocolError::NotAcknowledged)
        );
        assert_eq!(
            decode_response(b"z\x06q\x15"),
            Err(ProtocolError::NotAcknowledged)
        );
        assert_eq!(
            decode_response(&[STX, ACK, b'1', ETX, NAK]),
            Err(ProtocolError::NotAcknowledged)
        );
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        assert!(matches!(
            decode_response(b"\x02hello\x03"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_response(b""),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_request_inverts_encode() {
        let request = Request::new(
            addr(7),
            Target::Axis(AxisSelector::Y),
            Opcode::Home {
                direction: Direction::Minus,
                encoder_sync: true,
            },
        );
        assert_eq!(parse_request(&encode(&request)).unwrap(), request);

        let request = Request::new(addr(3), Target::Module, Opcode::FirmwareVersion);
        assert_eq!(parse_request(&encode(&request)).unwrap(), request);
    }

    #[test]
    fn test_parse_request_rejects_unframed_input() {
        assert!(parse_request(b"0XP20R").is_err());
        assert!(parse_request(b"\x02XP20R\x03").is_err());
        assert!(parse_request(b"\x0216SE\x03").is_err());
    }
}
