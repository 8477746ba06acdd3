use std::time::Duration;

use thiserror::Error;

/// Failures of a single request/response exchange on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The response carries neither the acknowledge nor the not-acknowledge marker.
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// The controller explicitly rejected the command.
    #[error("Command not acknowledged by controller")]
    NotAcknowledged,
    /// No complete response arrived before the read deadline.
    #[error("No response within {0:?}")]
    Timeout(Duration),
}

impl ProtocolError {
    pub fn malformed(raw: &[u8]) -> Self {
        ProtocolError::Malformed(format!("{:02x?}", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_renders_hex_bytes() {
        let err = ProtocolError::malformed(&[0x02, 0x41]);
        assert_eq!(err.to_string(), "Malformed response: [02, 41]");
    }
}
