use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{ETX, NAK, STX};

/// Splits the controller's byte stream into raw responses.
///
/// A response ends at `ETX`, or is a lone `NAK` seen while no frame is open.
/// Bytes are returned undecoded so that [`decode_response`](super::decode_response)
/// stays the single place that interprets them.
#[derive(Debug, Clone)]
pub struct ResponseCodec {
    max_length: usize,
}

impl ResponseCodec {
    pub const DEFAULT_MAX_LENGTH: usize = 256;

    pub fn new() -> Self {
        Self::with_max_length(Self::DEFAULT_MAX_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseCodec {
    type Item = Vec<u8>;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = src.iter().position(|&b| b == STX);
        let end = src.iter().position(|&b| b == ETX);
        let nak = src.iter().position(|&b| b == NAK);

        let cut = match (start, end, nak) {
            (_, _, Some(n)) if start.map_or(true, |s| n < s) => Some(n),
            (Some(s), Some(e), _) if e > s => Some(e),
            (_, Some(e), _) => {
                // ETX with no frame open: drop the stray bytes and look again
                src.advance(e + 1);
                return self.decode(src);
            }
            _ => None,
        };

        match cut {
            Some(idx) => Ok(Some(src.split_to(idx + 1).to_vec())),
            None if src.len() > self.max_length => {
                src.clear();
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("response exceeds {} bytes", self.max_length),
                ))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Vec<u8>> for ResponseCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_response, error::ProtocolError};

    #[test]
    fn test_waits_for_complete_frame() {
        let mut codec = ResponseCodec::new();
        let mut buf = BytesMut::from(&b"\x02\x0640"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"0\x03\x02\x06");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_response(&frame).unwrap(), "400");
        assert_eq!(&buf[..], b"\x02\x06");
    }

    #[test]
    fn test_lone_nak_is_a_response() {
        let mut codec = ResponseCodec::new();
        let mut buf = BytesMut::from(&b"\r\n\x15"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_response(&frame), Err(ProtocolError::NotAcknowledged));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_stray_etx_is_skipped() {
        let mut codec = ResponseCodec::new();
        let mut buf = BytesMut::from(&b"\x03\x02\x06E\x03"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_response(&frame).unwrap(), "E");
    }

    #[test]
    fn test_runaway_stream_is_rejected() {
        let mut codec = ResponseCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"\x02\x06123456"[..]);
        assert!(codec.decode(&mut buf).is_err());
        assert!(buf.is_empty());
    }
}
