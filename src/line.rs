//! Newline-framed line codec for tokio.
//!
//! Reads newline-terminated lines into `String`s and writes lines with a
//! guaranteed CRLF terminator. Sits beneath [`crate::codec::TtCodec`].

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

/// Maximum accepted wire line length in bytes.
///
/// Channel and file announcements can run long, but nothing the server
/// emits approaches this.
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Codec for newline-terminated lines.
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        // Look for a newline starting from where we left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text =
                std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                    byte_pos: e.valid_up_to(),
                    details: e.to_string(),
                })?;

            Ok(Some(text.trim_end_matches(&['\r', '\n'][..]).to_string()))
        } else {
            // No complete line yet - remember where we stopped
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        // Bare newlines inside a payload become carriage returns so the
        // frame stays a single wire line (multiline message content uses
        // \r separators on the wire).
        let normalized = line.replace('\n', "\r");
        dst.reserve(normalized.len() + 2);
        dst.put_slice(normalized.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("teamtalk usertimeout=10\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("teamtalk usertimeout=10".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("begin id=");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"1\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("begin id=1".to_string()));
    }

    #[test]
    fn test_decode_two_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("begin id=1\r\nend id=1\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("begin id=1".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("end id=1".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this line is way too long\n");

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::LineTooLong { .. })));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"bad \xff\xfe line\r\n"[..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("ping".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"ping\r\n");
    }

    #[test]
    fn test_encode_normalizes_embedded_newlines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode("message content=\"two\nlines\"".to_string(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"message content=\"two\rlines\"\r\n");
    }
}
