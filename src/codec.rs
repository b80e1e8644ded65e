//! Typed message codec for tokio.
//!
//! Wraps [`LineCodec`] and parses each line into a [`Message`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec turning wire lines into [`Message`] values and back.
pub struct TtCodec {
    inner: LineCodec,
}

impl TtCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self {
            inner: LineCodec::new(),
        }
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }
}

impl Default for TtCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TtCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        while let Some(line) = self.inner.decode(src)? {
            // blank lines carry nothing worth reporting
            if line.is_empty() {
                continue;
            }
            return line
                .parse::<Message>()
                .map(Some)
                .map_err(|cause| ProtocolError::InvalidMessage { line, cause });
        }
        Ok(None)
    }
}

impl Encoder<Message> for TtCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        self.inner.encode(msg.to_string(), dst)
    }
}
