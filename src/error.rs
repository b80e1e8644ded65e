//! Error types for the TeamTalk protocol library.
//!
//! Three layers: [`ProtocolError`] for transport and per-line failures,
//! [`ServerError`] for `error` events reported by the server, and
//! [`ClientError`] for command-surface failures that never reach the wire.

use thiserror::Error;

use crate::message::Fields;
use crate::state::EntityKind;
use crate::types::cmd_error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Server did not send its welcome line within the handshake window.
    #[error("no welcome line within {0:?}")]
    WelcomeTimeout(std::time::Duration),

    /// The connection is closed or a shutdown has been requested.
    #[error("connection closed")]
    Closed,

    /// A wire line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Received bytes that were not valid UTF-8.
    #[error("invalid UTF-8 at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte position where validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },

    /// A line failed to parse as a protocol message.
    #[error("invalid message: {line}")]
    InvalidMessage {
        /// The offending line, without its terminator.
        line: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },

    /// A non-ignorable `error` event from the server.
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl ProtocolError {
    /// Whether this error invalidates only the offending line.
    ///
    /// The dispatch loop logs these and keeps reading; everything else
    /// terminates the current loop invocation.
    pub fn is_line_error(&self) -> bool {
        matches!(
            self,
            Self::LineTooLong { .. } | Self::InvalidUtf8 { .. } | Self::InvalidMessage { .. }
        )
    }
}

/// Errors encountered when parsing a wire line into a [`crate::Message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty.
    #[error("empty message")]
    Empty,

    /// A field token carried no `=` separator.
    #[error("field token missing '=': {token}")]
    MissingSeparator {
        /// The offending token.
        token: String,
    },
}

/// A typed `error` event: the server's numeric code plus its message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("server error {code}: {message}")]
pub struct ServerError {
    /// Numeric command error code (see [`crate::types::cmd_error`]).
    pub code: i64,
    /// Human-readable explanation from the server.
    pub message: String,
}

impl ServerError {
    /// Extract the code/message pair from a decoded `error` event.
    ///
    /// A missing or unparseable `number` field is treated as the ignore
    /// sentinel so malformed chatter never aborts the loop.
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            code: fields.int("number").unwrap_or(cmd_error::IGNORE),
            message: fields.text("message").unwrap_or_default().to_string(),
        }
    }

    /// Whether this code is one of the two sentinels that indicate success
    /// or irrelevance rather than a real failure.
    pub fn is_ignorable(&self) -> bool {
        cmd_error::is_ignorable(self.code)
    }
}

/// Errors surfaced by the high-level command surface.
///
/// These are detected locally, before anything is written to the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// A flexible identifier did not resolve to a cached entity.
    #[error("unknown {kind}: {ident}")]
    NotFound {
        /// The entity kind that was looked up.
        kind: EntityKind,
        /// Display form of the identifier that failed to resolve.
        ident: String,
    },

    /// A channel-scoped command ran while not joined to any channel.
    #[error("not in a channel")]
    NoCurrentChannel,

    /// The write path has shut down.
    #[error("connection closed")]
    Closed,

    /// No handler with the given id is registered for the event.
    #[error("no such handler for event {event:?}")]
    UnknownHandler {
        /// The (lowercased) event name.
        event: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_server_error_display() {
        let err = ServerError {
            code: 2001,
            message: "Incorrect channel password".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "server error 2001: Incorrect channel password"
        );
    }

    #[test]
    fn test_sentinel_codes_are_ignorable() {
        for raw in [
            "error number=0 message=\"ok\"",
            "error number=-1 message=\"ignored\"",
        ] {
            let msg: Message = raw.parse().unwrap();
            assert!(ServerError::from_fields(&msg.fields).is_ignorable(), "{raw}");
        }

        let msg: Message = "error number=1001 message=\"bad\"".parse().unwrap();
        let err = ServerError::from_fields(&msg.fields);
        assert!(!err.is_ignorable());
        assert_eq!(err.code, 1001);
        assert_eq!(err.message, "bad");
    }

    #[test]
    fn test_line_error_classification() {
        let err = ProtocolError::LineTooLong {
            actual: 40000,
            limit: 16384,
        };
        assert!(err.is_line_error());
        assert!(!ProtocolError::Closed.is_line_error());
    }
}
