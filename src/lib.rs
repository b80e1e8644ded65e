//! # ttproto
//!
//! A client library for the TeamTalk 5 TCP text protocol: the wire codec,
//! a session-state cache kept consistent from the event stream, ordered
//! transaction tracking, event subscription, an adaptive keep-alive, and a
//! high-level command surface.
//!
//! ## Features
//!
//! - `key=value` wire codec with typed values (integers, quoted strings,
//!   bracketed lists)
//! - Tokio framed transport with a single serialized write path
//! - Sans-IO session core ([`Session`]) that mirrors channels, users,
//!   files, and server parameters purely from decoded events
//! - Flexible identifier resolution: pass an id, a name, or an event
//!   payload anywhere a channel or user is expected
//! - Keep-alive pings paced by the server's advertised idle timeout
//!
//! ## Quick start
//!
//! ```no_run
//! use ttproto::{Client, LoginConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = Client::connect("voice.example.net", 10333).await?;
//!     client.login(LoginConfig {
//!         nickname: "bot".into(),
//!         username: "bot".into(),
//!         password: "secret".into(),
//!         client_name: "ttproto-bot".into(),
//!         ..Default::default()
//!     }).await?;
//!
//!     client.join("Lobby", "", None)?;
//!     client.run_loop(Some(std::time::Duration::from_secs(1))).await?;
//!     Ok(())
//! }
//! ```
//!
//! A non-ignorable server `error` aborts `run_loop`; catch it and re-enter
//! the loop to keep processing.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod client;
pub mod codec;
pub mod error;
pub mod keepalive;
pub mod line;
pub mod message;
pub mod state;
pub mod transport;
pub mod types;

pub use self::client::{Client, Handler, HandlerId, LoginConfig};
pub use self::codec::TtCodec;
pub use self::error::{ClientError, MessageParseError, ProtocolError, Result, ServerError};
pub use self::keepalive::{ping_interval, DEFAULT_USER_TIMEOUT_SECS};
pub use self::line::{LineCodec, MAX_LINE_LEN};
pub use self::message::{Fields, Message, Scalar, Value};
pub use self::state::sync::{Effect, LoginState, Session, LOGIN_TRANSACTION_ID};
pub use self::state::{EntityKind, EntityRef, Role, ServerState};
pub use self::transport::{MessageSender, ReadOutcome, Transport};
pub use self::types::TextMessageType;
