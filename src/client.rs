//! High-level TeamTalk client: login sequencing, the dispatch loop, event
//! subscriptions, and the command surface.
//!
//! The dispatch loop is single-threaded and cooperative: internal
//! state-sync handlers run first for every event, then external
//! subscribers, then the per-line callback, and all of them complete
//! before the next line is read. The keep-alive task is the only other
//! concurrent participant and it writes through the same serialized path.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ProtocolError, Result, ServerError};
use crate::keepalive::{self, DEFAULT_USER_TIMEOUT_SECS};
use crate::message::{Fields, Message, Value};
use crate::state::sync::{Effect, LoginState, Session, LOGIN_TRANSACTION_ID};
use crate::state::{EntityKind, EntityRef, ServerState};
use crate::transport::{MessageSender, ReadOutcome, Transport};
use crate::types::TextMessageType;

/// Handshake event expected on the first line of a connection.
const HANDSHAKE_EVENT: &str = "teamtalk";
/// How long to wait for the welcome line.
const WELCOME_TIMEOUT: Duration = Duration::from_secs(3);
/// Read timeout used while driving the login sequence.
const LOGIN_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Login parameters, shaped like the `login` command itself.
///
/// `protocol` and `version` default to values current servers accept.
#[derive(Clone, Debug)]
pub struct LoginConfig {
    /// Display nickname.
    pub nickname: String,
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Client software label reported to the server.
    pub client_name: String,
    /// Protocol version string.
    pub protocol: String,
    /// Client version string.
    pub version: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            username: String::new(),
            password: String::new(),
            client_name: String::new(),
            protocol: "5.6".to_string(),
            version: "1.0".to_string(),
        }
    }
}

/// Token identifying a registered handler, for [`Client::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Boxed external event handler.
pub type Handler = Box<dyn FnMut(&mut Client, &Fields) + Send>;

struct Registered {
    id: HandlerId,
    func: Handler,
}

/// Instance-owned registry: lowercase event name → handlers in
/// registration order.
#[derive(Default)]
struct Subscriptions {
    by_event: HashMap<String, Vec<Registered>>,
    next_id: u64,
}

impl Subscriptions {
    fn add(&mut self, event: &str, func: Handler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.by_event
            .entry(event.to_ascii_lowercase())
            .or_default()
            .push(Registered { id, func });
        id
    }

    fn remove(&mut self, event: &str, id: HandlerId) -> Result<(), ClientError> {
        let key = event.to_ascii_lowercase();
        let missing = || ClientError::UnknownHandler { event: key.clone() };
        let list = self.by_event.get_mut(&key).ok_or_else(missing)?;
        let pos = list.iter().position(|r| r.id == id).ok_or_else(missing)?;
        list.remove(pos);
        Ok(())
    }

    fn detach(&mut self, event: &str) -> Option<Vec<Registered>> {
        self.by_event.remove(event)
    }

    fn restore(&mut self, event: &str, mut taken: Vec<Registered>) {
        // handlers registered during dispatch land behind the existing ones
        if let Some(added) = self.by_event.remove(event) {
            taken.extend(added);
        }
        if !taken.is_empty() {
            self.by_event.insert(event.to_string(), taken);
        }
    }
}

/// An asynchronous TeamTalk 5 client.
///
/// ```no_run
/// use ttproto::{Client, LoginConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut client = Client::connect("voice.example.net", 10333).await?;
///     client
///         .login(LoginConfig {
///             nickname: "greeter".into(),
///             username: "greeter".into(),
///             password: "secret".into(),
///             client_name: "greeter-bot".into(),
///             ..Default::default()
///         })
///         .await?;
///
///     client.subscribe("joined", |client, fields| {
///         let _ = client.channel_message("hello!", None, None);
///         let _ = fields;
///     });
///
///     client.run_loop(Some(std::time::Duration::from_secs(1))).await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    transport: Transport,
    session: Session,
    subscriptions: Subscriptions,
    timeout_tx: watch::Sender<f64>,
    keepalive: Option<JoinHandle<()>>,
}

impl Client {
    /// Connect to `host:port` and consume the welcome line.
    ///
    /// An unexpected handshake event (a pre-5.x server, or a different
    /// protocol entirely) leaves the client usable but unconfigured: no
    /// server parameters, keep-alive at its fallback cadence.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let mut transport = Transport::connect(host, port).await?;
        let (timeout_tx, _) = watch::channel(DEFAULT_USER_TIMEOUT_SECS);
        let mut session = Session::new();

        match transport.read(Some(WELCOME_TIMEOUT)).await? {
            ReadOutcome::Message(welcome)
                if welcome.event.eq_ignore_ascii_case(HANDSHAKE_EVENT) =>
            {
                info!(host, port, "connected");
                session.state.server_params = welcome.fields;
            }
            ReadOutcome::Message(other) => {
                warn!(
                    event = %other.event,
                    "unexpected welcome event, continuing unconfigured"
                );
            }
            ReadOutcome::Idle => return Err(ProtocolError::WelcomeTimeout(WELCOME_TIMEOUT)),
            ReadOutcome::Closed => return Err(ProtocolError::Closed),
        }
        session.set_login_state(LoginState::Connected);

        let client = Self {
            transport,
            session,
            subscriptions: Subscriptions::default(),
            timeout_tx,
            keepalive: None,
        };
        client.push_user_timeout();
        Ok(client)
    }

    /// Log in and block until the server closes the login bracket.
    ///
    /// Call promptly after [`connect`](Self::connect); the server applies
    /// its idle timeout from the first line.
    pub async fn login(&mut self, config: LoginConfig) -> Result<()> {
        self.login_with(config, |_, _, _| {}).await
    }

    /// Like [`login`](Self::login), but invokes `callback` for every line
    /// processed during the sequence (empty event on idle or dropped
    /// lines). A rejected login surfaces as the returned `error`.
    pub async fn login_with<F>(&mut self, config: LoginConfig, callback: F) -> Result<()>
    where
        F: FnMut(&mut Client, &str, &Fields),
    {
        let message = Message::new("login")
            .field("nickname", config.nickname)
            .field("username", config.username)
            .field("password", config.password)
            .field("clientname", config.client_name)
            .field("protocol", config.protocol)
            .field("version", config.version)
            .field("id", LOGIN_TRANSACTION_ID);
        self.transport.send(message)?;
        self.session.set_login_state(LoginState::LoginSent);
        self.start_keepalive();
        self.dispatch_loop(Some(LOGIN_READ_TIMEOUT), callback, true)
            .await
    }

    /// Process incoming lines until disconnect (`Ok`) or a non-ignorable
    /// server error or transport failure (`Err`). Re-enter after handling
    /// an error to keep processing.
    ///
    /// `timeout` bounds each line read; `None` blocks indefinitely between
    /// lines, which latency-sensitive callers should avoid.
    pub async fn run_loop(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.dispatch_loop(timeout, |_, _, _| {}, false).await
    }

    /// [`run_loop`](Self::run_loop) with a per-line callback, invoked after
    /// internal and subscribed handlers with the lowercased event name, or
    /// with an empty event when a read timed out or a line was dropped.
    pub async fn run_loop_with<F>(&mut self, timeout: Option<Duration>, callback: F) -> Result<()>
    where
        F: FnMut(&mut Client, &str, &Fields),
    {
        self.dispatch_loop(timeout, callback, false).await
    }

    async fn dispatch_loop<F>(
        &mut self,
        timeout: Option<Duration>,
        mut callback: F,
        until_login: bool,
    ) -> Result<()>
    where
        F: FnMut(&mut Client, &str, &Fields),
    {
        let empty = Fields::new();
        loop {
            let message = match self.transport.read(timeout).await {
                Ok(ReadOutcome::Message(message)) => message,
                Ok(ReadOutcome::Idle) => {
                    callback(self, "", &empty);
                    continue;
                }
                Ok(ReadOutcome::Closed) => {
                    // mid-login this is a failure; afterwards it is a
                    // normal end of the loop
                    return if until_login && self.session.login_state() != LoginState::LoggedIn {
                        Err(ProtocolError::Closed)
                    } else {
                        Ok(())
                    };
                }
                Err(e) if e.is_line_error() => {
                    warn!(error = %e, "dropping undecodable line");
                    callback(self, "", &empty);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let event = message.event.to_ascii_lowercase();
            let fields = message.fields;

            // replies to our own keep-alive pings are internal chatter
            if event == "pong" {
                callback(self, "", &empty);
                continue;
            }

            if event == "error" {
                let err = ServerError::from_fields(&fields);
                if err.is_ignorable() {
                    debug!(code = err.code, "ignorable server error");
                    continue;
                }
                return Err(err.into());
            }

            // state sync always precedes external handlers
            let effect = self.session.apply(&event, &fields);
            match effect {
                Effect::Disconnect => {
                    info!("logged out by server, disconnecting");
                    self.disconnect();
                }
                Effect::ParamsChanged => self.push_user_timeout(),
                Effect::LoginComplete | Effect::None => {}
            }

            self.dispatch_external(&event, &fields);
            callback(self, &event, &fields);

            if until_login && effect == Effect::LoginComplete {
                return Ok(());
            }
        }
    }

    fn dispatch_external(&mut self, event: &str, fields: &Fields) {
        let Some(mut taken) = self.subscriptions.detach(event) else {
            return;
        };
        for entry in taken.iter_mut() {
            (entry.func)(self, fields);
        }
        self.subscriptions.restore(event, taken);
    }

    fn start_keepalive(&mut self) {
        if self.keepalive.is_none() {
            self.keepalive = Some(keepalive::spawn(
                self.transport.sender(),
                self.timeout_tx.subscribe(),
                self.transport.shutdown_token(),
            ));
        }
    }

    fn push_user_timeout(&self) {
        if let Some(t) = self
            .session
            .state
            .server_params
            .get("usertimeout")
            .and_then(Value::as_f64)
        {
            self.timeout_tx.send_replace(t);
        }
    }

    /// Register `handler` for `event` (case-insensitive). Handlers for the
    /// same event run in registration order, after the internal state-sync
    /// handler.
    pub fn subscribe<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: FnMut(&mut Client, &Fields) + Send + 'static,
    {
        self.subscriptions.add(event, Box::new(handler))
    }

    /// Remove a previously registered handler. Fails if it is not
    /// currently registered for `event`.
    pub fn unsubscribe(&mut self, event: &str, id: HandlerId) -> Result<(), ClientError> {
        self.subscriptions.remove(event, id)
    }

    /// A read-only view of the mirrored server state.
    pub fn state(&self) -> &ServerState {
        &self.session.state
    }

    /// Current login sequencing state.
    pub fn login_state(&self) -> LoginState {
        self.session.login_state()
    }

    /// Id of the open ordered-response bracket (0 when none).
    pub fn current_transaction(&self) -> i64 {
        self.session.current_transaction()
    }

    /// Resolve a channel by id, path, or partial record.
    pub fn channel(&self, ident: impl Into<EntityRef>) -> Option<&Fields> {
        self.session.state.channel(&ident.into())
    }

    /// Resolve a user by id, nickname, or partial record.
    pub fn user(&self, ident: impl Into<EntityRef>) -> Option<&Fields> {
        self.session.state.user(&ident.into())
    }

    /// Resolve a file within a channel by id or filename.
    pub fn file(
        &self,
        ident: impl Into<EntityRef>,
        channel: impl Into<EntityRef>,
    ) -> Option<&Fields> {
        let ident = ident.into();
        let channel = channel.into();
        self.session.state.file(&ident, Some(&channel))
    }

    /// Queue a raw protocol message (escape hatch for unmapped commands).
    pub fn send(&self, message: Message) -> Result<()> {
        self.transport.send(message)
    }

    /// Clone a handle to the serialized write path.
    pub fn sender(&self) -> MessageSender {
        self.transport.sender()
    }

    /// Request disconnect. Idempotent; the dispatch loop and the
    /// keep-alive task wind down cooperatively.
    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    /// Whether a disconnect has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.transport.is_shutdown()
    }

    // ---- command surface ----------------------------------------------
    //
    // None of these wait for a reply; the server answers with the expected
    // follow-up event (`joined`, `left`, ...) or an `error`. Pass `txn` to
    // have the response bracketed by `begin`/`end` with that id.

    /// Join a channel, optionally with a password.
    pub fn join(
        &self,
        channel: impl Into<EntityRef>,
        password: &str,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let chanid = self.resolve_channel(&channel.into())?;
        let msg = Message::new("join")
            .field("chanid", chanid)
            .field("password", password);
        self.queue(correlate(msg, txn))
    }

    /// Leave the current channel.
    pub fn leave(&self, txn: Option<i64>) -> Result<(), ClientError> {
        self.queue(correlate(Message::new("leave"), txn))
    }

    /// Kick a user from a channel, or from the server when `channel` is
    /// `None`.
    pub fn kick(
        &self,
        user: impl Into<EntityRef>,
        channel: Option<EntityRef>,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let userid = self.resolve_user(&user.into())?;
        let mut msg = Message::new("kick").field("userid", userid);
        if let Some(channel) = channel {
            msg = msg.field("chanid", self.resolve_channel(&channel)?);
        }
        self.queue(correlate(msg, txn))
    }

    /// Move a user into another channel.
    pub fn move_user(
        &self,
        user: impl Into<EntityRef>,
        destination: impl Into<EntityRef>,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let userid = self.resolve_user(&user.into())?;
        let chanid = self.resolve_channel(&destination.into())?;
        let msg = Message::new("moveuser")
            .field("userid", userid)
            .field("chanid", chanid);
        self.queue(correlate(msg, txn))
    }

    /// Change own status. Modes: 0 online, 1 away, 2 question.
    pub fn change_status(
        &self,
        status_mode: i64,
        status_message: &str,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let msg = Message::new("changestatus")
            .field("statusmode", status_mode)
            .field("statusmsg", status_message);
        self.queue(correlate(msg, txn))
    }

    /// Change own nickname.
    pub fn change_nickname(&self, nickname: &str, txn: Option<i64>) -> Result<(), ClientError> {
        let msg = Message::new("changenick").field("nickname", nickname);
        self.queue(correlate(msg, txn))
    }

    /// Send a private message to a user.
    pub fn user_message(
        &self,
        to: impl Into<EntityRef>,
        content: &str,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let userid = self.resolve_user(&to.into())?;
        let msg = Message::new("message")
            .field("type", TextMessageType::User)
            .field("content", content)
            .field("destuserid", userid);
        self.queue(correlate(msg, txn))
    }

    /// Send a channel message, to the current channel when `to` is `None`.
    ///
    /// Only admins can message channels they have not joined.
    pub fn channel_message(
        &self,
        content: &str,
        to: Option<EntityRef>,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let chanid = match to {
            Some(channel) => self.resolve_channel(&channel)?,
            None => self
                .session
                .state
                .me
                .int("chanid")
                .ok_or(ClientError::NoCurrentChannel)?,
        };
        let msg = Message::new("message")
            .field("type", TextMessageType::Channel)
            .field("content", content)
            .field("chanid", chanid);
        self.queue(correlate(msg, txn))
    }

    /// Send a server-wide broadcast message.
    pub fn broadcast_message(&self, content: &str, txn: Option<i64>) -> Result<(), ClientError> {
        let msg = Message::new("message")
            .field("type", TextMessageType::Broadcast)
            .field("content", content);
        self.queue(correlate(msg, txn))
    }

    /// Delete a channel (admin only).
    pub fn remove_channel(
        &self,
        channel: impl Into<EntityRef>,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let chanid = self.resolve_channel(&channel.into())?;
        let msg = Message::new("removechannel").field("chanid", chanid);
        self.queue(correlate(msg, txn))
    }

    /// Grant (or with `grant` false, revoke) channel operator status.
    /// Defaults: own user, own current channel. A non-empty `password` is
    /// sent as the channel's operator password.
    pub fn channel_operator(
        &self,
        user: Option<EntityRef>,
        channel: Option<EntityRef>,
        password: &str,
        grant: bool,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let chanid = match channel {
            Some(channel) => self.resolve_channel(&channel)?,
            None => self
                .session
                .state
                .me
                .int("chanid")
                .ok_or(ClientError::NoCurrentChannel)?,
        };
        let userid = match user {
            Some(user) => self.resolve_user(&user)?,
            None => self
                .session
                .state
                .me
                .int("userid")
                .ok_or_else(|| ClientError::NotFound {
                    kind: EntityKind::User,
                    ident: "self".to_string(),
                })?,
        };
        let mut msg = Message::new("op")
            .field("chanid", chanid)
            .field("userid", userid)
            .field("opstatus", i64::from(grant));
        if !password.is_empty() {
            msg = msg.field("oppassword", password);
        }
        self.queue(correlate(msg, txn))
    }

    /// Subscribe to server-side events for a user (`sublocal` bits, see
    /// [`crate::types::sub`]). Not to be confused with
    /// [`subscribe`](Self::subscribe), which attaches local handlers.
    pub fn subscribe_to(
        &self,
        user: impl Into<EntityRef>,
        subscription: u32,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let userid = self.resolve_user(&user.into())?;
        let msg = Message::new("subscribe")
            .field("userid", userid)
            .field("sublocal", subscription);
        self.queue(correlate(msg, txn))
    }

    /// Drop server-side event subscriptions for a user.
    pub fn unsubscribe_from(
        &self,
        user: impl Into<EntityRef>,
        subscription: u32,
        txn: Option<i64>,
    ) -> Result<(), ClientError> {
        let userid = self.resolve_user(&user.into())?;
        let msg = Message::new("unsubscribe")
            .field("userid", userid)
            .field("sublocal", subscription);
        self.queue(correlate(msg, txn))
    }

    fn resolve_channel(&self, ident: &EntityRef) -> Result<i64, ClientError> {
        self.session
            .state
            .channel(ident)
            .and_then(|c| c.int("chanid"))
            .ok_or_else(|| ClientError::NotFound {
                kind: EntityKind::Channel,
                ident: ident.to_string(),
            })
    }

    fn resolve_user(&self, ident: &EntityRef) -> Result<i64, ClientError> {
        self.session
            .state
            .user(ident)
            .and_then(|u| u.int("userid"))
            .ok_or_else(|| ClientError::NotFound {
                kind: EntityKind::User,
                ident: ident.to_string(),
            })
    }

    fn queue(&self, message: Message) -> Result<(), ClientError> {
        self.transport.send(message).map_err(|_| ClientError::Closed)
    }
}

fn correlate(message: Message, txn: Option<i64>) -> Message {
    match txn {
        Some(id) => message.field("id", id),
        None => message,
    }
}
