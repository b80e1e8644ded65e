//! Adaptive keep-alive: periodic pings at a server-driven cadence.
//!
//! The server drops idle clients after its advertised `usertimeout`; the
//! keep-alive task pings well inside that window and re-reads the value
//! every round so a `serverupdate` takes effect on the next ping.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::message::Message;
use crate::transport::MessageSender;

/// Cadence fallback when the server never advertised `usertimeout`
/// (degraded handshake).
pub const DEFAULT_USER_TIMEOUT_SECS: f64 = 60.0;

/// Ping interval for a server-advertised timeout of `t` seconds.
///
/// Sub-second timeouts get a floor, short ones a half-second cadence, and
/// anything longer is pinged at three quarters of the window.
pub fn ping_interval(user_timeout: f64) -> Duration {
    let secs = if user_timeout < 1.0 {
        0.3
    } else if user_timeout < 1.5 {
        0.5
    } else {
        user_timeout * 0.75
    };
    Duration::from_secs_f64(secs)
}

/// Spawn the keep-alive task. Runs until shutdown is requested or the
/// write path closes.
pub(crate) fn spawn(
    sender: MessageSender,
    mut user_timeout: watch::Receiver<f64>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if sender.send(Message::new("ping")).is_err() {
                debug!("write path closed, stopping keep-alive");
                break;
            }
            let interval = ping_interval(*user_timeout.borrow_and_update());
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        debug!("keep-alive task stopped");
    })
}
