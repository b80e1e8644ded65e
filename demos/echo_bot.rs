//! Minimal echo bot.
//!
//! Connects, logs in, joins a channel, and repeats every channel text
//! message it sees:
//!
//! ```text
//! cargo run --example echo_bot -- <host> <port> <channel>
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use ttproto::{Client, LoginConfig, TextMessageType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().and_then(|p| p.parse().ok()).unwrap_or(10333);
    let channel = args.next().unwrap_or_else(|| "/".to_string());

    let mut client = Client::connect(&host, port).await?;
    client
        .login(LoginConfig {
            nickname: "echo".into(),
            username: "echo".into(),
            password: String::new(),
            client_name: "ttproto echo bot".into(),
            ..Default::default()
        })
        .await?;

    client.join(channel.as_str(), "", None)?;

    client.subscribe("message", |client, fields| {
        // only echo channel text, and never our own
        if fields.int("type") != Some(TextMessageType::Channel as i64) {
            return;
        }
        if fields.int("srcuserid") == client.state().me.int("userid") {
            return;
        }
        if let Some(content) = fields.text("content") {
            let reply = format!("echo: {content}");
            if let Err(e) = client.channel_message(&reply, None, None) {
                tracing::warn!("echo failed: {e}");
            }
        }
    });

    loop {
        match client.run_loop(Some(Duration::from_secs(1))).await {
            Ok(()) => break,
            Err(e) => tracing::error!("receive loop error: {e}"),
        }
        if client.is_shutdown() {
            break;
        }
    }
    Ok(())
}
