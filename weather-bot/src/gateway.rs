//! Discord gateway session: identify, heartbeat, and event fan-out to the router.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, error, info, warn};

use weather_core::{CommandRouter, InboundMessage};

use crate::discord::{DiscordClient, DiscordError};

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
pub const INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageAuthor {
    id: String,
    username: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    channel_id: String,
    #[serde(default)]
    content: String,
    author: MessageAuthor,
}

impl From<MessageCreate> for InboundMessage {
    fn from(msg: MessageCreate) -> Self {
        InboundMessage {
            author_id: msg.author.id,
            author_name: msg.author.username,
            author_is_bot: msg.author.bot,
            channel_id: msg.channel_id,
            content: msg.content,
        }
    }
}

/// Close codes after which reconnecting cannot help.
pub fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010..=4014)
}

pub fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "weather-bot",
                "device": "weather-bot"
            }
        }
    })
}

fn heartbeat_payload(seq: Option<u64>) -> String {
    json!({ "op": OP_HEARTBEAT, "d": seq }).to_string()
}

pub struct Gateway {
    url: String,
    client: Arc<DiscordClient>,
    router: Arc<CommandRouter>,
}

impl Gateway {
    pub fn new(client: Arc<DiscordClient>, router: Arc<CommandRouter>) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            client,
            router,
        }
    }

    /// Keep a session alive until a fatal close code arrives.
    pub async fn run(&self) -> Result<()> {
        loop {
            let outcome = self.run_session().await;
            self.client.detach_gateway().await;

            match outcome {
                Ok(()) => info!("gateway session ended, reconnecting"),
                Err(e) if matches!(e.downcast_ref::<DiscordError>(), Some(DiscordError::FatalClose(_))) => {
                    return Err(e);
                }
                Err(e) => warn!(error = %format!("{e:#}"), "gateway session failed, reconnecting"),
            }

            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_session(&self) -> Result<()> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .context("Failed to connect to Discord gateway")?;
        let (mut sink, mut stream) = socket.split();

        let interval_ms = read_hello(&mut stream).await?;
        debug!(interval_ms, "gateway hello received");

        let (frames, mut outbound) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = sink.send(Message::text(frame)).await {
                    warn!(error = %e, "gateway write failed");
                    break;
                }
            }
        });

        frames
            .send(identify_payload(self.client.token()).to_string())
            .map_err(|_| anyhow!("gateway writer stopped before identify"))?;
        self.client.attach_gateway(frames.clone()).await;

        let mut heartbeat = tokio::time::interval(Duration::from_millis(interval_ms));
        let mut seq: Option<u64> = None;

        let result: Result<()> = loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if frames.send(heartbeat_payload(seq)).is_err() {
                        break Err(anyhow!("gateway writer stopped"));
                    }
                }
                frame = stream.next() => match frame {
                    None => break Ok(()),
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("Gateway read failed")),
                    Some(Ok(Message::Text(text))) => {
                        let payload: GatewayPayload = match serde_json::from_str(text.as_str()) {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(error = %e, "ignoring undecodable gateway payload");
                                continue;
                            }
                        };
                        if payload.s.is_some() {
                            seq = payload.s;
                        }

                        match payload.op {
                            OP_DISPATCH => self.on_dispatch(payload).await,
                            OP_HEARTBEAT => {
                                let _ = frames.send(heartbeat_payload(seq));
                            }
                            OP_RECONNECT | OP_INVALID_SESSION => {
                                info!(op = payload.op, "gateway asked for a new session");
                                break Ok(());
                            }
                            OP_HEARTBEAT_ACK => {}
                            other => debug!(op = other, "unhandled gateway opcode"),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        warn!(?code, "gateway closed the connection");
                        break match code {
                            Some(code) if is_fatal_close(code) => Err(DiscordError::FatalClose(code).into()),
                            _ => Ok(()),
                        };
                    }
                    Some(Ok(_)) => {}
                },
            }
        };

        writer.abort();
        result
    }

    async fn on_dispatch(&self, payload: GatewayPayload) {
        match payload.t.as_deref() {
            Some("READY") => {
                let user = payload.d["user"]["username"].as_str().unwrap_or("unknown");
                let guilds = payload.d["guilds"].as_array().map_or(0, Vec::len);
                if let Err(e) = self.router.on_ready(user, guilds).await {
                    warn!(error = %format!("{e:#}"), "failed to finish ready hook");
                }
            }
            Some("MESSAGE_CREATE") => match serde_json::from_value::<MessageCreate>(payload.d) {
                Ok(msg) => spawn_isolated(self.router.clone(), msg.into()),
                Err(e) => warn!(error = %e, "ignoring malformed MESSAGE_CREATE"),
            },
            _ => {}
        }
    }
}

fn heartbeat_interval(hello: &GatewayPayload) -> Result<u64> {
    match hello.d["heartbeat_interval"].as_u64() {
        Some(0) => Err(anyhow!("gateway hello with zero heartbeat_interval")),
        Some(ms) => Ok(ms),
        None => Err(anyhow!("gateway hello without heartbeat_interval")),
    }
}

async fn read_hello<S>(stream: &mut S) -> Result<u64>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        if let Message::Text(text) = frame.context("Gateway read failed")? {
            let payload: GatewayPayload =
                serde_json::from_str(text.as_str()).context("Failed to parse gateway hello")?;
            if payload.op != OP_HELLO {
                return Err(anyhow!("expected gateway hello, got opcode {}", payload.op));
            }
            return heartbeat_interval(&payload);
        }
    }

    Err(anyhow!("gateway closed before hello"))
}

/// Handle one message on its own task so a slow or panicking command
/// cannot hold up or take down the others.
fn spawn_isolated(router: Arc<CommandRouter>, message: InboundMessage) {
    tokio::spawn(async move {
        let channel = message.channel_id.clone();
        let task = tokio::spawn(async move { router.handle_message(&message).await });

        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(%channel, error = %format!("{e:#}"), "failed to deliver reply"),
            Err(e) if e.is_panic() => error!(%channel, "command handler panicked"),
            Err(e) => error!(%channel, error = %e, "command task was cancelled"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_include_message_content() {
        assert_eq!(INTENTS, 37377);
    }

    #[test]
    fn identify_carries_token_and_intents() {
        let payload = identify_payload("abc");
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["token"], "abc");
        assert_eq!(payload["d"]["intents"], INTENTS);
    }

    #[test]
    fn heartbeat_sends_last_sequence_or_null() {
        let idle: Value = serde_json::from_str(&heartbeat_payload(None)).unwrap();
        assert_eq!(idle, json!({ "op": 1, "d": null }));

        let resumed: Value = serde_json::from_str(&heartbeat_payload(Some(7))).unwrap();
        assert_eq!(resumed, json!({ "op": 1, "d": 7 }));
    }

    fn hello(d: Value) -> GatewayPayload {
        serde_json::from_value(json!({ "op": OP_HELLO, "d": d })).unwrap()
    }

    #[test]
    fn hello_interval_is_read() {
        let payload = hello(json!({ "heartbeat_interval": 41250 }));
        assert_eq!(heartbeat_interval(&payload).unwrap(), 41250);
    }

    #[test]
    fn hello_with_zero_or_missing_interval_is_rejected() {
        let zero = heartbeat_interval(&hello(json!({ "heartbeat_interval": 0 }))).unwrap_err();
        assert!(zero.to_string().contains("zero heartbeat_interval"));

        let missing = heartbeat_interval(&hello(json!({}))).unwrap_err();
        assert!(missing.to_string().contains("without heartbeat_interval"));
    }

    #[test]
    fn authentication_failure_is_fatal() {
        assert!(is_fatal_close(4004));
        assert!(is_fatal_close(4014));
        assert!(!is_fatal_close(1000));
        assert!(!is_fatal_close(4000));
        assert!(!is_fatal_close(4009));
    }

    #[test]
    fn message_create_maps_to_inbound_message() {
        let msg: MessageCreate = serde_json::from_value(json!({
            "id": "1",
            "channel_id": "555",
            "content": "!weather Tokyo",
            "author": { "id": "42", "username": "alice" }
        }))
        .unwrap();

        let inbound = InboundMessage::from(msg);
        assert_eq!(inbound.channel_id, "555");
        assert_eq!(inbound.content, "!weather Tokyo");
        assert_eq!(inbound.author_name, "alice");
        assert!(!inbound.author_is_bot);
    }

    #[test]
    fn bot_flag_is_carried_through() {
        let msg: MessageCreate = serde_json::from_value(json!({
            "channel_id": "555",
            "content": "!ping",
            "author": { "id": "7", "username": "other-bot", "bot": true }
        }))
        .unwrap();

        assert!(InboundMessage::from(msg).author_is_bot);
    }
}
