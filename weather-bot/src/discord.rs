//! Discord REST client and the [`ChatPlatform`] implementation on top of it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};

use weather_core::{ChatPlatform, Reply};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("Discord rejected the bot token (HTTP 401).\nHint: check DISCORD_TOKEN.")]
    Unauthorized,

    #[error("Discord gateway closed the session with fatal code {0}")]
    FatalClose(u16),

    #[error("Discord API request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Discord gateway is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

pub struct DiscordClient {
    token: String,
    api_base: String,
    http: Client,
    /// Outbound frame queue of the live gateway session, if any.
    gateway: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl DiscordClient {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    pub fn with_api_base(token: String, api_base: impl Into<String>) -> Self {
        Self {
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            gateway: Mutex::new(None),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Check the token against `/users/@me`; a 401 is [`DiscordError::Unauthorized`].
    pub async fn verify_token(&self) -> Result<CurrentUser> {
        let res = self
            .http
            .get(format!("{}/users/@me", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .context("Failed to reach Discord API")?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DiscordError::Unauthorized.into());
        }

        let body = res
            .text()
            .await
            .context("Failed to read Discord /users/@me response body")?;

        if !status.is_success() {
            return Err(DiscordError::Api {
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        serde_json::from_str(&body).context("Failed to parse Discord /users/@me JSON")
    }

    pub async fn attach_gateway(&self, frames: mpsc::UnboundedSender<String>) {
        *self.gateway.lock().await = Some(frames);
    }

    pub async fn detach_gateway(&self) {
        self.gateway.lock().await.take();
    }
}

pub fn message_body(reply: &Reply) -> Value {
    match reply {
        Reply::Text(content) => json!({ "content": content }),
        Reply::Embed(embed) => json!({ "embeds": [embed] }),
    }
}

pub fn presence_payload(activity: &str) -> Value {
    json!({
        "op": 3,
        "d": {
            "since": null,
            "activities": [{ "name": activity, "type": 0 }],
            "status": "online",
            "afk": false
        }
    })
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn send_reply(&self, channel_id: &str, reply: &Reply) -> Result<()> {
        let res = self
            .http
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&message_body(reply))
            .send()
            .await
            .context("Failed to send message to Discord")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DiscordError::Api {
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        Ok(())
    }

    async fn set_activity(&self, text: &str) -> Result<()> {
        let guard = self.gateway.lock().await;
        let frames = guard.as_ref().ok_or(DiscordError::NotConnected)?;
        frames
            .send(presence_payload(text).to_string())
            .map_err(|_| DiscordError::NotConnected)?;
        Ok(())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::Embed;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    #[test]
    fn text_reply_becomes_content() {
        assert_eq!(message_body(&Reply::text("Pong!")), json!({ "content": "Pong!" }));
    }

    #[test]
    fn embed_reply_uses_discord_embed_shape() {
        let reply = Reply::Embed(
            Embed::new("Weather in London", "Sunny", 0x00ff00).field("Humidity", "60%", true),
        );

        assert_eq!(
            message_body(&reply),
            json!({
                "embeds": [{
                    "title": "Weather in London",
                    "description": "Sunny",
                    "color": 65280,
                    "fields": [{ "name": "Humidity", "value": "60%", "inline": true }]
                }]
            })
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        assert_eq!(truncate_body(&body).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn send_reply_posts_to_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/123/messages"))
            .and(header("authorization", "Bot secret"))
            .and(body_json(json!({ "content": "Pong!" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DiscordClient::with_api_base("secret".into(), server.uri());
        client.send_reply("123", &Reply::text("Pong!")).await.unwrap();
    }

    #[tokio::test]
    async fn send_reply_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
            .mount(&server)
            .await;

        let client = DiscordClient::with_api_base("secret".into(), server.uri());
        let err = client.send_reply("123", &Reply::text("hi")).await.unwrap_err();
        assert!(err.to_string().contains("Missing Access"));
    }

    #[tokio::test]
    async fn verify_token_rejects_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = DiscordClient::with_api_base("bad".into(), server.uri());
        let err = client.verify_token().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DiscordError>(),
            Some(DiscordError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn verify_token_returns_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "99", "username": "weather-bot" })),
            )
            .mount(&server)
            .await;

        let client = DiscordClient::with_api_base("good".into(), server.uri());
        let me = client.verify_token().await.unwrap();
        assert_eq!(me.id, "99");
        assert_eq!(me.username, "weather-bot");
    }

    #[tokio::test]
    async fn set_activity_requires_gateway() {
        let client = DiscordClient::new("t".into());
        let err = client.set_activity("!weather <city>").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DiscordError>(),
            Some(DiscordError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn set_activity_queues_presence_update() {
        let client = DiscordClient::new("t".into());
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.attach_gateway(tx).await;

        client.set_activity("!weather <city>").await.unwrap();

        let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["op"], 3);
        assert_eq!(frame["d"]["activities"][0]["name"], "!weather <city>");
        assert_eq!(frame["d"]["activities"][0]["type"], 0);
    }
}
