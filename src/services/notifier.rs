// src/services/notifier.rs

//! Notification delivery.
//!
//! Formats each new item and hands it to a `MessageSender`. Delivery is
//! fire-and-forget: failures are logged and counted, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{EnrichedItem, NotifierConfig};
use crate::pipeline::tracker::{RequestTracker, Service, ServiceStatus};
use crate::utils::http::create_api_client;

/// Message formatting requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

/// Per-message delivery options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: ParseMode,
    pub disable_link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::Markdown,
            disable_link_preview: true,
        }
    }
}

/// External send capability.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str, options: SendOptions) -> Result<()>;
}

/// Telegram Bot API sender.
pub struct TelegramSender {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: ParseMode,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramSender {
    pub fn new(client: Client, api_base: &str, bot_token: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
        }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, chat_id: &str, text: &str, options: SendOptions) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: options.parse_mode,
            disable_web_page_preview: options.disable_link_preview,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        check_send_response(status, &body)
    }
}

/// Interpret a Bot API reply. Delivery is confirmed only by a 2xx status
/// together with `"ok": true`.
fn check_send_response(status: u16, body: &str) -> Result<()> {
    let reply: SendMessageResponse = match serde_json::from_str(body) {
        Ok(reply) => reply,
        // Gateways in front of the API answer errors with HTML
        Err(_) if !(200..300).contains(&status) => {
            return Err(AppError::notify(format!("status {status}: non-JSON reply")));
        }
        Err(error) => return Err(error.into()),
    };

    if (200..300).contains(&status) && reply.ok {
        Ok(())
    } else {
        Err(AppError::notify(format!(
            "status {}: {}",
            status,
            reply.description.unwrap_or_else(|| "no description".into())
        )))
    }
}

/// Sender that only logs; used for dry runs.
pub struct ConsoleSender;

#[async_trait]
impl MessageSender for ConsoleSender {
    async fn send(&self, chat_id: &str, text: &str, _options: SendOptions) -> Result<()> {
        log::info!("[dry-run] to {}:\n{}", chat_id, text);
        Ok(())
    }
}

/// Formats items and records every send attempt.
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    chat_id: String,
    template: String,
    tracker: RequestTracker,
}

impl Notifier {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        chat_id: impl Into<String>,
        template: impl Into<String>,
        tracker: RequestTracker,
    ) -> Self {
        Self {
            sender,
            chat_id: chat_id.into(),
            template: template.into(),
            tracker,
        }
    }

    /// Build a notifier from configuration.
    ///
    /// Fails if delivery is enabled but the token or chat id is missing.
    pub fn from_config(config: &NotifierConfig, tracker: RequestTracker) -> Result<Self> {
        if config.dry_run {
            let chat_id = if config.chat_id.is_empty() {
                "dry-run"
            } else {
                config.chat_id.as_str()
            };
            return Ok(Self::new(
                Arc::new(ConsoleSender),
                chat_id,
                &config.template,
                tracker,
            ));
        }

        if config.bot_token.trim().is_empty() {
            return Err(AppError::config(
                "notifier.bot_token is empty (set TELEGRAM_BOT_TOKEN)",
            ));
        }
        if config.chat_id.trim().is_empty() {
            return Err(AppError::config(
                "notifier.chat_id is empty (set CHANNEL_ID)",
            ));
        }

        let client = create_api_client(30)?;
        let sender = TelegramSender::new(client, &config.api_base, &config.bot_token);
        Ok(Self::new(
            Arc::new(sender),
            config.chat_id.trim(),
            &config.template,
            tracker,
        ))
    }

    /// Render the message for an item.
    pub fn render(&self, item: &EnrichedItem) -> String {
        item.format(&self.template)
    }

    /// Send one item. Returns `true` only on confirmed delivery.
    pub async fn notify(&self, item: &EnrichedItem) -> bool {
        let text = self.render(item);
        self.tracker.record(Service::Notifier, ServiceStatus::Sending);

        match self
            .sender
            .send(&self.chat_id, &text, SendOptions::default())
            .await
        {
            Ok(()) => {
                self.tracker.record(Service::Notifier, ServiceStatus::Completed);
                log::info!("Announced {} ({})", item.name, item.display_year);
                true
            }
            Err(error) => {
                self.tracker.record(Service::Notifier, ServiceStatus::Error);
                log::error!(
                    "Failed to announce {} ({}): {}",
                    item.name,
                    item.display_year,
                    error
                );
                false
            }
        }
    }
}
