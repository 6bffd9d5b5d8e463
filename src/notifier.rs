//! Telegram Bot API notifier
//!
//! One `sendMessage` call per [`TelegramNotifier::send`]. There is no retry
//! and no deduplication; the caller decides what to do with a failure.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;

/// Telegram rejects longer texts
pub const MAX_MESSAGE_CHARS: usize = 4096;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const TRUNCATION_MARKER: &str = "\n…";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("refusing to send an empty message")]
    EmptyMessage,

    #[error("delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram rejected the message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends text messages to one configured chat
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &TelegramConfig, client: reqwest::Client) -> Self {
        TelegramNotifier {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    /// Deliver `message` to the configured chat
    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        if message.trim().is_empty() {
            return Err(NotifyError::EmptyMessage);
        }

        let text = truncate_message(message);
        if text != message {
            warn!(
                "Message truncated to {} characters for Telegram",
                MAX_MESSAGE_CHARS
            );
        }

        // The token is part of the path, keep it out of logs
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        debug!("Sending {} characters to chat {}", text.chars().count(), self.chat_id);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text: &text,
            })
            .send()
            .await?;

        let status = response.status();
        let body: Option<SendMessageResponse> = response.json().await.ok();

        match body {
            Some(SendMessageResponse { ok: true, .. }) if status.is_success() => {
                info!("Telegram message delivered to chat {}", self.chat_id);
                Ok(())
            }
            body => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: body
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| status.to_string()),
            }),
        }
    }
}

/// Cut `message` to at most [`MAX_MESSAGE_CHARS`] characters
fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }

    let keep = MAX_MESSAGE_CHARS - TRUNCATION_MARKER.chars().count();
    let mut text: String = message.chars().take(keep).collect();
    text.push_str(TRUNCATION_MARKER);
    text
}
