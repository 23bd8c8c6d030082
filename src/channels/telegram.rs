//! Telegram channel — long-polls the Bot API for updates.
//!
//! Maps Bot API updates onto the abstract event shapes (`/start`, text,
//! contact-share, location-share, inline-button callbacks) and renders
//! effects back as messages, with back affordances as inline keyboards.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{Channel, EventStream, IncomingEvent};
use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::flow::{ConversationId, Effect, Event, StateTag};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Label rendered on the inline back button.
const BACK_BUTTON_LABEL: &str = "⬅️ Back";

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token,
            allowed_users: config.allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Check if a username or numeric id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == identity)
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// Send a prompt or summary, splitting messages that exceed Telegram's
    /// limit. The back affordance, if any, rides on the final chunk.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        back: Option<StateTag>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            let keyboard = if i == last { back } else { None };
            self.send_chunk(chat_id, chunk, keyboard).await?;
        }
        Ok(())
    }

    /// Send a single chunk (≤4096 chars), Markdown-first with plain fallback.
    async fn send_chunk(
        &self,
        chat_id: &str,
        text: &str,
        back: Option<StateTag>,
    ) -> Result<(), ChannelError> {
        let markdown_body = send_message_body(chat_id, text, back, Some("Markdown"));
        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = send_message_body(chat_id, text, back, None);
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {markdown_status}, plain: {plain_err})"
                ),
            });
        }

        Ok(())
    }

    /// Acknowledge an inline-button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        if let Err(e) = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            tracing::warn!("Telegram answerCallbackQuery failed: {e}");
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let url = format!(
                    "https://api.telegram.org/bot{}/getUpdates",
                    bot_token.expose_secret()
                );
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(parsed) = parse_update(update) else {
                            continue;
                        };

                        let is_allowed = {
                            let identities: Vec<&str> = parsed
                                .username
                                .as_deref()
                                .into_iter()
                                .chain(parsed.user_id.as_deref())
                                .collect();
                            check_user_allowed(&allowed_users, identities)
                        };
                        if !is_allowed {
                            tracing::warn!(
                                "Telegram: ignoring update from unauthorized user: \
                                 username={}, user_id={}",
                                parsed.username.as_deref().unwrap_or("unknown"),
                                parsed.user_id.as_deref().unwrap_or("unknown")
                            );
                            continue;
                        }

                        let incoming = IncomingEvent::new(
                            "telegram",
                            ConversationId::new(parsed.chat_id.clone()),
                            parsed.event.clone(),
                        )
                        .with_metadata(serde_json::json!({
                            "chat_id": parsed.chat_id,
                            "username": parsed.username,
                            "callback_id": parsed.callback_id,
                        }));

                        if tx.send(incoming).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn deliver(
        &self,
        incoming: &IncomingEvent,
        effect: &Effect,
    ) -> Result<(), ChannelError> {
        let chat_id = incoming
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in event metadata".into(),
            })?;

        // A button press deserves an ack before the re-prompt lands.
        if let Some(callback_id) = incoming.metadata.get("callback_id").and_then(|v| v.as_str()) {
            self.answer_callback(callback_id).await;
        }

        match effect {
            Effect::Prompt { text, back } => self.send_text(chat_id, text, *back).await,
            Effect::Summary { text } => self.send_text(chat_id, text, None).await,
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Update mapping ──────────────────────────────────────────────────

/// A Bot API update reduced to what the engine needs.
#[derive(Debug, Clone)]
struct ParsedUpdate {
    chat_id: String,
    event: Event,
    username: Option<String>,
    user_id: Option<String>,
    /// Present for callback queries; used to acknowledge the press.
    callback_id: Option<String>,
}

/// Map one raw update to an abstract event, if it carries one.
fn parse_update(update: &serde_json::Value) -> Option<ParsedUpdate> {
    if let Some(message) = update.get("message") {
        return parse_message(message);
    }
    if let Some(callback) = update.get("callback_query") {
        return parse_callback(callback);
    }
    None
}

fn parse_message(message: &serde_json::Value) -> Option<ParsedUpdate> {
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?
        .to_string();
    let (username, user_id) = sender_identities(message.get("from"));

    let event = if let Some(contact) = message.get("contact") {
        let phone = contact.get("phone_number").and_then(|p| p.as_str())?;
        Event::contact(phone)
    } else if let Some(location) = message.get("location") {
        let lat = location.get("latitude").and_then(serde_json::Value::as_f64)?;
        let lon = location
            .get("longitude")
            .and_then(serde_json::Value::as_f64)?;
        Event::LocationShared { lat, lon }
    } else if let Some(text) = message.get("text").and_then(|t| t.as_str()) {
        if text == "/start" || text.starts_with("/start ") {
            Event::StartRequested
        } else {
            Event::text(text)
        }
    } else {
        // Stickers, photos, etc. carry no collectable payload.
        return None;
    };

    Some(ParsedUpdate {
        chat_id,
        event,
        username,
        user_id,
        callback_id: None,
    })
}

fn parse_callback(callback: &serde_json::Value) -> Option<ParsedUpdate> {
    let callback_id = callback.get("id").and_then(|i| i.as_str())?.to_string();
    let chat_id = callback
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?
        .to_string();
    let (username, user_id) = sender_identities(callback.get("from"));

    let target = callback
        .get("data")
        .and_then(|d| d.as_str())
        .and_then(StateTag::from_nav_tag)?;

    Some(ParsedUpdate {
        chat_id,
        event: Event::BackRequested { target },
        username,
        user_id,
        callback_id: Some(callback_id),
    })
}

fn sender_identities(from: Option<&serde_json::Value>) -> (Option<String>, Option<String>) {
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(|u| u.as_str())
        .map(String::from);
    let user_id = from
        .and_then(|f| f.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string());
    (username, user_id)
}

// ── Rendering helpers ───────────────────────────────────────────────

/// Build a sendMessage body, attaching the back affordance as an inline
/// keyboard whose callback payload is the nav tag.
fn send_message_body(
    chat_id: &str,
    text: &str,
    back: Option<StateTag>,
    parse_mode: Option<&str>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if let Some(mode) = parse_mode {
        body["parse_mode"] = serde_json::Value::String(mode.to_string());
    }
    if let Some(target) = back {
        body["reply_markup"] = serde_json::json!({
            "inline_keyboard": [[{
                "text": BACK_BUTTON_LABEL,
                "callback_data": target.nav_tag(),
            }]]
        });
    }
    body
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts at the last
/// char boundary at or below the limit. The limit is in bytes, but user
/// text (names flow into prompts verbatim) can be arbitrary UTF-8, so the
/// hard cut must never land inside a multibyte character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let cut = floor_char_boundary(remaining, max_len);
        let chunk = &remaining[..cut];
        let split_at = chunk.rfind('\n').or_else(|| chunk.rfind(' ')).unwrap_or(cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

/// Largest char-boundary index ≤ `index`. Never 0 for a non-empty string:
/// a first character wider than `index` is included whole so the caller
/// always makes progress.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut cut = index;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        s.chars().next().map_or(s.len(), char::len_utf8)
    } else {
        cut
    }
}

// ── Tests ───────────────────────────────────────────────────────────
