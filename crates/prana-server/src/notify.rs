//! Outbound notification delivery and the staff WhatsApp-link tool.
//!
//! Delivery is best-effort and fire-and-forget: the booking lifecycle never
//! waits on a chat API. Without a configured bot token the notifier degrades
//! to a tracing-only no-op.

use axum::{Extension, Json};
use prana_core::{
  notify::{StaffMessage, phone_digits},
  profile::Identity,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ServerConfig, error::Error};

// ─── Notifier ─────────────────────────────────────────────────────────────────

/// Staff-channel notification sink.
pub enum Notifier {
  Telegram(TelegramNotifier),
  Null,
}

impl Notifier {
  pub fn from_config(config: &ServerConfig) -> Self {
    match (&config.telegram_bot_token, &config.telegram_chat_id) {
      (Some(token), Some(chat_id)) => Notifier::Telegram(TelegramNotifier {
        http:    reqwest::Client::new(),
        token:   token.clone(),
        chat_id: chat_id.clone(),
      }),
      _ => {
        tracing::info!("telegram not configured; staff notifications disabled");
        Notifier::Null
      }
    }
  }

  pub async fn send(&self, text: &str) {
    match self {
      Notifier::Telegram(t) => t.send(text).await,
      Notifier::Null => tracing::debug!(%text, "notification suppressed"),
    }
  }
}

/// Relays messages to a staff group chat via the Telegram bot API.
pub struct TelegramNotifier {
  http:    reqwest::Client,
  token:   String,
  chat_id: String,
}

impl TelegramNotifier {
  async fn send(&self, text: &str) {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
    let result = self
      .http
      .post(&url)
      .json(&json!({
        "chat_id":    self.chat_id,
        "text":       text,
        "parse_mode": "HTML",
      }))
      .send()
      .await;

    match result {
      Ok(resp) if !resp.status().is_success() => {
        tracing::warn!(status = %resp.status(), "telegram send rejected");
      }
      Err(e) => tracing::warn!(error = %e, "telegram send failed"),
      Ok(_) => {}
    }
  }
}

// ─── WhatsApp link tool ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub phone:   String,
  #[serde(flatten)]
  pub message: StaffMessage,
}

/// `POST /tools/whatsapp-link` — compose a prefilled `wa.me` link for a
/// staff-to-client message. Admin only; the server never sends the message
/// itself, staff open the link on their own phone.
pub async fn link_handler(
  Extension(identity): Extension<Identity>,
  Json(body): Json<LinkBody>,
) -> Result<Json<Value>, Error> {
  if !identity.is_admin() {
    return Err(Error::Forbidden);
  }

  let digits = phone_digits(&body.phone);
  if digits.is_empty() {
    return Err(Error::BadRequest("phone has no digits".into()));
  }

  let url = reqwest::Url::parse_with_params(
    &format!("https://wa.me/{digits}"),
    &[("text", body.message.render())],
  )
  .map_err(|e| Error::BadRequest(format!("cannot build link: {e}")))?;

  Ok(Json(json!({ "url": url.to_string() })))
}
