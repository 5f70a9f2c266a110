// =============================================================================
// Webhook Alerting — best-effort, fire-and-forget
// =============================================================================
//
// Delivers close/failure notices to a Feishu-style text webhook. Delivery is
// strictly best-effort: every failure is logged and swallowed so the
// decision pipeline never waits on, or fails because of, the alert channel.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::guard::monitor::Notifier;

/// Webhook notifier. With no URL configured, every notify is a no-op.
pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { url, client }
    }
}

/// Feishu text-message payload.
fn text_payload(message: &str) -> serde_json::Value {
    json!({
        "msg_type": "text",
        "content": { "text": message }
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let Some(url) = &self.url else {
            debug!("no webhook configured — alert dropped");
            return;
        };

        let stamped = format!("[{}] {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"), message);

        match self.client.post(url).json(&text_payload(&stamped)).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("alert delivered");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "webhook rejected the alert");
            }
            Err(e) => {
                warn!(error = %e, "failed to deliver alert");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
