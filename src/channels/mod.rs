//! Outbound client messaging.
//!
//! Booking notifications are fire-and-forget: a delivery failure is
//! logged and never rolls back the appointment that triggered it.

use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("messaging request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("messaging gateway rejected the request with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn notify_client(&self, phone: &str, message: &str) -> Result<(), GatewayError>;
}

/// WhatsApp Cloud API sender.
pub struct WhatsAppGateway {
    http: reqwest::Client,
    api_url: String,
    phone_number_id: String,
    access_token: String,
}

impl WhatsAppGateway {
    pub fn new(api_url: &str, phone_number_id: &str, access_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            phone_number_id: phone_number_id.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppGateway {
    async fn notify_client(&self, phone: &str, message: &str) -> Result<(), GatewayError> {
        let url = format!("{}/{}/messages", self.api_url, self.phone_number_id);
        let body = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": phone,
            "type": "text",
            "text": { "body": message },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Gateway used when no messaging channel is configured: logs and
/// succeeds. Also convenient in tests.
#[derive(Default)]
pub struct NullGateway;

#[async_trait]
impl MessagingGateway for NullGateway {
    async fn notify_client(&self, phone: &str, message: &str) -> Result<(), GatewayError> {
        tracing::debug!(phone, message, "messaging disabled, notification dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_gateway_always_succeeds() {
        let gateway = NullGateway;
        assert!(gateway.notify_client("+5511999990001", "hello").await.is_ok());
    }
}
