use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::TransportError;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// The third-party "send text message" capability.
#[async_trait]
pub trait TextSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TransportError>;
}

#[derive(Clone)]
pub struct TwilioClient {
    http: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            http: Client::new(),
            account_sid,
            auth_token,
            from_number,
            base_url: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.account_sid.trim().is_empty()
            && !self.auth_token.trim().is_empty()
            && !self.from_number.trim().is_empty()
    }
}

#[async_trait]
impl TextSender for TwilioClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), TransportError> {
        if !self.has_credentials() {
            return Err(TransportError::Disabled);
        }

        let url = format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid);
        let res = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioErrorBody>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(TransportError::Carrier { status, message });
        }

        let sent = res.json::<MessageResponse>().await?;
        tracing::info!(to, sid = %sent.sid, status = %sent.status, "SMS accepted by Twilio");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: String,
}
