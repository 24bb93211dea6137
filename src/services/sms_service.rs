use std::sync::Arc;
use std::time::Duration;

use crate::{config::Settings, error::TransportError};

use super::phone;
use super::twilio::{TextSender, TwilioClient};

/// Single-segment SMS length.
pub const MAX_SMS_LENGTH: usize = 160;

/// Collapses whitespace runs and truncates to `max_length` characters,
/// ending with `...` when cut.
pub fn format_message(message: &str, max_length: usize) -> String {
    let formatted = message.split_whitespace().collect::<Vec<_>>().join(" ");

    if formatted.chars().count() <= max_length {
        return formatted;
    }

    let keep = max_length.saturating_sub(3);
    let mut out: String = formatted.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Outbound SMS adapter handed to the dispatcher.
///
/// Disabled instances never touch the network and fail every send with
/// [`TransportError::Disabled`].
#[derive(Clone)]
pub struct SmsService {
    sender: Option<Arc<dyn TextSender>>,
    timeout: Duration,
}

impl SmsService {
    pub fn new(sender: Arc<dyn TextSender>, timeout: Duration) -> Self {
        Self { sender: Some(sender), timeout }
    }

    pub fn disabled() -> Self {
        Self { sender: None, timeout: Duration::from_secs(5) }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = TwilioClient::new(
            settings.twilio_account_sid.clone(),
            settings.twilio_auth_token.clone(),
            settings.twilio_phone_number.clone(),
        );

        if !settings.sms_enabled || !client.has_credentials() {
            tracing::warn!("SMS service disabled: missing Twilio credentials or SMS_ENABLED=false");
            return Self::disabled();
        }

        tracing::info!("Twilio SMS service initialized");
        Self::new(Arc::new(client), Duration::from_secs(settings.sms_timeout_secs))
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub async fn send(&self, phone_number: &str, message: &str) -> Result<(), TransportError> {
        let Some(sender) = &self.sender else {
            return Err(TransportError::Disabled);
        };

        if phone_number.trim().is_empty() {
            return Err(TransportError::Rejected("recipient phone number is required".into()));
        }
        if message.trim().is_empty() {
            return Err(TransportError::Rejected("message content is required".into()));
        }

        let to = phone::normalize(phone_number)
            .ok_or_else(|| TransportError::Rejected(format!("invalid phone number: {phone_number}")))?;
        let body = format_message(message, MAX_SMS_LENGTH);

        match tokio::time::timeout(self.timeout, sender.send_text(&to, &body)).await {
            Ok(Ok(())) => {
                tracing::info!(to = %to, "SMS sent");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(to = %to, error = %e, "Failed to send SMS");
                Err(e)
            }
            Err(_) => {
                tracing::error!(to = %to, timeout_secs = self.timeout.as_secs(), "SMS send timed out");
                Err(TransportError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
