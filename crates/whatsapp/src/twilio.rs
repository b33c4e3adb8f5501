//! Twilio Messages API client for outbound WhatsApp delivery, plus webhook
//! signature validation. Delivery failures are reported as outcome values,
//! never as errors — callers log and move on.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use tracing::{error, info, warn};

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub message_sid: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message_sid: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

impl TwilioClient {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
        }
    }

    pub async fn send_message(&self, to: &str, body: &str) -> SendOutcome {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let params = [
            ("From", format!("whatsapp:{}", self.from_number)),
            ("To", format!("whatsapp:{to}")),
            ("Body", body.to_string()),
        ];

        let response = match self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(send_error) => {
                error!(
                    event_name = "whatsapp.send.transport_error",
                    to,
                    error = %send_error,
                    "could not reach the messaging provider"
                );
                return SendOutcome::failed(send_error.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(
                event_name = "whatsapp.send.rejected",
                to,
                status = %status,
                "messaging provider rejected the send"
            );
            return SendOutcome::failed(format!("provider returned {status}: {detail}"));
        }

        match response.json::<MessageResponse>().await {
            Ok(message) => {
                info!(
                    event_name = "whatsapp.send.accepted",
                    to,
                    message_sid = %message.sid,
                    "message accepted by the provider"
                );
                SendOutcome { success: true, message_sid: Some(message.sid), error: None }
            }
            Err(decode_error) => SendOutcome::failed(decode_error.to_string()),
        }
    }
}

/// HMAC-SHA1 over the raw request body, base64-encoded, compared against
/// the provider's signature header. With no secret configured, validation
/// is skipped with a warning so local setups keep working.
pub fn validate_signature(secret: Option<&str>, signature: &str, body: &str) -> bool {
    let Some(secret) = secret.filter(|secret| !secret.trim().is_empty()) else {
        warn!(
            event_name = "whatsapp.webhook.signature_skipped",
            "webhook signature validation skipped - no secret configured"
        );
        return true;
    };

    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body.as_bytes());
    let expected = BASE64.encode(mac.finalize().into_bytes());

    expected == signature
}
