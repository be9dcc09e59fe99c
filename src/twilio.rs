use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::TwilioSettings;

const TWILIO_API_BASE: &str = "https://api.twilio.com/";

/// A message accepted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub sid: String,
    pub date_sent: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with an error. `status` is the HTTP status and
    /// decides whether a retry makes sense; `code` is the provider's own code.
    #[error("provider error {status}: {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// "Create message" on a hosted SMS provider.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn create_message(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<ProviderMessage, ProviderError>;
}

#[derive(Clone)]
pub struct TwilioClient {
    http: Client,
    base_url: Url,
    account_sid: String,
    auth_token: String,
}

impl fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .finish_non_exhaustive()
    }
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String) -> Result<Self> {
        let base_url = Url::parse(TWILIO_API_BASE).context("invalid default Twilio URL")?;
        Self::with_base_url(account_sid, auth_token, base_url)
    }

    pub fn with_base_url(account_sid: String, auth_token: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("placement-notify/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            account_sid,
            auth_token,
        })
    }

    pub fn from_settings(settings: &TwilioSettings) -> Result<Self> {
        let sid = settings.account_sid.trim().to_string();
        let token = settings.auth_token.trim().to_string();
        match settings.base_url.as_deref() {
            Some(url) => {
                let base_url = Url::parse(url).context("invalid twilio.base_url")?;
                Self::with_base_url(sid, token, base_url)
            }
            None => Self::new(sid, token),
        }
    }

    pub fn build_request(&self, to: &str, from: &str, body: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("2010-04-01/Accounts/{}/Messages.json", self.account_sid))
            .context("invalid Twilio base URL")?;
        self.http
            .post(endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .build()
            .context("failed to build Twilio request")
    }
}

#[async_trait]
impl SmsProvider for TwilioClient {
    async fn create_message(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<ProviderMessage, ProviderError> {
        let request = self.build_request(to, from, body)?;
        debug!(url=%request.url(), to, "sending twilio request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Twilio")?;

        let status = res.status();
        let text = res.text().await.context("failed to read Twilio response")?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        let payload: MessageResponse =
            serde_json::from_str(&text).context("invalid Twilio response JSON")?;
        Ok(ProviderMessage {
            sid: payload.sid,
            date_sent: payload.date_sent.as_deref().and_then(parse_date),
        })
    }
}

/// Decode a provider error body, falling back to the raw text.
pub fn api_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => ProviderError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        Err(_) => ProviderError::Api {
            status,
            code: None,
            message: body.trim().to_string(),
        },
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
    date_sent: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    code: Option<i64>,
    message: String,
}
