//! Single and bulk SMS sending with demo fallback and bounded retry.
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, SmsSettings, TwilioSettings};
use crate::credentials;
use crate::phone;
use crate::twilio::{ProviderError, SmsProvider, TwilioClient};

/// HTTP statuses treated as transient.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Pause between bulk batches.
pub const BATCH_PAUSE: Duration = Duration::from_secs(1);

const DISABLED_REASON: &str = "SMS is disabled";

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Invalid recipient phone number")]
    InvalidRecipient,
    #[error("Twilio Error {code}: {message}")]
    Provider { code: i64, message: String },
    #[error("SMS Error: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Demo,
}

/// Expected outcomes of a send. Real failures travel as [`SmsError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Sending is switched off; nothing left the process.
    Disabled,
    /// Credentials are missing; the send was simulated locally.
    Demo {
        message_id: String,
        recipient: Option<String>,
    },
    Sent {
        message_id: String,
        recipient: String,
        sent_at: Option<DateTime<Utc>>,
    },
}

impl SendOutcome {
    pub fn success(&self) -> bool {
        !matches!(self, SendOutcome::Disabled)
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            SendOutcome::Disabled => None,
            SendOutcome::Demo { message_id, .. } | SendOutcome::Sent { message_id, .. } => {
                Some(message_id.as_str())
            }
        }
    }

    pub fn recipient(&self) -> Option<&str> {
        match self {
            SendOutcome::Disabled => None,
            SendOutcome::Demo { recipient, .. } => recipient.as_deref(),
            SendOutcome::Sent { recipient, .. } => Some(recipient.as_str()),
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            SendOutcome::Disabled => None,
            SendOutcome::Demo { .. } => Some(Mode::Demo),
            SendOutcome::Sent { .. } => Some(Mode::Production),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SendOutcome::Disabled => Some(DISABLED_REASON),
            _ => None,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, SendOutcome::Demo { .. })
    }

    /// Flat record for display or JSON output.
    pub fn report(&self) -> SendReport {
        SendReport {
            success: self.success(),
            message_id: self.message_id().map(str::to_string),
            recipient: self.recipient().map(str::to_string),
            mode: self.mode(),
            error: self.error().map(str::to_string),
            timestamp: match self {
                SendOutcome::Sent { sent_at, .. } => *sent_at,
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SendReport {
    pub success: bool,
    pub message_id: Option<String>,
    pub recipient: Option<String>,
    pub mode: Option<Mode>,
    pub error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkFailure {
    pub recipient: String,
    pub reason: String,
}

/// Per-recipient summary of a bulk send. Recipients are recorded as given.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkReport {
    pub sent: Vec<String>,
    pub failed: Vec<BulkFailure>,
    pub total: usize,
}

pub struct Dispatcher {
    settings: SmsSettings,
    twilio: TwilioSettings,
    provider: Arc<dyn SmsProvider>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .field("twilio", &self.twilio)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(cfg: &Config, provider: Arc<dyn SmsProvider>) -> Self {
        Self {
            settings: cfg.sms.clone(),
            twilio: cfg.twilio.clone(),
            provider,
        }
    }

    /// Dispatcher backed by the real Twilio API.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = TwilioClient::from_settings(&cfg.twilio)?;
        Ok(Self::new(cfg, Arc::new(client)))
    }

    pub fn settings(&self) -> &SmsSettings {
        &self.settings
    }

    pub fn normalize(&self, raw: &str) -> Option<String> {
        phone::normalize(raw, &self.settings.default_country_code)
    }

    /// Send one message, retrying transient provider failures.
    #[instrument(skip_all)]
    pub async fn send(&self, to: &str, body: &str) -> Result<SendOutcome, SmsError> {
        if !self.settings.enabled {
            info!("SMS is disabled; message not sent");
            return Ok(SendOutcome::Disabled);
        }

        if let Err(err) = credentials::validate(&self.twilio) {
            warn!(%err, "SMS credentials not configured; running in demo mode");
            info!(to, body, "[DEMO MODE] would send SMS");
            return Ok(SendOutcome::Demo {
                message_id: demo_message_id(),
                recipient: self.normalize(to),
            });
        }

        let recipient = match self.normalize(to) {
            Some(r) => r,
            None => {
                error!(to, "invalid recipient phone number");
                return Err(SmsError::InvalidRecipient);
            }
        };
        let from = self.twilio.phone_number.trim();
        let max_retries = self.settings.retry_attempts;
        let delay = self.settings.retry_delay();

        let mut attempt: u32 = 0;
        loop {
            info!(to = %recipient, attempt = attempt + 1, "sending SMS");
            match self.provider.create_message(&recipient, from, body).await {
                Ok(msg) => {
                    info!(sid = %msg.sid, to = %recipient, "SMS sent");
                    return Ok(SendOutcome::Sent {
                        message_id: msg.sid,
                        recipient,
                        sent_at: msg.date_sent,
                    });
                }
                Err(ProviderError::Api { status, code, message }) => {
                    let code = code.unwrap_or(i64::from(status));
                    error!(status, code, %message, "twilio rejected SMS");
                    if RETRYABLE_STATUSES.contains(&status) && attempt < max_retries {
                        warn!(
                            delay_secs = delay.as_secs(),
                            attempt = attempt + 1,
                            max_retries,
                            "retrying SMS"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(SmsError::Provider { code, message });
                }
                Err(ProviderError::Other(err)) => {
                    error!(?err, "SMS send failed");
                    return Err(SmsError::Unexpected(format!("{err:#}")));
                }
            }
        }
    }

    /// Send `body` to every recipient in order. Never fails; per-recipient
    /// failures are collected in the report.
    #[instrument(skip_all, fields(total = recipients.len()))]
    pub async fn send_bulk<S: AsRef<str>>(&self, recipients: &[S], body: &str) -> BulkReport {
        let mut report = BulkReport {
            total: recipients.len(),
            ..Default::default()
        };
        let batch_size = self.settings.batch_size.max(1);
        let mut mode = Mode::Production;

        for (i, raw) in recipients.iter().enumerate() {
            let raw = raw.as_ref();
            match self.send(raw, body).await {
                Ok(outcome) if outcome.success() => {
                    if outcome.is_demo() {
                        mode = Mode::Demo;
                    }
                    report.sent.push(raw.to_string());
                }
                Ok(outcome) => report.failed.push(BulkFailure {
                    recipient: raw.to_string(),
                    reason: outcome.error().unwrap_or_default().to_string(),
                }),
                Err(err) => report.failed.push(BulkFailure {
                    recipient: raw.to_string(),
                    reason: err.to_string(),
                }),
            }

            let done = i + 1;
            if done % batch_size == 0 && done < recipients.len() {
                info!(done, "batch complete; pausing before next batch");
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        info!(
            sent = report.sent.len(),
            failed = report.failed.len(),
            ?mode,
            "bulk SMS summary"
        );
        report
    }
}

/// `DEMO_MODE_` followed by 12 upper-case hex characters.
pub fn demo_message_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("DEMO_MODE_{}", hex[..12].to_ascii_uppercase())
}
