//! Configuration loader and validator for the SMS notification core.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub sms: SmsSettings,
    #[serde(default)]
    pub twilio: TwilioSettings,
}

/// Dispatcher tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmsSettings {
    pub enabled: bool,
    pub default_country_code: String,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub batch_size: usize,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_country_code: "+91".into(),
            retry_attempts: 3,
            retry_delay_seconds: 5,
            batch_size: 10,
        }
    }
}

impl SmsSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

/// Provider credentials. Empty values put the dispatcher in demo mode.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for TwilioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("account_sid", &self.account_sid)
            .field("phone_number", &self.phone_number)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build configuration from process environment only.
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut cfg = Config::default();
        cfg.apply_env(|key| std::env::var(key).ok())?;
        validate(&cfg)?;
        Ok(cfg)
    }

    /// Overlay the recognised environment keys on top of the current values.
    /// `lookup` returns `None` for unset keys.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SMS_ENABLED") {
            self.sms.enabled = parse_bool(&v).ok_or(ConfigError::Env {
                key: "SMS_ENABLED",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = v;
        }
        if let Some(v) = lookup("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = v;
        }
        if let Some(v) = lookup("TWILIO_PHONE_NUMBER") {
            self.twilio.phone_number = v;
        }
        if let Some(v) = lookup("SMS_DEFAULT_COUNTRY_CODE") {
            self.sms.default_country_code = v;
        }
        if let Some(v) = lookup("SMS_RETRY_ATTEMPTS") {
            self.sms.retry_attempts = parse_num("SMS_RETRY_ATTEMPTS", v)?;
        }
        if let Some(v) = lookup("SMS_RETRY_DELAY") {
            self.sms.retry_delay_seconds = parse_num("SMS_RETRY_DELAY", v)?;
        }
        if let Some(v) = lookup("SMS_BATCH_SIZE") {
            self.sms.batch_size = parse_num("SMS_BATCH_SIZE", v)?;
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value: raw })
}

/// Load configuration from a YAML file, overlay the environment and validate.
/// - If `path` is None, uses `notify.yaml` in the current working directory.
/// - A missing file is not an error; defaults plus environment are used.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("notify.yaml"));
    let mut cfg = match fs::read_to_string(path) {
        Ok(content) => parse(&content)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(err) => return Err(err.into()),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Parse YAML content. An empty document yields the defaults.
pub fn parse(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.sms.batch_size == 0 {
        return Err(ConfigError::Invalid("sms.batch_size must be > 0"));
    }
    if cfg.sms.default_country_code.trim().is_empty() {
        return Err(ConfigError::Invalid("sms.default_country_code must be non-empty"));
    }
    // Credentials are deliberately not checked here: absent credentials mean demo mode.
    Ok(())
}

/// Returns an example YAML configuration.
pub fn example() -> &'static str {
    r#"sms:
  enabled: true
  default_country_code: "+91"
  retry_attempts: 3
  retry_delay_seconds: 5
  batch_size: 10

# Leave any of these empty to run in demo mode.
twilio:
  account_sid: "ACXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX"
  auth_token: "YOUR_TWILIO_AUTH_TOKEN"
  phone_number: "+15005550006"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_example_ok() {
        let cfg = parse(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.sms.batch_size, 10);
        assert_eq!(cfg.twilio.phone_number, "+15005550006");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.sms.enabled);
        assert_eq!(cfg.sms.default_country_code, "+91");
        assert_eq!(cfg.sms.retry_attempts, 3);
        assert_eq!(cfg.sms.retry_delay(), Duration::from_secs(5));
        assert!(cfg.twilio.account_sid.is_empty());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg = parse("sms:\n  batch_size: 4\n").unwrap();
        assert_eq!(cfg.sms.batch_size, 4);
        assert_eq!(cfg.sms.retry_attempts, 3);
        assert!(cfg.sms.enabled);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = parse(example()).unwrap();
        cfg.apply_env(env(&[
            ("SMS_ENABLED", "off"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("SMS_RETRY_ATTEMPTS", "5"),
            ("SMS_RETRY_DELAY", " 2 "),
            ("SMS_BATCH_SIZE", "20"),
            ("SMS_DEFAULT_COUNTRY_CODE", "+1"),
        ]))
        .unwrap();
        assert!(!cfg.sms.enabled);
        assert_eq!(cfg.twilio.auth_token, "secret");
        assert_eq!(cfg.sms.retry_attempts, 5);
        assert_eq!(cfg.sms.retry_delay_seconds, 2);
        assert_eq!(cfg.sms.batch_size, 20);
        assert_eq!(cfg.sms.default_country_code, "+1");
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[("SMS_BATCH_SIZE", "ten")])).unwrap_err();
        match err {
            ConfigError::Env { key, value } => {
                assert_eq!(key, "SMS_BATCH_SIZE");
                assert_eq!(value, "ten");
            }
            _ => panic!("wrong error"),
        }

        let err = cfg.apply_env(env(&[("SMS_ENABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "SMS_ENABLED", .. }));
    }

    #[test]
    fn invalid_batch_size() {
        let mut cfg = Config::default();
        cfg.sms.batch_size = 0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("batch_size")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_country_code() {
        let mut cfg = Config::default();
        cfg.sms.default_country_code = "  ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn debug_hides_auth_token() {
        let mut cfg = Config::default();
        cfg.twilio.auth_token = "very-secret".into();
        assert!(!format!("{:?}", cfg).contains("very-secret"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("notify.yaml");
        fs::write(&p, "sms:\n  retry_attempts: 1\n").unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert!(cfg.sms.batch_size > 0);
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let td = tempdir().unwrap();
        let p = td.path().join("notify.yaml");
        fs::write(&p, "sms: [unclosed").unwrap();
        assert!(matches!(load(Some(&p)), Err(ConfigError::Parse(_))));
    }
}
