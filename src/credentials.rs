use crate::config::TwilioSettings;
use thiserror::Error;
use tracing::error;

/// Names of the credentials that were blank, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing Twilio credentials: {}. Please configure these in your .env file.", .missing.join(", "))]
pub struct CredentialsError {
    pub missing: Vec<&'static str>,
}

/// Check that account SID, auth token and sender number are all non-blank.
pub fn validate(settings: &TwilioSettings) -> Result<(), CredentialsError> {
    let missing: Vec<&'static str> = [
        ("TWILIO_ACCOUNT_SID", &settings.account_sid),
        ("TWILIO_AUTH_TOKEN", &settings.auth_token),
        ("TWILIO_PHONE_NUMBER", &settings.phone_number),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        return Ok(());
    }
    let err = CredentialsError { missing };
    error!(%err, "twilio credentials incomplete");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> TwilioSettings {
        TwilioSettings {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            phone_number: "+15005550006".into(),
            base_url: None,
        }
    }

    #[test]
    fn complete_credentials_pass() {
        assert!(validate(&full()).is_ok());
    }

    #[test]
    fn blank_values_are_listed_in_order() {
        let mut s = full();
        s.account_sid = "   ".into();
        s.phone_number = String::new();
        let err = validate(&s).unwrap_err();
        assert_eq!(err.missing, vec!["TWILIO_ACCOUNT_SID", "TWILIO_PHONE_NUMBER"]);
        assert_eq!(
            err.to_string(),
            "Missing Twilio credentials: TWILIO_ACCOUNT_SID, TWILIO_PHONE_NUMBER. Please configure these in your .env file."
        );
    }

    #[test]
    fn all_missing() {
        let err = validate(&TwilioSettings::default()).unwrap_err();
        assert_eq!(err.missing.len(), 3);
    }
}
