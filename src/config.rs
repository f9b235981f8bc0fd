//! Service configuration read from the environment

use crate::sms::{RetryPolicy, TwilioConfig};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{var} is required when {because} is set")]
    MissingRequired {
        var: &'static str,
        because: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    /// Number outbound replies are sent from; empty when no provider is set
    pub sender_number: String,
    /// `None` means replies are only logged
    pub twilio: Option<TwilioConfig>,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let db_path = get("INTAKE_DB_PATH").map_or_else(default_db_path, PathBuf::from);
        let port = parse_or("INTAKE_PORT", get("INTAKE_PORT"), DEFAULT_PORT)?;

        let defaults = RetryPolicy::default();
        let max_attempts = parse_or(
            "INTAKE_SEND_MAX_ATTEMPTS",
            get("INTAKE_SEND_MAX_ATTEMPTS"),
            defaults.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "INTAKE_SEND_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let delay_ms = parse_or(
            "INTAKE_SEND_RETRY_DELAY_MS",
            get("INTAKE_SEND_RETRY_DELAY_MS"),
            u64::try_from(defaults.delay.as_millis()).unwrap_or(u64::MAX),
        )?;
        let retry = RetryPolicy::new(max_attempts, Duration::from_millis(delay_ms));

        let sender_number = get("TWILIO_PHONE_NUMBER").unwrap_or_default();
        let twilio = match (get("TWILIO_ACCOUNT_SID"), get("TWILIO_AUTH_TOKEN")) {
            (Some(sid), Some(token)) => {
                if sender_number.is_empty() {
                    return Err(ConfigError::MissingRequired {
                        var: "TWILIO_PHONE_NUMBER",
                        because: "TWILIO_ACCOUNT_SID",
                    });
                }
                let mut twilio = TwilioConfig::new(sid, token);
                if let Some(base) = get("TWILIO_API_BASE") {
                    twilio = twilio.with_api_base(base);
                }
                Some(twilio)
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    var: "TWILIO_AUTH_TOKEN",
                    because: "TWILIO_ACCOUNT_SID",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingRequired {
                    var: "TWILIO_ACCOUNT_SID",
                    because: "TWILIO_AUTH_TOKEN",
                })
            }
            (None, None) => None,
        };

        Ok(Self {
            db_path,
            port,
            sender_number,
            twilio,
            retry,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".sms-intake").join("intake.db")
}
