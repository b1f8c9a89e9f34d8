use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::domain::types::{
    DEFAULT_DEVICE_CAP, DEFAULT_PASSCODE_LEN, DEFAULT_VALIDITY_HOURS, MAX_PASSCODE_LEN,
    SessionPolicy,
};

/// Access service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AccessConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `ACCESS_PORT`.
    pub access_port: u16,
    /// Passcode length (default 6, at most 64). Env var: `PASSCODE_LENGTH`.
    pub passcode_len: usize,
    /// Passcode validity window in hours (default 8). Env var: `PASSCODE_VALIDITY_HOURS`.
    pub validity_hours: i64,
    /// Devices one passcode may bind (default 2). Env var: `MAX_DEVICES`.
    pub max_devices: usize,
    /// HTTP relay for passcode emails. Unset: email delivery is only logged.
    pub email_relay_url: Option<String>,
    /// HTTP gateway for passcode SMS. Unset: SMS delivery is only logged.
    pub sms_gateway_url: Option<String>,
    /// Sender address on passcode emails. Env var: `MAIL_FROM`.
    pub mail_from: String,
    /// Outbox worker poll interval (default 1000 ms). Env var: `OUTBOX_POLL_INTERVAL_MS`.
    pub outbox_poll_interval_ms: u64,
}

impl AccessConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            access_port: parsed_var("ACCESS_PORT").unwrap_or(3120),
            passcode_len: passcode_len(parsed_var("PASSCODE_LENGTH")),
            validity_hours: parsed_var("PASSCODE_VALIDITY_HOURS")
                .filter(|hours| *hours > 0)
                .unwrap_or(DEFAULT_VALIDITY_HOURS),
            max_devices: parsed_var("MAX_DEVICES")
                .filter(|cap| *cap > 0)
                .unwrap_or(DEFAULT_DEVICE_CAP),
            email_relay_url: non_empty_var("EMAIL_RELAY_URL"),
            sms_gateway_url: non_empty_var("SMS_GATEWAY_URL"),
            mail_from: non_empty_var("MAIL_FROM")
                .unwrap_or_else(|| "admin@yourwifi.com".to_owned()),
            outbox_poll_interval_ms: parsed_var("OUTBOX_POLL_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(1000),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            passcode_len: self.passcode_len,
            validity: Duration::hours(self.validity_hours),
            device_cap: self.max_devices,
        }
    }

    pub fn outbox_poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.outbox_poll_interval_ms)
    }
}

/// Zero falls back to the default; anything longer than the column is clamped.
fn passcode_len(configured: Option<usize>) -> usize {
    match configured {
        Some(0) | None => DEFAULT_PASSCODE_LEN,
        Some(len) => len.min(MAX_PASSCODE_LEN),
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
