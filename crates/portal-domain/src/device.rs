//! Device identity supplied by the network layer (MAC address or hardware token).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest device id accepted.
pub const MAX_DEVICE_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceIdError {
    #[error("device identifier required")]
    Empty,
    #[error("device identifier longer than {MAX_DEVICE_ID_LEN} characters")]
    TooLong,
}

/// Stable per-device identifier. Compared verbatim after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn parse(raw: &str) -> Result<Self, DeviceIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeviceIdError::Empty);
        }
        if trimmed.chars().count() > MAX_DEVICE_ID_LEN {
            return Err(DeviceIdError::TooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
