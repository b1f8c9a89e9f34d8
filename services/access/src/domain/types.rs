use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use portal_domain::device::DeviceId;
use portal_domain::identifier::{Identifier, IdentifierKind};

use crate::error::PortalError;

/// Passcode length when `PASSCODE_LENGTH` is unset.
pub const DEFAULT_PASSCODE_LEN: usize = 6;

/// Longest passcode the `wifi_sessions.passcode` column holds.
pub const MAX_PASSCODE_LEN: usize = 64;

/// Validity window in hours when `PASSCODE_VALIDITY_HOURS` is unset.
pub const DEFAULT_VALIDITY_HOURS: i64 = 8;

/// Device cap when `MAX_DEVICES` is unset.
pub const DEFAULT_DEVICE_CAP: usize = 2;

/// Send attempts before an outbox event is abandoned.
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;

/// Outbox events drained per worker tick.
pub const DELIVERY_BATCH_SIZE: u64 = 32;

/// Upper bound on the retry backoff, in seconds.
pub const MAX_RETRY_DELAY_SECS: i64 = 300;

pub const PASSCODE_SUBJECT: &str = "Your WiFi Passcode";

/// Lifecycle of a session within one issuance cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Requested, waiting for the operator.
    Pending,
    /// Approved and delivered; no device has redeemed it yet.
    Approved,
    /// At least one device is bound.
    Used,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Used => "USED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "USED" => Ok(Self::Used),
            other => Err(anyhow::anyhow!("unknown session status: {other}")),
        }
    }
}

/// Tunables applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub passcode_len: usize,
    pub validity: Duration,
    pub device_cap: usize,
}

impl SessionPolicy {
    pub fn validity_hours(&self) -> i64 {
        self.validity.num_hours()
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            passcode_len: DEFAULT_PASSCODE_LEN,
            validity: Duration::hours(DEFAULT_VALIDITY_HOURS),
            device_cap: DEFAULT_DEVICE_CAP,
        }
    }
}

/// Outcome of a successful passcode redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The device was bound by this redemption.
    NewDevice,
    /// The device was already bound; nothing changed.
    KnownDevice,
}

/// Portal access session for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Identifier,
    pub passcode: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Bound devices in binding order, never longer than the device cap.
    pub devices: Vec<DeviceId>,
}

impl Session {
    /// Fresh `PENDING` session; expiry is always derived from the issue time.
    pub fn issue(
        user_id: Identifier,
        passcode: String,
        now: DateTime<Utc>,
        policy: &SessionPolicy,
    ) -> Self {
        Self {
            user_id,
            passcode,
            generated_at: now,
            expires_at: now + policy.validity,
            status: SessionStatus::Pending,
            devices: Vec::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_bound(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }

    /// Operator approval. Bindings left over from an earlier approval are dropped.
    pub fn approve(&mut self) {
        self.status = SessionStatus::Approved;
        self.devices.clear();
    }

    /// Runs the access checks without mutating. The first failing check wins:
    /// passcode, approval, expiry, then device cap.
    pub fn admit(
        &self,
        passcode: &str,
        device: &DeviceId,
        now: DateTime<Utc>,
        device_cap: usize,
    ) -> Result<Admission, PortalError> {
        if !passcodes_match(&self.passcode, passcode) {
            return Err(PortalError::InvalidPasscode);
        }
        // USED sessions stay redeemable; only an unapproved one is rejected.
        if self.status == SessionStatus::Pending {
            return Err(PortalError::PendingApproval);
        }
        if self.is_expired(now) {
            return Err(PortalError::Expired);
        }
        if self.is_bound(device) {
            return Ok(Admission::KnownDevice);
        }
        if self.devices.len() >= device_cap {
            return Err(PortalError::DeviceLimitExceeded { cap: device_cap });
        }
        Ok(Admission::NewDevice)
    }

    /// `admit`, then bind the device if it is new. Known devices leave the
    /// session untouched, including the binding order.
    pub fn redeem(
        &mut self,
        passcode: &str,
        device: &DeviceId,
        now: DateTime<Utc>,
        device_cap: usize,
    ) -> Result<Admission, PortalError> {
        let admission = self.admit(passcode, device, now, device_cap)?;
        if admission == Admission::NewDevice {
            self.devices.push(device.clone());
            self.status = SessionStatus::Used;
        }
        Ok(admission)
    }

    /// Whether a queued delivery of `passcode` is still worth sending: the
    /// session is approved and no newer request replaced the passcode.
    pub fn delivers(&self, passcode: &str) -> bool {
        self.status != SessionStatus::Pending && passcodes_match(&self.passcode, passcode)
    }

    /// Outbox event carrying the current passcode, or `None` when the
    /// identifier has no delivery channel.
    pub fn delivery_event(&self) -> Option<OutboxEvent> {
        let channel = DeliveryChannel::for_identifier(&self.user_id)?;
        let id = Uuid::new_v4();
        let payload = PasscodePayload {
            user_id: self.user_id.as_str().to_owned(),
            passcode: self.passcode.clone(),
        };
        Some(OutboxEvent {
            id,
            kind: channel.event_kind().to_owned(),
            payload: serde_json::to_value(payload).ok()?,
            idempotency_key: format!("passcode_approved:{id}"),
            attempts: 0,
        })
    }
}

/// Compares every byte so the time taken does not reveal the matching prefix.
fn passcodes_match(stored: &str, given: &str) -> bool {
    let (a, b) = (stored.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Where an approved passcode is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Sms,
}

impl DeliveryChannel {
    pub fn for_identifier(user_id: &Identifier) -> Option<Self> {
        match user_id.kind() {
            IdentifierKind::Email => Some(Self::Email),
            IdentifierKind::Phone => Some(Self::Sms),
            IdentifierKind::Unknown => None,
        }
    }

    pub fn event_kind(self) -> &'static str {
        match self {
            Self::Email => "passcode_email",
            Self::Sms => "passcode_sms",
        }
    }

    pub fn from_event_kind(kind: &str) -> Option<Self> {
        match kind {
            "passcode_email" => Some(Self::Email),
            "passcode_sms" => Some(Self::Sms),
            _ => None,
        }
    }
}

/// Outbox event for async delivery of an approved passcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
    /// Failed send attempts so far.
    pub attempts: i32,
}

/// Payload of `passcode_email` / `passcode_sms` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasscodePayload {
    pub user_id: String,
    pub passcode: String,
}

impl OutboxEvent {
    pub fn passcode_payload(&self) -> Result<PasscodePayload, PortalError> {
        let payload = serde_json::from_value(self.payload.clone())
            .map_err(|e| anyhow::anyhow!("malformed {} payload: {e}", self.kind))?;
        Ok(payload)
    }
}

/// Rendered notification handed to a `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasscodeMessage {
    pub channel: DeliveryChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub idempotency_key: String,
}

impl PasscodeMessage {
    pub fn from_event(event: &OutboxEvent) -> Result<Self, PortalError> {
        let channel = DeliveryChannel::from_event_kind(&event.kind)
            .ok_or_else(|| anyhow::anyhow!("unknown outbox event kind: {}", event.kind))?;
        let payload = event.passcode_payload()?;
        Ok(Self {
            channel,
            recipient: payload.user_id,
            subject: PASSCODE_SUBJECT.to_owned(),
            body: format!(
                "Your request is approved! Your passcode is: {}",
                payload.passcode
            ),
            idempotency_key: event.idempotency_key.clone(),
        })
    }
}

/// Backoff before retry number `attempts + 1`: 2^attempts seconds, capped.
pub fn retry_delay(attempts: i32) -> Duration {
    let exp = u32::try_from(attempts).unwrap_or(0);
    Duration::seconds(2i64.saturating_pow(exp).min(MAX_RETRY_DELAY_SECS))
}
