#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use portal_domain::device::DeviceId;

use crate::domain::types::{Admission, OutboxEvent, PasscodeMessage, Session};
use crate::error::PortalError;

/// Store of portal sessions, keyed by identifier.
///
/// Implementations must make `approve_with_outbox` and `redeem` atomic per
/// identifier: concurrent calls for the same identifier serialize.
pub trait SessionRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<Session>, PortalError>;

    /// Insert the session, or replace every field of the existing one
    /// (clearing its device bindings).
    async fn upsert(&self, session: &Session) -> Result<(), PortalError>;

    /// Approve the session and enqueue its delivery event in one transaction.
    /// Returns the approved session, or `None` when no session exists.
    async fn approve_with_outbox(&self, user_id: &str) -> Result<Option<Session>, PortalError>;

    /// Run the access checks and bind the device in one transaction.
    /// Fails with `SessionNotFound` when no session exists.
    async fn redeem(
        &self,
        user_id: &str,
        passcode: &str,
        device: &DeviceId,
        now: DateTime<Utc>,
        device_cap: usize,
    ) -> Result<Admission, PortalError>;
}

/// Queue of pending passcode deliveries.
pub trait OutboxRepository: Send + Sync {
    /// Undelivered, not abandoned events whose retry time has passed, oldest first.
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, PortalError>;

    async fn mark_processed(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), PortalError>;

    /// Record a failed attempt. `retry_at = None` abandons the event.
    async fn record_failure(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), PortalError>;
}

/// Port for the email relay / SMS gateway.
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &PasscodeMessage) -> Result<(), PortalError>;
}
