use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::domain::repository::{Notifier, OutboxRepository, SessionRepository};
use crate::domain::types::{
    DELIVERY_BATCH_SIZE, MAX_DELIVERY_ATTEMPTS, OutboxEvent, PasscodeMessage, PasscodePayload,
    retry_delay,
};
use crate::error::PortalError;

const SUPERSEDED_REASON: &str = "passcode superseded by a newer request";

/// Counts for one drained batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub retried: usize,
    pub abandoned: usize,
    /// Events dropped because their passcode is no longer the session's.
    pub superseded: usize,
}

pub struct DeliverPasscodesUseCase<O, S, N>
where
    O: OutboxRepository,
    S: SessionRepository,
    N: Notifier,
{
    pub outbox: O,
    pub sessions: S,
    pub notifier: N,
}

impl<O, S, N> DeliverPasscodesUseCase<O, S, N>
where
    O: OutboxRepository,
    S: SessionRepository,
    N: Notifier,
{
    /// Send every due event once. A failing send never stops the batch.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<DeliveryReport, PortalError> {
        let mut report = DeliveryReport::default();
        for event in self.outbox.fetch_due(now, DELIVERY_BATCH_SIZE).await? {
            let decoded = event
                .passcode_payload()
                .and_then(|payload| Ok((payload, PasscodeMessage::from_event(&event)?)));
            let (payload, message) = match decoded {
                Ok(decoded) => decoded,
                // Undecodable events can never succeed.
                Err(e) => {
                    error!(event_id = %event.id, error = %e, "abandoning malformed outbox event");
                    self.abandon(&event, &e.to_string(), now).await?;
                    report.abandoned += 1;
                    continue;
                }
            };

            if !self.is_current(&payload).await? {
                info!(event_id = %event.id, user_id = %payload.user_id, "passcode superseded, delivery skipped");
                self.outbox
                    .record_failure(event.id, event.attempts, SUPERSEDED_REASON, None, now)
                    .await?;
                report.superseded += 1;
                continue;
            }

            match self.notifier.send(&message).await {
                Ok(()) => {
                    self.outbox.mark_processed(event.id, now).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let attempts = event.attempts + 1;
                    let reason = failure_reason(&e);
                    if attempts >= MAX_DELIVERY_ATTEMPTS {
                        error!(event_id = %event.id, attempts, error = %reason, "passcode delivery abandoned");
                        self.abandon(&event, &reason, now).await?;
                        report.abandoned += 1;
                    } else {
                        let retry_at = now + retry_delay(attempts);
                        warn!(event_id = %event.id, attempts, %retry_at, error = %reason, "passcode delivery failed");
                        self.outbox
                            .record_failure(event.id, attempts, &reason, Some(retry_at), now)
                            .await?;
                        report.retried += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    /// A re-request between approval and delivery replaces the passcode;
    /// the queued one would no longer open the portal.
    async fn is_current(&self, payload: &PasscodePayload) -> Result<bool, PortalError> {
        let session = self.sessions.find(&payload.user_id).await?;
        Ok(session.is_some_and(|s| s.delivers(&payload.passcode)))
    }

    async fn abandon(
        &self,
        event: &OutboxEvent,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PortalError> {
        self.outbox
            .record_failure(event.id, event.attempts + 1, reason, None, now)
            .await
    }
}

/// Full cause chain for internal errors; the display text otherwise.
fn failure_reason(e: &PortalError) -> String {
    match e {
        PortalError::Internal(inner) => format!("{inner:#}"),
        other => other.to_string(),
    }
}
