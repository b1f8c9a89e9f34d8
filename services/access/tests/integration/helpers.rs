use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use portal_access::domain::repository::{Notifier, OutboxRepository, SessionRepository};
use portal_access::domain::types::{
    Admission, OutboxEvent, PasscodeMessage, Session, SessionPolicy, SessionStatus,
};
use portal_access::error::PortalError;
use portal_domain::device::DeviceId;
use portal_domain::identifier::Identifier;

// ── MockSessionRepo ──────────────────────────────────────────────────────────

/// In-memory session store. The mutex stands in for the row lock.
#[derive(Clone, Default)]
pub struct MockSessionRepo {
    pub sessions: Arc<Mutex<HashMap<String, Session>>>,
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl MockSessionRepo {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let repo = Self::default();
        repo.sessions
            .lock()
            .unwrap()
            .insert(session.user_id.as_str().to_owned(), session);
        repo
    }

    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(user_id).cloned()
    }

    /// Mutate a stored session directly, e.g. to push its expiry into the past.
    pub fn edit(&self, user_id: &str, f: impl FnOnce(&mut Session)) {
        let mut sessions = self.sessions.lock().unwrap();
        f(sessions.get_mut(user_id).expect("session exists"));
    }

    pub fn events(&self) -> Vec<OutboxEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionRepository for MockSessionRepo {
    async fn find(&self, user_id: &str) -> Result<Option<Session>, PortalError> {
        Ok(self.get(user_id))
    }

    async fn upsert(&self, session: &Session) -> Result<(), PortalError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.user_id.as_str().to_owned(), session.clone());
        Ok(())
    }

    async fn approve_with_outbox(&self, user_id: &str) -> Result<Option<Session>, PortalError> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get_mut(user_id) else {
            return Ok(None);
        };
        session.approve();
        if let Some(event) = session.delivery_event() {
            self.events.lock().unwrap().push(event);
        }
        Ok(Some(session.clone()))
    }

    async fn redeem(
        &self,
        user_id: &str,
        passcode: &str,
        device: &DeviceId,
        now: DateTime<Utc>,
        device_cap: usize,
    ) -> Result<Admission, PortalError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(user_id)
            .ok_or(PortalError::SessionNotFound)?;
        // Work on a copy so a rejection leaves the stored session untouched.
        let mut updated = session.clone();
        let admission = updated.redeem(passcode, device, now, device_cap)?;
        *session = updated;
        Ok(admission)
    }
}

// ── MockOutboxRepo ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub event: OutboxEvent,
    pub next_attempt_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockOutboxRepo {
    pub rows: Arc<Mutex<Vec<OutboxRow>>>,
}

impl MockOutboxRepo {
    pub fn with_events(events: Vec<OutboxEvent>, due_at: DateTime<Utc>) -> Self {
        let rows = events
            .into_iter()
            .map(|event| OutboxRow {
                event,
                next_attempt_at: due_at,
                processed_at: None,
                failed_at: None,
                last_error: None,
            })
            .collect();
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn row(&self, id: Uuid) -> OutboxRow {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.event.id == id)
            .cloned()
            .expect("outbox row exists")
    }
}

impl OutboxRepository for MockOutboxRepo {
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, PortalError> {
        let mut due: Vec<OutboxRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.processed_at.is_none() && r.failed_at.is_none())
            .filter(|r| r.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_attempt_at);
        Ok(due
            .into_iter()
            .take(limit as usize)
            .map(|r| r.event)
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), PortalError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.event.id == id) {
            row.processed_at = Some(now);
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), PortalError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.event.id == id) {
            row.event.attempts = attempts;
            row.last_error = Some(error.to_owned());
            match retry_at {
                Some(at) => row.next_attempt_at = at,
                None => row.failed_at = Some(now),
            }
        }
        Ok(())
    }
}

// ── MockNotifier ─────────────────────────────────────────────────────────────

/// Records every message; fails the send while `failing` is set.
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<PasscodeMessage>>>,
    pub failing: bool,
}

impl MockNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<PasscodeMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    async fn send(&self, message: &PasscodeMessage) -> Result<(), PortalError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.failing {
            return Err(anyhow::anyhow!("relay returned 503").into());
        }
        Ok(())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_EMAIL: &str = "alice@example.com";
pub const TEST_PHONE: &str = "5551234567";
pub const TEST_PASSCODE: &str = "aB3xY9";

pub fn device(raw: &str) -> DeviceId {
    DeviceId::parse(raw).unwrap()
}

pub fn test_session(user_id: &str, status: SessionStatus) -> Session {
    let mut session = Session::issue(
        Identifier::parse(user_id).unwrap(),
        TEST_PASSCODE.to_owned(),
        Utc::now(),
        &SessionPolicy::default(),
    );
    session.status = status;
    session
}
