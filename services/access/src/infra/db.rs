use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use portal_access_schema::{outbox_events, wifi_sessions};
use portal_domain::device::DeviceId;
use portal_domain::identifier::Identifier;

use crate::domain::repository::{OutboxRepository, SessionRepository};
use crate::domain::types::{Admission, OutboxEvent, Session};
use crate::error::PortalError;

// ── Session repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn find(&self, user_id: &str) -> Result<Option<Session>, PortalError> {
        let model = wifi_sessions::Entity::find_by_id(user_id.to_owned())
            .one(&self.db)
            .await
            .context("find wifi session")?;
        Ok(model.map(session_from_model).transpose()?)
    }

    async fn upsert(&self, session: &Session) -> Result<(), PortalError> {
        let model = wifi_sessions::ActiveModel {
            user_id: Set(session.user_id.as_str().to_owned()),
            passcode: Set(session.passcode.clone()),
            generated_time: Set(session.generated_at),
            expiry_time: Set(session.expires_at),
            status: Set(session.status.as_str().to_owned()),
            device_macs: Set(devices_to_json(&session.devices)?),
        };
        wifi_sessions::Entity::insert(model)
            .on_conflict(
                OnConflict::column(wifi_sessions::Column::UserId)
                    .update_columns([
                        wifi_sessions::Column::Passcode,
                        wifi_sessions::Column::GeneratedTime,
                        wifi_sessions::Column::ExpiryTime,
                        wifi_sessions::Column::Status,
                        wifi_sessions::Column::DeviceMacs,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("upsert wifi session")?;
        Ok(())
    }

    async fn approve_with_outbox(&self, user_id: &str) -> Result<Option<Session>, PortalError> {
        let txn = self.db.begin().await.context("begin approve")?;
        let Some(model) = lock_session(&txn, user_id).await? else {
            return Ok(None);
        };

        let mut session = session_from_model(model)?;
        session.approve();
        update_binding(&txn, &session)
            .await
            .context("approve wifi session")?;
        if let Some(event) = session.delivery_event() {
            insert_outbox_event(&txn, &event)
                .await
                .context("enqueue passcode delivery")?;
        }

        txn.commit().await.context("commit approve")?;
        Ok(Some(session))
    }

    async fn redeem(
        &self,
        user_id: &str,
        passcode: &str,
        device: &DeviceId,
        now: DateTime<Utc>,
        device_cap: usize,
    ) -> Result<Admission, PortalError> {
        let txn = self.db.begin().await.context("begin redeem")?;
        let model = lock_session(&txn, user_id)
            .await?
            .ok_or(PortalError::SessionNotFound)?;

        // A rejection returns early and drops the transaction, which rolls it back.
        let mut session = session_from_model(model)?;
        let admission = session.redeem(passcode, device, now, device_cap)?;
        if admission == Admission::NewDevice {
            update_binding(&txn, &session)
                .await
                .context("bind device to wifi session")?;
        }

        txn.commit().await.context("commit redeem")?;
        Ok(admission)
    }
}

/// `SELECT … FOR UPDATE`: concurrent approvals and redemptions of one identifier queue here.
async fn lock_session(
    txn: &DatabaseTransaction,
    user_id: &str,
) -> Result<Option<wifi_sessions::Model>, PortalError> {
    let model = wifi_sessions::Entity::find_by_id(user_id.to_owned())
        .lock_exclusive()
        .one(txn)
        .await
        .context("lock wifi session")?;
    Ok(model)
}

/// Persist status and device bindings; passcode and times are untouched.
async fn update_binding(txn: &DatabaseTransaction, session: &Session) -> anyhow::Result<()> {
    wifi_sessions::ActiveModel {
        user_id: Set(session.user_id.as_str().to_owned()),
        status: Set(session.status.as_str().to_owned()),
        device_macs: Set(devices_to_json(&session.devices)?),
        ..Default::default()
    }
    .update(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(event.attempts),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn devices_to_json(devices: &[DeviceId]) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(devices).context("encode device_macs")
}

fn session_from_model(model: wifi_sessions::Model) -> anyhow::Result<Session> {
    let user_id = Identifier::parse(&model.user_id)
        .with_context(|| format!("stored user_id {:?}", model.user_id))?;
    let devices: Vec<DeviceId> =
        serde_json::from_value(model.device_macs).context("decode device_macs")?;
    Ok(Session {
        user_id,
        passcode: model.passcode,
        generated_at: model.generated_time,
        expires_at: model.expiry_time,
        status: model.status.parse()?,
        devices,
    })
}

// ── Outbox repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, PortalError> {
        let models = outbox_events::Entity::find()
            .filter(outbox_events::Column::ProcessedAt.is_null())
            .filter(outbox_events::Column::FailedAt.is_null())
            .filter(outbox_events::Column::NextAttemptAt.lte(now))
            .order_by_asc(outbox_events::Column::NextAttemptAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("fetch due outbox events")?;
        Ok(models.into_iter().map(outbox_event_from_model).collect())
    }

    async fn mark_processed(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), PortalError> {
        outbox_events::ActiveModel {
            id: Set(id),
            processed_at: Set(Some(now)),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("mark outbox event processed")?;
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
        let mut model = outbox_events::ActiveModel {
            id: Set(id),
            attempts: Set(attempts),
            last_error: Set(Some(error.to_owned())),
            ..Default::default()
        };
        match retry_at {
            Some(at) => model.next_attempt_at = Set(at),
            None => model.failed_at = Set(Some(now)),
        }
        model
            .update(&self.db)
            .await
            .context("record outbox failure")?;
        Ok(())
    }
}

fn outbox_event_from_model(model: outbox_events::Model) -> OutboxEvent {
    OutboxEvent {
        id: model.id,
        kind: model.kind,
        payload: model.payload,
        idempotency_key: model.idempotency_key,
        attempts: model.attempts,
    }
}
