use sea_orm::entity::prelude::*;

/// Pending passcode delivery, written in the same transaction as the approval
/// that produced it and drained by the outbox worker.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Delivery channel: `passcode_email` or `passcode_sms`.
    pub kind: String,
    /// `{"user_id": ..., "passcode": ...}`
    pub payload: Json,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    /// Failed send attempts so far.
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Earliest time the worker may pick the event up again.
    pub next_attempt_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Set once retries are exhausted; the event is never picked up again.
    pub failed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
