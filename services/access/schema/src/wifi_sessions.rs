use sea_orm::entity::prelude::*;

/// Portal access session, one row per subscriber identifier.
/// A new passcode request overwrites the row in place.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wifi_sessions")]
pub struct Model {
    /// Email address or phone number the passcode was requested for.
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub passcode: String,
    pub generated_time: chrono::DateTime<chrono::Utc>,
    pub expiry_time: chrono::DateTime<chrono::Utc>,
    /// `PENDING`, `APPROVED` or `USED`.
    pub status: String,
    /// JSON array of bound device ids, in binding order.
    pub device_macs: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
