use sea_orm::DatabaseConnection;

use crate::domain::types::SessionPolicy;
use crate::infra::db::DbSessionRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub policy: SessionPolicy,
}

impl AppState {
    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }
}
