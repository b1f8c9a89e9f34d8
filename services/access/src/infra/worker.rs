use std::time::Duration;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::infra::db::{DbOutboxRepository, DbSessionRepository};
use crate::infra::notify::RelayNotifier;
use crate::usecase::delivery::{DeliverPasscodesUseCase, DeliveryReport};

/// Drain the passcode outbox every `interval` until the task is aborted.
pub fn spawn_outbox_worker(
    db: DatabaseConnection,
    notifier: RelayNotifier,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let usecase = DeliverPasscodesUseCase {
            outbox: DbOutboxRepository { db: db.clone() },
            sessions: DbSessionRepository { db },
            notifier,
        };
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match usecase.execute(Utc::now()).await {
                Ok(report) if report == DeliveryReport::default() => {}
                Ok(report) => debug!(?report, "outbox batch drained"),
                Err(e) => error!(error = ?e, "outbox worker tick failed"),
            }
        }
    })
}
