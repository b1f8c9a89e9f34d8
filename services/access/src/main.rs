use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use portal_access::config::AccessConfig;
use portal_access::infra::notify::RelayNotifier;
use portal_access::infra::worker::spawn_outbox_worker;
use portal_access::router::build_router;
use portal_access::state::AppState;
use portal_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AccessConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");
    let notifier = RelayNotifier::new(
        http,
        config.email_relay_url.clone(),
        config.sms_gateway_url.clone(),
        config.mail_from.clone(),
    );
    let worker = spawn_outbox_worker(db.clone(), notifier, config.outbox_poll_interval());

    let state = AppState {
        db,
        policy: config.policy(),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.access_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(
        passcode_len = config.passcode_len,
        validity_hours = config.validity_hours,
        max_devices = config.max_devices,
        "access service listening on {addr}"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    worker.abort();
    info!("access service stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
