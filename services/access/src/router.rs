use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use portal_core::health::healthz;
use portal_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    api::{api_get, api_post},
    health::readyz,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Portal actions (`?action=request|approve_and_send|validate`)
        .route("/api", get(api_get).post(api_post))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
