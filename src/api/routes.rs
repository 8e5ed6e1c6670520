use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Guest-facing
        .route("/waitlist", post(handlers::join_waitlist))
        .route("/waitlist/guest/:guest_id", get(handlers::get_guest_status))
        .route("/waitlist/:id", delete(handlers::cancel_party))
        .route("/waitlist/:id/token", get(handlers::issue_token))
        // Operator-facing
        .route("/waitlist", get(handlers::list_waitlist))
        .route("/waitlist/:id/call", post(handlers::call_party))
        .route("/waitlist/:id/arrival", post(handlers::confirm_arrival))
        .route("/waitlist/:id/table", post(handlers::assign_table))
        .route("/admission/verify", post(handlers::verify_token))
        .route("/tables", get(handlers::list_tables))
        .route("/tables/:id/status", put(handlers::update_table_status))
        .route("/stats", get(handlers::stats))
        .route("/_internal/health", get(handlers::health));

    // Test-only routes -- dangerous operations gated behind TEST_MODE
    if state.config.test_mode {
        tracing::warn!("Test mode enabled — purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
