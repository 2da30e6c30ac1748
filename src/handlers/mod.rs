pub mod health;
pub mod wizard;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/wizard", post(wizard::create_session))
        .route(
            "/api/wizard/:session_id",
            get(wizard::get_session).delete(wizard::abandon_session),
        )
        .route(
            "/api/wizard/:session_id/business/retry",
            post(wizard::retry_business),
        )
        .route("/api/wizard/:session_id/service", post(wizard::choose_service))
        .route("/api/wizard/:session_id/staff", post(wizard::choose_staff))
        .route("/api/wizard/:session_id/date", post(wizard::choose_date))
        .route("/api/wizard/:session_id/slots/retry", post(wizard::retry_slots))
        .route("/api/wizard/:session_id/time", post(wizard::choose_time))
        .route("/api/wizard/:session_id/submit", post(wizard::submit))
        .route("/api/wizard/:session_id/reset", post(wizard::reset))
        .with_state(state)
}
