// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Extension, Router,
};

use shared_utils::extractor::{auth_middleware, rate_limit_middleware};
use shared_utils::AppState;

use crate::handlers;
use crate::services::AppointmentNotifier;

pub fn appointment_routes(state: AppState, notifier: Arc<AppointmentNotifier>) -> Router {
    // Auth is the outer layer so the limiter can key on the session user.
    Router::new()
        .route(
            "/",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).patch(handlers::update_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(Extension(notifier))
        .with_state(state)
}
