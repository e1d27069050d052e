use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentNotifier};
use auth_cell::auth_routes;
use doctor_cell::doctor_routes;
use settings_cell::settings_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState, notifier: Arc<AppointmentNotifier>) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling portal API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone(), notifier))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/settings", settings_routes(state))
}
