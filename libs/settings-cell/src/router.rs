use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn settings_routes(state: AppState) -> Router {
    Router::new()
        .route("/password", patch(handlers::change_password))
        .route(
            "/outlook",
            get(handlers::outlook_status).delete(handlers::disconnect_outlook),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
