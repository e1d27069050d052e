use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_utils::extractor::{auth_middleware, rate_limit_middleware};
use shared_utils::AppState;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors).post(handlers::create_doctor))
        .route(
            "/{doctor_id}",
            patch(handlers::update_doctor).delete(handlers::delete_doctor),
        )
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
