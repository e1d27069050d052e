use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::AppointmentNotifier;
use shared_config::AppConfig;
use shared_utils::rate_limit::{CounterStore, InMemoryCounterStore, RedisCounterStore};
use shared_utils::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scheduling portal API server");

    let config = Arc::new(AppConfig::from_env());

    // Shared counters when Redis is available, process-local otherwise
    let counters: Arc<dyn CounterStore> = match config.redis_url.as_deref() {
        Some(url) => {
            info!("Rate limiting backed by Redis");
            Arc::new(RedisCounterStore::new(url).context("invalid REDIS_URL")?)
        }
        None => {
            warn!("REDIS_URL not set; rate limits are per process");
            Arc::new(InMemoryCounterStore::new())
        }
    };

    let state = AppState::with_counter_store(config.clone(), counters);
    let notifier = Arc::new(AppointmentNotifier::from_config(
        &config,
        state.supabase.clone(),
    ));

    // Session cookies need a concrete origin with credentials allowed
    let origin = HeaderValue::from_str(config.app_url.trim_end_matches('/'))
        .context("APP_URL is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = router::create_router(state, notifier)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
