use std::sync::Arc;

use axum::extract::FromRef;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::rate_limit::{CounterStore, InMemoryCounterStore, RateLimitPolicy, RateLimiter};

/// Router state shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
    pub api_limiter: Arc<RateLimiter>,
    pub sign_in_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State backed by process-local rate-limit counters.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_counter_store(config, Arc::new(InMemoryCounterStore::new()))
    }

    pub fn with_counter_store(config: Arc<AppConfig>, store: Arc<dyn CounterStore>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));

        Self {
            api_limiter: Arc::new(RateLimiter::new(
                store.clone(),
                RateLimitPolicy::API,
                "appointments",
            )),
            sign_in_limiter: Arc::new(RateLimiter::new(store, RateLimitPolicy::SIGN_IN, "signin")),
            config,
            supabase,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<SupabaseClient> {
    fn from_ref(state: &AppState) -> Self {
        state.supabase.clone()
    }
}
