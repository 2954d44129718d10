//! Tripmate service entrypoint.
//!
//! Loads configuration, builds the process-wide provider and store
//! handles once, and serves the HTTP surface. Missing credentials
//! degrade the matching endpoints instead of failing startup.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tripmate::adapters::ai::{GeminiConfig, GeminiProvider};
use tripmate::adapters::http::{router, AppState};
use tripmate::adapters::store::{PostgrestConfig, PostgrestStore};
use tripmate::config::AppConfig;
use tripmate::ports::{GenerationProvider, RowStore};

#[tokio::main]
async fn main() {
    let config = AppConfig::load().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let generation: Option<Arc<dyn GenerationProvider>> = match &config.ai.gemini_api_key {
        Some(key) if config.ai.has_credential() => {
            let gemini_config = GeminiConfig::new(key.clone())
                .with_model(config.ai.model.clone())
                .with_timeout(config.ai.timeout())
                .with_max_output_tokens(config.ai.max_output_tokens);
            Some(Arc::new(GeminiProvider::new(gemini_config)))
        }
        _ => {
            tracing::warn!("no generation credential configured; chat and title endpoints degraded");
            None
        }
    };

    let store: Option<Arc<dyn RowStore>> = match (&config.store.url, &config.store.service_key) {
        (Some(url), Some(key)) if config.store.is_configured() => {
            let store_config =
                PostgrestConfig::new(url.clone(), key.clone()).with_timeout(config.store.timeout());
            Some(Arc::new(PostgrestStore::new(store_config)))
        }
        _ => {
            tracing::warn!("no row store configured; persistence disabled");
            None
        }
    };

    let state = AppState::new(generation, store);
    let request_timeout = std::time::Duration::from_secs(config.server.request_timeout_secs);
    let app = router(state, request_timeout);

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(%addr, environment = ?config.server.environment, "tripmate listening");

    axum::serve(listener, app).await.expect("Server error");
}
