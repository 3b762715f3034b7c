//! SapperHub · Training Plan Backend
//!
//! - Axum HTTP API for plan generation, restoration, export, and key management
//! - Gemini integration when an API key is stored by the user or configured
//! - Offline template plans when no key is available or every model fails
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT            : u16 (default 3000)
//!   GEMINI_API_KEY  : default key (API_KEY is accepted too); a user-stored key wins
//!   GEMINI_BASE_URL : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODELS   : comma-separated model list, tried in order
//!   DATA_DIR        : where the last plan and user key are kept (default ./data, "" = memory)
//!   STATIC_DIR      : SPA bundle directory (default ./static)
//!   APP_CONFIG_PATH : path to TOML config (prompts, models, retry policy)
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use sapperhub_backend::config::AppConfig;
use sapperhub_backend::routes::build_router;
use sapperhub_backend::state::AppState;
use sapperhub_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

  // Shared state: generator, store, busy guard.
  let state = Arc::new(AppState::from_config(config).await?);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "sapperhub_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "sapperhub_backend", error = %e, "Failed to listen for shutdown signal");
  }
  info!(target: "sapperhub_backend", "Shutdown signal received");
}
