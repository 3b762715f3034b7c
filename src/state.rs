//! Application state: configuration, plan generator, persistence, and the
//! single-flight guard for generation.
//!
//! Built once at startup and shared with handlers behind an `Arc`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::gemini::{GeminiClient, PlanBackend};
use crate::generator::{PlanGenerator, Sleeper, TokioSleeper};
use crate::store::{FileStore, MemoryStore, PlanStore, StoreError};

pub struct AppState {
  pub config: AppConfig,
  pub generator: PlanGenerator,
  pub store: Arc<dyn PlanStore>,
  /// Held for the whole of a generation; a second submit is refused, not queued.
  pub busy: Mutex<()>,
}

impl AppState {
  pub fn new(config: AppConfig, backend: Arc<dyn PlanBackend>, sleeper: Arc<dyn Sleeper>, store: Arc<dyn PlanStore>) -> Self {
    let generator = PlanGenerator::new(backend, sleeper, &config);
    Self { config, generator, store, busy: Mutex::new(()) }
  }

  /// Production wiring: Gemini over HTTP, tokio timers, file (or memory) store.
  #[instrument(level = "info", skip_all)]
  pub async fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
    let backend = Arc::new(GeminiClient::new(&config.gemini)?);
    info!(target: "sapperhub_backend", base_url = %backend.base_url, models = ?config.gemini.models, has_default_key = !config.gemini.default_api_key.is_empty(), "Gemini backend configured");

    let store: Arc<dyn PlanStore> = if config.storage.data_dir.as_os_str().is_empty() {
      warn!(target: "sapperhub_backend", "DATA_DIR empty; plans and keys are kept in memory only");
      Arc::new(MemoryStore::default())
    } else {
      let dir = config.storage.data_dir.clone();
      let store = FileStore::open(&dir).await?;
      info!(target: "sapperhub_backend", dir = %dir.display(), "File store ready");
      Arc::new(store)
    };

    Ok(Self::new(config, backend, Arc::new(TokioSleeper), store))
  }

  /// Stored user key, else the configured default.
  pub async fn credential(&self) -> Result<Option<String>, StoreError> {
    let stored = self.store.load_credential().await?;
    Ok(crate::generator::resolve_credential(stored.as_deref(), &self.config.gemini.default_api_key))
  }
}
