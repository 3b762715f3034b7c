//! Persistence for the two user-facing slots: the last generated plan (restored
//! on reload) and the user-supplied API key.
//!
//! Slots are independent; clearing one never touches the other.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::domain::TrainingPlanResponse;

const PLAN_FILE: &str = "last_plan.json";
const CREDENTIAL_FILE: &str = "credential";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage I/O error on {path}: {source}")]
  Io { path: PathBuf, #[source] source: std::io::Error },
  #[error("failed to serialize plan: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait PlanStore: Send + Sync {
  async fn load_plan(&self) -> Result<Option<TrainingPlanResponse>, StoreError>;
  async fn save_plan(&self, plan: &TrainingPlanResponse) -> Result<(), StoreError>;
  async fn clear_plan(&self) -> Result<(), StoreError>;

  async fn load_credential(&self) -> Result<Option<String>, StoreError>;
  async fn save_credential(&self, key: &str) -> Result<(), StoreError>;
  async fn clear_credential(&self) -> Result<(), StoreError>;
}

/// Ephemeral store; everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
  plan: RwLock<Option<TrainingPlanResponse>>,
  credential: RwLock<Option<String>>,
}

#[async_trait]
impl PlanStore for MemoryStore {
  async fn load_plan(&self) -> Result<Option<TrainingPlanResponse>, StoreError> {
    Ok(self.plan.read().await.clone())
  }
  async fn save_plan(&self, plan: &TrainingPlanResponse) -> Result<(), StoreError> {
    *self.plan.write().await = Some(plan.clone());
    Ok(())
  }
  async fn clear_plan(&self) -> Result<(), StoreError> {
    *self.plan.write().await = None;
    Ok(())
  }
  async fn load_credential(&self) -> Result<Option<String>, StoreError> {
    Ok(self.credential.read().await.clone())
  }
  async fn save_credential(&self, key: &str) -> Result<(), StoreError> {
    *self.credential.write().await = Some(key.to_string());
    Ok(())
  }
  async fn clear_credential(&self) -> Result<(), StoreError> {
    *self.credential.write().await = None;
    Ok(())
  }
}

/// Files under a data directory, written through a temp file + rename.
pub struct FileStore {
  dir: PathBuf,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
  move |source| StoreError::Io { path: path.to_path_buf(), source }
}

impl FileStore {
  pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let dir = dir.into();
    tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;
    Ok(Self { dir })
  }

  fn path(&self, name: &str) -> PathBuf {
    self.dir.join(name)
  }

  async fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
    let path = self.path(name);
    match tokio::fs::read_to_string(&path).await {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(io_err(&path)(e)),
    }
  }

  async fn write(&self, name: &str, contents: &str) -> Result<(), StoreError> {
    let path = self.path(name);
    let tmp = self.path(&format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, contents).await.map_err(io_err(&tmp))?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
      let _ = tokio::fs::remove_file(&tmp).await;
      return Err(io_err(&path)(e));
    }
    debug!(target: "store", path = %path.display(), bytes = contents.len(), "Slot written");
    Ok(())
  }

  async fn remove(&self, name: &str) -> Result<(), StoreError> {
    let path = self.path(name);
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(io_err(&path)(e)),
    }
  }
}

#[async_trait]
impl PlanStore for FileStore {
  /// A corrupt plan file is dropped and reported as absent.
  #[instrument(level = "debug", skip(self))]
  async fn load_plan(&self) -> Result<Option<TrainingPlanResponse>, StoreError> {
    let Some(raw) = self.read(PLAN_FILE).await? else { return Ok(None) };
    match serde_json::from_str::<TrainingPlanResponse>(&raw) {
      Ok(plan) => Ok(Some(plan)),
      Err(e) => {
        error!(target: "store", error = %e, "Failed to load saved plan; removing it");
        self.remove(PLAN_FILE).await?;
        Ok(None)
      }
    }
  }

  async fn save_plan(&self, plan: &TrainingPlanResponse) -> Result<(), StoreError> {
    let json = serde_json::to_string(plan)?;
    self.write(PLAN_FILE, &json).await
  }

  async fn clear_plan(&self) -> Result<(), StoreError> {
    self.remove(PLAN_FILE).await
  }

  async fn load_credential(&self) -> Result<Option<String>, StoreError> {
    Ok(self
      .read(CREDENTIAL_FILE)
      .await?
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty()))
  }

  async fn save_credential(&self, key: &str) -> Result<(), StoreError> {
    self.write(CREDENTIAL_FILE, key.trim()).await
  }

  async fn clear_credential(&self) -> Result<(), StoreError> {
    self.remove(CREDENTIAL_FILE).await
  }
}
