//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Submitting the form (validate, resolve key, generate, persist)
//!   - Restoring and resetting the stored plan
//!   - Key validation and storage

use tracing::{info, instrument, warn};

use crate::domain::{TrainingFormData, TrainingPlanResponse};
use crate::protocol::ApiError;
use crate::state::AppState;

/// One generation per submission; a concurrent submit gets `busy`.
#[instrument(level = "info", skip(state, form), fields(days = form.duration_days, level = %form.experience_level))]
pub async fn submit(state: &AppState, form: TrainingFormData) -> Result<TrainingPlanResponse, ApiError> {
  let form = form.validate()?;
  let _guard = state.busy.try_lock().map_err(|_| ApiError::busy())?;

  let credential = state.credential().await?;
  let plan = state.generator.generate(&form, credential.as_deref()).await?;

  // Replace the previous plan wholesale; a storage failure should not hide the plan.
  if let Err(e) = state.store.save_plan(&plan).await {
    warn!(target: "sapperhub_backend", error = %e, "Failed to persist generated plan");
  }
  info!(target: "sapperhub_backend", days = plan.days.len(), offline = plan.is_offline, "Plan ready");
  Ok(plan)
}

pub async fn current_plan(state: &AppState) -> Result<TrainingPlanResponse, ApiError> {
  state
    .store
    .load_plan()
    .await?
    .ok_or_else(|| ApiError::not_found("no saved plan"))
}

#[instrument(level = "info", skip(state))]
pub async fn reset(state: &AppState) -> Result<(), ApiError> {
  state.store.clear_plan().await?;
  info!(target: "sapperhub_backend", "Saved plan cleared");
  Ok(())
}

#[instrument(level = "info", skip(state, api_key), fields(key_len = api_key.len()))]
pub async fn validate_credential(state: &AppState, api_key: &str) -> Result<(), ApiError> {
  state.generator.validate(api_key).await?;
  Ok(())
}

#[instrument(level = "info", skip(state, api_key), fields(key_len = api_key.len()))]
pub async fn save_credential(state: &AppState, api_key: &str) -> Result<(), ApiError> {
  let key = api_key.trim();
  if key.is_empty() {
    state.store.clear_credential().await?;
  } else {
    state.store.save_credential(key).await?;
  }
  Ok(())
}

pub async fn clear_credential(state: &AppState) -> Result<(), ApiError> {
  state.store.clear_credential().await?;
  Ok(())
}
