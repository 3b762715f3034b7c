//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::{header, StatusCode}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::domain::{ExperienceLevel, TrainingFormData, MAX_DURATION_DAYS};
use crate::export::{day_to_text, exam_deck, plan_to_text};
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;
use crate::topics::catalog;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_get_catalog() -> impl IntoResponse {
  Json(CatalogOut {
    categories: catalog(),
    experience_levels: ExperienceLevel::ALL.to_vec(),
    max_duration_days: MAX_DURATION_DAYS,
  })
}

#[instrument(level = "info", skip(state, body), fields(days = body.duration_days, topics = body.focus_areas.len()))]
pub async fn http_post_plan(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TrainingFormData>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = logic::submit(&state, body).await?;
  info!(target: "sapperhub_backend", days = plan.days.len(), offline = plan.is_offline, "HTTP plan served");
  Ok(Json(plan))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_plan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(logic::current_plan(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_plan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  logic::reset(&state).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_export_plan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let plan = logic::current_plan(&state).await?;
  Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], plan_to_text(&plan)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_export_day(
  State(state): State<Arc<AppState>>,
  Path(day): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = logic::current_plan(&state).await?;
  let day = plan
    .days
    .iter()
    .find(|d| d.day_number == day)
    .ok_or_else(|| ApiError::not_found(format!("day {day} is not in the plan")))?;
  Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], day_to_text(day)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exam(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let plan = logic::current_plan(&state).await?;
  let deck = exam_deck(&plan, &mut rand::thread_rng());
  info!(target: "sapperhub_backend", questions = deck.len(), "HTTP exam deck served");
  Ok(Json(deck))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_validate_credential(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CredentialIn>,
) -> Result<impl IntoResponse, ApiError> {
  logic::validate_credential(&state, &body.api_key).await?;
  Ok(Json(ValidateOut { valid: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_credential(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let has_user_key = state.store.load_credential().await?.is_some_and(|k| !k.trim().is_empty());
  Ok(Json(CredentialStatusOut {
    has_user_key,
    has_default_key: !state.config.gemini.default_api_key.is_empty(),
  }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_put_credential(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CredentialIn>,
) -> Result<impl IntoResponse, ApiError> {
  logic::save_credential(&state, &body.api_key).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_credential(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  logic::clear_credential(&state).await?;
  Ok(StatusCode::NO_CONTENT)
}
