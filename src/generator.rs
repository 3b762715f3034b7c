//! Plan generation: credential short-circuit, ordered model attempts with
//! backoff, and substitution of the offline template.
//!
//! One `generate` call owns its own attempt counter and last error; nothing is
//! shared between calls. Models are tried strictly in the configured order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::{AppConfig, ExhaustionPolicy, GeminiCfg, Prompts, RetryCfg};
use crate::domain::{TrainingFormData, TrainingPlanResponse};
use crate::error::GenerationError;
use crate::gemini::PlanBackend;
use crate::prompt::build_request;
use crate::template::assemble_template_plan;

/// Delay seam so retry timing can be tested without real time passing.
#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// Stored user key first, then the configured default. Blank values are skipped.
pub fn resolve_credential(stored: Option<&str>, default: &str) -> Option<String> {
  [stored.unwrap_or_default(), default]
    .into_iter()
    .map(str::trim)
    .find(|k| !k.is_empty())
    .map(str::to_string)
}

/// What the loop does after a failed attempt.
#[derive(Debug, PartialEq, Eq)]
enum Next {
  Abort,
  RetrySameAfterBackoff,
  NextModel,
  NextModelAfterBackoff,
}

fn next_step(err: &GenerationError, is_last_model: bool, retries_left: bool) -> Next {
  match err {
    GenerationError::CredentialCompromised => Next::Abort,
    GenerationError::CredentialMalformed(_) | GenerationError::PermissionDenied(_) if is_last_model => Next::Abort,
    GenerationError::CredentialMalformed(_) | GenerationError::PermissionDenied(_) => Next::NextModel,
    GenerationError::RateLimited(_) => Next::NextModelAfterBackoff,
    GenerationError::ModelUnavailable { .. } => Next::NextModel,
    GenerationError::Overloaded(_) | GenerationError::Network(_) if retries_left => Next::RetrySameAfterBackoff,
    GenerationError::Overloaded(_) | GenerationError::Network(_) => Next::NextModelAfterBackoff,
    _ => Next::NextModel,
  }
}

/// Terminal error surfaced to the caller when the loop aborts.
fn terminal(err: GenerationError) -> GenerationError {
  match err {
    GenerationError::CredentialMalformed(m) | GenerationError::PermissionDenied(m) => GenerationError::CredentialInvalid(m),
    other => other,
  }
}

fn attach_model(err: GenerationError, model: &str) -> GenerationError {
  match err {
    GenerationError::ModelUnavailable { model: m, message } if m.is_empty() => {
      GenerationError::ModelUnavailable { model: model.to_string(), message }
    }
    other => other,
  }
}

/// Parse and minimally validate a remote reply.
pub fn parse_plan(text: &str) -> Result<TrainingPlanResponse, GenerationError> {
  let trimmed = strip_code_fence(text);
  let mut plan: TrainingPlanResponse = serde_json::from_str(trimmed)
    .map_err(|e| GenerationError::MalformedResponse(format!("JSON parse error: {e}")))?;
  if plan.days.is_empty() {
    return Err(GenerationError::MalformedResponse("plan has no days".into()));
  }
  plan.is_offline = false;
  Ok(plan)
}

/// Models sometimes wrap JSON in a markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
  let t = text.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub struct PlanGenerator {
  backend: Arc<dyn PlanBackend>,
  sleeper: Arc<dyn Sleeper>,
  gemini: GeminiCfg,
  retry: RetryCfg,
  prompts: Prompts,
}

impl PlanGenerator {
  pub fn new(backend: Arc<dyn PlanBackend>, sleeper: Arc<dyn Sleeper>, cfg: &AppConfig) -> Self {
    Self {
      backend,
      sleeper,
      gemini: cfg.gemini.clone(),
      retry: cfg.retry.clone(),
      prompts: cfg.prompts.clone(),
    }
  }

  /// Upper bound on remote calls made by one `generate`.
  pub fn attempt_budget(&self) -> u32 {
    let per_model = 1 + self.retry.retries_per_model;
    let by_models = (self.gemini.models.len() as u32).saturating_mul(per_model);
    by_models.min(self.retry.max_attempts)
  }

  fn backoff(&self, step: u32) -> Duration {
    let factor = 1u64 << step.min(16);
    let ms = self.retry.base_delay_ms.saturating_mul(factor).min(self.retry.max_delay_ms);
    Duration::from_millis(ms)
  }

  /// Produce a plan. Without a credential this never touches the network.
  #[instrument(level = "info", skip(self, input, credential), fields(days = input.duration_days, topics = input.focus_areas.len(), has_key = credential.is_some()))]
  pub async fn generate(
    &self,
    input: &TrainingFormData,
    credential: Option<&str>,
  ) -> Result<TrainingPlanResponse, GenerationError> {
    let Some(key) = credential.map(str::trim).filter(|k| !k.is_empty()) else {
      warn!(target: "generator", "No API key configured; serving offline template");
      self.sleeper.sleep(Duration::from_millis(self.retry.offline_delay_ms)).await;
      return Ok(assemble_template_plan(input));
    };

    let request = build_request(&self.prompts, input, self.gemini.temperature, self.gemini.use_response_schema);
    let budget = self.attempt_budget();
    let models = &self.gemini.models;
    let mut attempts: u32 = 0;
    let mut backoffs: u32 = 0;
    let mut last_error: Option<GenerationError> = None;

    'models: for (idx, model) in models.iter().enumerate() {
      let is_last_model = idx + 1 == models.len();
      let mut retries_used: u32 = 0;

      loop {
        if attempts >= budget {
          break 'models;
        }
        attempts += 1;
        info!(target: "generator", %model, attempt = attempts, budget, "Attempting generation");

        let outcome = match self.backend.generate(key, model, &request).await {
          Ok(text) => parse_plan(&text),
          Err(e) => Err(attach_model(e, model)),
        };

        let err = match outcome {
          Ok(plan) => {
            info!(target: "generator", %model, attempt = attempts, days = plan.days.len(), "Plan generated");
            return Ok(plan);
          }
          Err(e) => e,
        };

        let retries_left = retries_used < self.retry.retries_per_model;
        let step = next_step(&err, is_last_model, retries_left);
        warn!(target: "generator", %model, attempt = attempts, kind = err.kind(), error = %err, next = ?step, "Generation attempt failed");

        match step {
          Next::Abort => {
            let err = terminal(err);
            error!(target: "generator", %model, kind = err.kind(), "Aborting generation");
            return Err(err);
          }
          Next::RetrySameAfterBackoff => {
            retries_used += 1;
            last_error = Some(err);
            if attempts < budget {
              self.sleeper.sleep(self.backoff(backoffs)).await;
              backoffs += 1;
            }
          }
          Next::NextModelAfterBackoff => {
            last_error = Some(err);
            if !is_last_model && attempts < budget {
              self.sleeper.sleep(self.backoff(backoffs)).await;
              backoffs += 1;
            }
            continue 'models;
          }
          Next::NextModel => {
            last_error = Some(err);
            continue 'models;
          }
        }
      }
    }

    let last = last_error.unwrap_or_else(|| GenerationError::Unknown("no models configured".into()));
    match self.retry.exhaustion_policy {
      ExhaustionPolicy::Fallback => {
        warn!(target: "generator", attempts, kind = last.kind(), error = %last, "All models failed; serving offline template");
        Ok(assemble_template_plan(input))
      }
      ExhaustionPolicy::Surface => {
        error!(target: "generator", attempts, kind = last.kind(), error = %last, "All models failed");
        Err(GenerationError::Exhausted { attempts, last: Box::new(last) })
      }
    }
  }

  /// Check a key with a minimal request. Independent of `generate`'s retry budget.
  #[instrument(level = "info", skip(self, credential))]
  pub async fn validate(&self, credential: &str) -> Result<(), GenerationError> {
    let key = credential.trim();
    if key.is_empty() {
      return Err(GenerationError::CredentialMissing);
    }

    let mut best: Option<GenerationError> = None;
    for model in &self.gemini.ping_models {
      match self.backend.ping(key, model).await {
        Ok(()) => {
          info!(target: "generator", %model, "API key validated");
          return Ok(());
        }
        Err(e) => {
          let e = attach_model(e, model);
          warn!(target: "generator", %model, kind = e.kind(), error = %e, "Key validation failed for model");
          let stop = matches!(e, GenerationError::CredentialCompromised | GenerationError::CredentialMalformed(_));
          if best.as_ref().map_or(true, |b| e.specificity() > b.specificity()) {
            best = Some(e);
          }
          if stop {
            break;
          }
        }
      }
    }
    Err(best.unwrap_or_else(|| GenerationError::Unknown("no models configured for validation".into())))
  }
}
