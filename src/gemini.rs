//! Minimal Gemini client for plan generation and key checks.
//!
//! We only call `models/{model}:generateContent`, asking for a JSON reply.
//! Calls are instrumented and log model names, latencies, and token usage (not contents).
//!
//! This is the only place that looks at provider error wording: every failure
//! leaves here already mapped onto `GenerationError`.
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::GeminiCfg;
use crate::error::GenerationError;
use crate::prompt::GenerationRequest;
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Remote generation seam. The generator only sees this trait, so tests can
/// script failures without a network.
#[async_trait]
pub trait PlanBackend: Send + Sync {
  /// Return the raw reply text (expected to be a JSON plan).
  async fn generate(
    &self,
    credential: &str,
    model: &str,
    request: &GenerationRequest,
  ) -> Result<String, GenerationError>;

  /// Minimal round trip proving the key can reach `model`.
  async fn ping(&self, credential: &str, model: &str) -> Result<(), GenerationError>;
}

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl GeminiClient {
  pub fn new(cfg: &GeminiCfg) -> Result<Self, GenerationError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
      .build()
      .map_err(|e| GenerationError::Network(e.to_string()))?;
    Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self, credential, body), fields(model = %model))]
  async fn call(&self, credential: &str, model: &str, body: &GenerateContentRequest) -> Result<GenerateContentResponse, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, model);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "sapperhub-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, credential)
      .json(body).send().await.map_err(transport_error)?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let err = classify_failure(Some(status), &body);
      warn!(target: "gemini", elapsed = ?start.elapsed(), %status, kind = err.kind(), body = %trunc_for_log(&body, 300), "Gemini call failed");
      return Err(err);
    }

    let parsed: GenerateContentResponse = res.json().await.map_err(|e| {
      if e.is_decode() {
        GenerationError::MalformedResponse(e.to_string())
      } else {
        transport_error(e)
      }
    })?;
    if let Some(usage) = &parsed.usage_metadata {
      info!(target: "gemini", elapsed = ?start.elapsed(), prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    Ok(parsed)
  }
}

#[async_trait]
impl PlanBackend for GeminiClient {
  async fn generate(
    &self,
    credential: &str,
    model: &str,
    request: &GenerationRequest,
  ) -> Result<String, GenerationError> {
    let body = GenerateContentRequest {
      system_instruction: Some(Content::text(None, &request.system_instruction)),
      contents: vec![Content::text(Some("user"), &request.prompt)],
      generation_config: Some(GenerationConfig {
        response_mime_type: Some("application/json".into()),
        response_schema: request.response_schema.clone(),
        temperature: Some(request.temperature),
      }),
    };
    let res = self.call(credential, model, &body).await?;
    if let Some(reason) = res.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
      error!(target: "gemini", %model, %reason, "Prompt blocked by provider");
      return Err(GenerationError::MalformedResponse(format!("prompt blocked: {reason}")));
    }
    let text = res.text();
    if text.trim().is_empty() {
      return Err(GenerationError::MalformedResponse("empty response".into()));
    }
    Ok(text)
  }

  async fn ping(&self, credential: &str, model: &str) -> Result<(), GenerationError> {
    let body = GenerateContentRequest {
      system_instruction: None,
      contents: vec![Content::text(Some("user"), "ping")],
      generation_config: None,
    };
    self.call(credential, model, &body).await.map(|_| ())
  }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
  if e.is_timeout() {
    GenerationError::Network(format!("request timed out: {e}"))
  } else {
    GenerationError::Network(e.to_string())
  }
}

/// Map a failed reply onto the error taxonomy.
///
/// The provider's message wins over the HTTP status for the compromised-key
/// case (it arrives as a 403); otherwise the status decides and the text is
/// only consulted when the status is absent or unrecognised.
pub fn classify_failure(status: Option<StatusCode>, body: &str) -> GenerationError {
  let envelope = extract_gemini_error(body);
  let message = envelope
    .as_ref()
    .map(|e| match &e.status {
      Some(s) => format!("{}: {}", s, e.message),
      None => e.message.clone(),
    })
    .unwrap_or_else(|| body.trim().to_string());
  let code = status
    .map(|s| s.as_u16())
    .or_else(|| envelope.as_ref().and_then(|e| e.code));
  let lower = message.to_lowercase();
  let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

  if has(&["leaked", "compromised"]) {
    return GenerationError::CredentialCompromised;
  }
  match code {
    Some(429) => return GenerationError::RateLimited(message),
    Some(404) => return GenerationError::ModelUnavailable { model: String::new(), message },
    Some(403) => return GenerationError::PermissionDenied(message),
    Some(400) | Some(401) => return GenerationError::CredentialMalformed(message),
    Some(500) | Some(503) | Some(504) => return GenerationError::Overloaded(message),
    _ => {}
  }
  if has(&["429", "quota", "resource_exhausted", "resource exhausted"]) {
    GenerationError::RateLimited(message)
  } else if has(&["404", "not found"]) {
    GenerationError::ModelUnavailable { model: String::new(), message }
  } else if has(&["403", "permission_denied", "permission denied"]) {
    GenerationError::PermissionDenied(message)
  } else if has(&["400", "invalid_argument", "api key not valid"]) {
    GenerationError::CredentialMalformed(message)
  } else if has(&["503", "overloaded", "unavailable"]) {
    GenerationError::Overloaded(message)
  } else if message.is_empty() {
    GenerationError::Unknown(format!("HTTP {}", code.map(|c| c.to_string()).unwrap_or_else(|| "?".into())))
  } else {
    GenerationError::Unknown(message)
  }
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

impl Content {
  fn text(role: Option<&str>, text: &str) -> Self {
    Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text.to_string()) }] }
  }
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  response_mime_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_schema: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  fn text(&self) -> String {
    self.candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
      .unwrap_or_default()
  }
}

#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<Content> }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback { #[serde(default)] block_reason: Option<String> }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

struct GeminiErrorBody {
  code: Option<u16>,
  status: Option<String>,
  message: String,
}

/// Try to extract the `{"error": {code, status, message}}` envelope.
fn extract_gemini_error(body: &str) -> Option<GeminiErrorBody> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj {
    #[serde(default)] code: Option<u16>,
    #[serde(default)] status: Option<String>,
    #[serde(default)] message: String,
  }
  let w = serde_json::from_str::<EWrap>(body).ok()?;
  Some(GeminiErrorBody { code: w.error.code, status: w.error.status, message: w.error.message })
}
