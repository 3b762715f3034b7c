//! Closed error taxonomy for plan generation and credential checks.
//!
//! Remote failures are classified once, in the Gemini adapter
//! (`gemini::classify_failure`). Everything above it only matches on these
//! variants.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
  #[error("no API key configured")]
  CredentialMissing,

  #[error("API key blocked: the provider reports it as publicly leaked. Create a new key in a new project and keep it private.")]
  CredentialCompromised,

  #[error("API key has an invalid format: {0}")]
  CredentialMalformed(String),

  #[error("access denied for this API key: {0}")]
  PermissionDenied(String),

  /// Terminal form of the two variants above, raised once no model is left.
  #[error("access error: check the API key or create a new one in Google AI Studio ({0})")]
  CredentialInvalid(String),

  #[error("model '{model}' is not available for this key: {message}")]
  ModelUnavailable { model: String, message: String },

  #[error("request limit exceeded (429): {0}")]
  RateLimited(String),

  #[error("service overloaded: {0}")]
  Overloaded(String),

  #[error("reply was not a usable plan: {0}")]
  MalformedResponse(String),

  #[error("network error: {0}")]
  Network(String),

  #[error("unexpected AI service error: {0}")]
  Unknown(String),

  #[error("{}", exhausted_message(.attempts, .last))]
  Exhausted { attempts: u32, last: Box<GenerationError> },
}

fn exhausted_message(attempts: &u32, last: &GenerationError) -> String {
  match last {
    GenerationError::RateLimited(_) => format!(
      "request limit exceeded (429) after {attempts} attempts; wait a minute or use another account"
    ),
    other => format!("all AI models failed after {attempts} attempts: {other}"),
  }
}

impl GenerationError {
  /// Stable machine-readable name used in API error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      GenerationError::CredentialMissing => "credential_missing",
      GenerationError::CredentialCompromised => "credential_compromised",
      GenerationError::CredentialMalformed(_) => "credential_malformed",
      GenerationError::PermissionDenied(_) => "permission_denied",
      GenerationError::CredentialInvalid(_) => "credential_invalid",
      GenerationError::ModelUnavailable { .. } => "model_unavailable",
      GenerationError::RateLimited(_) => "rate_limited",
      GenerationError::Overloaded(_) => "overloaded",
      GenerationError::MalformedResponse(_) => "malformed_response",
      GenerationError::Network(_) => "network",
      GenerationError::Unknown(_) => "unknown",
      GenerationError::Exhausted { .. } => "exhausted",
    }
  }

  /// Rank used by key validation to report the most actionable failure.
  /// Higher is more specific.
  pub fn specificity(&self) -> u8 {
    match self {
      GenerationError::CredentialCompromised => 9,
      GenerationError::CredentialMalformed(_) => 8,
      GenerationError::PermissionDenied(_) | GenerationError::CredentialInvalid(_) => 7,
      GenerationError::ModelUnavailable { .. } => 6,
      GenerationError::RateLimited(_) => 5,
      GenerationError::Overloaded(_) => 4,
      GenerationError::Network(_) => 3,
      GenerationError::MalformedResponse(_) => 2,
      GenerationError::Unknown(_) | GenerationError::Exhausted { .. } => 1,
      GenerationError::CredentialMissing => 0,
    }
  }
}
