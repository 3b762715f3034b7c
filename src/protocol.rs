//! Public protocol structs for the HTTP API (serde ready), plus the error
//! type every handler returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::{ExperienceLevel, FormError};
use crate::error::GenerationError;
use crate::store::StoreError;
use crate::topics::TopicCategory;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    pub categories: Vec<TopicCategory>,
    pub experience_levels: Vec<ExperienceLevel>,
    pub max_duration_days: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialIn {
    pub api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOut {
    pub valid: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatusOut {
    pub has_user_key: bool,
    pub has_default_key: bool,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: ErrorBody,
}

/// Handler error: a status plus a classified, user-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, kind: "not_found", message: msg.into() }
    }

    pub fn busy() -> Self {
        Self {
            status: StatusCode::CONFLICT,
            kind: "busy",
            message: "a plan is already being generated; wait for it to finish".into(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        let status = match &e {
            GenerationError::CredentialMissing | GenerationError::CredentialMalformed(_) => StatusCode::BAD_REQUEST,
            GenerationError::CredentialCompromised
            | GenerationError::CredentialInvalid(_)
            | GenerationError::PermissionDenied(_) => StatusCode::UNAUTHORIZED,
            GenerationError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GenerationError::Exhausted { last, .. } if matches!(**last, GenerationError::RateLimited(_)) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        Self { status, kind: e.kind(), message: e.to_string() }
    }
}

impl From<FormError> for ApiError {
    fn from(e: FormError) -> Self {
        Self { status: StatusCode::BAD_REQUEST, kind: "invalid_form", message: e.to_string() }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, kind: "storage", message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorOut { error: ErrorBody { kind: self.kind, message: self.message } };
        (self.status, Json(body)).into_response()
    }
}
