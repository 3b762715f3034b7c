//! End-to-end tests of the JSON API with a scripted remote backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sapperhub_backend::config::{AppConfig, ExhaustionPolicy};
use sapperhub_backend::error::GenerationError;
use sapperhub_backend::gemini::PlanBackend;
use sapperhub_backend::generator::Sleeper;
use sapperhub_backend::prompt::GenerationRequest;
use sapperhub_backend::routes::build_router;
use sapperhub_backend::state::AppState;
use sapperhub_backend::store::{MemoryStore, PlanStore};

// ===========================================================================
// Test harness
// ===========================================================================

#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<u32>,
}

#[async_trait]
impl PlanBackend for ScriptedBackend {
    async fn generate(&self, _: &str, _: &str, _: &GenerationRequest) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::RateLimited("quota".into())))
    }

    async fn ping(&self, _: &str, _: &str) -> Result<(), GenerationError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Err(e)) => Err(e),
            _ => Ok(()),
        }
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _: Duration) {}
}

/// Holds every generation long enough for a second submit to overlap it.
struct SlowBackend {
    delay: Duration,
    reply: String,
}

#[async_trait]
impl PlanBackend for SlowBackend {
    async fn generate(&self, _: &str, _: &str, _: &GenerationRequest) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    async fn ping(&self, _: &str, _: &str) -> Result<(), GenerationError> {
        Ok(())
    }
}

struct Harness {
    app: Router,
    backend: Arc<ScriptedBackend>,
    store: Arc<MemoryStore>,
}

fn harness(script: Vec<Result<String, GenerationError>>, default_key: &str, policy: ExhaustionPolicy) -> Harness {
    let mut config = AppConfig::default();
    config.gemini.default_api_key = default_key.into();
    config.gemini.models = vec!["m1".into(), "m2".into()];
    config.retry.exhaustion_policy = policy;
    config.server.static_dir = std::env::temp_dir().join("sapperhub-no-static");

    let backend = Arc::new(ScriptedBackend { script: Mutex::new(script.into()), ..Default::default() });
    let store = Arc::new(MemoryStore::default());
    let state = AppState::new(config, backend.clone(), Arc::new(NoSleep), store.clone());
    Harness { app: build_router(Arc::new(state)), backend, store }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1_048_576).await.unwrap().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn form() -> Value {
    json!({ "durationDays": 3, "experienceLevel": "Novice", "focusAreas": ["Mine Safety"], "customNotes": "" })
}

fn remote_plan() -> String {
    json!({
        "title": "Remote course",
        "overview": "All topics covered",
        "days": [{
            "dayNumber": 1, "theme": "Mines", "objectives": ["a"], "safetyNotes": "inert aids",
            "schedule": [{ "time": "08:00 - 09:00", "subject": "Markings", "description": "d", "type": "Theory",
                           "instructorTips": ["t"], "questions": [{ "question": "Q1?", "answer": "A1" }] }]
        }]
    })
    .to_string()
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn no_key_serves_offline_plan_and_persists_it() {
    let h = harness(vec![], "", ExhaustionPolicy::Fallback);

    let resp = send(&h.app, "POST", "/api/v1/plan", Some(form())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let plan = body_json(resp).await;
    assert_eq!(plan["isOffline"], true);
    let days = plan["days"].as_array().unwrap();
    assert_eq!(days.len(), 3);
    for (i, d) in days.iter().enumerate() {
        assert_eq!(d["dayNumber"], json!(i + 1));
    }
    assert_eq!(*h.backend.calls.lock().unwrap(), 0);

    let resp = send(&h.app, "GET", "/api/v1/plan", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, plan);
}

#[tokio::test]
async fn stored_user_key_drives_remote_generation() {
    let h = harness(vec![Ok(remote_plan())], "", ExhaustionPolicy::Fallback);

    let resp = send(&h.app, "PUT", "/api/v1/credential", Some(json!({ "apiKey": "user-key" }))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&h.app, "POST", "/api/v1/plan", Some(form())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let plan = body_json(resp).await;
    assert_eq!(plan["title"], "Remote course");
    assert_eq!(plan["isOffline"], false);
    assert_eq!(*h.backend.calls.lock().unwrap(), 1);

    let status = body_json(send(&h.app, "GET", "/api/v1/credential", None).await).await;
    assert_eq!(status, json!({ "hasUserKey": true, "hasDefaultKey": false }));
}

#[tokio::test]
async fn leaked_key_is_surfaced_as_unauthorized() {
    let h = harness(vec![Err(GenerationError::CredentialCompromised)], "default-key", ExhaustionPolicy::Fallback);

    let resp = send(&h.app, "POST", "/api/v1/plan", Some(form())).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["kind"], "credential_compromised");
    assert_eq!(*h.backend.calls.lock().unwrap(), 1);
    assert!(h.store.load_plan().await.unwrap().is_none());
}

#[tokio::test]
async fn quota_exhaustion_with_surface_policy_returns_429() {
    let h = harness(vec![], "default-key", ExhaustionPolicy::Surface);

    let resp = send(&h.app, "POST", "/api/v1/plan", Some(form())).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(resp).await["error"]["kind"], "exhausted");
    assert_eq!(*h.backend.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn invalid_form_is_rejected_before_generation() {
    let h = harness(vec![], "default-key", ExhaustionPolicy::Fallback);

    let bad = json!({ "durationDays": 61, "experienceLevel": "Novice", "focusAreas": ["Mine Safety"] });
    let resp = send(&h.app, "POST", "/api/v1/plan", Some(bad)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["kind"], "invalid_form");

    let empty = json!({ "durationDays": 2, "experienceLevel": "Novice", "focusAreas": [] });
    let resp = send(&h.app, "POST", "/api/v1/plan", Some(empty)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(*h.backend.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn reset_clears_the_plan() {
    let h = harness(vec![], "", ExhaustionPolicy::Fallback);
    send(&h.app, "POST", "/api/v1/plan", Some(form())).await;

    let resp = send(&h.app, "DELETE", "/api/v1/plan", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&h.app, "GET", "/api/v1/plan", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"]["kind"], "not_found");
}

#[tokio::test]
async fn exports_and_exam_deck() {
    let h = harness(vec![Ok(remote_plan())], "default-key", ExhaustionPolicy::Fallback);
    send(&h.app, "POST", "/api/v1/plan", Some(form())).await;

    let resp = send(&h.app, "GET", "/api/v1/plan/export", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(text.starts_with("TRAINING PLAN: REMOTE COURSE"));
    assert!(text.contains("- 08:00 - 09:00 | Markings (Classroom)"));

    let resp = send(&h.app, "GET", "/api/v1/plan/days/1/export", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&h.app, "GET", "/api/v1/plan/days/9/export", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let deck = body_json(send(&h.app, "GET", "/api/v1/plan/exam", None).await).await;
    assert_eq!(deck, json!([{ "question": "Q1?", "answer": "A1" }]));
}

#[tokio::test]
async fn credential_validation_reports_classified_errors() {
    let h = harness(
        vec![Err(GenerationError::CredentialMalformed("API key not valid".into()))],
        "",
        ExhaustionPolicy::Fallback,
    );

    let resp = send(&h.app, "POST", "/api/v1/credential/validate", Some(json!({ "apiKey": "bad" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["kind"], "credential_malformed");

    let resp = send(&h.app, "POST", "/api/v1/credential/validate", Some(json!({ "apiKey": "good" }))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "valid": true }));

    let resp = send(&h.app, "POST", "/api/v1/credential/validate", Some(json!({ "apiKey": " " }))).await;
    assert_eq!(body_json(resp).await["error"]["kind"], "credential_missing");
}

#[tokio::test]
async fn catalog_lists_topics_and_levels() {
    let h = harness(vec![], "", ExhaustionPolicy::Fallback);
    let body = body_json(send(&h.app, "GET", "/api/v1/catalog", None).await).await;
    assert_eq!(body["maxDurationDays"], 60);
    assert_eq!(body["experienceLevels"][0], "Novice");
    let topics: Vec<&str> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|c| c["topics"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()))
        .collect();
    assert!(topics.contains(&"Mine Safety"));
}

#[tokio::test]
async fn concurrent_submit_is_refused_while_one_is_running() {
    let mut config = AppConfig::default();
    config.gemini.default_api_key = "default-key".into();
    config.gemini.models = vec!["m1".into()];
    config.server.static_dir = std::env::temp_dir().join("sapperhub-no-static");
    let backend = Arc::new(SlowBackend { delay: Duration::from_millis(300), reply: remote_plan() });
    let state = AppState::new(config, backend, Arc::new(NoSleep), Arc::new(MemoryStore::default()));
    let app = build_router(Arc::new(state));

    let first = send(&app, "POST", "/api/v1/plan", Some(form()));
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&app, "POST", "/api/v1/plan", Some(form())).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"]["kind"], "busy");

    // The guard is released once the first submission finishes.
    let again = send(&app, "POST", "/api/v1/plan", Some(form())).await;
    assert_eq!(again.status(), StatusCode::OK);
}
