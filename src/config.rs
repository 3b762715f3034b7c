//! Loading application configuration (prompts, Gemini models, retry policy,
//! storage) from environment variables and an optional TOML file.
//!
//! Resolution: TOML values (if `APP_CONFIG_PATH` points to a readable file)
//! override built-in defaults; environment variables override both.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
  pub server: ServerCfg,
  pub gemini: GeminiCfg,
  pub retry: RetryCfg,
  pub storage: StorageCfg,
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
  pub port: u16,
  pub static_dir: PathBuf,
}

impl Default for ServerCfg {
  fn default() -> Self {
    Self { port: 3000, static_dir: PathBuf::from("./static") }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeminiCfg {
  pub base_url: String,
  /// Build/deploy-time default key; a key stored by the user wins over it.
  pub default_api_key: String,
  /// Tried strictly in this order.
  pub models: Vec<String>,
  /// Models pinged by key validation.
  pub ping_models: Vec<String>,
  pub temperature: f32,
  pub request_timeout_secs: u64,
  pub use_response_schema: bool,
}

impl Default for GeminiCfg {
  fn default() -> Self {
    Self {
      base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
      default_api_key: String::new(),
      models: vec![
        "gemini-2.0-flash".into(),
        "gemini-1.5-flash".into(),
        "gemini-1.5-flash-8b".into(),
        "gemini-2.0-flash-exp".into(),
      ],
      ping_models: vec!["gemini-2.0-flash".into(), "gemini-1.5-flash".into()],
      temperature: 0.4,
      request_timeout_secs: 60,
      use_response_schema: true,
    }
  }
}

/// What `generate` does once every model has failed with a retryable error.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
  /// Serve the offline template plan.
  #[default]
  Fallback,
  /// Report a classified error and let the caller decide.
  Surface,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
  /// Hard cap on remote attempts per `generate` call.
  pub max_attempts: u32,
  /// Extra attempts on the same model after an overload or network error.
  pub retries_per_model: u32,
  pub base_delay_ms: u64,
  pub max_delay_ms: u64,
  /// Pause before serving the template when no key is configured.
  pub offline_delay_ms: u64,
  pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for RetryCfg {
  fn default() -> Self {
    Self {
      max_attempts: 6,
      retries_per_model: 1,
      base_delay_ms: 2000,
      max_delay_ms: 16_000,
      offline_delay_ms: 1000,
      exhaustion_policy: ExhaustionPolicy::Fallback,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
  /// Directory holding the last plan and the user key. Empty = in-memory only.
  pub data_dir: PathBuf,
}

impl Default for StorageCfg {
  fn default() -> Self {
    Self { data_dir: PathBuf::from("./data") }
  }
}

/// Prompts sent to Gemini. Defaults target an engineer-unit training plan;
/// override them in TOML to tune tone or language.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_instruction: String,
  /// Placeholders: {days}, {level}, {topic_count}, {topics}, {notes}.
  pub user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_instruction: "You are a senior military engineering instructor. Respond ONLY with strict JSON.".into(),
      user_template: r#"Role: Senior instructor of a combat engineer (sapper) company.
Task: Create a rigorous training plan JSON for {days} days.
Audience level: {level}.
Focus topics ({topic_count}):
{topics}
User notes: "{notes}".

COVERAGE RULE:
The user selected {topic_count} topics. Every selected topic MUST appear in the schedule at least once within the {days} days.
- If there are few days, do not skip topics; shorten modules or combine compatible topics into one scenario.
- Shorter theory blocks are acceptable if that is what it takes to cover everything.

REQUIREMENTS:
1. The schedule content must match the day's theme.
2. Each day has 2-4 modules.
3. "instructorTips": concrete teaching advice and safety points, no filler.
4. "questions": 2-3 control questions with answers per module.
5. LANGUAGE: English, standard military terminology.

JSON SCHEMA:
{
  "title": "String (course name)",
  "overview": "String (brief summary stating that all selected topics are covered)",
  "days": [
    {
      "dayNumber": Integer,
      "theme": "String",
      "objectives": ["String"],
      "safetyNotes": "String",
      "schedule": [
        {
          "time": "String (e.g. 08:00 - 09:30)",
          "subject": "String",
          "description": "String",
          "type": "Theory" | "Practice" | "Drill",
          "instructorTips": ["String"],
          "questions": [{"question": "String", "answer": "String"}]
        }
      ]
    }
  ]
}"#.into(),
    }
  }
}

impl AppConfig {
  /// Build the config from `APP_CONFIG_PATH` (optional) and environment overrides.
  pub fn from_env() -> Self {
    let mut cfg = load_toml_from_env().unwrap_or_default();
    cfg.apply_env(|k| std::env::var(k).ok());
    cfg
  }

  /// Apply environment overrides through `get` so tests can pass a fake environment.
  pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
    if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(dir) = get("STATIC_DIR") {
      self.server.static_dir = PathBuf::from(dir);
    }
    if let Some(dir) = get("DATA_DIR") {
      self.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(url) = get("GEMINI_BASE_URL").filter(|s| !s.trim().is_empty()) {
      self.gemini.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")).filter(|s| !s.trim().is_empty()) {
      self.gemini.default_api_key = key.trim().to_string();
    }
    if let Some(models) = get("GEMINI_MODELS") {
      let list: Vec<String> = models
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
      if !list.is_empty() {
        self.gemini.models = list;
      }
    }
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_toml_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "sapperhub_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "sapperhub_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "sapperhub_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
