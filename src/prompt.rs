//! Rendering of the generation prompt and the structured-output schema.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{ModuleType, TrainingFormData};
use crate::topics::briefing;
use crate::util::fill_template;

const DEFAULT_NOTES: &str = "Baseline course, no special requirements.";

/// Everything one remote attempt needs besides the model name and key.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub system_instruction: String,
  pub prompt: String,
  pub temperature: f32,
  pub response_schema: Option<Value>,
}

/// One line per selected topic: name plus its briefing.
pub fn focus_briefings(topics: &[String]) -> String {
  topics
    .iter()
    .map(|t| format!("- TOPIC: {t}. ESSENCE: {}", briefing(t)))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn render_prompt(prompts: &Prompts, input: &TrainingFormData) -> String {
  let days = input.duration_days.to_string();
  let count = input.focus_areas.len().to_string();
  let topics = focus_briefings(&input.focus_areas);
  let notes = if input.custom_notes.trim().is_empty() { DEFAULT_NOTES } else { input.custom_notes.trim() };
  fill_template(
    &prompts.user_template,
    &[
      ("days", days.as_str()),
      ("level", input.experience_level.as_str()),
      ("topic_count", count.as_str()),
      ("topics", topics.as_str()),
      ("notes", notes),
    ],
  )
}

pub fn build_request(
  prompts: &Prompts,
  input: &TrainingFormData,
  temperature: f32,
  with_schema: bool,
) -> GenerationRequest {
  GenerationRequest {
    system_instruction: prompts.system_instruction.clone(),
    prompt: render_prompt(prompts, input),
    temperature,
    response_schema: with_schema.then(response_schema),
  }
}

/// Gemini `responseSchema` describing `TrainingPlanResponse`.
pub fn response_schema() -> Value {
  let strings = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
  let quiz = json!({
    "type": "OBJECT",
    "properties": {
      "question": { "type": "STRING" },
      "answer": { "type": "STRING" }
    },
    "required": ["question", "answer"]
  });
  let module = json!({
    "type": "OBJECT",
    "properties": {
      "time": { "type": "STRING" },
      "subject": { "type": "STRING" },
      "description": { "type": "STRING" },
      "type": { "type": "STRING", "enum": ModuleType::ALL },
      "instructorTips": strings,
      "questions": { "type": "ARRAY", "items": quiz }
    },
    "required": ["time", "subject", "description", "type", "instructorTips", "questions"]
  });
  let day = json!({
    "type": "OBJECT",
    "properties": {
      "dayNumber": { "type": "INTEGER" },
      "theme": { "type": "STRING" },
      "objectives": strings,
      "safetyNotes": { "type": "STRING" },
      "schedule": { "type": "ARRAY", "items": module }
    },
    "required": ["dayNumber", "theme", "objectives", "safetyNotes", "schedule"]
  });
  json!({
    "type": "OBJECT",
    "properties": {
      "title": { "type": "STRING" },
      "overview": { "type": "STRING" },
      "days": { "type": "ARRAY", "items": day }
    },
    "required": ["title", "overview", "days"]
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ExperienceLevel;
  use crate::topics::GENERIC_BRIEFING;

  fn input(notes: &str) -> TrainingFormData {
    TrainingFormData {
      duration_days: 5,
      experience_level: ExperienceLevel::Advanced,
      focus_areas: vec!["Mine Safety".into(), "Knot Tying".into()],
      custom_notes: notes.into(),
    }
  }

  #[test]
  fn prompt_embeds_parameters_and_briefings() {
    let p = render_prompt(&Prompts::default(), &input("winter conditions"));
    assert!(p.contains("for 5 days"));
    assert!(p.contains("Audience level: Advanced"));
    assert!(p.contains("Focus topics (2)"));
    assert!(p.contains("TOPIC: Mine Safety. ESSENCE: Recognition"));
    assert!(p.contains(&format!("TOPIC: Knot Tying. ESSENCE: {GENERIC_BRIEFING}")));
    assert!(p.contains("winter conditions"));
    assert!(!p.contains("{days}"));
  }

  #[test]
  fn topic_names_cannot_pull_in_notes() {
    let mut form = input("crew roster");
    form.focus_areas = vec!["Knots {notes}".into()];
    let p = render_prompt(&Prompts::default(), &form);
    assert!(p.contains("TOPIC: Knots {notes}. ESSENCE:"));
    assert_eq!(p.matches("crew roster").count(), 1);
  }

  #[test]
  fn empty_notes_use_default() {
    let p = render_prompt(&Prompts::default(), &input("   "));
    assert!(p.contains(DEFAULT_NOTES));
  }

  #[test]
  fn schema_restricts_module_type() {
    let s = response_schema();
    let ty = &s["properties"]["days"]["items"]["properties"]["schedule"]["items"]["properties"]["type"];
    assert_eq!(ty["enum"], json!(["Theory", "Practice", "Drill"]));
    let req = build_request(&Prompts::default(), &input(""), 0.4, false);
    assert!(req.response_schema.is_none());
  }
}
