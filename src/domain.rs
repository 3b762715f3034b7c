//! Domain models: the training form submitted by the UI and the plan document
//! returned to it (either generated remotely or assembled from templates).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest course the form accepts.
pub const MAX_DURATION_DAYS: u32 = 60;

/// Audience level of the trainees.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExperienceLevel {
  #[default]
  Novice,
  Intermediate,
  Advanced,
  Instructor,
}

impl ExperienceLevel {
  pub const ALL: [ExperienceLevel; 4] = [
    ExperienceLevel::Novice,
    ExperienceLevel::Intermediate,
    ExperienceLevel::Advanced,
    ExperienceLevel::Instructor,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ExperienceLevel::Novice => "Novice",
      ExperienceLevel::Intermediate => "Intermediate",
      ExperienceLevel::Advanced => "Advanced",
      ExperienceLevel::Instructor => "Instructor",
    }
  }
}

impl std::fmt::Display for ExperienceLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parameters collected by the form on submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingFormData {
  pub duration_days: u32,
  pub experience_level: ExperienceLevel,
  pub focus_areas: Vec<String>,
  #[serde(default)]
  pub custom_notes: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
  #[error("durationDays must be between 1 and {max}, got {got}")]
  DurationOutOfRange { got: u32, max: u32 },
  #[error("select at least one focus area")]
  NoFocusAreas,
}

impl TrainingFormData {
  /// Check bounds and normalize focus areas (trimmed, blank entries dropped,
  /// duplicates removed keeping the first occurrence).
  pub fn validate(mut self) -> Result<Self, FormError> {
    if self.duration_days == 0 || self.duration_days > MAX_DURATION_DAYS {
      return Err(FormError::DurationOutOfRange { got: self.duration_days, max: MAX_DURATION_DAYS });
    }

    let mut seen: Vec<String> = Vec::with_capacity(self.focus_areas.len());
    for topic in self.focus_areas.drain(..) {
      let topic = topic.trim().to_string();
      if topic.is_empty() || seen.contains(&topic) { continue; }
      seen.push(topic);
    }
    if seen.is_empty() {
      return Err(FormError::NoFocusAreas);
    }
    self.focus_areas = seen;
    self.custom_notes = self.custom_notes.trim().to_string();
    Ok(self)
  }
}

/// Kind of a scheduled teaching unit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModuleType {
  Theory,
  Practice,
  Drill,
}

impl ModuleType {
  pub const ALL: [&'static str; 3] = ["Theory", "Practice", "Drill"];
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizItem {
  pub question: String,
  pub answer: String,
}

/// One scheduled teaching unit within a day.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingModule {
  pub time: String,
  pub subject: String,
  pub description: String,
  #[serde(rename = "type")]
  pub module_type: ModuleType,
  #[serde(default)]
  pub instructor_tips: Vec<String>,
  #[serde(default)]
  pub questions: Vec<QuizItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDay {
  pub day_number: u32,
  pub theme: String,
  #[serde(default)]
  pub objectives: Vec<String>,
  #[serde(default)]
  pub safety_notes: String,
  #[serde(default)]
  pub schedule: Vec<TrainingModule>,
}

/// The plan document. `is_offline` marks template-sourced plans; remote
/// replies omit it and parse as `false`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlanResponse {
  pub title: String,
  #[serde(default)]
  pub overview: String,
  pub days: Vec<TrainingDay>,
  #[serde(default)]
  pub is_offline: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form(days: u32, topics: &[&str]) -> TrainingFormData {
    TrainingFormData {
      duration_days: days,
      experience_level: ExperienceLevel::Novice,
      focus_areas: topics.iter().map(|s| s.to_string()).collect(),
      custom_notes: "  bring gloves ".into(),
    }
  }

  #[test]
  fn validate_dedupes_and_trims_topics() {
    let f = form(3, &["Mine Safety", " Mine Safety", "", "Radio Discipline"]).validate().unwrap();
    assert_eq!(f.focus_areas, vec!["Mine Safety", "Radio Discipline"]);
    assert_eq!(f.custom_notes, "bring gloves");
  }

  #[test]
  fn validate_rejects_bad_duration() {
    assert_eq!(
      form(0, &["Mine Safety"]).validate(),
      Err(FormError::DurationOutOfRange { got: 0, max: 60 })
    );
    assert!(form(61, &["Mine Safety"]).validate().is_err());
    assert!(form(60, &["Mine Safety"]).validate().is_ok());
  }

  #[test]
  fn validate_requires_a_topic() {
    assert_eq!(form(2, &["  "]).validate(), Err(FormError::NoFocusAreas));
  }

  #[test]
  fn remote_shaped_plan_parses_as_online() {
    let json = r#"{
      "title": "Course",
      "overview": "All topics covered",
      "days": [{
        "dayNumber": 1,
        "theme": "Mine awareness",
        "objectives": ["Recognise markings"],
        "safetyNotes": "Inert aids only",
        "schedule": [{
          "time": "08:00 - 09:30",
          "subject": "Markings",
          "description": "Field signs",
          "type": "Theory",
          "instructorTips": ["Keep it short"],
          "questions": [{"question": "Q?", "answer": "A"}]
        }]
      }]
    }"#;
    let plan: TrainingPlanResponse = serde_json::from_str(json).unwrap();
    assert!(!plan.is_offline);
    assert_eq!(plan.days[0].schedule[0].module_type, ModuleType::Theory);
  }

  #[test]
  fn form_uses_camel_case_on_the_wire() {
    let json = r#"{"durationDays":3,"experienceLevel":"Novice","focusAreas":["Mine Safety"]}"#;
    let f: TrainingFormData = serde_json::from_str(json).unwrap();
    assert_eq!(f.duration_days, 3);
    assert_eq!(f.custom_notes, "");
  }
}
