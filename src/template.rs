//! Offline plan assembly from a small built-in module table.
//!
//! Guarantees the app returns something useful without a key or network:
//! deterministic, no I/O, and total for any input.

use crate::domain::{ModuleType, QuizItem, TrainingDay, TrainingFormData, TrainingModule, TrainingPlanResponse};

/// Day themes, cycled by day index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
  Engineering,
  Tactics,
  Medicine,
}

pub const THEME_CYCLE: [Theme; 3] = [Theme::Engineering, Theme::Tactics, Theme::Medicine];

pub const OFFLINE_TITLE: &str = "Basic training plan (offline template)";
pub const OFFLINE_OVERVIEW: &str = "Note: this plan was assembled from a template because the AI service is unavailable. Check the connection or API key and try generating a full plan again.";

impl Theme {
  pub fn for_day_index(index: usize) -> Theme {
    THEME_CYCLE[index % THEME_CYCLE.len()]
  }

  pub fn title(&self) -> &'static str {
    match self {
      Theme::Engineering => "Engineering training",
      Theme::Tactics => "Tactics and drone awareness",
      Theme::Medicine => "Tactical medicine",
    }
  }

  fn objectives(&self) -> Vec<String> {
    let items: &[&str] = match self {
      Theme::Engineering => &["Hazard recognition drills", "Work with training equipment"],
      Theme::Tactics => &["Concealment from aerial observation", "Hasty fighting positions"],
      Theme::Medicine => &["Bleeding control standards", "Casualty movement"],
    };
    items.iter().map(|s| s.to_string()).collect()
  }

  fn safety_notes(&self) -> &'static str {
    match self {
      Theme::Engineering => "Inert training aids only. Keep safety distances. Instructor controls every lane.",
      Theme::Tactics => "Eye protection when digging. No live ammunition on the training area.",
      Theme::Medicine => "Work in gloves. Simulated blood only. Release training tourniquets within two minutes.",
    }
  }

  fn modules(&self) -> Vec<TrainingModule> {
    match self {
      Theme::Engineering => vec![
        module(
          "08:00 - 10:00",
          "Mine and UXO hazard recognition",
          "Study of inert training aids. Signs of a mined area. Marking and reporting procedure.",
          ModuleType::Theory,
          &["Never handle an unidentified item", "Report location, description and time"],
          &[("First action when you spot a suspicious object?", "Stop, do not touch, mark and report")],
        ),
        module(
          "10:15 - 13:00",
          "Safe lane marking",
          "Marking a safe foot lane on the training area with instructor-issued markers.",
          ModuleType::Practice,
          &["Move only inside a cleared and marked lane", "Markers must be visible to friendly troops"],
          &[("Minimum lane width for a group?", "Wide enough for one person with kit, about one metre")],
        ),
      ],
      Theme::Tactics => vec![
        module(
          "08:00 - 10:00",
          "Concealment from drones",
          "Principles of anti-thermal protection. Working under tree cover.",
          ModuleType::Theory,
          &["Use natural overhead cover", "Do not look up with an uncovered face"],
          &[("Main thing that gives a position away?", "Movement and regular geometric shapes")],
        ),
        module(
          "10:15 - 13:00",
          "Prone entrenching",
          "Standard drill: build a prone position in 20 minutes.",
          ModuleType::Practice,
          &["Start digging from the feet end", "Weapon stays ready"],
          &[("Depth of a prone firing position?", "About 30 cm")],
        ),
      ],
      Theme::Medicine => vec![module(
        "08:00 - 12:00",
        "Massive bleeding control",
        "Applying a tourniquet to yourself and to a partner. Time control.",
        ModuleType::Practice,
        &["Application time under 30 seconds", "Check distal pulse"],
        &[("Where to apply a tourniquet in the red zone?", "As high on the limb as possible")],
      )],
    }
  }
}

fn module(
  time: &str,
  subject: &str,
  description: &str,
  module_type: ModuleType,
  tips: &[&str],
  questions: &[(&str, &str)],
) -> TrainingModule {
  TrainingModule {
    time: time.into(),
    subject: subject.into(),
    description: description.into(),
    module_type,
    instructor_tips: tips.iter().map(|s| s.to_string()).collect(),
    questions: questions
      .iter()
      .map(|(q, a)| QuizItem { question: q.to_string(), answer: a.to_string() })
      .collect(),
  }
}

fn consolidation_module() -> TrainingModule {
  module(
    "14:00 - 16:00",
    "Consolidated training / physical conditioning",
    "Reinforcing the day's material as a group.",
    ModuleType::Drill,
    &["Moderate intensity"],
    &[],
  )
}

pub fn build_day(index: usize) -> TrainingDay {
  let theme = Theme::for_day_index(index);
  let mut schedule = theme.modules();
  schedule.push(consolidation_module());
  TrainingDay {
    day_number: (index + 1) as u32,
    theme: theme.title().into(),
    objectives: theme.objectives(),
    safety_notes: theme.safety_notes().into(),
    schedule,
  }
}

/// Assemble the template plan: one day per requested day, `is_offline = true`.
pub fn assemble_template_plan(input: &TrainingFormData) -> TrainingPlanResponse {
  let days = (0..input.duration_days as usize).map(build_day).collect();
  TrainingPlanResponse {
    title: OFFLINE_TITLE.into(),
    overview: OFFLINE_OVERVIEW.into(),
    days,
    is_offline: true,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ExperienceLevel;

  fn input(days: u32) -> TrainingFormData {
    TrainingFormData {
      duration_days: days,
      experience_level: ExperienceLevel::Novice,
      focus_areas: vec!["Mine Safety".into()],
      custom_notes: String::new(),
    }
  }

  #[test]
  fn three_day_plan_without_key() {
    let plan = assemble_template_plan(&input(3));
    assert!(plan.is_offline);
    assert_eq!(plan.days.len(), 3);
    for (i, day) in plan.days.iter().enumerate() {
      assert_eq!(day.day_number, (i + 1) as u32);
    }
  }

  #[test]
  fn deterministic_for_identical_input() {
    for days in [1, 7, 60] {
      let a = assemble_template_plan(&input(days));
      let b = assemble_template_plan(&input(days));
      assert_eq!(a, b);
      assert_eq!(a.days.len(), days as usize);
    }
  }

  #[test]
  fn themes_cycle_and_end_with_consolidation() {
    let plan = assemble_template_plan(&input(4));
    let themes: Vec<_> = plan.days.iter().map(|d| d.theme.as_str()).collect();
    assert_eq!(themes, vec![
      Theme::Engineering.title(),
      Theme::Tactics.title(),
      Theme::Medicine.title(),
      Theme::Engineering.title(),
    ]);
    for day in &plan.days {
      let last = day.schedule.last().unwrap();
      assert_eq!(last.module_type, ModuleType::Drill);
      assert!(last.questions.is_empty());
    }
    assert_eq!(plan.days[2].schedule.len(), 2);
    assert_eq!(plan.days[0].schedule.len(), 3);
  }

  #[test]
  fn zero_days_gives_empty_but_valid_plan() {
    let plan = assemble_template_plan(&input(0));
    assert!(plan.days.is_empty());
    assert!(plan.is_offline);
    assert_eq!(plan.title, OFFLINE_TITLE);
  }
}
