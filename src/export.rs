//! Plain-text exports of a plan (for pasting into messengers) and the exam
//! deck built from its control questions.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{ModuleType, QuizItem, TrainingDay, TrainingPlanResponse};

fn place(module_type: ModuleType) -> &'static str {
  match module_type {
    ModuleType::Practice => "Range",
    ModuleType::Theory | ModuleType::Drill => "Classroom",
  }
}

/// Short summary of one day: header, safety line, one line per module.
pub fn day_to_text(day: &TrainingDay) -> String {
  let mut lines = vec![
    format!("DAY {} | {}", day.day_number, day.theme.to_uppercase()),
    format!("SAFETY: {}", day.safety_notes),
  ];
  lines.extend(
    day.schedule
      .iter()
      .map(|m| format!("- {} | {} ({})", m.time, m.subject, place(m.module_type))),
  );
  lines.join("\n")
}

pub fn plan_to_text(plan: &TrainingPlanResponse) -> String {
  let mut out = format!(
    "TRAINING PLAN: {}\n\n{}\n\n====================\n",
    plan.title.to_uppercase(),
    plan.overview
  );
  for day in &plan.days {
    out.push('\n');
    out.push_str(&day_to_text(day));
    out.push('\n');
  }
  out
}

/// Every control question of the plan, in random order.
pub fn exam_deck<R: Rng + ?Sized>(plan: &TrainingPlanResponse, rng: &mut R) -> Vec<QuizItem> {
  let mut deck: Vec<QuizItem> = plan
    .days
    .iter()
    .flat_map(|d| d.schedule.iter())
    .flat_map(|m| m.questions.iter().cloned())
    .collect();
  deck.shuffle(rng);
  deck
}
