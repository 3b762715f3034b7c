//! Static topic catalog offered by the form, and the briefing text each topic
//! expands to inside the generation prompt.

use serde::Serialize;

/// Briefing used for topics that are not in the table (custom or renamed ones).
pub const GENERIC_BRIEFING: &str = "Important topic. Emphasis on hands-on practice.";

#[derive(Clone, Debug, Serialize)]
pub struct TopicCategory {
  pub title: &'static str,
  pub topics: Vec<&'static str>,
}

/// (category, topic, briefing)
const TOPICS: &[(&str, &str, &str)] = &[
  // Engineering
  ("Engineering", "Field Fortification: Dugouts and Foxholes",
   "Overhead cover layering. Waterproofing with improvised materials. Digging in fast under aerial observation. Covered trenches."),
  ("Engineering", "Obstacle Construction (Wire)",
   "Low-profile wire entanglements, concertina wire, hasty obstacles. Keeping your own withdrawal route clear."),
  ("Engineering", "Mine Safety",
   "Recognition of mine and unexploded ordnance hazards from inert training aids. Marking and reporting. Rule: if you do not know it, do not touch it."),
  ("Engineering", "Remotely Delivered Mine Awareness",
   "Recognising scattered submunition hazards in grass and on roads. Group actions after an area has been seeded: halt, mark, report, withdraw along the known route."),
  ("Engineering", "Safe Lanes for Infantry",
   "Creating and marking foot lanes with a probe under instructor supervision. Markings visible to friends and hard to spot for an observer."),
  ("Engineering", "Demolition Range Safety",
   "Range organisation, safety distances, misfire drills and the chain of responsibility during supervised demolition training."),
  // Medicine
  ("Medicine", "Self-Aid in the Red Zone",
   "One-handed tourniquet application while lying down. Bleeding control when the medic cannot reach you."),
  ("Medicine", "Casualty Care Under Fire",
   "Dressing with dirty hands. Wound packing. Pain management basics. Evacuation without a stretcher."),
  ("Medicine", "Casualty Movement (Drag Sleds and Straps)",
   "Low crawl evacuation with a drag sled. Pulling a casualty from cover with a strap. Quick moves to a safe area."),
  // Tactics and survival
  ("Tactics", "Thermal Camouflage",
   "How thermal imagers see you. Anti-thermal covers. Using terrain. Why not to look up with an uncovered face."),
  ("Tactics", "Prone Entrenching Under Fire",
   "Digging a single prone position fast. Hiding fresh spoil. Fragment protection."),
  ("Tactics", "Drone-Resistant Overhead Cover",
   "Netting and screens over positions. Protecting dugout entrances. L-shaped entrances."),
  ("Tactics", "Night Operations",
   "Movement at night. Light discipline for radios. Working in pairs in darkness."),
  // Unmanned aircraft
  ("Drones", "Drone Threat Recognition",
   "Hovering behaviour before a drop, characteristic sounds, not running in a straight line, using tree trunks as cover."),
  ("Drones", "Reacting to FPV Attacks",
   "Recognising the approach sound. Sharp last-moment manoeuvre. Going face down to protect legs. Using portable jammers if issued."),
  ("Drones", "Working Under a Spotter Drone",
   "Cooperation with the pilot over the radio. Clear commands: stop, left, clear. The pilot sees surface hazards better than you do."),
  ("Drones", "Acoustic Detection",
   "Telling quadcopters, FPV drones and fixed-wing aircraft apart by sound. Estimating direction and distance."),
  // Communications
  ("Communications", "Radio Discipline and Encryption",
   "Short commands. Call sign tables. Why unencrypted handheld radios are monitored."),
  ("Communications", "Emergency Radio Wipe",
   "Erasing radio configuration and keys when capture is imminent."),
];

/// Prompt briefing for a topic, or the generic placeholder.
pub fn briefing(topic: &str) -> &'static str {
  TOPICS
    .iter()
    .find(|(_, name, _)| *name == topic)
    .map(|(_, _, text)| *text)
    .unwrap_or(GENERIC_BRIEFING)
}

/// Topic catalog grouped by category, in declaration order.
pub fn catalog() -> Vec<TopicCategory> {
  let mut out: Vec<TopicCategory> = Vec::new();
  for &(category, topic, _) in TOPICS {
    match out.iter_mut().find(|c| c.title == category) {
      Some(c) => c.topics.push(topic),
      None => out.push(TopicCategory { title: category, topics: vec![topic] }),
    }
  }
  out
}
