//! Content table record types.

use serde::{Deserialize, Serialize};
use sim_core::{Effect, EventCategory, EventChoice, Flag, ResourceDelta, WeightedEffect};
use std::collections::BTreeMap;

/// Where the player currently is. Supplied by the caller on every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    Hangar,
    Apron,
    Office,
    Toolroom,
    Breakroom,
    Archive,
}

impl std::str::FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hangar" => Ok(Location::Hangar),
            "apron" => Ok(Location::Apron),
            "office" => Ok(Location::Office),
            "toolroom" => Ok(Location::Toolroom),
            "breakroom" => Ok(Location::Breakroom),
            "archive" => Ok(Location::Archive),
            other => Err(format!("unknown location: {other}")),
        }
    }
}

/// Rates that unlocked skills may scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKey {
    AutomationYield,
    Degradation,
    SanityDrain,
    FocusDrain,
    SuspicionDrift,
    JobSpeed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    /// Precision tools carry a condition that decays while owned.
    #[serde(default)]
    pub tool: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requires_items: Vec<String>,
    #[serde(default)]
    pub requires_flags: Vec<Flag>,
    #[serde(default)]
    pub requires_story: Vec<String>,
    #[serde(default)]
    pub requires_skills: Vec<String>,
    #[serde(default)]
    pub cost: ResourceDelta,
    /// Evaluated in order; the first entry whose own draw succeeds applies.
    #[serde(default)]
    pub effects: Vec<WeightedEffect>,
    #[serde(default)]
    pub failure_effect: Option<Effect>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub category: EventCategory,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub choices: Vec<EventChoice>,
    #[serde(default)]
    pub success_outcome: Option<Effect>,
    #[serde(default)]
    pub failure_outcome: Option<Effect>,
    #[serde(default)]
    pub requires_flags: Vec<Flag>,
    #[serde(default)]
    pub requires_story: Vec<String>,
    #[serde(default)]
    pub forbids_story: Vec<String>,
    #[serde(default)]
    pub requires_items: Vec<String>,
    /// Only reachable by explicit id (chains, configured thresholds), never
    /// by a random pick within the category.
    #[serde(default)]
    pub chain_only: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub multipliers: BTreeMap<RateKey, f64>,
    /// Granted for free on reaching this level.
    #[serde(default)]
    pub auto_unlock_level: Option<u32>,
}

/// An unattended delegated task that produces resources while enabled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub per_second: ResourceDelta,
    #[serde(default)]
    pub audit_chance_per_sec: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub id: String,
    pub title: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub reward: ResourceDelta,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MailTemplate {
    pub id: String,
    pub sender: String,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationTrigger {
    pub category: EventCategory,
    pub probability_per_sec: f64,
}

/// Environmental pressure applied while the player is at a location.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationProfile {
    pub suspicion_per_sec: f64,
    pub fatigue_per_sec: f64,
    pub social_stress_target: Option<f64>,
    pub temperature_target: Option<f64>,
    pub noise_target: Option<f64>,
    pub light_target: Option<f64>,
    pub triggers: Vec<LocationTrigger>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotableSeed {
    pub part: String,
    pub condition: f64,
}

/// Contents of a new game beyond the default resource values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingKit {
    pub resources: ResourceDelta,
    pub items: Vec<String>,
    pub rotables: Vec<RotableSeed>,
}
