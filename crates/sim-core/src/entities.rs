//! Secondary entities owned by the snapshot: the active event and job,
//! rotables, mail, procurement, the pet and the toolroom.

use crate::effect::{Effect, EventChoice};
use crate::resources::ResourceDelta;
use serde::{Deserialize, Serialize};

/// Event categories. Each category carries its own [`EventContext`] shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Audit,
    Incident,
    Anomaly,
    Component,
    Social,
    Story,
}

/// Typed per-category data attached to an event instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventContext {
    #[default]
    General,
    /// Failure deltas are multiplied by `tier`.
    Audit { tier: u8 },
    /// Failure red-tags the referenced rotable.
    Component { rotable_id: u64 },
}

/// The single in-progress narrative interruption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub category: EventCategory,
    pub id: String,
    pub title: String,
    pub description: String,
    pub total_time_ms: f64,
    pub time_left_ms: f64,
    pub choices: Vec<EventChoice>,
    pub success_outcome: Option<Effect>,
    pub failure_outcome: Option<Effect>,
    pub context: EventContext,
}

impl ActiveEvent {
    pub fn choice(&self, id: &str) -> Option<&EventChoice> {
        self.choices.iter().find(|c| c.id == id)
    }
}

/// Work order countdown. Replaced, never cleared, when it expires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub template_id: String,
    pub title: String,
    pub total_ms: f64,
    pub time_left_ms: f64,
    pub reward: ResourceDelta,
}

/// A serialized component with a decaying condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotable {
    pub id: u64,
    pub part: String,
    /// In [0,100].
    pub condition: f64,
    pub red_tagged: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: u64,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub received_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcurementOrder {
    pub id: u64,
    pub item: String,
    pub eta_ms: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub name: String,
    pub hunger: f64,
    pub affection: f64,
}

impl Default for Pet {
    fn default() -> Self {
        Self {
            name: "Rivet".to_string(),
            hunger: 20.0,
            affection: 50.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolroomStatus {
    #[default]
    Open,
    Closed,
    Quarantined,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinigameState {
    pub kind: String,
    pub progress: f64,
}
