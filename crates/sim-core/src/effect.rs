//! Declarative effect bundles shared by actions and events.
//!
//! Effects are plain data. Anything that touches state outside the
//! resource/flag/inventory triad is expressed as one [`SideEffect`] variant
//! rather than as code.

use crate::entities::ToolroomStatus;
use crate::flags::{Flag, TimerKind};
use crate::log::LogKind;
use crate::resources::ResourceDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Add or remove exactly one unit of an inventory item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemChange {
    Add { item: String },
    Remove { item: String },
}

impl ItemChange {
    pub fn item(&self) -> &str {
        match self {
            ItemChange::Add { item } | ItemChange::Remove { item } => item,
        }
    }
}

/// Which entity a targeted side effect expects in the action payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetKind {
    Rotable,
    Tool,
    Mail,
}

/// Closed set of mutations outside the standard resource/flag/inventory triad.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    AdjustPet {
        #[serde(default)]
        hunger: f64,
        #[serde(default)]
        affection: f64,
    },
    AppendRotable {
        part: String,
        condition: f64,
    },
    /// Targets a rotable by id.
    RepairRotable { amount: f64 },
    /// Targets a rotable by id.
    ScrapRotable,
    SetProcurementTier { tier: u8 },
    PlaceOrder { item: String, eta_ms: f64 },
    ToggleAutomation { automation: String, enabled: bool },
    /// Targets a tool by id.
    RestoreTool { amount: f64 },
    SetToolroomStatus { status: ToolroomStatus },
    /// Pays the active job's reward and rolls a new job.
    CompleteJob,
    /// Targets a mail message by id.
    ReadMail,
    BeginScenario { scenario: String },
    EndScenario,
    StartMinigame { minigame: String },
}

impl SideEffect {
    /// The payload target this side effect requires, if any.
    pub fn target(&self) -> Option<TargetKind> {
        match self {
            SideEffect::RepairRotable { .. } | SideEffect::ScrapRotable => {
                Some(TargetKind::Rotable)
            }
            SideEffect::RestoreTool { .. } => Some(TargetKind::Tool),
            SideEffect::ReadMail => Some(TargetKind::Mail),
            _ => None,
        }
    }
}

/// One outcome: resource deltas, flag switches, timer grants, at most one
/// inventory change, an optional story flag, an optional side effect and the
/// log text written when it applies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effect {
    pub resources: ResourceDelta,
    /// Untimed flags only; timed flags are switched on through `timers`.
    pub flags: BTreeMap<Flag, bool>,
    /// Grants a countdown (ms) and switches on its paired flag.
    pub timers: BTreeMap<TimerKind, f64>,
    pub item: Option<ItemChange>,
    pub story_flag: Option<String>,
    pub side_effect: Option<SideEffect>,
    pub log: String,
    pub log_kind: LogKind,
}

/// An effect guarded by an independent success chance in [0,1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedEffect {
    pub chance: f64,
    pub effect: Effect,
}

/// A player choice attached to an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub cost: ResourceDelta,
    #[serde(default)]
    pub effect: Effect,
    /// When present the choice is rolled; a failed roll applies the event's
    /// failure outcome instead of `effect`.
    #[serde(default)]
    pub success_chance: Option<f64>,
    /// Follow-up event instantiated in the same update.
    #[serde(default)]
    pub next_event_id: Option<String>,
}
