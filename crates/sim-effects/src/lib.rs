#![deny(warnings)]

//! Player actions: precondition gates, independent-draw effect selection and
//! application of typed effect bundles.
//!
//! An action either applies exactly one effect (or its failure effect, or a
//! neutral outcome) and logs exactly once, or it is blocked and the snapshot
//! is left untouched. [`apply_effect`] is shared with the event arbitrator.

mod apply;
mod jobs;
mod skills;

pub use apply::{apply_effect, apply_side_effect};
pub use jobs::roll_job;
pub use skills::{grant_milestone_skills, unlock_skill, SkillOutcome};

use serde::{Deserialize, Serialize};
use sim_content::{ActionDef, ContentError, ContentTables};
use sim_core::{
    Effect, Flag, GameState, LogEntry, LogKind, RandomSource, ResourceKey, TargetKind,
    ToolroomStatus, WeightedEffect,
};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Caller-supplied action arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Rotable or mail id (decimal), or tool item id.
    #[serde(default)]
    pub target: Option<String>,
}

impl ActionPayload {
    pub fn target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
        }
    }
}

/// Why an action or purchase was refused. Blocked requests never mutate.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BlockReason {
    #[error("requires item {0}")]
    MissingItem(String),
    #[error("requires flag {0:?}")]
    MissingFlag(Flag),
    #[error("requires story flag {0}")]
    MissingStory(String),
    #[error("requires skill {0}")]
    MissingSkill(String),
    #[error("cannot afford {key:?}: need {required}, have {available}")]
    Unaffordable {
        key: ResourceKey,
        required: f64,
        available: f64,
    },
    #[error("action needs a {0:?} target")]
    MissingTarget(TargetKind),
    #[error("no {kind:?} matches target {target}")]
    InvalidTarget { kind: TargetKind, target: String },
    #[error("toolroom is {0:?}")]
    ToolroomUnavailable(ToolroomStatus),
    #[error("skill {0} is already unlocked")]
    AlreadyUnlocked(String),
    #[error("need {required} skill points, have {available}")]
    InsufficientSkillPoints { required: u32, available: u32 },
}

/// Which branch of an action applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Index into the action's weighted effects.
    Effect(usize),
    /// Every draw failed and the failure effect applied.
    Failure,
    /// Every draw failed and there was no failure effect.
    Neutral,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    Applied { selection: Selection, log: LogEntry },
    Blocked(BlockReason),
}

/// Evaluate weighted effects in order, one independent draw each, and return
/// the first whose draw falls under its chance. Draws stop at the first hit.
pub fn select_effect(effects: &[WeightedEffect], rng: &mut dyn RandomSource) -> Option<usize> {
    effects
        .iter()
        .position(|weighted| rng.next_f64() < weighted.chance)
}

fn check_target(
    state: &GameState,
    kind: TargetKind,
    target: Option<&str>,
) -> Result<(), BlockReason> {
    let target = target.ok_or(BlockReason::MissingTarget(kind))?;
    if kind == TargetKind::Tool && state.toolroom != ToolroomStatus::Open {
        return Err(BlockReason::ToolroomUnavailable(state.toolroom));
    }
    let found = match kind {
        TargetKind::Rotable => target
            .parse::<u64>()
            .ok()
            .and_then(|id| state.rotable(id))
            .is_some(),
        TargetKind::Mail => target
            .parse::<u64>()
            .ok()
            .is_some_and(|id| state.mail.iter().any(|m| m.id == id)),
        TargetKind::Tool => state.has_item(target) && state.tools.contains_key(target),
    };
    if found {
        Ok(())
    } else {
        Err(BlockReason::InvalidTarget {
            kind,
            target: target.to_string(),
        })
    }
}

/// Gate order: items, flags, story flags, skills, cost, target.
pub fn check_preconditions(
    state: &GameState,
    action: &ActionDef,
    payload: &ActionPayload,
) -> Result<(), BlockReason> {
    if let Some(item) = action.requires_items.iter().find(|i| !state.has_item(i)) {
        return Err(BlockReason::MissingItem(item.clone()));
    }
    if let Some(flag) = action
        .requires_flags
        .iter()
        .find(|f| !state.flags.is_set(**f))
    {
        return Err(BlockReason::MissingFlag(*flag));
    }
    if let Some(story) = action
        .requires_story
        .iter()
        .find(|s| !state.flags.has_story(s))
    {
        return Err(BlockReason::MissingStory(story.clone()));
    }
    if let Some(skill) = action
        .requires_skills
        .iter()
        .find(|s| !state.proficiency.contains(*s))
    {
        return Err(BlockReason::MissingSkill(skill.clone()));
    }
    for (key, required) in &action.cost {
        let available = state.resources.get(*key);
        if available < *required {
            return Err(BlockReason::Unaffordable {
                key: *key,
                required: *required,
                available,
            });
        }
    }
    let kinds: BTreeSet<_> = action
        .effects
        .iter()
        .map(|w| &w.effect)
        .chain(&action.failure_effect)
        .filter_map(|e| e.side_effect.as_ref()?.target())
        .collect();
    for kind in kinds {
        check_target(state, kind, payload.target.as_deref())?;
    }
    Ok(())
}

/// Run `action_id` against the draft `state`.
///
/// Unknown ids are a [`ContentError`]. A failed precondition returns
/// [`ActionOutcome::Blocked`] without consuming randomness or touching state.
pub fn apply_action(
    state: &mut GameState,
    content: &ContentTables,
    action_id: &str,
    payload: &ActionPayload,
    rng: &mut dyn RandomSource,
) -> Result<ActionOutcome, ContentError> {
    let action = content.action(action_id)?;
    if let Err(reason) = check_preconditions(state, action, payload) {
        debug!(action = action_id, %reason, "action blocked");
        return Ok(ActionOutcome::Blocked(reason));
    }
    state.resources.pay(&action.cost);

    let neutral;
    let (selection, effect) = match select_effect(&action.effects, rng) {
        Some(i) => (Selection::Effect(i), &action.effects[i].effect),
        None => match &action.failure_effect {
            Some(failure) => (Selection::Failure, failure),
            None => {
                neutral = Effect {
                    log: format!("{}: nothing came of it.", action.name),
                    log_kind: LogKind::Info,
                    ..Default::default()
                };
                (Selection::Neutral, &neutral)
            }
        },
    };
    let log = apply_effect(state, content, effect, payload.target.as_deref(), 1.0, rng);
    debug!(action = action_id, ?selection, "action applied");
    Ok(ActionOutcome::Applied { selection, log })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{ScriptedRng, SimRng};

    const FIXTURE: &str = r#"
items:
  - { id: torque_wrench, name: Torque wrench, tool: true }
  - { id: safety_wire, name: Safety wire }
skills:
  - { id: steady_hands, name: Steady hands, cost: 1, multipliers: { degradation: 0.5 } }
  - { id: shop_foreman, name: Shop foreman, cost: 2, requires: [steady_hands] }
  - { id: crew_chief, name: Crew chief, auto_unlock_level: 3 }
automations:
  - { id: night_crew, name: Night crew, per_second: { alclad: 4 } }
jobs:
  - { id: borescope, title: Borescope inspection, duration_ms: 60000, reward: { credits: 40 } }
  - { id: brake_swap, title: Brake swap, duration_ms: 90000, reward: { credits: 60 } }
actions:
  - id: engine_run_up
    name: Engine run-up
    cost: { focus: 10 }
    effects:
      - chance: 0.5
        effect: { resources: { credits: 10 }, log: Clean run-up. }
      - chance: 0.5
        effect: { resources: { sanity: -5 }, log: Something rattles in the cowling. }
    failure_effect: { resources: { suspicion: 2 }, log: The engine would not catch. }
  - id: calibrate
    name: Calibrate torque
    requires_items: [torque_wrench]
    requires_skills: [steady_hands]
    cost: { focus: 5 }
    effects:
      - chance: 1.0
        effect: { log: Calibrated. }
  - id: recalibrate
    name: Recalibrate a tool
    effects:
      - chance: 1.0
        effect: { side_effect: { kind: restore_tool, amount: 25 }, log: Recalibrated. }
  - id: overhaul
    name: Overhaul rotable
    effects:
      - chance: 1.0
        effect:
          side_effect: { kind: repair_rotable, amount: 30 }
          log: Overhauled.
  - id: loiter
    name: Loiter
    effects:
      - chance: 0.0
        effect: { log: unreachable }
"#;

    pub(crate) fn fixture() -> ContentTables {
        ContentTables::from_yaml_str(FIXTURE).unwrap()
    }

    #[test]
    fn low_draw_applies_first_effect() {
        let content = fixture();
        let mut state = GameState::default();
        let mut rng = ScriptedRng::new([0.1, 0.95]);
        let out = apply_action(
            &mut state,
            &content,
            "engine_run_up",
            &ActionPayload::default(),
            &mut rng,
        )
        .unwrap();
        let ActionOutcome::Applied { selection, log } = out else {
            panic!("expected applied, got {out:?}");
        };
        assert_eq!(selection, Selection::Effect(0));
        assert_eq!(log.text, "Clean run-up.");
        assert_eq!(rng.consumed(), 1);
        assert_eq!(state.resources.credits, 10.0);
        assert_eq!(state.resources.focus, 90.0);
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn failed_draws_fall_through_to_failure_effect() {
        let content = fixture();
        let mut state = GameState::default();
        let mut rng = ScriptedRng::new([0.9, 0.9]);
        let out = apply_action(
            &mut state,
            &content,
            "engine_run_up",
            &ActionPayload::default(),
            &mut rng,
        )
        .unwrap();
        assert!(matches!(
            out,
            ActionOutcome::Applied {
                selection: Selection::Failure,
                ..
            }
        ));
        assert_eq!(state.resources.suspicion, 2.0);
        assert_eq!(state.resources.credits, 0.0);
        assert_eq!(state.resources.sanity, 100.0);
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn no_failure_effect_is_neutral_but_still_logged() {
        let content = fixture();
        let mut state = GameState::default();
        let out = apply_action(
            &mut state,
            &content,
            "loiter",
            &ActionPayload::default(),
            &mut ScriptedRng::new([0.0]),
        )
        .unwrap();
        let ActionOutcome::Applied { selection, log } = out else {
            panic!("expected applied");
        };
        assert_eq!(selection, Selection::Neutral);
        assert_eq!(log.text, "Loiter: nothing came of it.");
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn gates_are_checked_in_order_without_mutation() {
        let content = fixture();
        let mut state = GameState::default();
        state.resources.focus = 1.0;
        let before = state.clone();
        let mut rng = ScriptedRng::new([]);
        let payload = ActionPayload::default();

        let out = apply_action(&mut state, &content, "calibrate", &payload, &mut rng).unwrap();
        assert_eq!(
            out,
            ActionOutcome::Blocked(BlockReason::MissingItem("torque_wrench".to_string()))
        );
        state.add_item("torque_wrench");
        let out = apply_action(&mut state, &content, "calibrate", &payload, &mut rng).unwrap();
        assert_eq!(
            out,
            ActionOutcome::Blocked(BlockReason::MissingSkill("steady_hands".to_string()))
        );
        state.proficiency.insert("steady_hands".to_string());
        let out = apply_action(&mut state, &content, "calibrate", &payload, &mut rng).unwrap();
        assert_eq!(
            out,
            ActionOutcome::Blocked(BlockReason::Unaffordable {
                key: ResourceKey::Focus,
                required: 5.0,
                available: 1.0
            })
        );
        assert_eq!(rng.consumed(), 0);
        assert_eq!(state.resources, before.resources);
        assert!(state.log.is_empty());
    }

    #[test]
    fn targeted_actions_need_a_live_target() {
        let content = fixture();
        let mut state = GameState::default();
        let mut rng = ScriptedRng::new([0.0, 0.0]);
        let none = ActionPayload::default();
        let out = apply_action(&mut state, &content, "overhaul", &none, &mut rng).unwrap();
        assert_eq!(
            out,
            ActionOutcome::Blocked(BlockReason::MissingTarget(TargetKind::Rotable))
        );
        let stale = ActionPayload::target("7");
        let out = apply_action(&mut state, &content, "overhaul", &stale, &mut rng).unwrap();
        assert!(matches!(
            out,
            ActionOutcome::Blocked(BlockReason::InvalidTarget { .. })
        ));

        let id = state.append_rotable("hydraulic pump", 40.0);
        let out = apply_action(
            &mut state,
            &content,
            "overhaul",
            &ActionPayload::target(id.to_string()),
            &mut rng,
        )
        .unwrap();
        assert!(matches!(out, ActionOutcome::Applied { .. }));
        assert_eq!(state.rotable(id).map(|r| r.condition), Some(70.0));
    }

    #[test]
    fn tool_restoration_needs_an_open_toolroom() {
        let content = fixture();
        let mut state = GameState::default();
        state.add_item("torque_wrench");
        state.tools.insert("torque_wrench".to_string(), 50.0);
        state.toolroom = ToolroomStatus::Quarantined;
        let payload = ActionPayload::target("torque_wrench");
        let mut rng = ScriptedRng::new([0.0]);
        let before = state.clone();
        let out = apply_action(&mut state, &content, "recalibrate", &payload, &mut rng).unwrap();
        assert_eq!(
            out,
            ActionOutcome::Blocked(BlockReason::ToolroomUnavailable(ToolroomStatus::Quarantined))
        );
        assert_eq!(state, before);
        assert_eq!(rng.consumed(), 0);

        state.toolroom = ToolroomStatus::Open;
        let out = apply_action(&mut state, &content, "recalibrate", &payload, &mut rng).unwrap();
        assert!(matches!(out, ActionOutcome::Applied { .. }));
        assert_eq!(state.tools.get("torque_wrench"), Some(&75.0));
    }

    #[test]
    fn unknown_action_is_a_content_error() {
        let content = fixture();
        let mut state = GameState::default();
        let err = apply_action(
            &mut state,
            &content,
            "teleport",
            &ActionPayload::default(),
            &mut ScriptedRng::new([]),
        )
        .unwrap_err();
        assert_eq!(err, ContentError::UnknownAction("teleport".to_string()));
    }

    proptest! {
        #[test]
        fn same_seed_same_outcome(seed in any::<u64>()) {
            let content = fixture();
            let run = |seed| {
                let mut state = GameState::default();
                let mut rng = SimRng::seed_from_u64(seed);
                for _ in 0..5 {
                    let payload = ActionPayload::default();
                    apply_action(&mut state, &content, "engine_run_up", &payload, &mut rng)
                        .unwrap();
                }
                state
            };
            prop_assert_eq!(run(seed), run(seed));
        }

        #[test]
        fn selection_is_first_success(draws in proptest::collection::vec(0.0f64..1.0, 2)) {
            let content = fixture();
            let action = content.action("engine_run_up").unwrap();
            let picked = select_effect(&action.effects, &mut ScriptedRng::new(draws.clone()));
            let expected = draws.iter().position(|d| *d < 0.5);
            prop_assert_eq!(picked, expected);
        }
    }
}
