//! The single entry point. Every instruction runs against a private clone of
//! the caller's snapshot and is published as a new `Arc` only when it
//! completes.

use crate::config::EngineConfig;
use crate::tick::{tick, TickInput, TickReport};
use crate::EngineError;
use serde::{Deserialize, Serialize};
use sim_content::ContentTables;
use sim_core::{validate_state, EventCategory, GameLog, GameState, LogKind, RandomSource, SimRng};
use sim_effects::{
    apply_action, roll_job, unlock_skill, ActionOutcome, ActionPayload, SkillOutcome,
};
use sim_events::{default_context, resolve, trigger, Resolution, ResolveOutcome, TriggerOutcome};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    Tick(TickInput),
    Action {
        id: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    TriggerEvent {
        category: EventCategory,
        #[serde(default)]
        id: Option<String>,
    },
    ResolveEvent {
        resolution: Resolution,
    },
    UnlockSkill {
        id: String,
    },
    /// Replace the snapshot. Runtime-only fields are always reset.
    Import(Box<GameState>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Ticked(TickReport),
    Action(ActionOutcome),
    Trigger(TriggerOutcome),
    Resolve(ResolveOutcome),
    Skill(SkillOutcome),
    Imported,
}

impl Outcome {
    /// Whether the instruction left the snapshot as it was.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Outcome::Action(ActionOutcome::Blocked(_))
                | Outcome::Trigger(TriggerOutcome::Dropped | TriggerOutcome::NoEligible)
                | Outcome::Resolve(ResolveOutcome::Rejected(_))
                | Outcome::Skill(SkillOutcome::Blocked(_))
        )
    }
}

#[derive(Clone, Debug)]
pub struct Update {
    pub state: Arc<GameState>,
    pub outcome: Outcome,
}

/// Owns the content, the tuning and the random source. Snapshots are passed
/// in and out; the engine keeps none of them.
pub struct Engine<R: RandomSource = SimRng> {
    content: Arc<ContentTables>,
    config: EngineConfig,
    rng: R,
}

impl Engine<SimRng> {
    pub fn seeded(
        content: Arc<ContentTables>,
        config: EngineConfig,
        seed: u64,
    ) -> Result<Self, EngineError> {
        Self::new(content, config, SimRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> Engine<R> {
    /// Fails when the config is out of range or names events the content
    /// does not define.
    pub fn new(
        content: Arc<ContentTables>,
        config: EngineConfig,
        rng: R,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        for t in &config.suspicion_thresholds {
            content.event(&t.event_id)?;
        }
        Ok(Self {
            content,
            config,
            rng,
        })
    }

    pub fn content(&self) -> &ContentTables {
        &self.content
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Default resources plus the content's starting kit and a first job.
    pub fn new_game(&mut self) -> Arc<GameState> {
        let mut state = GameState {
            log: GameLog::with_capacity(self.config.log_capacity),
            ..GameState::default()
        };
        let kit = self.content.starting();
        state.resources.merge(&kit.resources, 1.0);
        for item in &kit.items {
            state.add_item(item);
            if self.content.is_tool(item) {
                state.tools.entry(item.clone()).or_insert(100.0);
            }
        }
        for seed in &kit.rotables {
            state.append_rotable(&seed.part, seed.condition);
        }
        state.job = roll_job(&self.content, &mut self.rng);
        state.push_log(LogKind::System, "Shift started.");
        info!(
            items = state.inventory.len(),
            rotables = state.rotables.len(),
            "new game"
        );
        Arc::new(state)
    }

    /// Apply one instruction. On `Err` nothing was applied. Blocked and
    /// rejected requests hand back the caller's own snapshot.
    pub fn dispatch(
        &mut self,
        state: &Arc<GameState>,
        instruction: Instruction,
    ) -> Result<Update, EngineError> {
        let mut draft = GameState::clone(state);
        let content = Arc::clone(&self.content);
        let outcome = match instruction {
            Instruction::Tick(input) => Outcome::Ticked(tick(
                &mut draft,
                &content,
                &self.config,
                &input,
                &mut self.rng,
            )?),
            Instruction::Action { id, payload } => Outcome::Action(apply_action(
                &mut draft,
                &content,
                &id,
                &payload,
                &mut self.rng,
            )?),
            Instruction::TriggerEvent { category, id } => Outcome::Trigger(trigger(
                &mut draft,
                &content,
                category,
                id.as_deref(),
                default_context(category),
                &mut self.rng,
            )?),
            Instruction::ResolveEvent { resolution } => {
                Outcome::Resolve(resolve(&mut draft, &content, resolution, &mut self.rng)?)
            }
            Instruction::UnlockSkill { id } => {
                Outcome::Skill(unlock_skill(&mut draft, &content, &id)?)
            }
            Instruction::Import(imported) => {
                draft = *imported;
                draft.reset_runtime();
                draft.normalize();
                info!(level = draft.resources.level, "snapshot imported");
                Outcome::Imported
            }
        };

        if outcome.is_noop() {
            debug!(?outcome, "instruction left the snapshot unchanged");
            return Ok(Update {
                state: Arc::clone(state),
                outcome,
            });
        }
        debug_assert!(
            validate_state(&draft).is_ok(),
            "snapshot invariant violated: {:?}",
            validate_state(&draft)
        );
        Ok(Update {
            state: Arc::new(draft),
            outcome,
        })
    }
}
