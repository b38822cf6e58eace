//! Applying an [`Effect`] bundle to a draft snapshot.

use crate::jobs::roll_job;
use sim_content::ContentTables;
use sim_core::{
    Effect, GameState, ItemChange, LogEntry, MinigameState, ProcurementOrder, RandomSource,
    SideEffect,
};
use tracing::{debug, warn};

/// Merge `effect` into `state` and append exactly one log entry.
///
/// Resource deltas are multiplied by `scale`. `target` is the payload target
/// for side effects that need one; callers validate it beforehand.
pub fn apply_effect(
    state: &mut GameState,
    content: &ContentTables,
    effect: &Effect,
    target: Option<&str>,
    scale: f64,
    rng: &mut dyn RandomSource,
) -> LogEntry {
    state.resources.merge(&effect.resources, scale);
    for (flag, on) in &effect.flags {
        state.flags.set(*flag, *on);
    }
    for (timer, ms) in &effect.timers {
        state.grant_timer(*timer, *ms);
    }
    match &effect.item {
        Some(ItemChange::Add { item }) => {
            state.add_item(item);
            if content.is_tool(item) {
                state.tools.entry(item.clone()).or_insert(100.0);
            }
        }
        Some(ItemChange::Remove { item }) => {
            if !state.remove_item(item) {
                debug!(item = %item, "remove requested for an item that is not held");
            }
        }
        None => {}
    }
    if let Some(story) = &effect.story_flag {
        state.flags.story.insert(story.clone());
    }
    let override_text = effect
        .side_effect
        .as_ref()
        .and_then(|side| apply_side_effect(state, content, side, target, rng));
    let text = override_text.unwrap_or_else(|| effect.log.clone());
    state.push_log(effect.log_kind, text)
}

/// Run one typed side effect. Returns replacement log text when the outcome
/// depends on data the static text cannot know.
pub fn apply_side_effect(
    state: &mut GameState,
    content: &ContentTables,
    side: &SideEffect,
    target: Option<&str>,
    rng: &mut dyn RandomSource,
) -> Option<String> {
    match side {
        SideEffect::AdjustPet { hunger, affection } => {
            let pet = &mut state.pet;
            pet.hunger = (pet.hunger + hunger).clamp(0.0, 100.0);
            pet.affection = (pet.affection + affection).clamp(0.0, 100.0);
            None
        }
        SideEffect::AppendRotable { part, condition } => {
            let id = state.append_rotable(part, *condition);
            Some(format!("Installed {part} (S/N {id})."))
        }
        SideEffect::RepairRotable { amount } => {
            let rotable = target
                .and_then(|t| t.parse::<u64>().ok())
                .and_then(|id| state.rotable_mut(id))?;
            rotable.condition = (rotable.condition + amount).clamp(0.0, 100.0);
            rotable.red_tagged = false;
            Some(format!(
                "{} (S/N {}) restored to {:.0}%.",
                rotable.part, rotable.id, rotable.condition
            ))
        }
        SideEffect::ScrapRotable => {
            let id = target.and_then(|t| t.parse::<u64>().ok())?;
            let idx = state.rotables.iter().position(|r| r.id == id)?;
            let removed = state.rotables.remove(idx);
            Some(format!("{} (S/N {}) scrapped.", removed.part, removed.id))
        }
        SideEffect::SetProcurementTier { tier } => {
            state.procurement_tier = *tier;
            None
        }
        SideEffect::PlaceOrder { item, eta_ms } => {
            // Each procurement tier divides the lead time.
            let eta_ms = eta_ms.max(0.0) / f64::from(state.procurement_tier.max(1));
            let id = state.next_order_id;
            state.next_order_id += 1;
            state.orders.push(ProcurementOrder {
                id,
                item: item.clone(),
                eta_ms,
            });
            let name = content.item(item).map(|i| i.name.as_str()).unwrap_or(item.as_str());
            Some(format!("Order #{id} placed: {name}."))
        }
        SideEffect::ToggleAutomation {
            automation,
            enabled,
        } => {
            if *enabled {
                state.flags.automations.insert(automation.clone());
            } else {
                state.flags.automations.remove(automation);
            }
            None
        }
        SideEffect::RestoreTool { amount } => {
            let condition = target.and_then(|t| state.tools.get_mut(t))?;
            *condition = (*condition + amount).clamp(0.0, 100.0);
            None
        }
        SideEffect::SetToolroomStatus { status } => {
            state.toolroom = *status;
            None
        }
        SideEffect::CompleteJob => {
            let job = state.job.take()?;
            state.resources.merge(&job.reward, 1.0);
            state.job = roll_job(content, rng);
            Some(format!("Job signed off: {}.", job.title))
        }
        SideEffect::ReadMail => {
            let id = target.and_then(|t| t.parse::<u64>().ok())?;
            match state.mail.iter_mut().find(|m| m.id == id) {
                Some(mail) => mail.read = true,
                None => warn!(id, "read requested for missing mail"),
            }
            None
        }
        SideEffect::BeginScenario { scenario } => {
            state.runtime.active_scenario = Some(scenario.clone());
            None
        }
        SideEffect::EndScenario => {
            state.runtime.active_scenario = None;
            None
        }
        SideEffect::StartMinigame { minigame } => {
            state.runtime.minigame = Some(MinigameState {
                kind: minigame.clone(),
                progress: 0.0,
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixture;
    use sim_core::{Flag, LogKind, ResourceKey, ScriptedRng, TimerKind, ToolroomStatus};

    #[test]
    fn merges_resources_flags_timers_and_items() {
        let content = fixture();
        let mut state = GameState::default();
        let effect = Effect {
            resources: [(ResourceKey::Credits, 12.0), (ResourceKey::Sanity, -150.0)]
                .into_iter()
                .collect(),
            flags: [(Flag::NightShift, true)].into_iter().collect(),
            timers: [(TimerKind::Hallucination, 3000.0)].into_iter().collect(),
            item: Some(ItemChange::Add {
                item: "torque_wrench".to_string(),
            }),
            story_flag: Some("met_the_night_lead".to_string()),
            log: "A long night.".to_string(),
            log_kind: LogKind::Story,
            ..Default::default()
        };
        let mut rng = ScriptedRng::new([]);
        let entry = apply_effect(&mut state, &content, &effect, None, 1.0, &mut rng);
        assert_eq!(entry.text, "A long night.");
        assert_eq!(entry.kind, LogKind::Story);
        assert_eq!(state.resources.credits, 12.0);
        assert_eq!(state.resources.sanity, 0.0);
        assert!(state.flags.is_set(Flag::NightShift));
        assert!(state.flags.is_set(Flag::Hallucinating));
        assert_eq!(state.item_count("torque_wrench"), 1);
        assert_eq!(state.tools.get("torque_wrench"), Some(&100.0));
        assert!(state.flags.has_story("met_the_night_lead"));
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn scale_multiplies_resource_deltas_only() {
        let content = fixture();
        let mut state = GameState::default();
        let effect = Effect {
            resources: [(ResourceKey::Suspicion, 10.0)].into_iter().collect(),
            timers: [(TimerKind::Fear, 1000.0)].into_iter().collect(),
            ..Default::default()
        };
        apply_effect(&mut state, &content, &effect, None, 3.0, &mut ScriptedRng::new([]));
        assert_eq!(state.resources.suspicion, 30.0);
        assert_eq!(state.hf.timer(TimerKind::Fear), 1000.0);
    }

    #[test]
    fn rotable_side_effects_use_the_target() {
        let content = fixture();
        let mut state = GameState::default();
        let id = state.append_rotable("bleed air valve", 20.0);
        state.rotables[0].red_tagged = true;
        let mut rng = ScriptedRng::new([]);
        let target = id.to_string();
        let text = apply_side_effect(
            &mut state,
            &content,
            &SideEffect::RepairRotable { amount: 50.0 },
            Some(&target),
            &mut rng,
        );
        assert_eq!(text.as_deref(), Some("bleed air valve (S/N 0) restored to 70%."));
        assert!(!state.rotables[0].red_tagged);

        apply_side_effect(&mut state, &content, &SideEffect::ScrapRotable, Some(&target), &mut rng);
        assert!(state.rotables.is_empty());
    }

    #[test]
    fn complete_job_pays_and_rolls_a_new_one() {
        let content = fixture();
        let mut state = GameState::default();
        let mut rng = ScriptedRng::new([0.0, 0.0]);
        state.job = roll_job(&content, &mut rng);
        let reward = state.job.as_ref().map(|j| j.reward.clone()).unwrap_or_default();
        let side = SideEffect::CompleteJob;
        let text = apply_side_effect(&mut state, &content, &side, None, &mut rng);
        assert!(text.unwrap().starts_with("Job signed off"));
        assert_eq!(
            state.resources.credits,
            reward.get(&ResourceKey::Credits).copied().unwrap_or(0.0)
        );
        assert!(state.job.is_some());
    }

    #[test]
    fn simple_side_effects_replace_their_slot() {
        let content = fixture();
        let mut state = GameState::default();
        let mut rng = ScriptedRng::new([]);
        for side in [
            SideEffect::SetProcurementTier { tier: 2 },
            SideEffect::SetToolroomStatus {
                status: ToolroomStatus::Quarantined,
            },
            SideEffect::ToggleAutomation {
                automation: "night_crew".to_string(),
                enabled: true,
            },
            SideEffect::AdjustPet {
                hunger: -50.0,
                affection: 80.0,
            },
            SideEffect::BeginScenario {
                scenario: "the_long_taxi".to_string(),
            },
            SideEffect::StartMinigame {
                minigame: "safety_wiring".to_string(),
            },
            SideEffect::PlaceOrder {
                item: "safety_wire".to_string(),
                eta_ms: 5000.0,
            },
        ] {
            apply_side_effect(&mut state, &content, &side, None, &mut rng);
        }
        assert_eq!(state.procurement_tier, 2);
        assert_eq!(state.toolroom, ToolroomStatus::Quarantined);
        assert!(state.flags.automation_enabled("night_crew"));
        assert_eq!(state.pet.hunger, 0.0);
        assert_eq!(state.pet.affection, 100.0);
        assert_eq!(state.runtime.active_scenario.as_deref(), Some("the_long_taxi"));
        assert_eq!(
            state.runtime.minigame.as_ref().map(|m| m.kind.as_str()),
            Some("safety_wiring")
        );
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.orders[0].eta_ms, 2500.0);

        apply_side_effect(&mut state, &content, &SideEffect::EndScenario, None, &mut rng);
        assert!(state.runtime.active_scenario.is_none());
    }

    #[test]
    fn untiered_orders_keep_their_lead_time() {
        let content = fixture();
        let mut state = GameState::default();
        let order = SideEffect::PlaceOrder {
            item: "safety_wire".to_string(),
            eta_ms: 6000.0,
        };
        apply_side_effect(&mut state, &content, &order, None, &mut ScriptedRng::new([]));
        state.procurement_tier = 3;
        apply_side_effect(&mut state, &content, &order, None, &mut ScriptedRng::new([]));
        let etas: Vec<f64> = state.orders.iter().map(|o| o.eta_ms).collect();
        assert_eq!(etas, [6000.0, 2000.0]);
    }
}
