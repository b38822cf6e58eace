//! Cross-reference and range checks over a fully merged set of tables.

use crate::{ContentError, ContentTables, EventTemplate};
use sim_core::{Effect, EventCategory, SideEffect, TargetKind};

fn check_finite(context: &str, value: f64) -> Result<(), ContentError> {
    if !value.is_finite() {
        return Err(ContentError::InvalidValue {
            context: context.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_positive(context: &str, value: f64) -> Result<(), ContentError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ContentError::InvalidValue {
            context: context.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_chance(context: &str, value: f64) -> Result<(), ContentError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ContentError::InvalidChance {
            context: context.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_item(tables: &ContentTables, context: &str, item: &str) -> Result<(), ContentError> {
    if tables.items.contains_key(item) {
        Ok(())
    } else {
        Err(ContentError::UnknownItem {
            context: context.to_string(),
            id: item.to_string(),
        })
    }
}

fn check_skill(tables: &ContentTables, context: &str, skill: &str) -> Result<(), ContentError> {
    if tables.skills.contains_key(skill) {
        Ok(())
    } else {
        Err(ContentError::UnknownSkill {
            context: context.to_string(),
            id: skill.to_string(),
        })
    }
}

fn check_event(tables: &ContentTables, context: &str, event: &str) -> Result<(), ContentError> {
    if tables.events.contains_key(event) {
        Ok(())
    } else {
        Err(ContentError::UnknownEvent {
            context: context.to_string(),
            id: event.to_string(),
        })
    }
}

/// Events have no payload. The only target one can supply is the rotable of
/// a component event's context.
fn check_event_target(
    event: &EventTemplate,
    context: &str,
    effect: &Effect,
) -> Result<(), ContentError> {
    let Some(kind) = effect.side_effect.as_ref().and_then(SideEffect::target) else {
        return Ok(());
    };
    if event.category == EventCategory::Component && kind == TargetKind::Rotable {
        return Ok(());
    }
    Err(ContentError::UntargetableSideEffect {
        context: context.to_string(),
        kind,
    })
}

fn check_effect(
    tables: &ContentTables,
    context: &str,
    effect: &Effect,
) -> Result<(), ContentError> {
    for amount in effect.resources.values() {
        check_finite(context, *amount)?;
    }
    for flag in effect.flags.keys() {
        if flag.is_timed() {
            return Err(ContentError::TimedFlagInModifiers {
                context: context.to_string(),
                flag: format!("{flag:?}"),
            });
        }
    }
    for ms in effect.timers.values() {
        check_positive(context, *ms)?;
    }
    if let Some(change) = &effect.item {
        check_item(tables, context, change.item())?;
    }
    match &effect.side_effect {
        Some(SideEffect::AdjustPet { hunger, affection }) => {
            check_finite(context, *hunger)?;
            check_finite(context, *affection)?;
        }
        Some(SideEffect::AppendRotable { condition, .. }) => check_finite(context, *condition)?,
        Some(SideEffect::RepairRotable { amount }) | Some(SideEffect::RestoreTool { amount }) => {
            check_finite(context, *amount)?
        }
        Some(SideEffect::PlaceOrder { item, eta_ms }) => {
            check_item(tables, context, item)?;
            check_finite(context, *eta_ms)?;
        }
        Some(SideEffect::ToggleAutomation { automation, .. }) => {
            if !tables.automations.contains_key(automation) {
                return Err(ContentError::UnknownAutomation {
                    context: context.to_string(),
                    id: automation.clone(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn validate(tables: &ContentTables) -> Result<(), ContentError> {
    for action in tables.actions.values() {
        let ctx = format!("action {}", action.id);
        for item in &action.requires_items {
            check_item(tables, &ctx, item)?;
        }
        for skill in &action.requires_skills {
            check_skill(tables, &ctx, skill)?;
        }
        for amount in action.cost.values() {
            check_finite(&ctx, *amount)?;
        }
        for (i, weighted) in action.effects.iter().enumerate() {
            let ctx = format!("action {} effect {i}", action.id);
            check_chance(&ctx, weighted.chance)?;
            check_effect(tables, &ctx, &weighted.effect)?;
        }
        if let Some(failure) = &action.failure_effect {
            check_effect(tables, &format!("action {} failure", action.id), failure)?;
        }
    }

    for event in tables.events.values() {
        let ctx = format!("event {}", event.id);
        check_positive(&ctx, event.duration_ms)?;
        for item in &event.requires_items {
            check_item(tables, &ctx, item)?;
        }
        for outcome in event.success_outcome.iter().chain(&event.failure_outcome) {
            check_effect(tables, &ctx, outcome)?;
            check_event_target(event, &ctx, outcome)?;
        }
        for choice in &event.choices {
            let ctx = format!("event {} choice {}", event.id, choice.id);
            if let Some(chance) = choice.success_chance {
                check_chance(&ctx, chance)?;
            }
            for amount in choice.cost.values() {
                check_finite(&ctx, *amount)?;
            }
            check_effect(tables, &ctx, &choice.effect)?;
            check_event_target(event, &ctx, &choice.effect)?;
            if let Some(next) = &choice.next_event_id {
                check_event(tables, &ctx, next)?;
            }
        }
    }

    for skill in tables.skills.values() {
        let ctx = format!("skill {}", skill.id);
        for req in &skill.requires {
            check_skill(tables, &ctx, req)?;
        }
        for m in skill.multipliers.values() {
            check_positive(&ctx, *m)?;
        }
    }

    for automation in tables.automations.values() {
        let ctx = format!("automation {}", automation.id);
        for amount in automation.per_second.values() {
            check_finite(&ctx, *amount)?;
        }
        check_chance(&ctx, automation.audit_chance_per_sec)?;
    }

    for job in &tables.jobs {
        check_positive(&format!("job {}", job.id), job.duration_ms)?;
    }

    for (location, profile) in &tables.locations {
        let ctx = format!("location {location:?}");
        check_finite(&ctx, profile.suspicion_per_sec)?;
        check_finite(&ctx, profile.fatigue_per_sec)?;
        for trigger in &profile.triggers {
            check_chance(&ctx, trigger.probability_per_sec)?;
        }
    }

    for item in &tables.starting.items {
        check_item(tables, "starting kit", item)?;
    }
    Ok(())
}
