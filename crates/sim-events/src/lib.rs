#![deny(warnings)]

//! Event arbitration: keeps at most one narrative event active, instantiates
//! events by category or id, resolves player choices and chains follow-ups.
//!
//! Countdown is not handled here. The tick calls [`expire`] once an event's
//! time has run out.

mod resolve;

pub use resolve::{resolve, Rejection, Resolution, ResolveOutcome};

use sim_content::{ContentError, ContentTables, EventTemplate};
use sim_core::{
    ActiveEvent, Effect, EventCategory, EventContext, GameState, LogEntry, LogKind, RandomSource,
};
use sim_effects::apply_effect;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq)]
pub enum TriggerOutcome {
    Triggered { id: String },
    /// Another event is already active; the request is dropped, not queued.
    Dropped,
    /// No template in the category passes its eligibility checks.
    NoEligible,
}

/// Result of running an expired event's failure routine.
#[derive(Clone, Debug, PartialEq)]
pub struct Expired {
    pub event_id: String,
    pub log: LogEntry,
}

/// Context used when the caller has nothing more specific.
pub fn default_context(category: EventCategory) -> EventContext {
    match category {
        EventCategory::Audit => EventContext::Audit { tier: 1 },
        _ => EventContext::General,
    }
}

/// Flags, story flags and inventory the template asks for.
pub fn is_eligible(state: &GameState, template: &EventTemplate) -> bool {
    template.requires_flags.iter().all(|f| state.flags.is_set(*f))
        && template.requires_story.iter().all(|s| state.flags.has_story(s))
        && !template.forbids_story.iter().any(|s| state.flags.has_story(s))
        && template.requires_items.iter().all(|i| state.has_item(i))
}

/// Clone a template into a fresh active event with a full countdown.
pub fn instantiate(template: &EventTemplate, context: EventContext) -> ActiveEvent {
    ActiveEvent {
        category: template.category,
        id: template.id.clone(),
        title: template.title.clone(),
        description: template.description.clone(),
        total_time_ms: template.duration_ms,
        time_left_ms: template.duration_ms,
        choices: template.choices.clone(),
        success_outcome: template.success_outcome.clone(),
        failure_outcome: template.failure_outcome.clone(),
        context,
    }
}

/// Request an event.
///
/// With an `id`, that template is used; an unknown id or one filed under a
/// different category is a [`ContentError`] even when the request would have
/// been dropped. Without an `id`, one eligible template of `category` is
/// picked uniformly.
pub fn trigger(
    state: &mut GameState,
    content: &ContentTables,
    category: EventCategory,
    id: Option<&str>,
    context: EventContext,
    rng: &mut dyn RandomSource,
) -> Result<TriggerOutcome, ContentError> {
    let explicit = match id {
        Some(id) => {
            let template = content.event(id)?;
            if template.category != category {
                return Err(ContentError::CategoryMismatch {
                    id: id.to_string(),
                    expected: category,
                    found: template.category,
                });
            }
            Some(template)
        }
        None => None,
    };
    if let Some(active) = &state.runtime.active_event {
        debug!(active = %active.id, ?category, "trigger dropped, event already active");
        return Ok(TriggerOutcome::Dropped);
    }
    let template = match explicit {
        Some(template) if is_eligible(state, template) => template,
        Some(_) => return Ok(TriggerOutcome::NoEligible),
        None => {
            let eligible: Vec<_> = content
                .events_in(category)
                .filter(|t| is_eligible(state, t))
                .collect();
            match rng.pick_index(eligible.len()) {
                Some(i) => eligible[i],
                None => return Ok(TriggerOutcome::NoEligible),
            }
        }
    };
    info!(event = %template.id, ?category, "event triggered");
    state.runtime.active_event = Some(instantiate(template, context));
    Ok(TriggerOutcome::Triggered {
        id: template.id.clone(),
    })
}

/// Payload target implied by an event's context. Only component events
/// point at something the side effects can act on.
pub(crate) fn context_target(context: &EventContext) -> Option<String> {
    match context {
        EventContext::Component { rotable_id } => Some(rotable_id.to_string()),
        EventContext::General | EventContext::Audit { .. } => None,
    }
}

/// Apply `event`'s failure outcome. Audit failures are multiplied by their
/// tier; component failures red-tag the rotable. Always logs exactly once.
pub(crate) fn apply_failure(
    state: &mut GameState,
    content: &ContentTables,
    event: &ActiveEvent,
    rng: &mut dyn RandomSource,
) -> LogEntry {
    let scale = match event.context {
        EventContext::Audit { tier } => f64::from(tier.max(1)),
        EventContext::General | EventContext::Component { .. } => 1.0,
    };
    if let EventContext::Component { rotable_id } = event.context {
        if let Some(rotable) = state.rotable_mut(rotable_id) {
            rotable.red_tagged = true;
        }
    }
    let mut outcome = event.failure_outcome.clone().unwrap_or_default();
    if outcome.log.is_empty() {
        outcome.log = format!("{}: time ran out.", event.title);
        outcome.log_kind = LogKind::Warning;
    }
    let target = context_target(&event.context);
    apply_effect(state, content, &outcome, target.as_deref(), scale, rng)
}

/// Failure routine for an event whose countdown reached zero. Clears the
/// event. Returns `None` when nothing was active.
pub fn expire(
    state: &mut GameState,
    content: &ContentTables,
    rng: &mut dyn RandomSource,
) -> Option<Expired> {
    let event = state.runtime.active_event.take()?;
    let log = apply_failure(state, content, &event, rng);
    info!(event = %event.id, "event expired");
    Some(Expired {
        event_id: event.id,
        log,
    })
}

/// Apply the success outcome, if any, without a player choice.
pub(crate) fn apply_success(
    state: &mut GameState,
    content: &ContentTables,
    event: &ActiveEvent,
    rng: &mut dyn RandomSource,
) -> Option<LogEntry> {
    let outcome: &Effect = event.success_outcome.as_ref()?;
    let target = context_target(&event.context);
    Some(apply_effect(
        state,
        content,
        outcome,
        target.as_deref(),
        1.0,
        rng,
    ))
}
