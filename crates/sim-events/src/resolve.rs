//! Player resolution of the active event.

use crate::{apply_failure, apply_success, context_target, default_context, instantiate};
use serde::{Deserialize, Serialize};
use sim_content::{ContentError, ContentTables};
use sim_core::{GameState, LogEntry, RandomSource, ResourceKey};
use sim_effects::apply_effect;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "choice", rename_all = "snake_case")]
pub enum Resolution {
    /// Pick one of the active event's choices by id.
    Choice(String),
    /// Debug escape hatch: apply the success outcome and clear the event.
    Force,
}

/// Refusals. None of them mutate or log.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("no event is active")]
    NoActiveEvent,
    #[error("active event has no choice {0}")]
    UnknownChoice(String),
    #[error("cannot afford {key:?}: need {required}, have {available}")]
    Unaffordable {
        key: ResourceKey,
        required: f64,
        available: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolveOutcome {
    Resolved { event_id: String, log: LogEntry },
    /// The choice led straight into `next`; there is no moment without an
    /// active event in between.
    Chained {
        event_id: String,
        next: String,
        log: LogEntry,
    },
    /// The choice's success roll failed and the failure outcome applied.
    Failed { event_id: String, log: LogEntry },
    Forced {
        event_id: String,
        log: Option<LogEntry>,
    },
    Rejected(Rejection),
}

pub fn resolve(
    state: &mut GameState,
    content: &ContentTables,
    resolution: Resolution,
    rng: &mut dyn RandomSource,
) -> Result<ResolveOutcome, ContentError> {
    let Some(event) = state.runtime.active_event.clone() else {
        return Ok(ResolveOutcome::Rejected(Rejection::NoActiveEvent));
    };
    let choice_id = match resolution {
        Resolution::Force => {
            state.runtime.active_event = None;
            let log = apply_success(state, content, &event, rng);
            info!(event = %event.id, "event force-resolved");
            return Ok(ResolveOutcome::Forced {
                event_id: event.id,
                log,
            });
        }
        Resolution::Choice(id) => id,
    };
    let Some(choice) = event.choice(&choice_id) else {
        return Ok(ResolveOutcome::Rejected(Rejection::UnknownChoice(choice_id)));
    };
    for (key, required) in &choice.cost {
        let available = state.resources.get(*key);
        if available < *required {
            debug!(event = %event.id, choice = %choice.id, "choice unaffordable");
            return Ok(ResolveOutcome::Rejected(Rejection::Unaffordable {
                key: *key,
                required: *required,
                available,
            }));
        }
    }
    let next = match &choice.next_event_id {
        Some(next) => Some(content.event(next)?),
        None => None,
    };

    state.resources.pay(&choice.cost);
    state.runtime.active_event = None;

    if let Some(chance) = choice.success_chance {
        if rng.next_f64() >= chance {
            let log = apply_failure(state, content, &event, rng);
            info!(event = %event.id, choice = %choice.id, "choice failed its roll");
            return Ok(ResolveOutcome::Failed {
                event_id: event.id.clone(),
                log,
            });
        }
    }

    let mut effect = choice.effect.clone();
    if effect.log.is_empty() {
        effect.log = choice.text.clone();
    }
    let target = context_target(&event.context);
    let log = apply_effect(state, content, &effect, target.as_deref(), 1.0, rng);

    match next {
        Some(template) => {
            let context = if template.category == event.category {
                event.context.clone()
            } else {
                default_context(template.category)
            };
            state.runtime.active_event = Some(instantiate(template, context));
            info!(event = %event.id, next = %template.id, "event chained");
            Ok(ResolveOutcome::Chained {
                event_id: event.id.clone(),
                next: template.id.clone(),
                log,
            })
        }
        None => {
            info!(event = %event.id, choice = %choice.id, "event resolved");
            Ok(ResolveOutcome::Resolved {
                event_id: event.id.clone(),
                log,
            })
        }
    }
}
