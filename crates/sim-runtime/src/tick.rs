//! The per-frame pass. Steps run in a fixed order on the draft snapshot;
//! events requested by earlier steps are already active for later ones.

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use sim_content::{ContentError, ContentTables, Location, RateKey};
use sim_core::{
    gate, xp_for_next_level, EventCategory, EventContext, Flag, GameState, LogKind, MailMessage,
    RandomSource, ResourceKey, TimerKind, MAX_LEVEL,
};
use sim_effects::{grant_milestone_skills, roll_job};
use sim_events::{default_context, expire, trigger, TriggerOutcome};
use tracing::{debug, info, warn};

/// Caller-supplied frame input. The core never reads a clock itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub delta_ms: f64,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub wall_clock_ms: Option<u64>,
}

impl TickInput {
    pub fn new(delta_ms: f64, location: Location) -> Self {
        Self {
            delta_ms,
            location,
            wall_clock_ms: None,
        }
    }
}

/// What happened during one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub levels_gained: u32,
    pub skills_granted: Vec<String>,
    /// Events that became active during the tick, in order.
    pub triggered: Vec<String>,
    pub red_tagged: Vec<u64>,
    pub expired_timers: Vec<TimerKind>,
    pub event_expired: Option<String>,
    /// Template id of a job that lapsed and was replaced.
    pub job_lapsed: Option<String>,
    pub deliveries: Vec<String>,
    pub mail_received: Option<u64>,
}

fn request_event(
    state: &mut GameState,
    content: &ContentTables,
    category: EventCategory,
    id: Option<&str>,
    context: EventContext,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) -> Result<(), ContentError> {
    if let TriggerOutcome::Triggered { id } = trigger(state, content, category, id, context, rng)? {
        report.triggered.push(id);
    }
    Ok(())
}

fn approach(value: &mut f64, target: Option<f64>, k: f64) {
    if let Some(target) = target {
        *value += (target - *value) * k;
    }
}

/// Advance `state` by `input.delta_ms`. Negative or non-finite deltas count
/// as zero.
pub fn tick(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    input: &TickInput,
    rng: &mut dyn RandomSource,
) -> Result<TickReport, ContentError> {
    let dt_ms = if input.delta_ms.is_finite() && input.delta_ms > 0.0 {
        input.delta_ms
    } else {
        0.0
    };
    let dt_s = dt_ms / 1000.0;
    let mut report = TickReport::default();
    // Only events that were already running when the frame began count down.
    let carried_event = state.is_event_active();

    level_up(state, content, &mut report);
    location_pressure(state, content, config, input.location, dt_ms, rng, &mut report)?;
    degrade(state, content, config, dt_s, &mut report);
    emerge(state, content, config, dt_ms, rng, &mut report)?;

    report.expired_timers = state.decay_timers(dt_ms);
    for kind in &report.expired_timers {
        if kind.paired_flag().is_some() {
            state.push_log(LogKind::Info, format!("{} wore off.", kind.label()));
        }
    }

    continuous_effects(state, content, config, dt_ms, rng, &mut report)?;

    if carried_event {
        let timed_out = match state.runtime.active_event.as_mut() {
            Some(event) => {
                event.time_left_ms = (event.time_left_ms - dt_ms).max(0.0);
                event.time_left_ms <= 0.0
            }
            None => false,
        };
        if timed_out {
            report.event_expired = expire(state, content, rng).map(|e| e.event_id);
        }
    }

    job_countdown(state, content, config, dt_ms, rng, &mut report);
    deliveries(state, content, dt_ms, &mut report);
    mail(state, content, config, dt_ms, rng, &mut report);

    state.clock_ms += dt_ms;
    if let Some(wall) = input.wall_clock_ms {
        state.runtime.last_update_ms = Some(wall);
    }
    Ok(report)
}

/// Level-ups logged one per line before the rest are folded into a summary.
const LEVEL_LOG_LINES: u32 = 3;

/// Step 1. A `while` so one large grant can cross several thresholds; it
/// stops at [`MAX_LEVEL`].
fn level_up(state: &mut GameState, content: &ContentTables, report: &mut TickReport) {
    let start = state.resources.level;
    while state.resources.level < MAX_LEVEL {
        let need = xp_for_next_level(state.resources.level);
        if state.resources.experience < need {
            break;
        }
        state.resources.experience -= need;
        state.resources.level += 1;
        state.resources.skill_points = state.resources.skill_points.saturating_add(1);
        report.levels_gained += 1;
        if report.levels_gained <= LEVEL_LOG_LINES {
            state.push_log(
                LogKind::LevelUp,
                format!("Level {} reached.", state.resources.level),
            );
        }
    }
    if report.levels_gained == 0 {
        return;
    }
    if report.levels_gained > LEVEL_LOG_LINES {
        state.push_log(
            LogKind::LevelUp,
            format!(
                "Level {} reached ({} levels at once).",
                state.resources.level, report.levels_gained
            ),
        );
    }
    info!(from = start, to = state.resources.level, "level up");
    report.skills_granted = grant_milestone_skills(state, content);
}

/// Step 2.
fn location_pressure(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    location: Location,
    dt_ms: f64,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) -> Result<(), ContentError> {
    let Some(profile) = content.location(location) else {
        return Ok(());
    };
    let dt_s = dt_ms / 1000.0;
    let mut drift = profile.suspicion_per_sec
        * content.multiplier(&state.proficiency, RateKey::SuspicionDrift);
    if drift > 0.0 && state.flags.is_set(Flag::BadgeFlagged) {
        drift *= config.badge_flagged_drift_multiplier;
    }
    state.resources.add(ResourceKey::Suspicion, drift * dt_s);
    state.hf.fatigue += profile.fatigue_per_sec * dt_s;

    let k = (config.drift_rate * dt_s).clamp(0.0, 1.0);
    approach(&mut state.hf.social_stress, profile.social_stress_target, k);
    approach(&mut state.hf.temperature, profile.temperature_target, k);
    let noise = if state.flags.is_set(Flag::HearingProtection) {
        profile
            .noise_target
            .map(|n| n * config.hearing_protection_factor)
    } else {
        profile.noise_target
    };
    approach(&mut state.hf.noise_exposure, noise, k);
    approach(&mut state.hf.light_level, profile.light_target, k);
    state.hf.clamp_all();

    for t in &profile.triggers {
        if gate(rng, t.probability_per_sec, dt_ms, config.max_gate_probability) {
            debug!(?location, category = ?t.category, "location trigger fired");
            request_event(
                state,
                content,
                t.category,
                None,
                default_context(t.category),
                rng,
                report,
            )?;
        }
    }
    Ok(())
}

/// Step 3.
fn degrade(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    dt_s: f64,
    report: &mut TickReport,
) {
    let mult = content.multiplier(&state.proficiency, RateKey::Degradation);
    let rotable_loss = config.rotable_decay_per_sec * dt_s * mult;
    let mut tagged = Vec::new();
    for rotable in &mut state.rotables {
        rotable.condition = (rotable.condition - rotable_loss).max(0.0);
        if !rotable.red_tagged && rotable.condition < config.red_tag_threshold {
            rotable.red_tagged = true;
            tagged.push((rotable.id, rotable.part.clone(), rotable.condition));
        }
    }
    for (id, part, condition) in tagged {
        state.push_log(
            LogKind::Warning,
            format!("{part} (S/N {id}) red-tagged at {condition:.0}%."),
        );
        report.red_tagged.push(id);
    }

    let tool_loss = config.tool_decay_per_sec * dt_s * mult;
    let inventory = &state.inventory;
    for (tool, condition) in state.tools.iter_mut() {
        let owned = inventory.get(tool).copied().unwrap_or(0) > 0;
        if owned && *condition > 0.0 {
            *condition = (*condition - tool_loss).max(0.0);
        }
    }
}

/// Step 4. Suspicion thresholds re-arm even while an event is active.
fn emerge(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    dt_ms: f64,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) -> Result<(), ContentError> {
    let cap = config.max_gate_probability;
    let suspicion = state.resources.suspicion;
    for t in &config.suspicion_thresholds {
        if state.flags.is_set(t.flag) && suspicion < t.threshold - t.rearm_margin {
            debug!(flag = ?t.flag, "suspicion threshold re-armed");
            state.flags.set(t.flag, false);
        }
    }
    if state.is_event_active() {
        return Ok(());
    }

    for t in &config.suspicion_thresholds {
        if suspicion >= t.threshold && !state.flags.is_set(t.flag) {
            state.flags.set(t.flag, true);
            let category = content.event(&t.event_id)?.category;
            request_event(
                state,
                content,
                category,
                Some(&t.event_id),
                default_context(category),
                rng,
                report,
            )?;
            if state.is_event_active() {
                return Ok(());
            }
        }
    }

    if suspicion > config.high_suspicion_threshold
        && gate(rng, config.high_suspicion_audit_per_sec, dt_ms, cap)
    {
        request_event(
            state,
            content,
            EventCategory::Audit,
            None,
            EventContext::Audit {
                tier: config.high_suspicion_audit_tier,
            },
            rng,
            report,
        )?;
        if state.is_event_active() {
            return Ok(());
        }
    }

    let degraded: Vec<u64> = state
        .rotables
        .iter()
        .filter(|r| !r.red_tagged && r.condition < config.failure_threshold)
        .map(|r| r.id)
        .collect();
    for rotable_id in degraded {
        if gate(rng, config.component_failure_per_sec, dt_ms, cap) {
            request_event(
                state,
                content,
                EventCategory::Component,
                None,
                EventContext::Component { rotable_id },
                rng,
                report,
            )?;
            if state.is_event_active() {
                break;
            }
        }
    }
    Ok(())
}

/// Step 6.
fn continuous_effects(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    dt_ms: f64,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) -> Result<(), ContentError> {
    let dt_s = dt_ms / 1000.0;
    if state.flags.is_set(Flag::Hallucinating) {
        let mult = content.multiplier(&state.proficiency, RateKey::FocusDrain);
        state.resources.add(
            ResourceKey::Focus,
            -config.hallucination_focus_drain_per_sec * dt_s * mult,
        );
    }
    if state.flags.is_set(Flag::Afraid) && !state.flags.is_set(Flag::Warded) {
        let mut mult = content.multiplier(&state.proficiency, RateKey::SanityDrain);
        if state.is_event_active() {
            mult *= config.event_active_drain_multiplier;
        }
        state.resources.add(
            ResourceKey::Sanity,
            -config.fear_sanity_drain_per_sec * dt_s * mult,
        );
    }

    let yield_mult = content.multiplier(&state.proficiency, RateKey::AutomationYield);
    let active: Vec<String> = state.flags.automations.iter().cloned().collect();
    for id in active {
        let Some(automation) = content.automation(&id) else {
            warn!(automation = %id, "enabled automation has no definition");
            continue;
        };
        state.resources.merge(&automation.per_second, dt_s * yield_mult);
        if gate(
            rng,
            automation.audit_chance_per_sec,
            dt_ms,
            config.max_gate_probability,
        ) {
            debug!(automation = %id, "automation provoked an audit");
            request_event(
                state,
                content,
                EventCategory::Audit,
                None,
                EventContext::Audit { tier: 1 },
                rng,
                report,
            )?;
        }
    }
    Ok(())
}

/// Step 8. The slot is refilled rather than left empty.
fn job_countdown(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    dt_ms: f64,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) {
    let mut speed = content.multiplier(&state.proficiency, RateKey::JobSpeed);
    if state.flags.is_set(Flag::ScheduleCompressed) {
        speed *= config.schedule_compression_rate;
    }
    let lapsed = match state.job.as_mut() {
        Some(job) => {
            job.time_left_ms = (job.time_left_ms - dt_ms * speed).max(0.0);
            job.time_left_ms <= 0.0
        }
        None => {
            state.job = roll_job(content, rng);
            false
        }
    };
    if lapsed {
        if let Some(old) = state.job.take() {
            state.push_log(
                LogKind::Warning,
                format!("Work order lapsed: {}.", old.title),
            );
            report.job_lapsed = Some(old.template_id);
        }
        state.job = roll_job(content, rng);
    }
}

/// Step 8b.
fn deliveries(
    state: &mut GameState,
    content: &ContentTables,
    dt_ms: f64,
    report: &mut TickReport,
) {
    for order in &mut state.orders {
        order.eta_ms = (order.eta_ms - dt_ms).max(0.0);
    }
    let (arrived, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.orders)
        .into_iter()
        .partition(|o| o.eta_ms <= 0.0);
    state.orders = pending;
    for order in arrived {
        state.add_item(&order.item);
        if content.is_tool(&order.item) {
            state.tools.entry(order.item.clone()).or_insert(100.0);
        }
        let name = content
            .item(&order.item)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| order.item.clone());
        state.push_log(LogKind::Success, format!("Delivered: {name}."));
        report.deliveries.push(order.item);
    }
}

/// Step 9.
fn mail(
    state: &mut GameState,
    content: &ContentTables,
    config: &EngineConfig,
    dt_ms: f64,
    rng: &mut dyn RandomSource,
    report: &mut TickReport,
) {
    if state.hf.timer(TimerKind::MailCooldown) > 0.0
        || state.unread_mail() >= config.max_unread_mail
        || !gate(rng, config.mail_per_sec, dt_ms, config.max_gate_probability)
    {
        return;
    }
    let fresh: Vec<_> = content
        .mail_templates()
        .iter()
        .filter(|t| !state.mail.iter().any(|m| m.subject == t.subject))
        .collect();
    let Some(i) = rng.pick_index(fresh.len()) else {
        return;
    };
    let template = fresh[i];
    let id = state.next_mail_id;
    state.next_mail_id += 1;
    state.mail.push(MailMessage {
        id,
        sender: template.sender.clone(),
        subject: template.subject.clone(),
        body: template.body.clone(),
        read: false,
        received_ms: state.clock_ms.max(0.0) as u64,
    });
    state.grant_timer(TimerKind::MailCooldown, config.mail_cooldown_ms);
    state.push_log(
        LogKind::Info,
        format!("Mail from {}: {}", template.sender, template.subject),
    );
    report.mail_received = Some(id);
}
