#![deny(warnings)]

//! Core state model for Hangar Shift.
//!
//! This crate defines the serializable snapshot consumed and produced by the
//! simulation, the clamping rules of its fields, the log ring buffer, the
//! injectable RNG seam and validation helpers that check the snapshot
//! invariants.

pub mod effect;
pub mod entities;
pub mod flags;
pub mod log;
pub mod resources;
pub mod rng;
pub mod state;

pub use effect::{Effect, EventChoice, ItemChange, SideEffect, TargetKind, WeightedEffect};
pub use entities::{
    ActiveEvent, ActiveJob, EventCategory, EventContext, MailMessage, MinigameState, Pet,
    ProcurementOrder, Rotable, ToolroomStatus,
};
pub use flags::{Flag, GameFlags, HfStats, TimerKind, TEMPERATURE_RANGE};
pub use log::{GameLog, LogEntry, LogKind, DEFAULT_LOG_CAPACITY};
pub use resources::{
    xp_for_next_level, ResourceDelta, ResourceKey, ResourceState, MAX_LEVEL,
};
pub use rng::{gate, gate_probability, RandomSource, ScriptedRng, SimRng};
pub use state::{GameState, RuntimeState};

use thiserror::Error;

/// Snapshot invariant violations. Any of these after an update is a defect.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A resource is NaN or outside its clamp range.
    #[error("resource {key:?} = {value} is outside its range")]
    ResourceOutOfRange { key: ResourceKey, value: f64 },
    /// Levels run from 1 to [`MAX_LEVEL`].
    #[error("level must be between 1 and {}", MAX_LEVEL)]
    InvalidLevel,
    /// A continuous variable is NaN or outside its range.
    #[error("{field} = {value} is outside its range")]
    OutOfRange { field: String, value: f64 },
    /// A timed flag is set while its countdown is not running.
    #[error("flag {0:?} is set without a running timer")]
    TimedFlagWithoutTimer(Flag),
    /// The log holds more entries than its capacity.
    #[error("log holds {len} entries, capacity is {capacity}")]
    LogOverCapacity { len: usize, capacity: usize },
    /// Log entries are not strictly newest-first.
    #[error("log entries are not in reverse-chronological order")]
    LogOrder,
    /// A tracked inventory item has a zero count.
    #[error("inventory item {0} has a zero count")]
    EmptyInventorySlot(String),
}

fn check_range(field: &str, value: f64, lo: f64, hi: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Validate resource clamp ranges.
pub fn validate_resources(r: &ResourceState) -> Result<(), ValidationError> {
    for key in ResourceKey::ALL {
        let (lo, hi) = key.bounds();
        let value = r.get(key);
        if value.is_nan() || value < lo || value > hi || value.is_infinite() {
            return Err(ValidationError::ResourceOutOfRange { key, value });
        }
    }
    if !(1..=MAX_LEVEL).contains(&r.level) {
        return Err(ValidationError::InvalidLevel);
    }
    Ok(())
}

/// Validate human-factors ranges, timers and timer/flag pairing.
pub fn validate_hf(hf: &HfStats, flags: &GameFlags) -> Result<(), ValidationError> {
    check_range("fatigue", hf.fatigue, 0.0, 100.0)?;
    check_range("noise_exposure", hf.noise_exposure, 0.0, 100.0)?;
    check_range("social_stress", hf.social_stress, 0.0, 100.0)?;
    check_range("light_level", hf.light_level, 0.0, 100.0)?;
    let (lo, hi) = TEMPERATURE_RANGE;
    check_range("temperature", hf.temperature, lo, hi)?;
    for (kind, ms) in &hf.timers {
        check_range(&format!("timer {kind:?}"), *ms, 0.0, f64::MAX)?;
    }
    for flag in &flags.active {
        if let Some(kind) = flag.timer() {
            if hf.timer(kind) <= 0.0 {
                return Err(ValidationError::TimedFlagWithoutTimer(*flag));
            }
        }
    }
    Ok(())
}

/// Validate the log bound and ordering.
pub fn validate_log(log: &GameLog) -> Result<(), ValidationError> {
    if log.len() > log.capacity() {
        return Err(ValidationError::LogOverCapacity {
            len: log.len(),
            capacity: log.capacity(),
        });
    }
    let seqs: Vec<u64> = log.entries().map(|e| e.seq).collect();
    if seqs.windows(2).any(|w| w[0] <= w[1]) {
        return Err(ValidationError::LogOrder);
    }
    Ok(())
}

/// Validate the whole snapshot.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    validate_resources(&state.resources)?;
    validate_hf(&state.hf, &state.flags)?;
    validate_log(&state.log)?;
    for r in &state.rotables {
        check_range(&format!("rotable {} condition", r.id), r.condition, 0.0, 100.0)?;
    }
    for (id, condition) in &state.tools {
        check_range(&format!("tool {id} condition"), *condition, 0.0, 100.0)?;
    }
    for (item, count) in &state.inventory {
        if *count == 0 {
            return Err(ValidationError::EmptyInventorySlot(item.clone()));
        }
    }
    check_range("pet hunger", state.pet.hunger, 0.0, 100.0)?;
    check_range("pet affection", state.pet.affection, 0.0, 100.0)?;
    if let Some(event) = &state.runtime.active_event {
        check_range("event time_left_ms", event.time_left_ms, f64::MIN, f64::MAX)?;
    }
    if let Some(job) = &state.job {
        check_range("job time_left_ms", job.time_left_ms, f64::MIN, f64::MAX)?;
    }
    check_range("clock_ms", state.clock_ms, 0.0, f64::MAX)?;
    Ok(())
}
