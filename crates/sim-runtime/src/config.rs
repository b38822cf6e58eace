//! Engine tuning constants. Every field has a default; a YAML file only needs
//! the keys it overrides.

use crate::EngineError;
use serde::{Deserialize, Serialize};
use sim_core::{Flag, DEFAULT_LOG_CAPACITY};
use std::fs;
use std::path::Path;

/// A one-shot suspicion trigger. Fires `event_id` once when suspicion reaches
/// `threshold`, then stays quiet until suspicion falls below
/// `threshold - rearm_margin`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspicionThreshold {
    pub threshold: f64,
    pub flag: Flag,
    pub event_id: String,
    #[serde(default = "default_rearm_margin")]
    pub rearm_margin: f64,
}

fn default_rearm_margin() -> f64 {
    10.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for any per-tick gate probability.
    pub max_gate_probability: f64,
    /// Log capacity for new games.
    pub log_capacity: usize,

    pub rotable_decay_per_sec: f64,
    pub tool_decay_per_sec: f64,
    /// Rotables below this condition are red-tagged.
    pub red_tag_threshold: f64,
    /// Rotables below this condition run component-failure trials.
    pub failure_threshold: f64,
    pub component_failure_per_sec: f64,

    pub suspicion_thresholds: Vec<SuspicionThreshold>,
    pub high_suspicion_threshold: f64,
    pub high_suspicion_audit_per_sec: f64,
    pub high_suspicion_audit_tier: u8,

    pub hallucination_focus_drain_per_sec: f64,
    pub fear_sanity_drain_per_sec: f64,
    /// Applied to the fear drain while an event is active.
    pub event_active_drain_multiplier: f64,
    /// Job countdown speed while the schedule is compressed.
    pub schedule_compression_rate: f64,
    /// Fraction of the gap to a location target closed per second.
    pub drift_rate: f64,
    /// Share of a location's noise target that gets through hearing
    /// protection.
    pub hearing_protection_factor: f64,
    /// Applied to positive location suspicion drift while the badge is
    /// flagged.
    pub badge_flagged_drift_multiplier: f64,

    pub mail_per_sec: f64,
    pub mail_cooldown_ms: f64,
    pub max_unread_mail: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_gate_probability: 1.0,
            log_capacity: DEFAULT_LOG_CAPACITY,
            rotable_decay_per_sec: 0.02,
            tool_decay_per_sec: 0.01,
            red_tag_threshold: 10.0,
            failure_threshold: 35.0,
            component_failure_per_sec: 0.002,
            suspicion_thresholds: vec![
                SuspicionThreshold {
                    threshold: 50.0,
                    flag: Flag::SuspicionNoticeIssued,
                    event_id: "suspicion_notice".to_string(),
                    rearm_margin: default_rearm_margin(),
                },
                SuspicionThreshold {
                    threshold: 80.0,
                    flag: Flag::SuspicionReviewIssued,
                    event_id: "suspicion_review".to_string(),
                    rearm_margin: default_rearm_margin(),
                },
            ],
            high_suspicion_threshold: 70.0,
            high_suspicion_audit_per_sec: 0.01,
            high_suspicion_audit_tier: 2,
            hallucination_focus_drain_per_sec: 1.5,
            fear_sanity_drain_per_sec: 0.8,
            event_active_drain_multiplier: 2.0,
            schedule_compression_rate: 2.0,
            drift_rate: 0.05,
            hearing_protection_factor: 0.4,
            badge_flagged_drift_multiplier: 1.5,
            mail_per_sec: 0.01,
            mail_cooldown_ms: 60_000.0,
            max_unread_mail: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_yaml_str(&text)
    }

    /// Range checks. Cross-references into content are checked by
    /// [`crate::Engine::new`].
    pub fn validate(&self) -> Result<(), EngineError> {
        let rates = [
            ("rotable_decay_per_sec", self.rotable_decay_per_sec),
            ("tool_decay_per_sec", self.tool_decay_per_sec),
            ("component_failure_per_sec", self.component_failure_per_sec),
            ("high_suspicion_audit_per_sec", self.high_suspicion_audit_per_sec),
            (
                "hallucination_focus_drain_per_sec",
                self.hallucination_focus_drain_per_sec,
            ),
            ("fear_sanity_drain_per_sec", self.fear_sanity_drain_per_sec),
            (
                "event_active_drain_multiplier",
                self.event_active_drain_multiplier,
            ),
            ("schedule_compression_rate", self.schedule_compression_rate),
            ("drift_rate", self.drift_rate),
            ("hearing_protection_factor", self.hearing_protection_factor),
            (
                "badge_flagged_drift_multiplier",
                self.badge_flagged_drift_multiplier,
            ),
            ("mail_per_sec", self.mail_per_sec),
            ("mail_cooldown_ms", self.mail_cooldown_ms),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let thresholds = [
            ("red_tag_threshold", self.red_tag_threshold),
            ("failure_threshold", self.failure_threshold),
            ("high_suspicion_threshold", self.high_suspicion_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() {
                return Err(EngineError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.max_gate_probability) {
            return Err(EngineError::Config(format!(
                "max_gate_probability must be in [0,1], got {}",
                self.max_gate_probability
            )));
        }
        if self.log_capacity == 0 {
            return Err(EngineError::Config("log_capacity must be positive".into()));
        }
        for t in &self.suspicion_thresholds {
            if t.flag.is_timed() {
                return Err(EngineError::Config(format!(
                    "suspicion threshold {} guards timed flag {:?}",
                    t.event_id, t.flag
                )));
            }
            if !t.threshold.is_finite() {
                return Err(EngineError::Config(format!(
                    "suspicion threshold {} must be finite",
                    t.event_id
                )));
            }
            if !t.rearm_margin.is_finite() || t.rearm_margin < 0.0 {
                return Err(EngineError::Config(format!(
                    "suspicion threshold {} has invalid rearm margin",
                    t.event_id
                )));
            }
        }
        Ok(())
    }
}
