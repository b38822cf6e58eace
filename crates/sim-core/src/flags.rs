//! Flags, status timers and the human-factors block.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Named switches in global game state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// Timed by [`TimerKind::Fear`].
    Afraid,
    /// Timed by [`TimerKind::Hallucination`].
    Hallucinating,
    /// Timed by [`TimerKind::ScheduleCompression`]; the active job runs faster.
    ScheduleCompressed,
    /// Timed by [`TimerKind::Ward`]; shields sanity from fear.
    Warded,
    HearingProtection,
    NightShift,
    BadgeFlagged,
    /// One-shot guard for the first suspicion threshold.
    SuspicionNoticeIssued,
    /// One-shot guard for the second suspicion threshold.
    SuspicionReviewIssued,
}

impl Flag {
    /// The countdown that owns this flag, if any.
    pub fn timer(self) -> Option<TimerKind> {
        TimerKind::ALL
            .into_iter()
            .find(|kind| kind.paired_flag() == Some(self))
    }

    pub fn is_timed(self) -> bool {
        self.timer().is_some()
    }
}

/// Millisecond countdowns kept in [`HfStats::timers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Fear,
    Hallucination,
    ScheduleCompression,
    Ward,
    /// Minimum interval between inserted mail.
    MailCooldown,
}

impl TimerKind {
    pub const ALL: [TimerKind; 5] = [
        TimerKind::Fear,
        TimerKind::Hallucination,
        TimerKind::ScheduleCompression,
        TimerKind::Ward,
        TimerKind::MailCooldown,
    ];

    pub fn paired_flag(self) -> Option<Flag> {
        match self {
            TimerKind::Fear => Some(Flag::Afraid),
            TimerKind::Hallucination => Some(Flag::Hallucinating),
            TimerKind::ScheduleCompression => Some(Flag::ScheduleCompressed),
            TimerKind::Ward => Some(Flag::Warded),
            TimerKind::MailCooldown => None,
        }
    }

    /// Short label used in transition logs.
    pub fn label(self) -> &'static str {
        match self {
            TimerKind::Fear => "The dread",
            TimerKind::Hallucination => "The visions",
            TimerKind::ScheduleCompression => "The schedule crunch",
            TimerKind::Ward => "The ward",
            TimerKind::MailCooldown => "Mail cooldown",
        }
    }
}

/// Boolean switches, persistent story flags and enabled automations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameFlags {
    pub active: BTreeSet<Flag>,
    pub story: BTreeSet<String>,
    pub automations: BTreeSet<String>,
}

impl GameFlags {
    pub fn is_set(&self, flag: Flag) -> bool {
        self.active.contains(&flag)
    }

    pub fn set(&mut self, flag: Flag, on: bool) {
        if on {
            self.active.insert(flag);
        } else {
            self.active.remove(&flag);
        }
    }

    pub fn has_story(&self, story: &str) -> bool {
        self.story.contains(story)
    }

    pub fn automation_enabled(&self, id: &str) -> bool {
        self.automations.contains(id)
    }
}

/// Continuous human-factors variables plus the status countdowns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HfStats {
    pub fatigue: f64,
    pub noise_exposure: f64,
    pub social_stress: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub light_level: f64,
    pub timers: BTreeMap<TimerKind, f64>,
}

impl Default for HfStats {
    fn default() -> Self {
        Self {
            fatigue: 0.0,
            noise_exposure: 20.0,
            social_stress: 10.0,
            temperature: 18.0,
            light_level: 60.0,
            timers: BTreeMap::new(),
        }
    }
}

/// Bounds for temperature in degrees Celsius.
pub const TEMPERATURE_RANGE: (f64, f64) = (-40.0, 60.0);

impl HfStats {
    /// Remaining milliseconds on a countdown (0 when absent).
    pub fn timer(&self, kind: TimerKind) -> f64 {
        self.timers.get(&kind).copied().unwrap_or(0.0)
    }

    /// Clamp every continuous variable into its documented range.
    pub fn clamp_all(&mut self) {
        for v in [
            &mut self.fatigue,
            &mut self.noise_exposure,
            &mut self.social_stress,
            &mut self.light_level,
        ] {
            *v = if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
        }
        let (lo, hi) = TEMPERATURE_RANGE;
        self.temperature = if self.temperature.is_finite() {
            self.temperature.clamp(lo, hi)
        } else {
            0.0
        };
        self.timers.retain(|_, ms| ms.is_finite() && *ms > 0.0);
    }
}
