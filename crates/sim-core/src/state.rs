//! The snapshot: every piece of simulation data in one owned value.

use crate::entities::{
    ActiveEvent, ActiveJob, MailMessage, MinigameState, Pet, ProcurementOrder, Rotable,
    ToolroomStatus,
};
use crate::flags::{GameFlags, HfStats, TimerKind};
use crate::log::{GameLog, LogEntry, LogKind};
use crate::resources::ResourceState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fields that never survive an import.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub active_event: Option<ActiveEvent>,
    pub active_scenario: Option<String>,
    pub minigame: Option<MinigameState>,
    /// Caller-supplied wall clock of the most recent tick.
    pub last_update_ms: Option<u64>,
}

/// Full game state. Each update of the engine produces a new value; nothing
/// inside holds references to anything outside it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub resources: ResourceState,
    pub flags: GameFlags,
    pub hf: HfStats,
    /// Item id to count.
    pub inventory: BTreeMap<String, u32>,
    /// Precision tool id to condition in [0,100].
    pub tools: BTreeMap<String, f64>,
    pub rotables: Vec<Rotable>,
    pub next_rotable_id: u64,
    /// Unlocked skill ids.
    pub proficiency: BTreeSet<String>,
    pub job: Option<ActiveJob>,
    pub mail: Vec<MailMessage>,
    pub next_mail_id: u64,
    pub orders: Vec<ProcurementOrder>,
    pub next_order_id: u64,
    pub procurement_tier: u8,
    pub pet: Pet,
    pub toolroom: ToolroomStatus,
    pub log: GameLog,
    /// Logical simulation time in milliseconds.
    pub clock_ms: f64,
    pub runtime: RuntimeState,
}

impl GameState {
    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.item_count(item) > 0
    }

    pub fn add_item(&mut self, item: &str) {
        let count = self.inventory.entry(item.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Remove one unit. Returns false when none was held.
    pub fn remove_item(&mut self, item: &str) -> bool {
        match self.inventory.get_mut(item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.inventory.remove(item);
                true
            }
            None => false,
        }
    }

    pub fn is_event_active(&self) -> bool {
        self.runtime.active_event.is_some()
    }

    pub fn rotable(&self, id: u64) -> Option<&Rotable> {
        self.rotables.iter().find(|r| r.id == id)
    }

    pub fn rotable_mut(&mut self, id: u64) -> Option<&mut Rotable> {
        self.rotables.iter_mut().find(|r| r.id == id)
    }

    /// Install a new rotable and return its id.
    pub fn append_rotable(&mut self, part: &str, condition: f64) -> u64 {
        let id = self.next_rotable_id;
        self.next_rotable_id += 1;
        self.rotables.push(Rotable {
            id,
            part: part.to_string(),
            condition: if condition.is_finite() {
                condition.clamp(0.0, 100.0)
            } else {
                0.0
            },
            red_tagged: false,
        });
        id
    }

    pub fn unread_mail(&self) -> usize {
        self.mail.iter().filter(|m| !m.read).count()
    }

    /// Start or extend a countdown and switch on its paired flag. A grant
    /// never shortens a running timer.
    pub fn grant_timer(&mut self, kind: TimerKind, ms: f64) {
        if !ms.is_finite() || ms <= 0.0 {
            return;
        }
        let slot = self.hf.timers.entry(kind).or_insert(0.0);
        *slot = slot.max(ms);
        if let Some(flag) = kind.paired_flag() {
            self.flags.set(flag, true);
        }
    }

    /// Decrement every countdown by `delta_ms`. Each timer that reaches zero
    /// is removed and its paired flag cleared. Returns the timers that expired
    /// during this call, in [`TimerKind::ALL`] order.
    pub fn decay_timers(&mut self, delta_ms: f64) -> Vec<TimerKind> {
        let mut expired = Vec::new();
        for kind in TimerKind::ALL {
            let Some(left) = self.hf.timers.get_mut(&kind) else {
                continue;
            };
            *left = (*left - delta_ms).max(0.0);
            if *left <= 0.0 {
                self.hf.timers.remove(&kind);
                expired.push(kind);
            }
        }
        // A paired flag without a running timer cannot stay set, whether it
        // just expired or arrived that way.
        for kind in TimerKind::ALL {
            if let Some(flag) = kind.paired_flag() {
                if self.hf.timer(kind) <= 0.0 {
                    self.flags.set(flag, false);
                }
            }
        }
        expired
    }

    /// Append a log entry stamped with the simulation clock.
    pub fn push_log(&mut self, kind: LogKind, text: impl Into<String>) -> LogEntry {
        let stamp = self.clock_ms.max(0.0) as u64;
        self.log.push(stamp, kind, text)
    }

    /// Clear every runtime-only field.
    pub fn reset_runtime(&mut self) {
        self.runtime = RuntimeState::default();
    }

    /// Re-establish clamp ranges and flag/timer pairing on a structurally
    /// valid but possibly out-of-range snapshot.
    pub fn normalize(&mut self) {
        self.resources.clamp_all();
        self.hf.clamp_all();
        self.decay_timers(0.0);
        for rotable in &mut self.rotables {
            rotable.condition = finite_or_zero(rotable.condition).clamp(0.0, 100.0);
        }
        for condition in self.tools.values_mut() {
            *condition = finite_or_zero(*condition).clamp(0.0, 100.0);
        }
        self.pet.hunger = finite_or_zero(self.pet.hunger).clamp(0.0, 100.0);
        self.pet.affection = finite_or_zero(self.pet.affection).clamp(0.0, 100.0);
        self.inventory.retain(|_, count| *count > 0);
        if let Some(max_id) = self.rotables.iter().map(|r| r.id).max() {
            self.next_rotable_id = self.next_rotable_id.max(max_id + 1);
        }
        if let Some(max_id) = self.mail.iter().map(|m| m.id).max() {
            self.next_mail_id = self.next_mail_id.max(max_id + 1);
        }
        if let Some(max_id) = self.orders.iter().map(|o| o.id).max() {
            self.next_order_id = self.next_order_id.max(max_id + 1);
        }
        self.clock_ms = finite_or_zero(self.clock_ms).max(0.0);
        self.log.normalize();
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    #[test]
    fn inventory_counts_add_and_remove() {
        let mut s = GameState::default();
        s.add_item("torque_wrench");
        s.add_item("torque_wrench");
        assert_eq!(s.item_count("torque_wrench"), 2);
        assert!(s.remove_item("torque_wrench"));
        assert!(s.remove_item("torque_wrench"));
        assert!(!s.remove_item("torque_wrench"));
        assert!(!s.inventory.contains_key("torque_wrench"));
    }

    #[test]
    fn timer_grant_sets_flag_and_decay_clears_it_once() {
        let mut s = GameState::default();
        s.grant_timer(TimerKind::Fear, 1500.0);
        assert!(s.flags.is_set(Flag::Afraid));
        assert!(s.decay_timers(1000.0).is_empty());
        assert!(s.flags.is_set(Flag::Afraid));
        assert_eq!(s.decay_timers(1000.0), vec![TimerKind::Fear]);
        assert!(!s.flags.is_set(Flag::Afraid));
        assert!(s.decay_timers(1000.0).is_empty());
    }

    #[test]
    fn grant_never_shortens() {
        let mut s = GameState::default();
        s.grant_timer(TimerKind::Ward, 5000.0);
        s.grant_timer(TimerKind::Ward, 100.0);
        assert_eq!(s.hf.timer(TimerKind::Ward), 5000.0);
    }

    #[test]
    fn normalize_clears_orphaned_timed_flags() {
        let mut s = GameState::default();
        s.flags.set(Flag::Hallucinating, true);
        s.flags.set(Flag::NightShift, true);
        s.resources.sanity = 180.0;
        s.normalize();
        assert!(!s.flags.is_set(Flag::Hallucinating));
        assert!(s.flags.is_set(Flag::NightShift));
        assert_eq!(s.resources.sanity, 100.0);
    }

    #[test]
    fn appended_rotables_get_fresh_ids() {
        let mut s = GameState::default();
        let a = s.append_rotable("fuel pump", 90.0);
        let b = s.append_rotable("starter generator", 140.0);
        assert_ne!(a, b);
        assert_eq!(s.rotable(b).map(|r| r.condition), Some(100.0));
    }
}
