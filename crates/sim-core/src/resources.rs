//! Resource pools and their clamping rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Addressable resource fields. Content tables refer to resources by these keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    /// Percentage resource in [0,100].
    Sanity,
    /// Percentage resource in [0,100].
    Suspicion,
    /// Percentage resource in [0,100].
    Focus,
    Credits,
    Experience,
    /// Sheet aluminium stock.
    Alclad,
    Titanium,
    /// Rare currency.
    Fragments,
    /// Rare currency.
    Residue,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 9] = [
        ResourceKey::Sanity,
        ResourceKey::Suspicion,
        ResourceKey::Focus,
        ResourceKey::Credits,
        ResourceKey::Experience,
        ResourceKey::Alclad,
        ResourceKey::Titanium,
        ResourceKey::Fragments,
        ResourceKey::Residue,
    ];

    /// Percentage resources are bounded above by 100.
    pub fn is_percentage(self) -> bool {
        matches!(
            self,
            ResourceKey::Sanity | ResourceKey::Suspicion | ResourceKey::Focus
        )
    }

    /// Inclusive clamp range for this resource.
    pub fn bounds(self) -> (f64, f64) {
        if self.is_percentage() {
            (0.0, 100.0)
        } else {
            (0.0, f64::INFINITY)
        }
    }
}

/// Additive resource bundle keyed by resource.
pub type ResourceDelta = BTreeMap<ResourceKey, f64>;

/// Highest reachable level. Experience past it simply accumulates.
pub const MAX_LEVEL: u32 = 10_000;

/// Experience required to advance from `level` to `level + 1`: `floor(1000 * level^1.5)`.
pub fn xp_for_next_level(level: u32) -> f64 {
    (1000.0 * f64::from(level.max(1)).powf(1.5)).floor()
}

/// Player resources. Every write goes through [`ResourceState::add`] or
/// [`ResourceState::set`], which clamp to [`ResourceKey::bounds`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub sanity: f64,
    pub suspicion: f64,
    pub focus: f64,
    pub credits: f64,
    pub experience: f64,
    pub alclad: f64,
    pub titanium: f64,
    pub fragments: f64,
    pub residue: f64,
    /// Never decreases.
    pub level: u32,
    pub skill_points: u32,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            sanity: 100.0,
            suspicion: 0.0,
            focus: 100.0,
            credits: 0.0,
            experience: 0.0,
            alclad: 0.0,
            titanium: 0.0,
            fragments: 0.0,
            residue: 0.0,
            level: 1,
            skill_points: 0,
        }
    }
}

impl ResourceState {
    pub fn get(&self, key: ResourceKey) -> f64 {
        match key {
            ResourceKey::Sanity => self.sanity,
            ResourceKey::Suspicion => self.suspicion,
            ResourceKey::Focus => self.focus,
            ResourceKey::Credits => self.credits,
            ResourceKey::Experience => self.experience,
            ResourceKey::Alclad => self.alclad,
            ResourceKey::Titanium => self.titanium,
            ResourceKey::Fragments => self.fragments,
            ResourceKey::Residue => self.residue,
        }
    }

    fn slot_mut(&mut self, key: ResourceKey) -> &mut f64 {
        match key {
            ResourceKey::Sanity => &mut self.sanity,
            ResourceKey::Suspicion => &mut self.suspicion,
            ResourceKey::Focus => &mut self.focus,
            ResourceKey::Credits => &mut self.credits,
            ResourceKey::Experience => &mut self.experience,
            ResourceKey::Alclad => &mut self.alclad,
            ResourceKey::Titanium => &mut self.titanium,
            ResourceKey::Fragments => &mut self.fragments,
            ResourceKey::Residue => &mut self.residue,
        }
    }

    /// Add `delta` to a resource, clamping the result. Returns the change that
    /// was actually applied. Non-finite deltas are discarded.
    pub fn add(&mut self, key: ResourceKey, delta: f64) -> f64 {
        if !delta.is_finite() {
            warn!(?key, delta, "discarding non-finite resource delta");
            return 0.0;
        }
        let (lo, hi) = key.bounds();
        let slot = self.slot_mut(key);
        let before = *slot;
        *slot = (before + delta).clamp(lo, hi);
        *slot - before
    }

    /// Overwrite a resource, clamping to its range.
    pub fn set(&mut self, key: ResourceKey, value: f64) {
        if !value.is_finite() {
            warn!(?key, value, "discarding non-finite resource value");
            return;
        }
        let (lo, hi) = key.bounds();
        *self.slot_mut(key) = value.clamp(lo, hi);
    }

    /// Merge a bundle of deltas, each multiplied by `scale`.
    pub fn merge(&mut self, delta: &ResourceDelta, scale: f64) {
        for (key, amount) in delta {
            self.add(*key, amount * scale);
        }
    }

    /// Whether every amount in `cost` is currently available.
    pub fn can_afford(&self, cost: &ResourceDelta) -> bool {
        cost.iter().all(|(key, amount)| self.get(*key) >= *amount)
    }

    /// Deduct `cost`. Callers check [`ResourceState::can_afford`] first.
    pub fn pay(&mut self, cost: &ResourceDelta) {
        for (key, amount) in cost {
            self.add(*key, -amount);
        }
    }

    /// Re-apply clamping to every field, e.g. after importing a snapshot.
    pub fn clamp_all(&mut self) {
        for key in ResourceKey::ALL {
            let value = self.get(key);
            if value.is_finite() {
                self.set(key, value);
            } else {
                *self.slot_mut(key) = 0.0;
            }
        }
        self.level = self.level.clamp(1, MAX_LEVEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn xp_curve_matches_formula() {
        assert_eq!(xp_for_next_level(1), 1000.0);
        assert_eq!(xp_for_next_level(2), 2828.0);
        assert_eq!(xp_for_next_level(4), 8000.0);
    }

    #[test]
    fn clamp_all_bounds_the_level() {
        let mut r = ResourceState {
            level: u32::MAX,
            ..ResourceState::default()
        };
        r.clamp_all();
        assert_eq!(r.level, MAX_LEVEL);
        r.level = 0;
        r.clamp_all();
        assert_eq!(r.level, 1);
    }

    #[test]
    fn percentage_resources_saturate() {
        let mut r = ResourceState::default();
        assert_eq!(r.add(ResourceKey::Sanity, 25.0), 0.0);
        assert_eq!(r.sanity, 100.0);
        assert_eq!(r.add(ResourceKey::Suspicion, -10.0), 0.0);
        r.add(ResourceKey::Suspicion, 130.0);
        assert_eq!(r.suspicion, 100.0);
    }

    #[test]
    fn accumulators_never_go_negative() {
        let mut r = ResourceState::default();
        r.add(ResourceKey::Credits, 10.0);
        let applied = r.add(ResourceKey::Credits, -25.0);
        assert_eq!(applied, -10.0);
        assert_eq!(r.credits, 0.0);
        r.add(ResourceKey::Residue, 1e12);
        assert_eq!(r.residue, 1e12);
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let mut r = ResourceState::default();
        r.add(ResourceKey::Focus, f64::NAN);
        r.add(ResourceKey::Credits, f64::INFINITY);
        assert_eq!(r.focus, 100.0);
        assert_eq!(r.credits, 0.0);
    }

    #[test]
    fn affordability_and_payment() {
        let mut r = ResourceState {
            credits: 50.0,
            alclad: 3.0,
            ..Default::default()
        };
        let cost: ResourceDelta = [(ResourceKey::Credits, 40.0), (ResourceKey::Alclad, 3.0)]
            .into_iter()
            .collect();
        assert!(r.can_afford(&cost));
        r.pay(&cost);
        assert_eq!(r.credits, 10.0);
        assert_eq!(r.alclad, 0.0);
        assert!(!r.can_afford(&cost));
    }

    proptest! {
        #[test]
        fn merges_stay_in_bounds(
            deltas in proptest::collection::vec((0usize..9, -500.0f64..500.0), 0..64),
        ) {
            let mut r = ResourceState::default();
            for (idx, amount) in deltas {
                r.add(ResourceKey::ALL[idx], amount);
            }
            for key in ResourceKey::ALL {
                let (lo, hi) = key.bounds();
                let v = r.get(key);
                prop_assert!(v >= lo && v <= hi, "{key:?} = {v}");
            }
        }
    }
}
