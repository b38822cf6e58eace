//! Injectable randomness.
//!
//! The engine never reaches for a global generator. Production code uses
//! [`SimRng`] (ChaCha8, seeded); tests script exact draws with [`ScriptedRng`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`, or `None` when `len == 0`. Consumes one
    /// draw only when `len > 0`.
    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let idx = (self.next_f64() * len as f64) as usize;
        Some(idx.min(len - 1))
    }
}

/// Seeded ChaCha8 generator.
#[derive(Clone, Debug)]
pub struct SimRng(ChaCha8Rng);

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl RandomSource for SimRng {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, then returns `fallback` forever.
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    values: Vec<f64>,
    cursor: usize,
    fallback: f64,
}

impl ScriptedRng {
    /// The default fallback (0.999) makes exhausted scripts fail every
    /// ordinary probability gate.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            cursor: 0,
            fallback: 0.999,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        let v = self.values.get(self.cursor).copied().unwrap_or(self.fallback);
        self.cursor += 1;
        v
    }
}

/// Probability that a per-second rate fires within `delta_ms`, clamped to
/// `[0, cap]`. Non-finite inputs yield zero.
pub fn gate_probability(per_second: f64, delta_ms: f64, cap: f64) -> f64 {
    let p = per_second * (delta_ms / 1000.0);
    if !p.is_finite() {
        return 0.0;
    }
    let cap = if cap.is_finite() {
        cap.clamp(0.0, 1.0)
    } else {
        1.0
    };
    p.clamp(0.0, cap)
}

/// Bernoulli gate: fires when `uniform(0,1) < clamp(p * dt, 0, cap)`.
/// Zero-probability gates draw nothing.
pub fn gate(rng: &mut dyn RandomSource, per_second: f64, delta_ms: f64, cap: f64) -> bool {
    let p = gate_probability(per_second, delta_ms, cap);
    if p <= 0.0 {
        return false;
    }
    rng.next_f64() < p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sequences_repeat() {
        let mut a = SimRng::seed_from_u64(7);
        let mut b = SimRng::seed_from_u64(7);
        for _ in 0..16 {
            let (x, y) = (a.next_f64(), b.next_f64());
            assert_eq!(x, y);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn scripted_rng_replays_then_falls_back() {
        let mut rng = ScriptedRng::new([0.1, 0.5]).with_fallback(0.25);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.5);
        assert_eq!(rng.next_f64(), 0.25);
        assert_eq!(rng.consumed(), 3);
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = ScriptedRng::new([0.0, 0.5, 0.9999]);
        assert_eq!(rng.pick_index(4), Some(0));
        assert_eq!(rng.pick_index(4), Some(2));
        assert_eq!(rng.pick_index(4), Some(3));
        assert_eq!(rng.pick_index(0), None);
        assert_eq!(rng.consumed(), 3);
    }

    #[test]
    fn gate_scales_with_delta() {
        assert_eq!(gate_probability(0.01, 1000.0, 1.0), 0.01);
        assert_eq!(gate_probability(0.01, 500.0, 1.0), 0.005);
        let mut rng = ScriptedRng::new([0.004, 0.006]);
        assert!(gate(&mut rng, 0.01, 500.0, 1.0));
        assert!(!gate(&mut rng, 0.01, 500.0, 1.0));
    }

    #[test]
    fn long_suspension_is_clamped_to_cap() {
        // An hour-long delta pushes p * dt far past 1.
        assert_eq!(gate_probability(0.001, 3_600_000.0, 1.0), 1.0);
        let mut rng = ScriptedRng::new([0.9999]);
        assert!(gate(&mut rng, 0.001, 3_600_000.0, 1.0));

        assert_eq!(gate_probability(0.001, 3_600_000.0, 0.5), 0.5);
        let mut rng = ScriptedRng::new([0.6]);
        assert!(!gate(&mut rng, 0.001, 3_600_000.0, 0.5));
    }

    #[test]
    fn degenerate_inputs_never_fire() {
        let mut rng = ScriptedRng::new([0.0]);
        assert!(!gate(&mut rng, 0.0, 1000.0, 1.0));
        assert!(!gate(&mut rng, f64::NAN, 1000.0, 1.0));
        assert!(!gate(&mut rng, 0.5, -1000.0, 1.0));
        assert_eq!(rng.consumed(), 0);
    }
}
