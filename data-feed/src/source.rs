//! Injected capabilities: wall clock and uniform random draws.

#[cfg(not(target_arch = "wasm32"))]
use chrono::Utc;
use market_core::Timestamp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of "now" in Unix milliseconds.
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

/// Uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// `true` with probability `1 - threshold`, matching `random() > threshold`.
    fn above(&mut self, threshold: f64) -> bool {
        self.next_unit() > threshold
    }

    /// Uniform integer in `[0, upper)`.
    fn index(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        ((self.next_unit() * upper as f64) as usize).min(upper - 1)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        js_sys::Date::now() as i64
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        Utc::now().timestamp_millis()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now_ms(&self) -> Timestamp {
        self.0
    }
}

/// Seedable PRNG draws.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws in a loop.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Values outside `[0, 1)` are clamped into range.
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        let mut draws: Vec<f64> = draws.into();
        if draws.is_empty() {
            draws.push(0.0);
        }
        for d in draws.iter_mut() {
            *d = if d.is_nan() { 0.0 } else { d.clamp(0.0, 1.0 - f64::EPSILON) };
        }
        Self { draws, cursor: 0 }
    }

    /// Every draw returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let v = self.draws[self.cursor % self.draws.len()];
        self.cursor = self.cursor.wrapping_add(1);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_draws_are_reproducible_and_in_range() {
        let mut a = SeededRandom::new(7);
        let mut b = SeededRandom::new(7);
        for _ in 0..100 {
            let x = a.next_unit();
            assert_eq!(x, b.next_unit());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn scripted_draws_cycle_and_clamp() {
        let mut r = ScriptedRandom::new(vec![0.25, 1.5, -2.0]);
        assert_eq!(r.next_unit(), 0.25);
        assert!(r.next_unit() < 1.0);
        assert_eq!(r.next_unit(), 0.0);
        assert_eq!(r.next_unit(), 0.25);
    }

    #[test]
    fn index_stays_below_upper() {
        let mut r = ScriptedRandom::new(vec![0.0, 0.999_999, 0.5]);
        assert_eq!(r.index(4), 0);
        assert_eq!(r.index(4), 3);
        assert_eq!(r.index(4), 2);
        assert_eq!(r.index(0), 0);
    }

    #[test]
    fn system_clock_reads_wall_time() {
        // 2023-11-14, well before any machine running these tests.
        assert!(SystemClock.now_ms() > 1_700_000_000_000);
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let clock = FixedClock(1_700_000_000_000);
        assert_eq!(clock.now_ms(), clock.now_ms());
    }
}
