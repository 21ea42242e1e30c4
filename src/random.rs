//! Injectable randomness.
//!
//! The history generator and the fallback derivation only ever need uniform
//! draws from `[0, 1)`, so that is the whole surface of `RandomSource`.

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::sync::Mutex;

/// A uniform random source over `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;

    /// Uniform draw from `[low, high)`.
    fn uniform(&self, low: f64, high: f64) -> f64 {
        low + self.next_f64() * (high - low)
    }
}

/// Thread-local OS-seeded entropy. Used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        thread_rng().gen::<f64>()
    }
}

/// Reproducible generator seeded from configuration.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        // A poisoned lock still holds a usable generator.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen::<f64>()
    }
}

/// Always returns the same draw.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

#[cfg(test)]
impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
#[cfg(test)]
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: Mutex<usize>,
}

#[cfg(test)]
impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "sequence needs at least one value");
        Self {
            values,
            cursor: Mutex::new(0),
        }
    }
}

#[cfg(test)]
impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        let mut cursor = self.cursor.lock().unwrap();
        let value = self.values[*cursor % self.values.len()];
        *cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_maps_unit_interval() {
        assert_eq!(FixedRandom(0.0).uniform(40.0, 70.0), 40.0);
        assert_eq!(FixedRandom(0.5).uniform(-4.0, 4.0), 0.0);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let draws_a: Vec<f64> = (0..5).map(|_| a.next_f64()).collect();
        let draws_b: Vec<f64> = (0..5).map(|_| b.next_f64()).collect();
        assert_eq!(draws_a, draws_b);
        assert!(draws_a.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_sequence_random_cycles() {
        let seq = SequenceRandom::new(vec![0.1, 0.9]);
        assert_eq!(seq.next_f64(), 0.1);
        assert_eq!(seq.next_f64(), 0.9);
        assert_eq!(seq.next_f64(), 0.1);
    }

    #[test]
    fn test_thread_random_in_range() {
        let random = ThreadRandom;
        for _ in 0..100 {
            let v = random.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
