//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG shared by the whole simulation run.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. The orchestrator owns exactly
//! one generator and advances it only at setup (spawn sampling, activation
//! order) and when sampling en-route delay. Nothing reseeds it mid-run.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::RngManager;
///
/// let mut rng = RngManager::new(2808);
/// let value = rng.next();
/// let range_value = rng.range(0, 100); // [0, 100)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves the all-zero state
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Get current RNG state (for snapshots/replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Sample uniformly from `[low, high)`
    ///
    /// A degenerate interval (`low == high`) still consumes one draw so that
    /// the number of draws per call site never depends on the sampled values.
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// let x = rng.uniform(9.5, 10.5);
    /// assert!(x >= 9.5 && x < 10.5);
    /// ```
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let u = self.next_f64();
        low + (high - low) * u
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range(0, i as i64 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Permutation of `0..n`
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(42);
    /// let mut order = rng.permutation(5);
    /// order.sort();
    /// assert_eq!(order, vec![0, 1, 2, 3, 4]);
    /// ```
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        self.shuffle(&mut order);
        order
    }

    /// Draw `k` indices from `0..n`
    ///
    /// Indices are distinct while `k <= n`; once the population is exhausted
    /// sampling starts over on a fresh permutation.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        if n == 0 {
            return Vec::new();
        }
        let mut picked = Vec::with_capacity(k);
        while picked.len() < k {
            let round = self.permutation(n);
            let take = (k - picked.len()).min(n);
            picked.extend_from_slice(&round[..take]);
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                (0.0..1.0).contains(&val),
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }

    #[test]
    fn test_uniform_degenerate_interval_consumes_draw() {
        let mut a = RngManager::new(5);
        let mut b = RngManager::new(5);

        assert_eq!(a.uniform(3.0, 3.0), 3.0);
        b.next();
        assert_eq!(a.get_state(), b.get_state());
    }

    #[test]
    fn test_sample_indices_distinct_when_possible() {
        let mut rng = RngManager::new(99);
        let mut picked = rng.sample_indices(6, 6);
        picked.sort();
        assert_eq!(picked, vec![0, 1, 2, 3, 4, 5]);

        let more = rng.sample_indices(3, 7);
        assert_eq!(more.len(), 7);
        assert!(more.iter().all(|&i| i < 3));
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = RngManager::new(2808);
        let mut items = vec!['a', 'b', 'c', 'd'];
        rng.shuffle(&mut items);
        items.sort();
        assert_eq!(items, vec!['a', 'b', 'c', 'd']);
    }
}
