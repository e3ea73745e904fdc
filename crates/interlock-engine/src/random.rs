//! Deterministic pseudo-random numbers.
//!
//! [`SeededRandom`] is a small linear congruential generator. It is not
//! statistically strong, but it is identical on every platform and
//! cheap enough to instantiate once per edge, which is what keeps a
//! knob and its facing hole congruent: both faces replay the same
//! stream from the same seed.

/// LCG multiplier.
const MULTIPLIER: u64 = 9301;

/// LCG increment.
const INCREMENT: u64 = 49_297;

/// LCG modulus. Every output is a multiple of `1 / MODULUS`.
const MODULUS: u64 = 233_280;

/// Linear congruential generator producing values in `[0, 1)`.
///
/// `state = (state * 9301 + 49297) mod 233280`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed as u64 }
    }

    /// Next value in `[0, 1)`.
    #[allow(clippy::cast_precision_loss, clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Next value in `[min, max)`.
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        self.next().mul_add(max - min, min)
    }

    /// Next integer in `[min, max]` (both inclusive).
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        #[allow(clippy::cast_precision_loss)]
        let span = (max - min + 1) as f64;
        (self.next() * span).floor() as i64 + min
    }

    /// Discard `count` values.
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.next();
        }
    }
}

/// `SplitMix32` finaliser: a cheap bijective scrambler over `u32`.
#[must_use]
pub const fn splitmix32(mut value: u32) -> u32 {
    value = value.wrapping_add(0x9E37_79B9);
    let mut z = value;
    z = (z ^ (z >> 16)).wrapping_mul(0x85EB_CA6B);
    z = (z ^ (z >> 13)).wrapping_mul(0xC2B2_AE35);
    z ^ (z >> 16)
}

/// Derive a child seed from a parent seed and a salt.
///
/// Distinct salts under the same parent give unrelated children, and
/// the same pair always gives the same child.
#[must_use]
pub const fn mix_seed(seed: u32, salt: u32) -> u32 {
    splitmix32(seed ^ splitmix32(salt))
}
