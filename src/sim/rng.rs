//! Seeded race RNG - Mulberry32, portable across platforms and languages.
//!
//! Algorithm per draw:
//!   a += 0x6D2B79F5; t = (a ^ a >> 15) * (a | 1);
//!   t ^= t + (t ^ t >> 7) * (t | 61); out = t ^ t >> 14
//! All arithmetic wraps at 32 bits, so the sequence matches `Math.imul` ports bit for bit.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Independent draw sequences derived from one race seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Grid = 1,
    Ratings = 2,
    Variation = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceRng {
    state: u32,
}

impl RaceRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Generator for one named concern of a race
    pub fn stream(seed: u32, stream: Stream) -> Self {
        Self::new(seed ^ (stream as u32).wrapping_mul(0x9E37_79B9))
    }

    pub fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform in [0, 1)
    pub fn next_unit(&mut self) -> f64 {
        self.next() as f64 / 4_294_967_296.0
    }

    /// Uniform in [min, max)
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_unit()
    }

    /// Standard normal sample (Box-Muller, cosine branch)
    pub fn normal(&mut self) -> f64 {
        let u1 = 1.0 - self.next_unit(); // (0, 1], keeps ln finite
        let u2 = self.next_unit();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// In-place Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = ((self.next_unit() * (i + 1) as f64) as usize).min(i);
            items.swap(i, j);
        }
    }
}

impl RngCore for RaceRng {
    fn next_u32(&mut self) -> u32 {
        self.next()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next() as u64;
        let lo = self.next() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// Hash a text seed to 32 bits (FNV-1a with a murmur3 finalizer)
pub fn hash_seed(text: &str) -> u32 {
    let mut h: u32 = 0x811C_9DC5;
    for byte in text.bytes() {
        h ^= byte as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^ (h >> 16)
}
