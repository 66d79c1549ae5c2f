// crates/ea_core/src/rng.rs
//
// Seedable, integer-only RNG for lottery draws and fallback picks.
// Unbiased ranges via rejection sampling; explicit u64 -> ChaCha20 seed mapping
// so a recorded seed replays the same draws on any platform.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Source of randomness consumed by the allocators.
///
/// Only two shapes of draw exist: a full permutation of a candidate list
/// (lottery) and a single uniform pick (fallback course choice).
pub trait TieSource {
    /// Uniformly permute `slice` in place.
    fn shuffle<T>(&mut self, slice: &mut [T]);
    /// Uniform index in `[0, n)`; `None` if `n == 0`.
    fn choose_index(&mut self, n: usize) -> Option<usize>;
}

/// ChaCha20-backed draw source.
///
/// The 32-byte ChaCha seed is `seed.to_le_bytes()` in the first 8 bytes, the
/// remaining 24 bytes zero.
#[derive(Debug, Clone)]
pub struct TieRng {
    rng: ChaCha20Rng,
    seed: u64,
    words_consumed: u128,
}

impl TieRng {
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            rng: ChaCha20Rng::from_seed(seed32),
            seed,
            words_consumed: 0,
        }
    }

    /// Seed from operating-system entropy. The drawn seed is kept so the run
    /// record can carry it and the run can be replayed.
    #[cfg(feature = "entropy")]
    pub fn from_entropy() -> Self {
        Self::from_seed_u64(rand_core::OsRng.next_u64())
    }

    /// Seed this stream was built from.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of 64-bit words drawn so far (saturating).
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Unbiased integer in `[0, n)`; `None` if `n == 0`.
    ///
    /// `threshold = 2^64 mod n`; any word `x >= threshold` maps uniformly via `x % n`.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// In-place Fisher–Yates: for i in (1..len).rev() { j ~ U{0..=i}; swap(i, j) }.
    pub fn shuffle_in_place<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        if len <= 1 {
            return;
        }
        for i in (1..len).rev() {
            // i + 1 > 0, so the draw always succeeds
            let j = self.gen_range(i as u64 + 1).unwrap_or(0) as usize;
            slice.swap(i, j);
        }
    }
}

impl TieSource for TieRng {
    #[inline]
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        self.shuffle_in_place(slice)
    }

    #[inline]
    fn choose_index(&mut self, n: usize) -> Option<usize> {
        self.gen_range(n as u64).map(|v| v as usize)
    }
}
