//! Deterministic random stream utilities.
//!
//! Each engine owns one [`WeatherRng`] derived from the system seed and a
//! logical stage label. Streams for different stages never share state, so the
//! order in which engines draw numbers cannot leak between them and a given
//! sequence of ticks reproduces exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_seeder::Seeder;

#[derive(Clone, Debug)]
pub struct WeatherRng {
    inner: ChaCha8Rng,
}

impl WeatherRng {
    /// Construct a stream for the given `(seed, stage)` pair.
    pub fn from_stage(seed: u64, stage: &str) -> Self {
        let stream_id = mix64(
            seed.wrapping_mul(0xA0761D6478BD642F)
                .wrapping_add(0xE7037ED1A0B428DB)
                ^ stream_label(stage),
        );
        Self {
            inner: ChaCha8Rng::seed_from_u64(stream_id),
        }
    }

    /// Build a stream from a free-form seed phrase.
    pub fn from_phrase(phrase: &str) -> Self {
        Self {
            inner: Seeder::from(phrase).make_rng(),
        }
    }

    /// Deterministically derive a child stream identified by `label`.
    ///
    /// The parent is left untouched.
    pub fn derive(&self, label: &str) -> Self {
        let mut inner = self.inner.clone();
        inner.set_stream(mix64(stream_label(label) ^ 0x94D049BB133111EB));
        inner.set_word_pos(0);
        Self { inner }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.gen()
    }

    /// Sample in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Sample in `[-1, 1)`.
    pub fn signed_unit(&mut self) -> f32 {
        self.unit() * 2.0 - 1.0
    }

    /// Sample in `[lo, hi)`. Degenerate ranges collapse to `lo`.
    pub fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        let value = lo + (hi - lo) * self.unit();
        // Rounding can land exactly on `hi` when the span dwarfs `lo`.
        if value < hi {
            value
        } else {
            lo
        }
    }

    /// Bernoulli draw. Probabilities outside `[0, 1]` saturate.
    pub fn chance(&mut self, probability: f32) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.unit() < probability
    }

    /// Uniform index in `0..len`. Returns `None` for empty collections.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.inner.gen_range(0..len))
        }
    }

    /// Inclusive integer range.
    pub fn range_inclusive(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            lo
        } else {
            self.inner.gen_range(lo..=hi)
        }
    }

    /// Weighted pick over `weights`, ties resolved by order.
    ///
    /// Returns `None` when there are no positive weights.
    pub fn weighted_index<I>(&mut self, weights: I) -> Option<usize>
    where
        I: IntoIterator<Item = f32>,
        I::IntoIter: Clone,
    {
        let weights = weights.into_iter();
        let total: f32 = weights.clone().filter(|w| *w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let roll = self.unit() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (index, weight) in weights.enumerate() {
            if weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(index);
            if roll < cumulative {
                return Some(index);
            }
        }
        // Rounding can leave `roll` a hair above the final cumulative sum.
        last_positive
    }
}

/// Produce a deterministic label hash for deriving streams.
pub fn stream_label(name: &str) -> u64 {
    fnv1a64(name.as_bytes())
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
