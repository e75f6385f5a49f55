//! # Seeds
//!
//! Turns what a player typed into a world seed, and derives independent
//! random streams from that seed.
//!
//! ## Determinism Guarantee
//!
//! Every stream is a `ChaCha8Rng` seeded through `SeedableRng::seed_from_u64`,
//! whose expansion is fixed by `rand_core`. Given the same `WorldSeed`, the
//! same purpose and the same chunk, the stream is **exactly** the same on any
//! platform, any thread, any run.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::chunk::ChunkCoord;

/// Converts a seed string into an integer seed.
///
/// - `""` gives `None`: the caller picks a random seed. `0` is a real seed,
///   so an empty string cannot map to it.
/// - An optional `-` followed by ASCII digits is taken as that integer.
///   Values beyond the `i64` range saturate. Strings like `"404.4"` don't
///   qualify and are hashed instead.
/// - Anything else is hashed with [`string_hash`].
#[must_use]
pub fn convert_seed(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }

    // A single trailing newline is tolerated after an integer literal.
    let literal = text.strip_suffix('\n').unwrap_or(text);
    if is_integer_literal(literal) {
        return Some(parse_saturating(literal));
    }

    Some(i64::from(string_hash(text)))
}

/// The classic 31-multiplier string hash: `h = 31 * h + c` over Unicode
/// codepoints, wrapping at 32 bits.
///
/// Each `char` counts once, so characters outside the Basic Multilingual
/// Plane are not split into surrogate halves.
#[must_use]
pub fn string_hash(text: &str) -> i32 {
    text.chars()
        .fold(0i32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i32))
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_saturating(literal: &str) -> i64 {
    // Only overflow can fail here; the literal is already validated.
    literal.parse().unwrap_or(if literal.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(i64);

impl WorldSeed {
    /// Multiplier for seed mixing.
    const MIX: u64 = 0x517c_c1b7_2722_0a95;

    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: i64) -> Self {
        Self(seed)
    }

    /// Picks a fresh seed from OS entropy, for worlds created without one.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., terrain, biomes).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0 as u64;
        hash ^= purpose;
        hash = hash.wrapping_mul(Self::MIX);
        hash ^= hash >> 32;
        Self(hash as i64)
    }

    /// Derives the sub-seed for one chunk and one purpose.
    #[inline]
    #[must_use]
    pub const fn chunk_seed(self, coord: ChunkCoord, purpose: u64) -> u64 {
        let mut hash = self.derive(purpose).0 as u64;
        hash ^= (coord.x as u32 as u64) | ((coord.z as u32 as u64) << 32);
        hash = hash.wrapping_mul(Self::MIX);
        hash ^= hash >> 29;
        hash = hash.wrapping_mul(Self::MIX);
        hash ^ (hash >> 32)
    }

    /// Seed used to populate a chunk: `0xdeadbeef ^ (x << 8) ^ z ^ seed`.
    #[inline]
    #[must_use]
    pub const fn population_seed(self, coord: ChunkCoord) -> u64 {
        (0xdead_beef_i64 ^ ((coord.x as i64) << 8) ^ (coord.z as i64) ^ self.0) as u64
    }

    /// World-wide random stream for one purpose.
    #[must_use]
    pub fn rng(self, purpose: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive(purpose).0 as u64)
    }

    /// Random stream for one chunk and one purpose.
    ///
    /// Independent of generation order and of which thread asks for it.
    #[must_use]
    pub fn chunk_rng(self, coord: ChunkCoord, purpose: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.chunk_seed(coord, purpose))
    }

    /// Random stream handed to a chunk's populators.
    #[must_use]
    pub fn population_rng(self, coord: ChunkCoord) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.population_seed(coord))
    }
}

impl From<i64> for WorldSeed {
    fn from(seed: i64) -> Self {
        Self(seed)
    }
}

impl fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_empty_seed_means_random() {
        assert_eq!(convert_seed(""), None);
    }

    #[test]
    fn test_integer_seeds_parse_exactly() {
        assert_eq!(convert_seed("12345"), Some(12345));
        assert_eq!(convert_seed("-42"), Some(-42));
        assert_eq!(convert_seed("0"), Some(0));
        assert_eq!(convert_seed("-0"), Some(0));
        assert_eq!(convert_seed("007"), Some(7));
        assert_eq!(convert_seed("123\n"), Some(123));
    }

    #[test]
    fn test_integer_seeds_saturate() {
        assert_eq!(convert_seed("99999999999999999999"), Some(i64::MAX));
        assert_eq!(convert_seed("-99999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn test_numeric_looking_strings_are_hashed() {
        let seed = convert_seed("404.4");
        assert_eq!(seed, Some(i64::from(string_hash("404.4"))));
        assert_ne!(seed, Some(404));
        assert_eq!(convert_seed("404.4"), seed, "hash path must be deterministic");

        for text in ["-", "+5", " 5", "5 ", "1e3", "0x10", "--1"] {
            assert_eq!(
                convert_seed(text),
                Some(i64::from(string_hash(text))),
                "{text:?} should take the hash path"
            );
        }
    }

    #[test]
    fn test_string_hash_reference_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("hello"), 99_162_322);
        assert_eq!(convert_seed("hello"), Some(99_162_322));
        // Overflows and wraps negative
        assert_eq!(string_hash("polygenelubricants"), i32::MIN);
        assert_eq!(string_hash("é"), 0xE9);
    }

    #[test]
    fn test_astral_characters_hash_as_one_codepoint() {
        // U+1F600 is a single char, not a surrogate pair
        assert_eq!(string_hash("\u{1F600}"), 0x1F600);
        assert_eq!(convert_seed("\u{1F600}"), Some(128_512));
        assert_eq!(string_hash("a\u{1F600}"), 97 * 31 + 0x1F600);
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        let derived1 = base.derive(1);
        let derived2 = base.derive(2);
        let derived1_again = base.derive(1);

        assert_ne!(derived1, derived2, "Different purposes should give different seeds");
        assert_eq!(derived1, derived1_again, "Same purpose should give same seed");
        assert_ne!(derived1, base, "Derived seed should differ from base");
    }

    #[test]
    fn test_chunk_seeds_are_distinct_and_stable() {
        let seed = WorldSeed::new(-7);
        let a = seed.chunk_seed(ChunkCoord::new(0, 1), 1);
        let b = seed.chunk_seed(ChunkCoord::new(1, 0), 1);
        let c = seed.chunk_seed(ChunkCoord::new(0, 1), 2);

        assert_ne!(a, b, "Swapped coordinates must not collide");
        assert_ne!(a, c, "Purposes must not collide");
        assert_eq!(a, seed.chunk_seed(ChunkCoord::new(0, 1), 1));
    }

    #[test]
    fn test_chunk_rng_reproducible() {
        let seed = WorldSeed::new(12345);
        let coord = ChunkCoord::new(-3, 9);

        let mut first = seed.chunk_rng(coord, 5);
        let mut second = seed.chunk_rng(coord, 5);
        for _ in 0..64 {
            assert_eq!(first.next_u64(), second.next_u64());
        }
    }

    #[test]
    fn test_population_seed_formula() {
        let seed = WorldSeed::new(100);
        let coord = ChunkCoord::new(2, -1);
        let expected = (0xdead_beef_i64 ^ (2 << 8) ^ -1 ^ 100) as u64;
        assert_eq!(seed.population_seed(coord), expected);
    }
}
