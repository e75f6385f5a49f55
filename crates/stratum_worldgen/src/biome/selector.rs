//! # Biome Selection
//!
//! Picks a biome for each world column from two climate channels:
//! - temperature, from one noise field,
//! - rainfall, from a second, independent one.
//!
//! The climate-to-biome mapping is baked into a 64x64 table when the
//! selector is built, so `pick` is two noise samples and one array read.

use crate::noise::SimplexNoise;
use crate::seed::WorldSeed;

use super::BiomeId;

/// Picks a biome id per world column.
pub struct BiomeSelector {
    temperature: SimplexNoise,
    rainfall: SimplexNoise,
    /// Indexed by `[rainfall][temperature]`, each quantised to 0..64.
    map: Box<[[BiomeId; Self::RESOLUTION]; Self::RESOLUTION]>,
}

impl BiomeSelector {
    /// Climate quantisation steps per axis.
    pub const RESOLUTION: usize = 64;

    /// Blocks per unit of noise input; larger means broader climate zones.
    const SCALE: f64 = 1.0 / 512.0;

    /// Octaves per climate channel.
    const OCTAVES: u32 = 2;

    /// Purpose tags for [`WorldSeed::derive`].
    const TEMPERATURE_PURPOSE: u64 = 0x7e3a;
    const RAINFALL_PURPOSE: u64 = 0x4a17;

    /// Creates a selector for a world.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        let mut map = Box::new([[BiomeId::OCEAN; Self::RESOLUTION]; Self::RESOLUTION]);
        let step = (Self::RESOLUTION - 1) as f64;
        for (r, row) in map.iter_mut().enumerate() {
            for (t, slot) in row.iter_mut().enumerate() {
                *slot = Self::lookup(t as f64 / step, r as f64 / step);
            }
        }

        Self {
            temperature: SimplexNoise::new(seed.derive(Self::TEMPERATURE_PURPOSE)),
            rainfall: SimplexNoise::new(seed.derive(Self::RAINFALL_PURPOSE)),
            map,
        }
    }

    /// Climate mapping used to fill the table. Both inputs are in `[0, 1]`.
    #[must_use]
    pub fn lookup(temperature: f64, rainfall: f64) -> BiomeId {
        if rainfall < 0.25 {
            if temperature < 0.7 {
                BiomeId::OCEAN
            } else if temperature < 0.85 {
                BiomeId::RIVER
            } else {
                BiomeId::SWAMP
            }
        } else if rainfall < 0.60 {
            if temperature < 0.25 {
                BiomeId::ICE_PLAINS
            } else if temperature < 0.75 {
                BiomeId::PLAINS
            } else {
                BiomeId::DESERT
            }
        } else if rainfall < 0.80 {
            if temperature < 0.25 {
                BiomeId::TAIGA
            } else if temperature < 0.75 {
                BiomeId::FOREST
            } else {
                BiomeId::BIRCH_FOREST
            }
        } else if temperature < 0.20 {
            BiomeId::MOUNTAINS
        } else if temperature < 0.40 {
            BiomeId::SMALL_MOUNTAINS
        } else {
            BiomeId::RIVER
        }
    }

    /// Temperature at a world column, in `[0, 1]`.
    #[must_use]
    pub fn temperature(&self, x: i32, z: i32) -> f64 {
        self.temperature
            .unit(f64::from(x) * Self::SCALE, f64::from(z) * Self::SCALE, Self::OCTAVES)
    }

    /// Rainfall at a world column, in `[0, 1]`.
    #[must_use]
    pub fn rainfall(&self, x: i32, z: i32) -> f64 {
        self.rainfall
            .unit(f64::from(x) * Self::SCALE, f64::from(z) * Self::SCALE, Self::OCTAVES)
    }

    /// Biome id for a world column.
    #[must_use]
    pub fn pick(&self, x: i32, z: i32) -> BiomeId {
        let step = (Self::RESOLUTION - 1) as f64;
        let t = (self.temperature(x, z) * step) as usize;
        let r = (self.rainfall(x, z) * step) as usize;
        self.map[r.min(Self::RESOLUTION - 1)][t.min(Self::RESOLUTION - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_selection_is_deterministic() {
        let a = BiomeSelector::new(WorldSeed::new(42));
        let b = BiomeSelector::new(WorldSeed::new(42));

        for i in -50..50 {
            let (x, z) = (i * 97, i * -61);
            assert_eq!(a.pick(x, z), b.pick(x, z));
        }
    }

    #[test]
    fn test_climate_in_unit_range() {
        let selector = BiomeSelector::new(WorldSeed::new(7));

        for i in -500..500 {
            let t = selector.temperature(i * 13, i * 7);
            let r = selector.rainfall(i * 7, i * -13);
            assert!((0.0..=1.0).contains(&t), "temperature {t}");
            assert!((0.0..=1.0).contains(&r), "rainfall {r}");
        }
    }

    #[test]
    fn test_lookup_thresholds() {
        assert_eq!(BiomeSelector::lookup(0.0, 0.0), BiomeId::OCEAN);
        assert_eq!(BiomeSelector::lookup(0.8, 0.1), BiomeId::RIVER);
        assert_eq!(BiomeSelector::lookup(0.9, 0.1), BiomeId::SWAMP);
        assert_eq!(BiomeSelector::lookup(0.1, 0.5), BiomeId::ICE_PLAINS);
        assert_eq!(BiomeSelector::lookup(0.5, 0.5), BiomeId::PLAINS);
        assert_eq!(BiomeSelector::lookup(0.9, 0.5), BiomeId::DESERT);
        assert_eq!(BiomeSelector::lookup(0.1, 0.7), BiomeId::TAIGA);
        assert_eq!(BiomeSelector::lookup(0.5, 0.7), BiomeId::FOREST);
        assert_eq!(BiomeSelector::lookup(0.9, 0.7), BiomeId::BIRCH_FOREST);
        assert_eq!(BiomeSelector::lookup(0.1, 0.9), BiomeId::MOUNTAINS);
        assert_eq!(BiomeSelector::lookup(0.3, 0.9), BiomeId::SMALL_MOUNTAINS);
        assert_eq!(BiomeSelector::lookup(0.5, 0.9), BiomeId::RIVER);
    }

    #[test]
    fn test_several_biomes_over_a_large_area() {
        let selector = BiomeSelector::new(WorldSeed::new(12345));
        let mut found = HashSet::new();

        for x in (-4000..4000).step_by(64) {
            for z in (-4000..4000).step_by(64) {
                found.insert(selector.pick(x, z));
            }
        }

        assert!(found.len() >= 3, "found only {found:?}");
    }
}
