//! The standard biome set.

use super::{BiomeDefinition, BiomeId, BiomeRegistry};
use crate::chunk::Block;
use crate::populator::{TallGrass, TreeKind, Trees};

/// Grass over four dirt.
fn grassy() -> [Block; 5] {
    [Block::GRASS, Block::DIRT, Block::DIRT, Block::DIRT, Block::DIRT]
}

/// Snow layer over grass over three dirt.
fn snowy() -> [Block; 5] {
    [Block::SNOW_LAYER, Block::GRASS, Block::DIRT, Block::DIRT, Block::DIRT]
}

fn mountains(name: &'static str, max_elevation: i32) -> BiomeDefinition {
    BiomeDefinition::new(name)
        .elevation(63, max_elevation)
        .climate(0.4, 0.5)
        .ground_cover(grassy())
        .populator(Trees::new(TreeKind::Oak, 1, 0))
        .populator(TallGrass::new(1, 0))
}

/// Every built-in biome with its id.
#[must_use]
pub fn definitions() -> Vec<(BiomeId, BiomeDefinition)> {
    vec![
        (
            BiomeId::OCEAN,
            BiomeDefinition::new("Ocean")
                .elevation(46, 58)
                .ground_cover([Block::GRAVEL; 5])
                .populator(TallGrass::new(5, 0)),
        ),
        (
            BiomeId::PLAINS,
            BiomeDefinition::new("Plains")
                .elevation(63, 68)
                .climate(0.8, 0.4)
                .ground_cover(grassy())
                .populator(TallGrass::new(12, 0)),
        ),
        (
            BiomeId::DESERT,
            BiomeDefinition::new("Desert")
                .elevation(63, 74)
                .climate(1.0, 0.0)
                .ground_cover([
                    Block::SAND,
                    Block::SAND,
                    Block::SANDSTONE,
                    Block::SANDSTONE,
                    Block::SANDSTONE,
                ]),
        ),
        (BiomeId::MOUNTAINS, mountains("Mountains", 127)),
        (
            BiomeId::FOREST,
            BiomeDefinition::new("Forest")
                .elevation(63, 81)
                .climate(0.7, 0.8)
                .ground_cover(grassy())
                .populator(Trees::new(TreeKind::Oak, 5, 3))
                .populator(TallGrass::new(3, 0)),
        ),
        (
            BiomeId::TAIGA,
            BiomeDefinition::new("Taiga")
                .elevation(63, 81)
                .climate(0.05, 0.8)
                .ground_cover(snowy())
                .populator(Trees::new(TreeKind::Spruce, 10, 1))
                .populator(TallGrass::new(1, 1)),
        ),
        (
            BiomeId::SWAMP,
            BiomeDefinition::new("Swamp")
                .elevation(62, 63)
                .climate(0.8, 0.9)
                .ground_cover(grassy()),
        ),
        (
            BiomeId::RIVER,
            BiomeDefinition::new("River")
                .elevation(58, 62)
                .climate(0.5, 0.7)
                .ground_cover(grassy())
                .populator(TallGrass::new(5, 0)),
        ),
        (
            BiomeId::ICE_PLAINS,
            BiomeDefinition::new("Ice Plains")
                .elevation(63, 74)
                .climate(0.05, 0.8)
                .ground_cover(snowy())
                .populator(TallGrass::new(5, 0)),
        ),
        (BiomeId::SMALL_MOUNTAINS, mountains("Small Mountains", 97)),
        (
            BiomeId::BIRCH_FOREST,
            BiomeDefinition::new("Birch Forest")
                .elevation(63, 81)
                .climate(0.6, 0.5)
                .ground_cover(grassy())
                .populator(Trees::new(TreeKind::Birch, 5, 3))
                .populator(TallGrass::new(3, 0)),
        ),
    ]
}

/// Registers every built-in biome.
pub fn register_all(registry: &mut BiomeRegistry) {
    for (id, definition) in definitions() {
        registry.register(id, definition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_biomes_follow_conventions() {
        let registry = BiomeRegistry::with_builtin();
        for biome in registry.iter() {
            assert!(biome.diagnostics().is_empty(), "{biome:?}");
            assert_eq!(biome.ground_cover().len(), 5, "{}", biome.name());
        }
    }

    #[test]
    fn test_hell_is_not_builtin() {
        assert!(definitions().iter().all(|(id, _)| *id != BiomeId::HELL));
        assert_eq!(definitions().len(), 11);
    }

    #[test]
    fn test_populator_lists() {
        let registry = BiomeRegistry::with_builtin();
        let names = |id| -> Vec<String> {
            registry
                .get(id)
                .populators()
                .iter()
                .map(|p| p.name().to_owned())
                .collect()
        };

        assert_eq!(names(BiomeId::TAIGA), ["spruce_trees", "tall_grass"]);
        assert_eq!(names(BiomeId::PLAINS), ["tall_grass"]);
        assert!(names(BiomeId::DESERT).is_empty());
        assert!(names(BiomeId::SWAMP).is_empty());
    }
}
