//! # Generators
//!
//! A generator turns chunk coordinates into terrain, in two phases:
//!
//! 1. **Generate**: [`Generator::generate_chunk`] builds a chunk from the
//!    world seed, the coordinate and the options alone. It touches no shared
//!    state, so chunks can be generated in any order, on any thread.
//! 2. **Populate**: [`Generator::populate_chunk`] decorates a generated
//!    chunk through its biome's populators. Decorations spill over chunk
//!    borders, so the chunk's 8 neighbours must be loaded too.
//!
//! Generators are looked up by name through the [`GeneratorManager`].

pub mod flat;
pub mod manager;
pub mod normal;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::biome::BiomeRegistry;
use crate::chunk::{Chunk, ChunkCoord, ChunkManager, CHUNK_SIZE};
use crate::error::{WorldGenError, WorldGenResult};
use crate::seed::WorldSeed;

pub use flat::{FlatGenerator, FlatPreset};
pub use manager::{factory, GeneratorFactory, GeneratorManager};
pub use normal::NormalGenerator;

/// Per-world generator settings, keyed by option name.
///
/// Values are opaque until a generator reads them through a typed getter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorOptions(toml::Table);

impl GeneratorOptions {
    /// No options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Whether the option is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Raw option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    /// String option.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` if present but not a string.
    pub fn get_str(&self, key: &str) -> WorldGenResult<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(type_mismatch(key, "a string", other)),
        }
    }

    /// Integer option.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` if present but not an integer.
    pub fn get_int(&self, key: &str) -> WorldGenResult<Option<i64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Integer(value)) => Ok(Some(*value)),
            Some(other) => Err(type_mismatch(key, "an integer", other)),
        }
    }

    /// Boolean option.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` if present but not a boolean.
    pub fn get_bool(&self, key: &str) -> WorldGenResult<Option<bool>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Boolean(value)) => Ok(Some(*value)),
            Some(other) => Err(type_mismatch(key, "a boolean", other)),
        }
    }
}

impl From<toml::Table> for GeneratorOptions {
    fn from(table: toml::Table) -> Self {
        Self(table)
    }
}

fn type_mismatch(key: &str, expected: &str, found: &toml::Value) -> WorldGenError {
    WorldGenError::InvalidGeneratorOptions(format!(
        "option `{key}` must be {expected}, found {}",
        found.type_str()
    ))
}

/// Local X and Z of the column whose biome decides a chunk's population.
pub const CENTRE_COLUMN: i32 = CHUNK_SIZE as i32 / 2 - 1;

/// Everything a generator is built from.
#[derive(Clone)]
pub struct GeneratorContext {
    /// World seed.
    pub seed: WorldSeed,
    /// Generator settings.
    pub options: GeneratorOptions,
    /// Shared biome table.
    pub biomes: Arc<BiomeRegistry>,
}

impl GeneratorContext {
    /// Creates a context.
    #[must_use]
    pub fn new(seed: WorldSeed, options: GeneratorOptions, biomes: Arc<BiomeRegistry>) -> Self {
        Self {
            seed,
            options,
            biomes,
        }
    }
}

impl fmt::Debug for GeneratorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorContext")
            .field("seed", &self.seed)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A world generator.
///
/// Implementations are immutable after construction and shared across
/// worker threads.
pub trait Generator: Send + Sync {
    /// Registered name.
    fn name(&self) -> &str;

    /// Seed, options and biomes this generator was built from.
    fn context(&self) -> &GeneratorContext;

    /// Builds the terrain of one chunk.
    ///
    /// Must depend only on the seed, `coord` and the options. Any
    /// randomness comes from [`WorldSeed::chunk_rng`].
    ///
    /// # Errors
    ///
    /// Generator specific. The built-in generators refuse chunks past
    /// [`ChunkCoord::GENERATION_LIMIT`] with `ChunkOutOfRange`.
    fn generate_chunk(&self, coord: ChunkCoord) -> WorldGenResult<Chunk>;

    /// Decorates a generated chunk with its biome's populators.
    ///
    /// The biome is the one at the chunk's centre column. The random stream
    /// is [`WorldSeed::population_rng`] for `coord`.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` past [`ChunkCoord::POPULATION_LIMIT`],
    /// `ChunkNotLoaded` if the chunk or one of its neighbours is missing from
    /// `world`, `PopulatorFailed` if a populator fails.
    fn populate_chunk(&self, world: &mut dyn ChunkManager, coord: ChunkCoord) -> WorldGenResult<()> {
        coord.check_populatable()?;
        for required in coord.neighbourhood() {
            if world.chunk(required).is_none() {
                return Err(WorldGenError::ChunkNotLoaded(required));
            }
        }

        let context = self.context();
        let biome_id = world
            .biome_id_at(coord.world_x() + CENTRE_COLUMN, coord.world_z() + CENTRE_COLUMN)
            .ok_or(WorldGenError::ChunkNotLoaded(coord))?;
        let biome = context.biomes.get(biome_id);

        trace!(generator = self.name(), %coord, biome = biome.name(), "populating");
        let mut random = context.seed.population_rng(coord);
        biome.populate_chunk(world, coord, &mut random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> GeneratorOptions {
        let table: toml::Table = toml::from_str(
            r#"
            preset = "2;bedrock;1;"
            sea_level = 40
            caves = true
            "#,
        )
        .unwrap();
        table.into()
    }

    #[test]
    fn test_typed_getters() {
        let options = options();

        assert_eq!(options.get_str("preset").unwrap(), Some("2;bedrock;1;"));
        assert_eq!(options.get_int("sea_level").unwrap(), Some(40));
        assert_eq!(options.get_bool("caves").unwrap(), Some(true));
        assert_eq!(options.get_str("missing").unwrap(), None);
        assert!(options.contains("caves"));
    }

    #[test]
    fn test_type_mismatch_is_invalid_options() {
        let options = options();

        assert!(matches!(
            options.get_int("preset"),
            Err(WorldGenError::InvalidGeneratorOptions(msg)) if msg.contains("preset")
        ));
        assert!(options.get_str("sea_level").is_err());
        assert!(options.get_bool("sea_level").is_err());
    }

    #[test]
    fn test_builder() {
        let options = GeneratorOptions::new().with("sea_level", 70).with("preset", "x");
        assert_eq!(options.get_int("sea_level").unwrap(), Some(70));
        assert_eq!(options.get_str("preset").unwrap(), Some("x"));
    }
}
