//! # World Generation Config
//!
//! ```toml
//! seed = "hello"
//! generator = "flat"
//!
//! [options]
//! preset = "2;bedrock,3xstone,grass;1;"
//!
//! [pipeline]
//! workers = 8
//! task_timeout_ms = 2000
//! max_attempts = 2
//! ```
//!
//! Every field is optional. `seed` may also be a bare integer
//! (`seed = 12345`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::biome::BiomeRegistry;
use crate::chunk::ChunkManager;
use crate::error::{WorldGenError, WorldGenResult};
use crate::generator::{Generator, GeneratorContext, GeneratorManager, GeneratorOptions};
use crate::pipeline::{ChunkPipeline, RetryPolicy};
use crate::seed::{convert_seed, WorldSeed};

/// Per-world generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    /// Seed as typed by the player. Empty picks a random one.
    #[serde(deserialize_with = "seed_text")]
    pub seed: String,
    /// Generator name.
    pub generator: String,
    /// Generator options, passed through unparsed.
    pub options: GeneratorOptions,
    /// Chunk pipeline settings.
    pub pipeline: PipelineConfig,
}

/// A seed written as a TOML string or integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedValue {
    Text(String),
    Number(i64),
}

/// Reads either form back as the text the player would have typed.
fn seed_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match SeedValue::deserialize(deserializer)? {
        SeedValue::Text(text) => text,
        SeedValue::Number(number) => number.to_string(),
    })
}

/// Chunk pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads for batch generation and population.
    pub workers: usize,
    /// Per-attempt limit for one chunk task. 0 disables the limit.
    pub task_timeout_ms: u64,
    /// Attempts before a task that keeps timing out is reported.
    pub max_attempts: u32,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: String::new(),
            generator: "normal".to_owned(),
            options: GeneratorOptions::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            task_timeout_ms: 5_000,
            max_attempts: 3,
        }
    }
}

impl WorldGenConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the document does not parse or fails validation.
    pub fn from_toml_str(text: &str) -> WorldGenResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| WorldGenError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> WorldGenResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serializes back to TOML.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if an option value has no TOML form.
    pub fn to_toml_string(&self) -> WorldGenResult<String> {
        toml::to_string(self).map_err(|err| WorldGenError::InvalidConfig(err.to_string()))
    }

    /// Checks the pipeline settings.
    ///
    /// Generator options are checked when the generator is built.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> WorldGenResult<()> {
        if self.generator.trim().is_empty() {
            return Err(WorldGenError::InvalidConfig("generator must not be empty".to_owned()));
        }
        if self.pipeline.workers == 0 {
            return Err(WorldGenError::InvalidConfig("pipeline.workers must be at least 1".to_owned()));
        }
        if self.pipeline.max_attempts == 0 {
            return Err(WorldGenError::InvalidConfig(
                "pipeline.max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// The world seed: the configured one, or a fresh random one if empty.
    #[must_use]
    pub fn resolve_seed(&self) -> WorldSeed {
        match convert_seed(&self.seed) {
            Some(seed) => WorldSeed::new(seed),
            None => {
                let seed = WorldSeed::random();
                info!(%seed, "no seed configured, picked a random one");
                seed
            }
        }
    }

    /// Retry policy for chunk tasks.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let timeout = match self.pipeline.task_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        RetryPolicy {
            timeout,
            max_attempts: self.pipeline.max_attempts,
        }
    }

    /// Builds the configured generator for `seed`.
    ///
    /// # Errors
    ///
    /// `UnknownGenerator` or `InvalidGeneratorOptions`.
    pub fn build_generator(
        &self,
        manager: &GeneratorManager,
        seed: WorldSeed,
        biomes: Arc<BiomeRegistry>,
    ) -> WorldGenResult<Arc<dyn Generator>> {
        let context = GeneratorContext::new(seed, self.options.clone(), biomes);
        manager.create(&self.generator, context)
    }

    /// Builds a pipeline over `world`: resolves the seed, builds the
    /// generator and applies the pipeline settings.
    ///
    /// # Errors
    ///
    /// As [`Self::build_generator`].
    pub fn build_pipeline<W: ChunkManager>(
        &self,
        manager: &GeneratorManager,
        biomes: Arc<BiomeRegistry>,
        world: W,
    ) -> WorldGenResult<ChunkPipeline<W>> {
        let generator = self.build_generator(manager, self.resolve_seed(), biomes)?;
        Ok(ChunkPipeline::new(
            generator,
            world,
            self.retry_policy(),
            self.pipeline.workers,
        ))
    }
}
