//! # STRATUM World Generation
//!
//! Deterministic world generation for infinite, reproducible voxel worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed, generator and options always produce the same world
//! 2. **Two phases**: Terrain is generated per chunk in isolation, then populated
//!    once every neighbour exists
//! 3. **No global state**: Biomes live in a [`BiomeRegistry`] shared by `Arc`
//!
//! ## Core Components
//!
//! - [`convert_seed`] / [`WorldSeed`]: Seed strings and derived random streams
//! - [`Biome`] / [`BiomeRegistry`]: Biome definitions, with fallbacks for unknown ids
//! - [`Populator`]: Decorations placed after terrain
//! - [`Generator`] / [`GeneratorManager`]: `flat` and `normal` terrain, looked up by name
//! - [`ChunkPipeline`]: Chunk lifecycle, neighbour ordering, timeout and retry
//! - [`WorldGenConfig`]: TOML configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratum_worldgen::{
//!     BiomeRegistry, ChunkCoord, GeneratorManager, SimpleChunkManager, WorldGenConfig,
//! };
//!
//! let config = WorldGenConfig::from_toml_str(r#"seed = "hello""#)?;
//! let mut pipeline = config.build_pipeline(
//!     &GeneratorManager::with_defaults(),
//!     Arc::new(BiomeRegistry::with_builtin()),
//!     SimpleChunkManager::new(),
//! )?;
//!
//! // Generates the 3x3 neighbourhood, then decorates the centre
//! pipeline.request(ChunkCoord::new(0, 0))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod chunk;
pub mod config;
pub mod error;
pub mod generator;
pub mod noise;
pub mod pipeline;
pub mod populator;
pub mod seed;

pub use biome::{Biome, BiomeDefinition, BiomeId, BiomeIssue, BiomeRegistry, BiomeSelector};
pub use chunk::{
    Block, Chunk, ChunkCoord, ChunkManager, SimpleChunkManager, CHUNK_HEIGHT, CHUNK_SIZE,
};
pub use config::{PipelineConfig, WorldGenConfig};
pub use error::{WorldGenError, WorldGenResult};
pub use generator::{
    FlatGenerator, FlatPreset, Generator, GeneratorContext, GeneratorManager, GeneratorOptions,
    NormalGenerator,
};
pub use noise::SimplexNoise;
pub use pipeline::{ChunkPipeline, ChunkState, RetryPolicy};
pub use populator::{Populator, TallGrass, TreeKind, Trees};
pub use seed::{convert_seed, string_hash, WorldSeed};
