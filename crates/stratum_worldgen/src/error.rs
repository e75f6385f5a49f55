//! # World Generation Error Types
//!
//! All errors that can occur while building, generating, or populating a world.

use thiserror::Error;

use crate::chunk::ChunkCoord;

/// Errors that can occur in the world generation core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldGenError {
    /// Generator options failed validation. Fatal to world creation, never retried.
    #[error("invalid generator options: {0}")]
    InvalidGeneratorOptions(String),

    /// No generator is registered under this name.
    #[error("unknown generator: {0}")]
    UnknownGenerator(String),

    /// A generator with this name is already registered.
    #[error("generator already registered: {0}")]
    GeneratorAlreadyRegistered(String),

    /// A populator failed; the remaining populators for the chunk were skipped.
    #[error("populator `{populator}` of biome `{biome}` failed in chunk {coord}: {reason}")]
    PopulatorFailed {
        /// Name of the failing populator.
        populator: String,
        /// Name of the biome that owns the populator.
        biome: String,
        /// The chunk being populated.
        coord: ChunkCoord,
        /// What went wrong.
        reason: String,
    },

    /// A block access touched a chunk that is not present in the world accessor.
    #[error("chunk {0} is not loaded")]
    ChunkNotLoaded(ChunkCoord),

    /// A block access was outside the vertical bounds of the world.
    #[error("y = {y} is outside the world")]
    OutOfWorld {
        /// The offending Y coordinate.
        y: i32,
    },

    /// The chunk lies too far out for its blocks to have `i32` coordinates.
    #[error("chunk {0} is beyond the world border")]
    ChunkOutOfRange(ChunkCoord),

    /// Population was requested for a chunk that has not been generated.
    #[error("chunk {0} has not been generated")]
    ChunkNotGenerated(ChunkCoord),

    /// The chunk was already generated.
    #[error("chunk {0} has already been generated")]
    AlreadyGenerated(ChunkCoord),

    /// The chunk was already populated.
    #[error("chunk {0} has already been populated")]
    AlreadyPopulated(ChunkCoord),

    /// Population requires every neighbour to be generated first.
    #[error("cannot populate chunk {coord}: neighbour {neighbour} has not been generated")]
    NeighbourNotGenerated {
        /// The chunk that was to be populated.
        coord: ChunkCoord,
        /// The first neighbour found missing.
        neighbour: ChunkCoord,
    },

    /// A chunk task overran its timeout on every attempt.
    #[error("chunk task for {coord} timed out after {attempts} attempt(s)")]
    ChunkTaskTimedOut {
        /// The chunk the task was working on.
        coord: ChunkCoord,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A chunk worker exited without reporting a result.
    #[error("worker for chunk {0} exited without a result")]
    ChunkWorkerLost(ChunkCoord),

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading the configuration failed.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WorldGenError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for world generation operations.
pub type WorldGenResult<T> = Result<T, WorldGenError>;
