//! # Biomes
//!
//! A biome is a named climate/terrain classification. It carries:
//! - an elevation band the terrain generator aims for,
//! - a ground cover stack laid over the terrain surface,
//! - temperature and rainfall,
//! - an ordered list of populators that decorate chunks assigned to it.
//!
//! Biomes are described by a [`BiomeDefinition`] and bound to an id by the
//! [`BiomeRegistry`]. The id is fixed at bind time and never changes.

pub mod builtin;
pub mod registry;
pub mod selector;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::RngCore;
use thiserror::Error;
use tracing::trace;

use crate::chunk::{Block, ChunkCoord, ChunkManager};
use crate::error::{WorldGenError, WorldGenResult};
use crate::populator::Populator;

pub use registry::{BiomeRegistry, MAX_BIOMES};
pub use selector::BiomeSelector;

/// Biome identifier. Every `u8` is a valid slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BiomeId(pub u8);

impl BiomeId {
    /// Ocean.
    pub const OCEAN: Self = Self(0);
    /// Plains.
    pub const PLAINS: Self = Self(1);
    /// Desert.
    pub const DESERT: Self = Self(2);
    /// Mountains.
    pub const MOUNTAINS: Self = Self(3);
    /// Forest.
    pub const FOREST: Self = Self(4);
    /// Taiga.
    pub const TAIGA: Self = Self(5);
    /// Swamp.
    pub const SWAMP: Self = Self(6);
    /// River.
    pub const RIVER: Self = Self(7);
    /// Hell. Named but not registered by default.
    pub const HELL: Self = Self(8);
    /// Ice plains.
    pub const ICE_PLAINS: Self = Self(12);
    /// Small mountains.
    pub const SMALL_MOUNTAINS: Self = Self(20);
    /// Birch forest.
    pub const BIRCH_FOREST: Self = Self(27);

    /// Creates a biome id.
    #[inline]
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw id value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Slot index in the registry.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A convention a biome breaks. Not enforced, only reported.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BiomeIssue {
    /// `min_elevation > max_elevation`.
    #[error("elevation band is inverted: min {min} > max {max}")]
    InvertedElevation {
        /// Minimum elevation.
        min: i32,
        /// Maximum elevation.
        max: i32,
    },
    /// Temperature outside `[0, 1]`.
    #[error("temperature {0} is outside [0, 1]")]
    TemperatureOutOfRange(f64),
    /// Rainfall outside `[0, 1]`.
    #[error("rainfall {0} is outside [0, 1]")]
    RainfallOutOfRange(f64),
}

/// An unbound biome description.
///
/// ```rust,ignore
/// let marsh = BiomeDefinition::new("Marsh")
///     .elevation(61, 63)
///     .climate(0.7, 0.95)
///     .ground_cover([Block::GRASS, Block::DIRT])
///     .populator(TallGrass::new(8, 4));
/// registry.register(BiomeId::new(40), marsh);
/// ```
#[derive(Clone)]
pub struct BiomeDefinition {
    name: Cow<'static, str>,
    min_elevation: i32,
    max_elevation: i32,
    ground_cover: Vec<Block>,
    temperature: f64,
    rainfall: f64,
    populators: Vec<Arc<dyn Populator>>,
}

impl BiomeDefinition {
    /// Default temperature and rainfall.
    pub const DEFAULT_CLIMATE: f64 = 0.5;

    /// Starts a definition. Every biome must have a name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            min_elevation: 0,
            max_elevation: 0,
            ground_cover: Vec::new(),
            temperature: Self::DEFAULT_CLIMATE,
            rainfall: Self::DEFAULT_CLIMATE,
            populators: Vec::new(),
        }
    }

    /// Sets the elevation band.
    #[must_use]
    pub const fn elevation(mut self, min: i32, max: i32) -> Self {
        self.min_elevation = min;
        self.max_elevation = max;
        self
    }

    /// Sets the ground cover, topmost block first.
    #[must_use]
    pub fn ground_cover(mut self, cover: impl IntoIterator<Item = Block>) -> Self {
        self.ground_cover = cover.into_iter().collect();
        self
    }

    /// Sets temperature and rainfall.
    #[must_use]
    pub const fn climate(mut self, temperature: f64, rainfall: f64) -> Self {
        self.temperature = temperature;
        self.rainfall = rainfall;
        self
    }

    /// Appends a populator.
    #[must_use]
    pub fn populator(mut self, populator: impl Populator + 'static) -> Self {
        self.populators.push(Arc::new(populator));
        self
    }
}

impl fmt::Debug for BiomeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiomeDefinition")
            .field("name", &self.name)
            .field("elevation", &(self.min_elevation..=self.max_elevation))
            .field("temperature", &self.temperature)
            .field("rainfall", &self.rainfall)
            .field("populators", &populator_names(&self.populators))
            .finish_non_exhaustive()
    }
}

/// A biome bound to its registry slot.
pub struct Biome {
    id: BiomeId,
    name: Cow<'static, str>,
    min_elevation: i32,
    max_elevation: i32,
    ground_cover: Vec<Block>,
    temperature: f64,
    rainfall: f64,
    /// Run in order; later entries see what earlier ones placed.
    populators: RwLock<Vec<Arc<dyn Populator>>>,
    fallback: bool,
}

impl Biome {
    /// Name given to fallback biomes.
    pub const UNKNOWN_NAME: &'static str = "Unknown";

    /// Binds a definition to an id.
    #[must_use]
    pub fn new(id: BiomeId, definition: BiomeDefinition) -> Self {
        Self {
            id,
            name: definition.name,
            min_elevation: definition.min_elevation,
            max_elevation: definition.max_elevation,
            ground_cover: definition.ground_cover,
            temperature: definition.temperature,
            rainfall: definition.rainfall,
            populators: RwLock::new(definition.populators),
            fallback: false,
        }
    }

    /// The stand-in biome for an id nobody registered.
    #[must_use]
    pub fn unknown(id: BiomeId) -> Self {
        Self {
            fallback: true,
            ..Self::new(id, BiomeDefinition::new(Self::UNKNOWN_NAME))
        }
    }

    /// Biome id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BiomeId {
        self.id
    }

    /// Biome name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowest terrain height this biome aims for.
    #[inline]
    #[must_use]
    pub const fn min_elevation(&self) -> i32 {
        self.min_elevation
    }

    /// Highest terrain height this biome aims for.
    #[inline]
    #[must_use]
    pub const fn max_elevation(&self) -> i32 {
        self.max_elevation
    }

    /// Ground cover, topmost block first.
    #[inline]
    #[must_use]
    pub fn ground_cover(&self) -> &[Block] {
        &self.ground_cover
    }

    /// Temperature, nominally in `[0, 1]`.
    #[inline]
    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Rainfall, nominally in `[0, 1]`.
    #[inline]
    #[must_use]
    pub const fn rainfall(&self) -> f64 {
        self.rainfall
    }

    /// True if the registry created this biome because the id was never registered.
    #[inline]
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Appends a populator.
    pub fn add_populator(&self, populator: Arc<dyn Populator>) {
        self.populators.write().push(populator);
    }

    /// Removes every populator.
    pub fn clear_populators(&self) {
        self.populators.write().clear();
    }

    /// Snapshot of the populator list, in run order.
    #[must_use]
    pub fn populators(&self) -> Vec<Arc<dyn Populator>> {
        self.populators.read().clone()
    }

    /// Runs every populator, in order, against one chunk.
    ///
    /// All populators share the same world, coordinate and random stream.
    /// The list is snapshotted first, so a populator may add or clear
    /// populators without affecting the current run.
    ///
    /// # Errors
    ///
    /// Stops at the first failing populator and returns
    /// [`WorldGenError::PopulatorFailed`]. What earlier populators placed is
    /// left as is.
    pub fn populate_chunk(
        &self,
        world: &mut dyn ChunkManager,
        coord: ChunkCoord,
        random: &mut dyn RngCore,
    ) -> WorldGenResult<()> {
        let populators = self.populators();
        trace!(biome = %self.name, %coord, count = populators.len(), "populating chunk");

        for populator in &populators {
            populator
                .populate(world, coord, random)
                .map_err(|err| WorldGenError::PopulatorFailed {
                    populator: populator.name().to_owned(),
                    biome: self.name.to_string(),
                    coord,
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }

    /// Conventions this biome breaks.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<BiomeIssue> {
        let mut issues = Vec::new();
        if self.min_elevation > self.max_elevation {
            issues.push(BiomeIssue::InvertedElevation {
                min: self.min_elevation,
                max: self.max_elevation,
            });
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            issues.push(BiomeIssue::TemperatureOutOfRange(self.temperature));
        }
        if !(0.0..=1.0).contains(&self.rainfall) {
            issues.push(BiomeIssue::RainfallOutOfRange(self.rainfall));
        }
        issues
    }
}

impl fmt::Debug for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Biome")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("elevation", &(self.min_elevation..=self.max_elevation))
            .field("temperature", &self.temperature)
            .field("rainfall", &self.rainfall)
            .field("populators", &populator_names(&self.populators.read()))
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

fn populator_names(populators: &[Arc<dyn Populator>]) -> Vec<String> {
    populators.iter().map(|p| p.name().to_owned()).collect()
}
