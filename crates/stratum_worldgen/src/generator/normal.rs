//! # Normal Generator
//!
//! Biome-driven terrain:
//! - each column's biome comes from the [`BiomeSelector`],
//! - the surface height blends the elevation bands of nearby biomes, so
//!   borders slope instead of stepping,
//! - octaved simplex noise picks where inside the blended band a column sits,
//! - the biome's ground cover goes on top, and water fills up to sea level.

use std::sync::Arc;

use rand::Rng;
use tracing::info;

use super::{Generator, GeneratorContext};
use crate::biome::{Biome, BiomeSelector};
use crate::chunk::{Block, Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE};
use crate::error::{WorldGenError, WorldGenResult};
use crate::noise::SimplexNoise;

/// Radius of the column neighbourhood averaged for the surface height.
const SMOOTH_RADIUS: usize = 2;

/// Side of the area whose biomes a chunk needs: the chunk plus the border.
const AREA: usize = CHUNK_SIZE + 2 * SMOOTH_RADIUS;

/// Binomial weights over the 5 offsets of one axis.
const SMOOTH_WEIGHTS: [f64; 2 * SMOOTH_RADIUS + 1] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// Purpose tags for [`crate::seed::WorldSeed::derive`] and `chunk_rng`.
const HEIGHT_PURPOSE: u64 = 0x4e7a;
const BEDROCK_PURPOSE: u64 = 0xbed0;

/// Default terrain generator.
pub struct NormalGenerator {
    context: GeneratorContext,
    sea_level: i32,
    selector: BiomeSelector,
    height_noise: SimplexNoise,
}

impl NormalGenerator {
    /// Registered name.
    pub const NAME: &'static str = "normal";

    /// Sea level used when the option is absent.
    pub const DEFAULT_SEA_LEVEL: i32 = 62;

    /// Horizontal scale of the height noise, in blocks.
    const HEIGHT_SCALE: f64 = 1.0 / 96.0;

    /// Builds a normal generator, reading the `sea_level` option.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` if `sea_level` is not an integer in `1..=255`.
    pub fn new(context: GeneratorContext) -> WorldGenResult<Self> {
        let sea_level = match context.options.get_int("sea_level")? {
            None => Self::DEFAULT_SEA_LEVEL,
            Some(level) if (1..CHUNK_HEIGHT as i64).contains(&level) => level as i32,
            Some(level) => {
                return Err(WorldGenError::InvalidGeneratorOptions(format!(
                    "sea_level must be in 1..={}, got {level}",
                    CHUNK_HEIGHT - 1
                )))
            }
        };

        let seed = context.seed;
        info!(%seed, sea_level, "created normal generator");
        Ok(Self {
            selector: BiomeSelector::new(seed),
            height_noise: SimplexNoise::new(seed.derive(HEIGHT_PURPOSE)),
            context,
            sea_level,
        })
    }

    /// Water fills up to and including this Y.
    #[must_use]
    pub const fn sea_level(&self) -> i32 {
        self.sea_level
    }

    /// The biome selector.
    #[must_use]
    pub fn selector(&self) -> &BiomeSelector {
        &self.selector
    }

    /// Biomes for the chunk and a border of `SMOOTH_RADIUS` columns, `[z][x]`.
    fn biome_area(&self, coord: ChunkCoord) -> Vec<Vec<Arc<Biome>>> {
        let origin_x = coord.world_x() - SMOOTH_RADIUS as i32;
        let origin_z = coord.world_z() - SMOOTH_RADIUS as i32;
        (0..AREA)
            .map(|dz| {
                (0..AREA)
                    .map(|dx| {
                        let id = self
                            .selector
                            .pick(origin_x + dx as i32, origin_z + dz as i32);
                        self.context.biomes.get(id)
                    })
                    .collect()
            })
            .collect()
    }

    /// Surface Y of a column, from the blended bands and the height noise.
    fn surface_height(
        &self,
        area: &[Vec<Arc<Biome>>],
        x: usize,
        z: usize,
        world_x: i32,
        world_z: i32,
    ) -> i32 {
        let mut min = 0.0;
        let mut max = 0.0;
        let mut total = 0.0;
        for (dz, wz) in SMOOTH_WEIGHTS.iter().enumerate() {
            for (dx, wx) in SMOOTH_WEIGHTS.iter().enumerate() {
                let weight = wx * wz;
                let biome = &area[z + dz][x + dx];
                min += f64::from(biome.min_elevation()) * weight;
                max += f64::from(biome.max_elevation()) * weight;
                total += weight;
            }
        }
        let (min, max) = (min / total, max / total);

        let noise = self.height_noise.unit(
            f64::from(world_x) * Self::HEIGHT_SCALE,
            f64::from(world_z) * Self::HEIGHT_SCALE,
            4,
        );
        let height = (min + (max - min) * noise).round() as i32;
        height.clamp(1, CHUNK_HEIGHT as i32 - 2)
    }

    /// Lays `cover` over the surface at `height`, topmost block first.
    ///
    /// A non-solid top block (a snow layer) sits on the surface instead of
    /// replacing it, and is dropped where it would end up under water.
    fn cover_column(chunk: &mut Chunk, x: usize, z: usize, height: usize, cover: &[Block]) {
        let mut cover = cover.iter().copied().peekable();
        if let Some(top) = cover.next_if(|block| !block.is_solid()) {
            if chunk.get_block(x, height + 1, z).is_air() {
                chunk.set_block(x, height + 1, z, top);
            }
        }
        for (depth, block) in cover.enumerate() {
            let Some(y) = height.checked_sub(depth) else {
                break;
            };
            if y == 0 {
                break;
            }
            chunk.set_block(x, y, z, block);
        }
    }
}

impl Generator for NormalGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn context(&self) -> &GeneratorContext {
        &self.context
    }

    fn generate_chunk(&self, coord: ChunkCoord) -> WorldGenResult<Chunk> {
        let mut chunk = Chunk::new(coord.check_generatable()?);
        let mut random = self.context.seed.chunk_rng(coord, BEDROCK_PURPOSE);
        let area = self.biome_area(coord);
        let sea_level = self.sea_level as usize;

        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let world_x = coord.world_x() + x as i32;
                let world_z = coord.world_z() + z as i32;
                let biome = &area[z + SMOOTH_RADIUS][x + SMOOTH_RADIUS];
                chunk.set_biome_id(x, z, biome.id());

                let height = self.surface_height(&area, x, z, world_x, world_z) as usize;

                chunk.set_block(x, 0, z, Block::BEDROCK);
                for y in 1..=height {
                    // Rough bedrock floor over the first few layers. The roll
                    // is u32 so the stream does not depend on pointer width.
                    let block = if y < 4 && random.gen_range(0..=y as u32) == 0 {
                        Block::BEDROCK
                    } else {
                        Block::STONE
                    };
                    chunk.set_block(x, y, z, block);
                }
                for y in height + 1..=sea_level {
                    chunk.set_block(x, y, z, Block::WATER);
                }

                Self::cover_column(&mut chunk, x, z, height, biome.ground_cover());
            }
        }
        Ok(chunk)
    }
}

impl std::fmt::Debug for NormalGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalGenerator")
            .field("context", &self.context)
            .field("sea_level", &self.sea_level)
            .finish_non_exhaustive()
    }
}
