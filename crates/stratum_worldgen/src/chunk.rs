//! # Chunk System
//!
//! World data is organized into fixed-size chunks so that:
//! - chunks can be generated independently and out of order,
//! - population can be run against a small neighbourhood snapshot,
//! - the world accessor stays an external concern behind [`ChunkManager`].
//!
//! ## Chunk Format
//!
//! Chunks are 16x16x256 blocks (width x depth x height), plus one biome id
//! per column.

use std::collections::HashMap;
use std::fmt;

use crate::biome::BiomeId;
use crate::error::{WorldGenError, WorldGenResult};

/// Chunk width/depth in blocks.
pub const CHUNK_SIZE: usize = 16;

/// Chunk height in blocks.
pub const CHUNK_HEIGHT: usize = 256;

/// Total blocks per chunk.
pub const BLOCKS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Largest `|x|` or `|z|` that can be generated. One more chunk past it
    /// still has `i32` block coordinates, for terrain that samples beyond
    /// its own border.
    pub const GENERATION_LIMIT: i32 = i32::MAX / CHUNK_SIZE as i32 - 1;

    /// Largest `|x|` or `|z|` that can be populated. Its whole 3x3
    /// neighbourhood must stay within [`Self::GENERATION_LIMIT`].
    pub const POPULATION_LIMIT: i32 = Self::GENERATION_LIMIT - 1;

    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts world block coordinates to chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE as i32),
            z: block_z.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// Whether both axes are within `limit` chunks of the origin.
    #[inline]
    #[must_use]
    pub const fn within(self, limit: i32) -> bool {
        let limit = limit.unsigned_abs();
        self.x.unsigned_abs() <= limit && self.z.unsigned_abs() <= limit
    }

    /// `Ok(self)` if the chunk's blocks fit in world coordinates.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` beyond [`Self::GENERATION_LIMIT`].
    pub fn check_generatable(self) -> WorldGenResult<Self> {
        if self.within(Self::GENERATION_LIMIT) {
            Ok(self)
        } else {
            Err(WorldGenError::ChunkOutOfRange(self))
        }
    }

    /// `Ok(self)` if the chunk and all its neighbours can be generated.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` beyond [`Self::POPULATION_LIMIT`].
    pub fn check_populatable(self) -> WorldGenResult<Self> {
        if self.within(Self::POPULATION_LIMIT) {
            Ok(self)
        } else {
            Err(WorldGenError::ChunkOutOfRange(self))
        }
    }

    /// Returns the world X coordinate of the chunk's origin (corner).
    ///
    /// Overflows more than one chunk past [`Self::GENERATION_LIMIT`].
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i32 {
        self.x * CHUNK_SIZE as i32
    }

    /// Returns the world Z coordinate of the chunk's origin.
    #[inline]
    #[must_use]
    pub const fn world_z(self) -> i32 {
        self.z * CHUNK_SIZE as i32
    }

    /// Returns the coordinate offset by `(dx, dz)` chunks.
    ///
    /// Overflows at the `i32` edges; [`Self::check_populatable`] keeps a
    /// chunk's neighbourhood clear of them.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// The 3x3 block of chunks centred on this one, row by row, self included.
    #[must_use]
    pub fn neighbourhood(self) -> [Self; 9] {
        let mut out = [self; 9];
        let mut i = 0;
        for dz in -1..=1 {
            for dx in -1..=1 {
                out[i] = self.offset(dx, dz);
                i += 1;
            }
        }
        out
    }

    /// The 8 chunks touching this one.
    pub fn neighbours(self) -> impl Iterator<Item = Self> {
        self.neighbourhood().into_iter().filter(move |c| *c != self)
    }

    /// Chebyshev (king-move) distance in chunks.
    #[inline]
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Block specification: a block type and its variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    /// Block type ID.
    pub id: u16,
    /// Block variant (wood type, grass type, ...).
    pub meta: u16,
}

impl Block {
    /// Air block (empty).
    pub const AIR: Self = Self::new(0);
    /// Stone block.
    pub const STONE: Self = Self::new(1);
    /// Grass block.
    pub const GRASS: Self = Self::new(2);
    /// Dirt block.
    pub const DIRT: Self = Self::new(3);
    /// Bedrock block.
    pub const BEDROCK: Self = Self::new(7);
    /// Still water.
    pub const WATER: Self = Self::new(9);
    /// Sand block.
    pub const SAND: Self = Self::new(12);
    /// Gravel block.
    pub const GRAVEL: Self = Self::new(13);
    /// Oak log.
    pub const OAK_LOG: Self = Self::with_meta(17, 0);
    /// Spruce log.
    pub const SPRUCE_LOG: Self = Self::with_meta(17, 1);
    /// Birch log.
    pub const BIRCH_LOG: Self = Self::with_meta(17, 2);
    /// Oak leaves.
    pub const OAK_LEAVES: Self = Self::with_meta(18, 0);
    /// Spruce leaves.
    pub const SPRUCE_LEAVES: Self = Self::with_meta(18, 1);
    /// Birch leaves.
    pub const BIRCH_LEAVES: Self = Self::with_meta(18, 2);
    /// Sandstone block.
    pub const SANDSTONE: Self = Self::new(24);
    /// Tall grass plant.
    pub const TALL_GRASS: Self = Self::with_meta(31, 1);
    /// Thin snow cover.
    pub const SNOW_LAYER: Self = Self::new(78);

    const NAMED: [(&'static str, Self); 17] = [
        ("air", Self::AIR),
        ("stone", Self::STONE),
        ("grass", Self::GRASS),
        ("dirt", Self::DIRT),
        ("bedrock", Self::BEDROCK),
        ("water", Self::WATER),
        ("sand", Self::SAND),
        ("gravel", Self::GRAVEL),
        ("oak_log", Self::OAK_LOG),
        ("spruce_log", Self::SPRUCE_LOG),
        ("birch_log", Self::BIRCH_LOG),
        ("oak_leaves", Self::OAK_LEAVES),
        ("spruce_leaves", Self::SPRUCE_LEAVES),
        ("birch_leaves", Self::BIRCH_LEAVES),
        ("sandstone", Self::SANDSTONE),
        ("tall_grass", Self::TALL_GRASS),
        ("snow_layer", Self::SNOW_LAYER),
    ];

    /// Creates a new block with given ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self { id, meta: 0 }
    }

    /// Creates a block with ID and metadata.
    #[inline]
    #[must_use]
    pub const fn with_meta(id: u16, meta: u16) -> Self {
        Self { id, meta }
    }

    /// Looks a block up by name (case-insensitive, optional `minecraft:` prefix).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_prefix("minecraft:").unwrap_or(&name);
        Self::NAMED
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, block)| *block)
    }

    /// Returns true if this is an air block.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id == 0
    }

    /// Returns true if the block fills its whole cell.
    ///
    /// Air, water, plants and snow layers are not solid.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        !matches!(
            self.id,
            0 | 9 | 31 | 78 // air, water, tall grass, snow layer
        )
    }
}

/// Converts a world coordinate to a local coordinate within its chunk.
#[inline]
#[must_use]
pub const fn local(world: i32) -> usize {
    world.rem_euclid(CHUNK_SIZE as i32) as usize
}

/// A chunk of world data.
///
/// Contains a 16x16x256 grid of blocks plus a biome id per column.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk position in the world.
    coord: ChunkCoord,
    /// Block data (indexed as [y][z][x]).
    blocks: Box<[Block]>,
    /// Biome id for each column (indexed as [z][x]).
    biomes: [[BiomeId; CHUNK_SIZE]; CHUNK_SIZE],
}

impl Chunk {
    /// Creates a new empty chunk at the given coordinates.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![Block::AIR; BLOCKS_PER_CHUNK].into_boxed_slice(),
            biomes: [[BiomeId::PLAINS; CHUNK_SIZE]; CHUNK_SIZE],
        }
    }

    /// Chunk position in the world.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    const fn index(x: usize, y: usize, z: usize) -> usize {
        (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
    }

    /// Gets a block at local coordinates. Out-of-range reads return air.
    ///
    /// # Arguments
    ///
    /// * `x` - Local X (0-15)
    /// * `y` - Y level (0-255)
    /// * `z` - Local Z (0-15)
    #[inline]
    #[must_use]
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Block {
        if x < CHUNK_SIZE && y < CHUNK_HEIGHT && z < CHUNK_SIZE {
            self.blocks[Self::index(x, y, z)]
        } else {
            Block::AIR
        }
    }

    /// Sets a block at local coordinates. Out-of-range writes are ignored.
    #[inline]
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) {
        if x < CHUNK_SIZE && y < CHUNK_HEIGHT && z < CHUNK_SIZE {
            self.blocks[Self::index(x, y, z)] = block;
        }
    }

    /// Gets the biome id at a local column.
    #[inline]
    #[must_use]
    pub fn biome_id(&self, x: usize, z: usize) -> BiomeId {
        if x < CHUNK_SIZE && z < CHUNK_SIZE {
            self.biomes[z][x]
        } else {
            BiomeId::PLAINS
        }
    }

    /// Sets the biome id at a local column.
    #[inline]
    pub fn set_biome_id(&mut self, x: usize, z: usize, biome: BiomeId) {
        if x < CHUNK_SIZE && z < CHUNK_SIZE {
            self.biomes[z][x] = biome;
        }
    }

    /// Y of the highest non-air block in a local column.
    #[must_use]
    pub fn highest_block_at(&self, x: usize, z: usize) -> Option<usize> {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|&y| !self.get_block(x, y, z).is_air())
    }

    /// Counts non-air blocks.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("solid_blocks", &self.solid_count())
            .finish_non_exhaustive()
    }
}

/// World accessor used by generators and populators.
///
/// Block-level helpers take absolute world coordinates and are provided in
/// terms of the four chunk-level methods.
pub trait ChunkManager {
    /// Returns a loaded chunk.
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk>;

    /// Returns a loaded chunk mutably.
    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk>;

    /// Inserts or replaces a chunk at its own coordinate.
    fn set_chunk(&mut self, chunk: Chunk);

    /// Removes a chunk.
    fn take_chunk(&mut self, coord: ChunkCoord) -> Option<Chunk>;

    /// Whether `y` lies inside the world's vertical bounds.
    fn is_in_world(&self, y: i32) -> bool {
        (0..CHUNK_HEIGHT as i32).contains(&y)
    }

    /// Block at absolute coordinates. Unloaded or out-of-world positions read as air.
    fn block_at(&self, x: i32, y: i32, z: i32) -> Block {
        if !self.is_in_world(y) {
            return Block::AIR;
        }
        self.chunk(ChunkCoord::from_block_pos(x, z))
            .map_or(Block::AIR, |chunk| chunk.get_block(local(x), y as usize, local(z)))
    }

    /// Sets the block at absolute coordinates.
    ///
    /// # Errors
    ///
    /// `OutOfWorld` if `y` is out of bounds, `ChunkNotLoaded` if the chunk is absent.
    fn set_block_at(&mut self, x: i32, y: i32, z: i32, block: Block) -> WorldGenResult<()> {
        if !self.is_in_world(y) {
            return Err(WorldGenError::OutOfWorld { y });
        }
        let coord = ChunkCoord::from_block_pos(x, z);
        let chunk = self
            .chunk_mut(coord)
            .ok_or(WorldGenError::ChunkNotLoaded(coord))?;
        chunk.set_block(local(x), y as usize, local(z), block);
        Ok(())
    }

    /// Biome id of the column at absolute coordinates.
    fn biome_id_at(&self, x: i32, z: i32) -> Option<BiomeId> {
        self.chunk(ChunkCoord::from_block_pos(x, z))
            .map(|chunk| chunk.biome_id(local(x), local(z)))
    }

    /// Y of the highest non-air block in the column at absolute coordinates.
    fn highest_block_at(&self, x: i32, z: i32) -> Option<i32> {
        self.chunk(ChunkCoord::from_block_pos(x, z))
            .and_then(|chunk| chunk.highest_block_at(local(x), local(z)))
            .map(|y| y as i32)
    }
}

/// In-memory world accessor.
///
/// Also serves as the neighbourhood snapshot that population runs against.
#[derive(Clone, Debug, Default)]
pub struct SimpleChunkManager {
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl SimpleChunkManager {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Coordinates of all loaded chunks, sorted.
    #[must_use]
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Consumes the manager, yielding its chunks.
    pub fn into_chunks(self) -> impl Iterator<Item = Chunk> {
        self.chunks.into_values()
    }
}

impl ChunkManager for SimpleChunkManager {
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    fn set_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.coord(), chunk);
    }

    fn take_chunk(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_from_block() {
        assert_eq!(ChunkCoord::from_block_pos(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block_pos(15, 15), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block_pos(16, 16), ChunkCoord::new(1, 1));
        assert_eq!(ChunkCoord::from_block_pos(-1, -1), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_block_pos(-16, -16), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_block_pos(-17, -17), ChunkCoord::new(-2, -2));
    }

    #[test]
    fn test_coordinate_limits() {
        let edge = ChunkCoord::GENERATION_LIMIT;
        assert!(ChunkCoord::new(edge, -edge).check_generatable().is_ok());
        assert_eq!(ChunkCoord::new(edge + 1, 0).world_x() + 15, i32::MAX);
        assert_eq!(
            ChunkCoord::new(0, edge + 1).check_generatable(),
            Err(WorldGenError::ChunkOutOfRange(ChunkCoord::new(0, edge + 1)))
        );
        assert!(ChunkCoord::new(i32::MIN, 0).check_generatable().is_err());

        let inner = ChunkCoord::new(-ChunkCoord::POPULATION_LIMIT, ChunkCoord::POPULATION_LIMIT);
        assert!(inner.check_populatable().is_ok());
        assert!(inner.neighbourhood().iter().all(|c| c.check_generatable().is_ok()));
        assert!(ChunkCoord::new(edge, 0).check_populatable().is_err());
        assert!(ChunkCoord::new(i32::MAX / 8, 0).check_populatable().is_err());
    }

    #[test]
    fn test_local_coordinates() {
        assert_eq!(local(0), 0);
        assert_eq!(local(17), 1);
        assert_eq!(local(-1), 15);
        assert_eq!(local(-16), 0);
    }

    #[test]
    fn test_neighbourhood() {
        let centre = ChunkCoord::new(4, -2);
        let ring: Vec<_> = centre.neighbours().collect();

        assert_eq!(centre.neighbourhood().len(), 9);
        assert_eq!(ring.len(), 8);
        assert!(!ring.contains(&centre));
        assert!(ring.iter().all(|c| c.chebyshev_distance(centre) == 1));
    }

    #[test]
    fn test_block_names() {
        assert_eq!(Block::from_name("dirt"), Some(Block::DIRT));
        assert_eq!(Block::from_name("minecraft:Bedrock"), Some(Block::BEDROCK));
        assert_eq!(Block::from_name("unobtainium"), None);
    }

    #[test]
    fn test_block_solidity() {
        assert!(Block::STONE.is_solid());
        assert!(Block::OAK_LEAVES.is_solid());
        assert!(!Block::AIR.is_solid());
        assert!(!Block::WATER.is_solid());
        assert!(!Block::SNOW_LAYER.is_solid());
        assert!(!Block::TALL_GRASS.is_solid());
    }

    #[test]
    fn test_chunk_block_access() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        chunk.set_block(3, 70, 4, Block::STONE);

        assert_eq!(chunk.get_block(3, 70, 4), Block::STONE);
        assert_eq!(chunk.highest_block_at(3, 4), Some(70));
        assert_eq!(chunk.highest_block_at(0, 0), None);
        assert_eq!(chunk.get_block(16, 0, 0), Block::AIR, "out of range reads as air");
    }

    #[test]
    fn test_manager_absolute_access() {
        let mut world = SimpleChunkManager::new();
        world.set_chunk(Chunk::new(ChunkCoord::new(-1, 0)));

        world.set_block_at(-3, 64, 5, Block::SAND).unwrap();
        assert_eq!(world.block_at(-3, 64, 5), Block::SAND);
        assert_eq!(
            world.chunk(ChunkCoord::new(-1, 0)).unwrap().get_block(13, 64, 5),
            Block::SAND
        );
        assert_eq!(world.highest_block_at(-3, 5), Some(64));

        assert_eq!(
            world.set_block_at(20, 64, 5, Block::SAND),
            Err(WorldGenError::ChunkNotLoaded(ChunkCoord::new(1, 0)))
        );
        assert_eq!(
            world.set_block_at(-3, 256, 5, Block::SAND),
            Err(WorldGenError::OutOfWorld { y: 256 })
        );
        assert_eq!(world.block_at(-3, -1, 5), Block::AIR);
    }
}
