//! # Populators
//!
//! A populator adds one category of decoration (plants, trees, ...) to a chunk
//! whose terrain already exists. Populators are stateless: everything they
//! need comes from the world accessor, the chunk coordinate and the random
//! stream they are handed.
//!
//! Decorations may straddle chunk borders. Writes outside the target chunk go
//! through the world accessor and fail with `ChunkNotLoaded` when the
//! neighbour is missing.

use rand::{Rng, RngCore};

use crate::chunk::{Block, ChunkCoord, ChunkManager, CHUNK_HEIGHT, CHUNK_SIZE};
use crate::error::WorldGenResult;

/// A unit of decoration invoked once per chunk.
pub trait Populator: Send + Sync {
    /// Identity used in logs and errors.
    fn name(&self) -> &str;

    /// Decorates the chunk at `coord`.
    ///
    /// # Errors
    ///
    /// Any failure aborts the remaining populators of the biome.
    fn populate(
        &self,
        world: &mut dyn ChunkManager,
        coord: ChunkCoord,
        random: &mut dyn RngCore,
    ) -> WorldGenResult<()>;
}

/// Picks a random column of the chunk, in world coordinates.
fn random_column(coord: ChunkCoord, random: &mut dyn RngCore) -> (i32, i32) {
    let x = coord.world_x() + random.gen_range(0..CHUNK_SIZE as i32);
    let z = coord.world_z() + random.gen_range(0..CHUNK_SIZE as i32);
    (x, z)
}

/// Blocks that plants and trees grow through or replace.
fn is_clearable(block: Block) -> bool {
    block.is_air() || block == Block::SNOW_LAYER || block == Block::TALL_GRASS || is_leaves(block)
}

fn is_leaves(block: Block) -> bool {
    block.id == Block::OAK_LEAVES.id
}

/// Scans down from the top of a column, skipping leaves and snow, and
/// returns the first other block with its Y.
fn ground_at(world: &dyn ChunkManager, x: i32, z: i32) -> Option<(i32, Block)> {
    let mut y = world.highest_block_at(x, z)?;
    loop {
        let block = world.block_at(x, y, z);
        if !(is_leaves(block) || block == Block::SNOW_LAYER) || y == 0 {
            return Some((y, block));
        }
        y -= 1;
    }
}

/// Scatters tall grass over grass blocks.
///
/// Places `base + rand[0, random]` plants per chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TallGrass {
    base_amount: u32,
    random_amount: u32,
}

impl TallGrass {
    /// Creates a tall grass populator.
    #[must_use]
    pub const fn new(base_amount: u32, random_amount: u32) -> Self {
        Self {
            base_amount,
            random_amount,
        }
    }
}

impl Populator for TallGrass {
    fn name(&self) -> &str {
        "tall_grass"
    }

    fn populate(
        &self,
        world: &mut dyn ChunkManager,
        coord: ChunkCoord,
        random: &mut dyn RngCore,
    ) -> WorldGenResult<()> {
        let amount = self.base_amount + random.gen_range(0..=self.random_amount);

        for _ in 0..amount {
            let (x, z) = random_column(coord, random);
            let Some((y, ground)) = ground_at(world, x, z) else {
                continue;
            };
            let above = world.block_at(x, y + 1, z);
            if ground == Block::GRASS
                && world.is_in_world(y + 1)
                && (above.is_air() || above == Block::SNOW_LAYER)
            {
                world.set_block_at(x, y + 1, z, Block::TALL_GRASS)?;
            }
        }
        Ok(())
    }
}

/// Tree species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeKind {
    /// Oak: short, round crown.
    Oak,
    /// Spruce: tall, narrow crown.
    Spruce,
    /// Birch: slender, round crown.
    Birch,
}

impl TreeKind {
    /// Trunk block.
    #[must_use]
    pub const fn log(self) -> Block {
        match self {
            Self::Oak => Block::OAK_LOG,
            Self::Spruce => Block::SPRUCE_LOG,
            Self::Birch => Block::BIRCH_LOG,
        }
    }

    /// Crown block.
    #[must_use]
    pub const fn leaves(self) -> Block {
        match self {
            Self::Oak => Block::OAK_LEAVES,
            Self::Spruce => Block::SPRUCE_LEAVES,
            Self::Birch => Block::BIRCH_LEAVES,
        }
    }

    /// Trunk height range (inclusive).
    #[must_use]
    pub const fn trunk_height(self) -> (i32, i32) {
        match self {
            Self::Oak => (4, 6),
            Self::Birch => (5, 7),
            Self::Spruce => (6, 9),
        }
    }
}

/// Plants trees on grass or dirt.
///
/// Crowns reach up to two blocks past the trunk, so trees near an edge write
/// into neighbouring chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trees {
    kind: TreeKind,
    base_amount: u32,
    random_amount: u32,
}

impl Trees {
    /// Crown radius at its widest.
    const CROWN_RADIUS: i32 = 2;

    /// Creates a tree populator.
    #[must_use]
    pub const fn new(kind: TreeKind, base_amount: u32, random_amount: u32) -> Self {
        Self {
            kind,
            base_amount,
            random_amount,
        }
    }

    /// Species planted.
    #[must_use]
    pub const fn kind(&self) -> TreeKind {
        self.kind
    }

    fn grow(
        &self,
        world: &mut dyn ChunkManager,
        x: i32,
        base_y: i32,
        z: i32,
        random: &mut dyn RngCore,
    ) -> WorldGenResult<()> {
        let (min_height, max_height) = self.kind.trunk_height();
        let height = random.gen_range(min_height..=max_height);

        // Leave room for the crown above the trunk
        if base_y + height + 1 >= CHUNK_HEIGHT as i32 {
            return Ok(());
        }
        if !(base_y..base_y + height).all(|y| is_clearable(world.block_at(x, y, z))) {
            return Ok(());
        }

        world.set_block_at(x, base_y - 1, z, Block::DIRT)?;

        // Crown: two wide layers then two narrow ones, ending one above the trunk
        let top = base_y + height;
        let leaves = self.kind.leaves();
        for y in top - 3..=top {
            let radius = if top - y >= 2 { Self::CROWN_RADIUS } else { 1 };
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    let corner = dx.abs() == radius && dz.abs() == radius;
                    if corner && (y == top || random.gen_bool(0.5)) {
                        continue;
                    }
                    if is_clearable(world.block_at(x + dx, y, z + dz)) {
                        world.set_block_at(x + dx, y, z + dz, leaves)?;
                    }
                }
            }
        }

        let log = self.kind.log();
        for y in base_y..top {
            world.set_block_at(x, y, z, log)?;
        }
        Ok(())
    }
}

impl Populator for Trees {
    fn name(&self) -> &str {
        match self.kind {
            TreeKind::Oak => "oak_trees",
            TreeKind::Spruce => "spruce_trees",
            TreeKind::Birch => "birch_trees",
        }
    }

    fn populate(
        &self,
        world: &mut dyn ChunkManager,
        coord: ChunkCoord,
        random: &mut dyn RngCore,
    ) -> WorldGenResult<()> {
        let amount = self.base_amount + random.gen_range(0..=self.random_amount);

        for _ in 0..amount {
            let (x, z) = random_column(coord, random);
            let Some((y, ground)) = ground_at(world, x, z) else {
                continue;
            };
            if ground == Block::GRASS || ground == Block::DIRT {
                self.grow(world, x, y + 1, z, random)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, SimpleChunkManager};
    use crate::error::WorldGenError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 3x3 chunks of flat grass at y = 64.
    fn grass_world(centre: ChunkCoord) -> SimpleChunkManager {
        let mut world = SimpleChunkManager::new();
        for coord in centre.neighbourhood() {
            let mut chunk = Chunk::new(coord);
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    for y in 0..64 {
                        chunk.set_block(x, y, z, Block::DIRT);
                    }
                    chunk.set_block(x, 64, z, Block::GRASS);
                }
            }
            world.set_chunk(chunk);
        }
        world
    }

    fn count(world: &SimpleChunkManager, wanted: Block) -> usize {
        world
            .coords()
            .into_iter()
            .filter_map(|c| world.chunk(c))
            .map(|chunk| {
                let mut n = 0;
                for y in 0..CHUNK_HEIGHT {
                    for z in 0..CHUNK_SIZE {
                        for x in 0..CHUNK_SIZE {
                            n += usize::from(chunk.get_block(x, y, z) == wanted);
                        }
                    }
                }
                n
            })
            .sum()
    }

    #[test]
    fn test_tall_grass_lands_on_grass() {
        let coord = ChunkCoord::new(0, 0);
        let mut world = grass_world(coord);
        let mut random = ChaCha8Rng::seed_from_u64(7);

        TallGrass::new(20, 0)
            .populate(&mut world, coord, &mut random)
            .unwrap();

        let placed = count(&world, Block::TALL_GRASS);
        assert!(placed > 0 && placed <= 20, "placed {placed}");
        let chunk = world.chunk(coord).unwrap();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let block = chunk.get_block(x, 65, z);
                assert!(block.is_air() || block == Block::TALL_GRASS);
            }
        }
    }

    #[test]
    fn test_trees_are_deterministic() {
        let coord = ChunkCoord::new(2, 5);
        let populator = Trees::new(TreeKind::Oak, 4, 2);

        let mut first = grass_world(coord);
        let mut second = grass_world(coord);
        populator
            .populate(&mut first, coord, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();
        populator
            .populate(&mut second, coord, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();

        for c in coord.neighbourhood() {
            assert!(first.chunk(c) == second.chunk(c), "chunk {c} differs");
        }
        assert!(count(&first, Block::OAK_LOG) > 0);
        assert!(count(&first, Block::OAK_LEAVES) > 0);
    }

    #[test]
    fn test_trees_need_neighbours() {
        let coord = ChunkCoord::new(0, 0);
        let mut world = SimpleChunkManager::new();
        let mut chunk = Chunk::new(coord);
        // A single grass column on the chunk's west edge
        for z in 0..CHUNK_SIZE {
            chunk.set_block(0, 64, z, Block::GRASS);
        }
        world.set_chunk(chunk);

        let populator = Trees::new(TreeKind::Spruce, 200, 0);
        let result = populator.populate(&mut world, coord, &mut ChaCha8Rng::seed_from_u64(3));

        assert!(
            matches!(result, Err(WorldGenError::ChunkNotLoaded(c)) if c.x == -1),
            "expected a write into the missing west neighbour, got {result:?}"
        );
    }

    #[test]
    fn test_no_ground_no_decoration() {
        let coord = ChunkCoord::new(0, 0);
        let mut world = SimpleChunkManager::new();
        world.set_chunk(Chunk::new(coord));

        Trees::new(TreeKind::Birch, 10, 0)
            .populate(&mut world, coord, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        TallGrass::new(10, 0)
            .populate(&mut world, coord, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();

        assert_eq!(world.chunk(coord).unwrap().solid_count(), 0);
    }
}
