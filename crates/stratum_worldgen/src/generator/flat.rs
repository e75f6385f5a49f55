//! # Flat Generator
//!
//! Fills every chunk with the same stack of layers.
//!
//! The stack comes from the `preset` option, `version;layers;biome;extras`:
//!
//! ```text
//! 2;bedrock,2xdirt,grass;1;
//! ```
//!
//! Layers are listed bottom to top. Each is `[N x]block` (`N*block` also
//! works), where `block` is a name or a numeric `id[:meta]`.

use tracing::info;

use super::{Generator, GeneratorContext};
use crate::biome::BiomeId;
use crate::chunk::{Block, Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE};
use crate::error::{WorldGenError, WorldGenResult};

/// A parsed flat world preset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatPreset {
    /// Blocks from y = 0 upwards.
    layers: Vec<Block>,
    biome: BiomeId,
    extras: String,
}

impl FlatPreset {
    /// Preset used when none is configured.
    pub const DEFAULT: &'static str = "2;bedrock,2xdirt,grass;1;";

    /// Parses a preset string.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` on a malformed version, layer, count or
    /// biome id, on an empty layer list, or if the stack is taller than the
    /// world.
    pub fn parse(preset: &str) -> WorldGenResult<Self> {
        let mut parts = preset.splitn(4, ';');
        let version = parts.next().unwrap_or_default().trim();
        let layers = parts.next().unwrap_or_default();
        let biome = parts.next().unwrap_or_default().trim();
        let extras = parts.next().unwrap_or_default().trim().to_owned();

        if !version.is_empty() && version.parse::<u32>().is_err() {
            return Err(invalid(format!("bad preset version `{version}`")));
        }

        let mut stack = Vec::new();
        for spec in layers.split(',') {
            let (count, block) = parse_layer(spec)?;
            if stack.len() + count > CHUNK_HEIGHT {
                return Err(invalid(format!(
                    "preset has more than {CHUNK_HEIGHT} layers"
                )));
            }
            stack.extend(std::iter::repeat(block).take(count));
        }

        let biome = if biome.is_empty() {
            BiomeId::PLAINS
        } else {
            biome
                .parse::<u8>()
                .map(BiomeId::new)
                .map_err(|_| invalid(format!("bad biome id `{biome}`")))?
        };

        Ok(Self {
            layers: stack,
            biome,
            extras,
        })
    }

    /// Blocks from y = 0 upwards.
    #[must_use]
    pub fn layers(&self) -> &[Block] {
        &self.layers
    }

    /// Biome of every column.
    #[must_use]
    pub const fn biome(&self) -> BiomeId {
        self.biome
    }

    /// Extra settings, kept verbatim.
    #[must_use]
    pub fn extras(&self) -> &str {
        &self.extras
    }
}

fn invalid(message: String) -> WorldGenError {
    WorldGenError::InvalidGeneratorOptions(message)
}

/// Parses `[N x]block` into a count and a block.
fn parse_layer(spec: &str) -> WorldGenResult<(usize, Block)> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(invalid("empty layer in preset".to_owned()));
    }

    let split = spec
        .find(['x', '*'])
        .filter(|&at| at > 0 && spec[..at].bytes().all(|b| b.is_ascii_digit()));
    let (count, block) = match split {
        Some(at) => {
            let count = spec[..at]
                .parse::<usize>()
                .map_err(|_| invalid(format!("bad layer count in `{spec}`")))?;
            (count, &spec[at + 1..])
        }
        None => (1, spec),
    };

    if count == 0 {
        return Err(invalid(format!("layer `{spec}` has a zero count")));
    }
    let block = parse_block(block.trim()).ok_or_else(|| invalid(format!("unknown block `{block}`")))?;
    Ok((count, block))
}

/// A block name, or a numeric `id[:meta]`.
fn parse_block(text: &str) -> Option<Block> {
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        let (id, meta) = text.split_once(':').unwrap_or((text, "0"));
        return Some(Block::with_meta(id.parse().ok()?, meta.parse().ok()?));
    }
    Block::from_name(text)
}

/// Superflat terrain.
#[derive(Debug)]
pub struct FlatGenerator {
    context: GeneratorContext,
    preset: FlatPreset,
}

impl FlatGenerator {
    /// Registered name.
    pub const NAME: &'static str = "flat";

    /// Builds a flat generator, reading the `preset` option.
    ///
    /// # Errors
    ///
    /// `InvalidGeneratorOptions` if the preset does not parse.
    pub fn new(context: GeneratorContext) -> WorldGenResult<Self> {
        let preset = context.options.get_str("preset")?.unwrap_or(FlatPreset::DEFAULT);
        let preset = FlatPreset::parse(preset)?;
        info!(
            seed = %context.seed,
            layers = preset.layers().len(),
            biome = %preset.biome(),
            "created flat generator"
        );
        Ok(Self { context, preset })
    }

    /// The parsed preset.
    #[must_use]
    pub fn preset(&self) -> &FlatPreset {
        &self.preset
    }
}

impl Generator for FlatGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn context(&self) -> &GeneratorContext {
        &self.context
    }

    fn generate_chunk(&self, coord: ChunkCoord) -> WorldGenResult<Chunk> {
        let mut chunk = Chunk::new(coord.check_generatable()?);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                chunk.set_biome_id(x, z, self.preset.biome);
                for (y, block) in self.preset.layers.iter().enumerate() {
                    chunk.set_block(x, y, z, *block);
                }
            }
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeRegistry;
    use crate::generator::GeneratorOptions;
    use crate::seed::WorldSeed;
    use std::sync::Arc;

    fn context(options: GeneratorOptions) -> GeneratorContext {
        GeneratorContext::new(WorldSeed::new(1), options, Arc::new(BiomeRegistry::with_builtin()))
    }

    #[test]
    fn test_default_preset() {
        let preset = FlatPreset::parse(FlatPreset::DEFAULT).unwrap();
        assert_eq!(
            preset.layers(),
            &[Block::BEDROCK, Block::DIRT, Block::DIRT, Block::GRASS]
        );
        assert_eq!(preset.biome(), BiomeId::PLAINS);
        assert_eq!(preset.extras(), "");
    }

    #[test]
    fn test_layer_syntax() {
        let preset = FlatPreset::parse("3;7,3*1,2x3:1, sand;2;village,decoration").unwrap();
        assert_eq!(
            preset.layers(),
            &[
                Block::BEDROCK,
                Block::STONE,
                Block::STONE,
                Block::STONE,
                Block::with_meta(3, 1),
                Block::with_meta(3, 1),
                Block::SAND,
            ]
        );
        assert_eq!(preset.biome(), BiomeId::DESERT);
        assert_eq!(preset.extras(), "village,decoration");

        let short = FlatPreset::parse("2;bedrock").unwrap();
        assert_eq!(short.biome(), BiomeId::PLAINS);
    }

    #[test]
    fn test_bad_presets_are_rejected() {
        for preset in [
            "2;;1;",
            "2;bedrock,,grass;1;",
            "2;unobtainium;1;",
            "2;0xdirt;1;",
            "2;bedrock;256;",
            "2;bedrock;ocean;",
            "two;bedrock;1;",
            "2;257xstone;1;",
            "2;200xstone,57xdirt;1;",
            "2;7:x;1;",
        ] {
            assert!(
                matches!(FlatPreset::parse(preset), Err(WorldGenError::InvalidGeneratorOptions(_))),
                "{preset:?} should be rejected"
            );
        }
        assert!(FlatPreset::parse("2;256xstone;1;").is_ok());
    }

    #[test]
    fn test_generator_rejects_bad_options() {
        let bad = context(GeneratorOptions::new().with("preset", "2;nothing;1;"));
        assert!(FlatGenerator::new(bad).is_err());

        let wrong_type = context(GeneratorOptions::new().with("preset", 5));
        assert!(matches!(
            FlatGenerator::new(wrong_type),
            Err(WorldGenError::InvalidGeneratorOptions(_))
        ));
    }

    #[test]
    fn test_chunks_are_identical_layers() {
        let generator = FlatGenerator::new(context(GeneratorOptions::new())).unwrap();
        let a = generator.generate_chunk(ChunkCoord::new(0, 0)).unwrap();
        let b = generator.generate_chunk(ChunkCoord::new(-30, 12)).unwrap();

        assert_eq!(b.coord(), ChunkCoord::new(-30, 12));
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(a.highest_block_at(x, z), Some(3));
                assert_eq!(b.get_block(x, 3, z), Block::GRASS);
                assert_eq!(b.biome_id(x, z), BiomeId::PLAINS);
            }
        }
        assert_eq!(a.solid_count(), b.solid_count());
    }
}
