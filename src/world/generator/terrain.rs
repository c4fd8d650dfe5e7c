use super::biome::Biome;
use super::TerrainVariant;
use crate::config::ChunkConfig;
use crate::utils::error::ChunkError;
use crate::world::block::{Block, BlockType};
use crate::world::chunk::{Chunk, ChunkState};
use crate::world::storage::BlockStorage;
use noise::{NoiseFn, Perlin};

/// One noise octave: sample frequency and its weight as a fraction of chunk height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Octave {
    pub frequency: f64,
    pub amplitude: f64,
}

const fn octave(frequency: f64, amplitude: f64) -> Octave {
    Octave {
        frequency,
        amplitude,
    }
}

/// Height functions of a terrain variant. All heights are fractions of the
/// chunk height so the same constants work for any configured height.
#[derive(Debug, Clone, PartialEq)]
pub enum HeightField {
    Layered {
        rock_base: f64,
        rock_octaves: &'static [Octave],
        dirt_depth: f64,
        dirt_octaves: &'static [Octave],
        /// Folds the first rock octave into ridges that cut valleys.
        ridged: bool,
        sea_level: Option<f64>,
    },
    Flat {
        rock: f64,
        dirt: f64,
    },
}

impl HeightField {
    pub const MOUNTAINOUS: HeightField = HeightField::Layered {
        rock_base: 0.35,
        rock_octaves: &[
            octave(0.0043, 0.24),
            octave(0.0117, 0.11),
            octave(0.0291, 0.04),
            octave(0.0787, 0.012),
        ],
        dirt_depth: 0.03,
        dirt_octaves: &[octave(0.0213, 0.015), octave(0.0631, 0.006)],
        ridged: false,
        sea_level: None,
    };

    pub const VALLEY: HeightField = HeightField::Layered {
        rock_base: 0.50,
        rock_octaves: &[
            octave(0.0061, 0.22),
            octave(0.0173, 0.05),
            octave(0.0457, 0.015),
        ],
        dirt_depth: 0.04,
        dirt_octaves: &[octave(0.0312, 0.01)],
        ridged: true,
        sea_level: Some(0.36),
    };

    pub const FLAT_DEBUG: HeightField = HeightField::Flat {
        rock: 0.25,
        dirt: 0.28,
    };

    fn octave_count(&self) -> usize {
        match self {
            HeightField::Layered {
                rock_octaves,
                dirt_octaves,
                ..
            } => rock_octaves.len() + dirt_octaves.len(),
            HeightField::Flat { .. } => 0,
        }
    }
}

/// Column heights in blocks: rock up to and including `rock`, dirt above it
/// up to and including `dirt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHeights {
    pub rock: usize,
    pub dirt: usize,
    pub sea_level: Option<usize>,
}

pub struct TerrainGenerator {
    seed: u64,
    chunk: ChunkConfig,
    height_field: HeightField,
    biome: Biome,
    noise_layers: Vec<Perlin>,
}

impl TerrainGenerator {
    pub fn new(seed: u64, variant: TerrainVariant, chunk: ChunkConfig) -> Self {
        Self::with_strategies(seed, variant.height_field(), variant.default_biome(), chunk)
    }

    pub fn with_strategies(
        seed: u64,
        height_field: HeightField,
        biome: Biome,
        chunk: ChunkConfig,
    ) -> Self {
        // Perlin takes a u32 seed; fold both halves in so high bits still matter.
        let base_seed = (seed as u32) ^ ((seed >> 32) as u32);
        let noise_layers = (0..height_field.octave_count() as u32)
            .map(|i| Perlin::new(base_seed.wrapping_add(i.wrapping_mul(0x9E37_79B9))))
            .collect();

        Self {
            seed,
            chunk,
            height_field,
            biome,
            noise_layers,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    fn sample(&self, layers: &[Perlin], octaves: &[Octave], world_x: i32, world_z: i32, ridged: bool) -> f64 {
        octaves
            .iter()
            .zip(layers)
            .enumerate()
            .map(|(i, (octave, noise))| {
                let value = noise.get([
                    world_x as f64 * octave.frequency,
                    world_z as f64 * octave.frequency,
                ]);
                let value = if ridged && i == 0 { -value.abs() } else { value };
                value * octave.amplitude
            })
            .sum()
    }

    /// Rock and dirt heights for one world column. Pure in `(seed, x, z)`.
    pub fn column_heights(&self, world_x: i32, world_z: i32) -> ColumnHeights {
        let height = self.chunk.height_in_blocks() as f64;
        let max_index = self.chunk.max_height_index();
        let to_block = |fraction: f64| ((fraction * height) as isize).clamp(0, max_index as isize) as usize;

        match &self.height_field {
            HeightField::Layered {
                rock_base,
                rock_octaves,
                dirt_depth,
                dirt_octaves,
                ridged,
                sea_level,
            } => {
                let (rock_layers, dirt_layers) = self.noise_layers.split_at(rock_octaves.len());
                let rock = rock_base + self.sample(rock_layers, rock_octaves, world_x, world_z, *ridged);
                let dirt = rock + dirt_depth + self.sample(dirt_layers, dirt_octaves, world_x, world_z, false);
                let rock = to_block(rock);
                ColumnHeights {
                    rock,
                    dirt: to_block(dirt).max(rock),
                    sea_level: sea_level.map(to_block),
                }
            }
            HeightField::Flat { rock, dirt } => ColumnHeights {
                rock: to_block(*rock),
                dirt: to_block(*dirt),
                sea_level: None,
            },
        }
    }

    /// Fills the chunk's columns in block storage. A no-op unless the chunk is
    /// awaiting generation; on success the chunk awaits lighting and is dirty.
    pub fn generate(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<(), ChunkError> {
        if chunk.state() != ChunkState::AwaitingGenerate {
            return Ok(());
        }
        chunk.transition(ChunkState::AwaitingGenerate, ChunkState::Generating)?;

        let origin = chunk.world_position();
        let height = self.chunk.height_in_blocks();
        let mut highest_solid = 0usize;
        let mut lowest_empty = self.chunk.max_height_index();

        for x in 0..self.chunk.width_in_blocks() as i32 {
            if chunk.is_disposed() {
                return Err(ChunkError::Disposed(chunk.position()));
            }
            let world_x = origin.x + x;
            for z in 0..self.chunk.length_in_blocks() as i32 {
                let world_z = origin.y + z;
                let heights = self.column_heights(world_x, world_z);
                let base = storage.column_base_offset(world_x, world_z);

                for y in (0..height).rev() {
                    let block_type = if y > heights.dirt {
                        match heights.sea_level {
                            Some(sea) if y <= sea => BlockType::Water,
                            _ => BlockType::None,
                        }
                    } else if y > heights.rock {
                        BlockType::Dirt
                    } else {
                        BlockType::Rock
                    };

                    if block_type.is_solid() && y > highest_solid {
                        highest_solid = y;
                    }
                    if block_type == BlockType::None && y < lowest_empty {
                        lowest_empty = y;
                    }
                    storage.set_at(base + y, Block::new(block_type));
                }
            }
        }

        let dressed_top = self.biome.apply(self, chunk, storage, highest_solid);
        chunk.set_bounds(dressed_top.max(highest_solid) as u8, lowest_empty as u8);
        chunk.mark_dirty();
        chunk.transition(ChunkState::Generating, ChunkState::AwaitingLighting)?;

        log::trace!("Generated chunk {:?}", chunk.position());
        Ok(())
    }

    pub(crate) fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::world::chunk_coord::ChunkCoord;

    fn setup() -> (ChunkConfig, BlockStorage) {
        let chunk = ChunkConfig::new(8, 64, 8).unwrap();
        let cache = CacheConfig::new(1, 2, true, &chunk).unwrap();
        (chunk, BlockStorage::new(&chunk, &cache))
    }

    fn generate_snapshot(seed: u64, variant: TerrainVariant, coord: ChunkCoord) -> Vec<Block> {
        let (config, storage) = setup();
        let generator = TerrainGenerator::new(seed, variant, config);
        let chunk = Chunk::new(coord, &config);
        generator.generate(&chunk, &storage).unwrap();
        let origin = chunk.world_position();
        storage.snapshot(origin.x, origin.y, 8, 8)
    }

    #[test]
    fn test_generation_is_deterministic() {
        for variant in [
            TerrainVariant::Mountainous,
            TerrainVariant::Valley,
            TerrainVariant::FlatDebug,
        ] {
            for (seed, coord) in [
                (0, ChunkCoord::new(0, 0)),
                (42, ChunkCoord::new(-3, 7)),
                (u64::MAX, ChunkCoord::new(100, -100)),
            ] {
                assert_eq!(
                    generate_snapshot(seed, variant, coord),
                    generate_snapshot(seed, variant, coord),
                    "{:?} seed {} at {:?}",
                    variant,
                    seed,
                    coord
                );
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let coord = ChunkCoord::new(2, 2);
        assert_ne!(
            generate_snapshot(1, TerrainVariant::Mountainous, coord),
            generate_snapshot(2, TerrainVariant::Mountainous, coord)
        );
    }

    #[test]
    fn test_generate_advances_state_and_bounds() {
        let (config, storage) = setup();
        let generator = TerrainGenerator::new(9, TerrainVariant::FlatDebug, config);
        let chunk = Chunk::new(ChunkCoord::new(-1, 0), &config);

        generator.generate(&chunk, &storage).unwrap();

        assert_eq!(chunk.state(), ChunkState::AwaitingLighting);
        assert!(chunk.is_dirty());
        // rock to 16, dirt to 17 on a 64 high chunk
        assert_eq!(chunk.highest_solid_block_offset(), 17);
        assert_eq!(chunk.lowest_empty_block_offset(), 18);
        assert_eq!(storage.get(-8, 0, 0).block_type, BlockType::Rock);
        assert_eq!(storage.get(-8, 17, 0).block_type, BlockType::Dirt);
        assert_eq!(storage.get(-1, 18, 7).block_type, BlockType::None);
    }

    #[test]
    fn test_generate_is_noop_outside_awaiting_generate() {
        let (config, storage) = setup();
        let generator = TerrainGenerator::new(9, TerrainVariant::FlatDebug, config);
        let chunk = Chunk::new(ChunkCoord::new(0, 0), &config);
        chunk
            .transition(ChunkState::AwaitingGenerate, ChunkState::Generating)
            .unwrap();

        generator.generate(&chunk, &storage).unwrap();

        assert_eq!(chunk.state(), ChunkState::Generating);
        assert_eq!(storage.get(0, 0, 0), Block::AIR);
    }

    #[test]
    fn test_disposed_chunk_aborts_generation() {
        let (config, storage) = setup();
        let generator = TerrainGenerator::new(9, TerrainVariant::FlatDebug, config);
        let chunk = Chunk::new(ChunkCoord::new(0, 0), &config);
        chunk.dispose();

        assert_eq!(
            generator.generate(&chunk, &storage),
            Err(ChunkError::Disposed(ChunkCoord::new(0, 0)))
        );
    }

    #[test]
    fn test_column_heights_stay_in_bounds() {
        let (config, _) = setup();
        let generator = TerrainGenerator::new(3, TerrainVariant::Mountainous, config);
        for x in -50..50 {
            for z in (-50..50).step_by(7) {
                let heights = generator.column_heights(x * 13, z * 11);
                assert!(heights.rock <= heights.dirt);
                assert!(heights.dirt <= config.max_height_index());
            }
        }
    }

    #[test]
    fn test_valley_floods_below_sea_level() {
        let (config, storage) = setup();
        let generator = TerrainGenerator::new(5, TerrainVariant::Valley, config);
        let sea = generator.column_heights(0, 0).sea_level.unwrap();
        let chunk = Chunk::new(ChunkCoord::new(0, 0), &config);
        generator.generate(&chunk, &storage).unwrap();

        for x in 0..8 {
            for z in 0..8 {
                for y in 0..=sea {
                    assert_ne!(storage.get(x, y, z).block_type, BlockType::None);
                }
            }
        }
    }
}
