use crate::config::ChunkConfig;
use crate::utils::error::ChunkError;
use crate::world::block::{BlockType, MAX_SUNLIGHT};
use crate::world::chunk::Chunk;
use crate::world::storage::BlockStorage;

/// Pipeline stage that runs after generation and before meshing.
pub trait LightingStage: Send + Sync {
    fn light(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<(), ChunkError>;
}

/// Straight-down sunlight per column: full light above the first solid
/// block, dimmed through water, dark below.
pub struct ColumnSunlight {
    config: ChunkConfig,
}

const WATER_FALLOFF: u8 = 2;

impl ColumnSunlight {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }
}

impl LightingStage for ColumnSunlight {
    fn light(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<(), ChunkError> {
        let origin = chunk.world_position();
        let height = self.config.height_in_blocks();

        for x in 0..self.config.width_in_blocks() as i32 {
            if chunk.is_disposed() {
                return Err(ChunkError::Disposed(chunk.position()));
            }
            for z in 0..self.config.length_in_blocks() as i32 {
                let base = storage.column_base_offset(origin.x + x, origin.y + z);
                let mut light = MAX_SUNLIGHT;
                for y in (0..height).rev() {
                    let mut block = storage.get_at(base + y);
                    if block.is_solid() {
                        light = 0;
                    } else if block.block_type == BlockType::Water {
                        light = light.saturating_sub(WATER_FALLOFF);
                    }
                    if block.sun_light != light {
                        block.sun_light = light;
                        storage.set_at(base + y, block);
                    }
                }
            }
        }
        Ok(())
    }
}
