pub mod config;
pub mod engine;
pub mod player;
pub mod utils;
pub mod world;

// Re-export commonly used types
pub use config::{CacheConfig, ChunkConfig, ChunkSysConfig, EngineConfig, WorldGenConfig};
pub use engine::{EngineStats, VoxelEngine};
pub use player::PlayerState;
pub use utils::error::{ChunkError, ConfigError, WorldError};
pub use utils::math::AABB;
pub use world::block::{Block, BlockType};
pub use world::builder::ChunkBuilder;
pub use world::cache::ChunkCache;
pub use world::chunk::{Chunk, ChunkState};
pub use world::chunk_coord::ChunkCoord;
pub use world::generator::{Biome, TerrainGenerator, TerrainVariant};
pub use world::storage::BlockStorage;
