pub mod block;
pub mod builder;
pub mod cache;
pub mod chunk;
pub mod chunk_coord;
pub mod generator;
pub mod index;
pub mod lighting;
pub mod mesher;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use block::{Block, BlockType};
pub use builder::{BuilderStats, ChunkBuilder, ScanReport};
pub use cache::ChunkCache;
pub use chunk::{Chunk, ChunkState};
pub use chunk_coord::ChunkCoord;
pub use generator::{Biome, HeightField, TerrainGenerator, TerrainVariant};
pub use index::ChunkIndex;
pub use lighting::{ColumnSunlight, LightingStage};
pub use mesher::{ChunkMesh, FaceMesher, MeshStage};
pub use storage::BlockStorage;
