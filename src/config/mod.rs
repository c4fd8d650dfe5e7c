pub mod chunksys;
pub mod core;
pub mod worldgen;

pub use chunksys::{CacheConfig, ChunkConfig, ChunkSysConfig};
pub use self::core::{default_config_path, EngineConfig};
pub use worldgen::WorldGenConfig;
