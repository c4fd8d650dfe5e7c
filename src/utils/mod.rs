pub mod error;
pub mod math;

pub use error::{ChunkError, ConfigError, WorldError};
pub use math::AABB;
