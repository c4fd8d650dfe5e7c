use crate::world::chunk::ChunkState;
use crate::world::chunk_coord::ChunkCoord;
use thiserror::Error;

/// Invalid chunk or cache configuration. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Chunk dimension `{axis}` must be non-zero")]
    ZeroChunkDimension { axis: &'static str },

    #[error("Chunk height {0} exceeds the maximum of 256 blocks")]
    ChunkTooTall(u32),

    #[error("View range must be at least 1")]
    ZeroViewRange,

    #[error("Cache range must be at least 1")]
    ZeroCacheRange,

    #[error("View range {view_range} exceeds cache range {cache_range}")]
    ViewExceedsCache { view_range: u32, cache_range: u32 },

    #[error("Cache range {cache_range} must equal view range {view_range} when extra chunks are disabled")]
    UnexpectedExtraChunks { view_range: u32, cache_range: u32 },

    #[error("Cache range {cache_range} must exceed view range {view_range} when extra chunks are enabled")]
    MissingExtraChunks { view_range: u32, cache_range: u32 },

    #[error("At least one worker thread is required")]
    NoWorkers,
}

/// Failure while pushing one chunk through the pipeline. Isolated to that chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Chunk {coord:?} is in state {actual:?}, expected {expected:?}")]
    WrongState {
        coord: ChunkCoord,
        expected: ChunkState,
        actual: ChunkState,
    },

    #[error("Chunk {0:?} was disposed while in flight")]
    Disposed(ChunkCoord),

    #[error("Stage `{stage}` failed for chunk {coord:?}: {message}")]
    StageFailed {
        stage: &'static str,
        coord: ChunkCoord,
        message: String,
    },

    #[error("Worker panicked while processing chunk {coord:?}: {message}")]
    Panicked { coord: ChunkCoord, message: String },
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Block ({x}, {y}, {z}) is outside the cached window")]
    OutOfRange { x: i32, y: i32, z: i32 },

    #[error("Chunk {0:?} has not been generated yet")]
    NotGenerated(ChunkCoord),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, WorldError>;
