use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Raw chunk-system settings as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkSysConfig {
    pub chunk_width: u32,
    pub chunk_height: u32,
    pub chunk_length: u32,
    pub view_range: u32,
    pub cache_range: u32,
    pub cache_extra_chunks: bool,
    pub worker_threads: usize,
    pub scan_interval_ms: u64,
}

impl Default for ChunkSysConfig {
    fn default() -> Self {
        Self {
            chunk_width: 16,
            chunk_height: 128,
            chunk_length: 16,
            view_range: 3,
            cache_range: 5,
            cache_extra_chunks: true,
            worker_threads: 4,
            scan_interval_ms: 10,
        }
    }
}

impl ChunkSysConfig {
    /// Checks every dimension and range relationship once, up front.
    pub fn validate(&self) -> Result<(ChunkConfig, CacheConfig), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let chunk = ChunkConfig::new(self.chunk_width, self.chunk_height, self.chunk_length)?;
        let cache = CacheConfig::new(
            self.view_range,
            self.cache_range,
            self.cache_extra_chunks,
            &chunk,
        )?;
        Ok((chunk, cache))
    }
}

/// Validated chunk dimensions. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    width_in_blocks: usize,
    height_in_blocks: usize,
    length_in_blocks: usize,
}

impl ChunkConfig {
    pub fn new(width: u32, height: u32, length: u32) -> Result<Self, ConfigError> {
        if width == 0 {
            return Err(ConfigError::ZeroChunkDimension { axis: "width" });
        }
        if height == 0 {
            return Err(ConfigError::ZeroChunkDimension { axis: "height" });
        }
        if length == 0 {
            return Err(ConfigError::ZeroChunkDimension { axis: "length" });
        }
        // Vertical bounds are tracked as u8 offsets.
        if height > 256 {
            return Err(ConfigError::ChunkTooTall(height));
        }
        Ok(Self {
            width_in_blocks: width as usize,
            height_in_blocks: height as usize,
            length_in_blocks: length as usize,
        })
    }

    pub fn width_in_blocks(&self) -> usize {
        self.width_in_blocks
    }

    pub fn height_in_blocks(&self) -> usize {
        self.height_in_blocks
    }

    pub fn length_in_blocks(&self) -> usize {
        self.length_in_blocks
    }

    pub fn volume(&self) -> usize {
        self.width_in_blocks * self.height_in_blocks * self.length_in_blocks
    }

    pub fn max_width_index(&self) -> usize {
        self.width_in_blocks - 1
    }

    pub fn max_height_index(&self) -> usize {
        self.height_in_blocks - 1
    }

    pub fn max_length_index(&self) -> usize {
        self.length_in_blocks - 1
    }
}

/// Validated view/cache window settings plus the derived block dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    view_range: u32,
    cache_range: u32,
    cache_extra_chunks: bool,
    cache_width_in_blocks: usize,
    cache_length_in_blocks: usize,
    view_width_in_blocks: usize,
    view_length_in_blocks: usize,
}

impl CacheConfig {
    pub fn new(
        view_range: u32,
        cache_range: u32,
        cache_extra_chunks: bool,
        chunk: &ChunkConfig,
    ) -> Result<Self, ConfigError> {
        if view_range == 0 {
            return Err(ConfigError::ZeroViewRange);
        }
        if cache_range == 0 {
            return Err(ConfigError::ZeroCacheRange);
        }
        if view_range > cache_range {
            return Err(ConfigError::ViewExceedsCache {
                view_range,
                cache_range,
            });
        }
        if !cache_extra_chunks && view_range != cache_range {
            return Err(ConfigError::UnexpectedExtraChunks {
                view_range,
                cache_range,
            });
        }
        if cache_extra_chunks && cache_range <= view_range {
            return Err(ConfigError::MissingExtraChunks {
                view_range,
                cache_range,
            });
        }

        let cache_diameter = (cache_range * 2 + 1) as usize;
        let view_diameter = (view_range * 2 + 1) as usize;
        Ok(Self {
            view_range,
            cache_range,
            cache_extra_chunks,
            cache_width_in_blocks: cache_diameter * chunk.width_in_blocks(),
            cache_length_in_blocks: cache_diameter * chunk.length_in_blocks(),
            view_width_in_blocks: view_diameter * chunk.width_in_blocks(),
            view_length_in_blocks: view_diameter * chunk.length_in_blocks(),
        })
    }

    pub fn view_range(&self) -> u32 {
        self.view_range
    }

    pub fn cache_range(&self) -> u32 {
        self.cache_range
    }

    pub fn cache_extra_chunks(&self) -> bool {
        self.cache_extra_chunks
    }

    /// Chunks across the cached rectangle on either axis.
    pub fn cache_diameter(&self) -> usize {
        (self.cache_range * 2 + 1) as usize
    }

    pub fn cache_width_in_blocks(&self) -> usize {
        self.cache_width_in_blocks
    }

    pub fn cache_length_in_blocks(&self) -> usize {
        self.cache_length_in_blocks
    }

    pub fn view_width_in_blocks(&self) -> usize {
        self.view_width_in_blocks
    }

    pub fn view_length_in_blocks(&self) -> usize {
        self.view_length_in_blocks
    }
}
