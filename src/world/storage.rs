//! Flat block storage for the whole cached window.
//!
//! One array holds every block of every cached chunk, laid out `[x][z][y]`.
//! World coordinates are folded onto the array with Euclidean modulo, so the
//! array behaves as a ring buffer over world space: when the window slides,
//! the chunk entering the leading edge lands on exactly the slots freed by
//! the chunk leaving the trailing edge, and overwrites them wholesale during
//! generation.
//!
//! The storage performs no synchronization of its own. Each slot is an
//! `AtomicU64` accessed with relaxed ordering, which keeps individual reads
//! and writes well defined; consistency of a whole column comes from the
//! scheduler guaranteeing that at most one task owns a chunk at a time.

use crate::config::{CacheConfig, ChunkConfig};
use crate::utils::math::wrap;
use crate::world::block::Block;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct BlockStorage {
    blocks: Box<[AtomicU64]>,
    cache_width: usize,
    cache_length: usize,
    height: usize,
    flatten_offset: usize,
}

impl BlockStorage {
    pub fn new(chunk: &ChunkConfig, cache: &CacheConfig) -> Self {
        let cache_width = cache.cache_width_in_blocks();
        let cache_length = cache.cache_length_in_blocks();
        let height = chunk.height_in_blocks();
        let size = cache_width * cache_length * height;

        let blocks = (0..size)
            .map(|_| AtomicU64::new(Block::AIR.pack()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        log::debug!(
            "Allocated block storage {}x{}x{} ({} blocks)",
            cache_width,
            height,
            cache_length,
            size
        );

        Self {
            blocks,
            cache_width,
            cache_length,
            height,
            flatten_offset: cache_length * height,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stride between consecutive x slices of the backing array.
    pub fn flatten_offset(&self) -> usize {
        self.flatten_offset
    }

    /// Index of `y == 0` for the column at the given world coordinates.
    #[inline]
    pub fn column_base_offset(&self, world_x: i32, world_z: i32) -> usize {
        wrap(world_x, self.cache_width) * self.flatten_offset + wrap(world_z, self.cache_length) * self.height
    }

    #[inline]
    fn offset(&self, world_x: i32, y: usize, world_z: i32) -> usize {
        debug_assert!(y < self.height, "y {} outside chunk height {}", y, self.height);
        self.column_base_offset(world_x, world_z) + y
    }

    #[inline]
    pub fn get(&self, world_x: i32, y: usize, world_z: i32) -> Block {
        Block::unpack(self.blocks[self.offset(world_x, y, world_z)].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, world_x: i32, y: usize, world_z: i32, block: Block) {
        self.blocks[self.offset(world_x, y, world_z)].store(block.pack(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get_at(&self, offset: usize) -> Block {
        Block::unpack(self.blocks[offset].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_at(&self, offset: usize, block: Block) {
        self.blocks[offset].store(block.pack(), Ordering::Relaxed);
    }

    /// Copies the blocks of a `width` x `length` area of full-height columns.
    pub fn snapshot(&self, origin_x: i32, origin_z: i32, width: usize, length: usize) -> Vec<Block> {
        let mut out = Vec::with_capacity(width * length * self.height);
        for x in 0..width as i32 {
            for z in 0..length as i32 {
                let base = self.column_base_offset(origin_x + x, origin_z + z);
                out.extend((0..self.height).map(|y| self.get_at(base + y)));
            }
        }
        out
    }
}
