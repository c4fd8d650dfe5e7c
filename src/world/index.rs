use crate::world::chunk::Chunk;
use crate::world::chunk_coord::ChunkCoord;
use std::collections::HashMap;
use std::sync::Arc;

/// Coordinate -> chunk map over the cached rectangle.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    chunks: HashMap<ChunkCoord, Arc<Chunk>>,
    south_west_edge: ChunkCoord,
    north_east_edge: ChunkCoord,
}

impl ChunkIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chunks: HashMap::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub fn get(&self, x: i32, z: i32) -> Option<&Arc<Chunk>> {
        self.chunks.get(&ChunkCoord::new(x, z))
    }

    pub fn get_coord(&self, coord: ChunkCoord) -> Option<&Arc<Chunk>> {
        self.chunks.get(&coord)
    }

    /// Inserts or overwrites, returning the displaced chunk.
    pub fn set(&mut self, x: i32, z: i32, chunk: Arc<Chunk>) -> Option<Arc<Chunk>> {
        self.chunks.insert(ChunkCoord::new(x, z), chunk)
    }

    pub fn remove(&mut self, x: i32, z: i32) -> Option<Arc<Chunk>> {
        self.chunks.remove(&ChunkCoord::new(x, z))
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Chunk>> {
        self.chunks.values()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    /// Removes every chunk, returning them so the caller can dispose them.
    pub fn drain(&mut self) -> Vec<Arc<Chunk>> {
        self.chunks.drain().map(|(_, chunk)| chunk).collect()
    }

    pub fn south_west_edge(&self) -> ChunkCoord {
        self.south_west_edge
    }

    pub fn north_east_edge(&self) -> ChunkCoord {
        self.north_east_edge
    }

    pub fn set_edges(&mut self, south_west: ChunkCoord, north_east: ChunkCoord) {
        self.south_west_edge = south_west;
        self.north_east_edge = north_east;
    }

    /// Whether the coordinate lies inside the current edges (inclusive).
    pub fn in_rectangle(&self, coord: ChunkCoord) -> bool {
        coord.x() >= self.south_west_edge.x()
            && coord.x() <= self.north_east_edge.x()
            && coord.z() >= self.south_west_edge.z()
            && coord.z() <= self.north_east_edge.z()
    }
}
