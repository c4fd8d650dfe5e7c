use crate::config::{CacheConfig, ChunkConfig};
use crate::player::PlayerState;
use crate::utils::math::AABB;
use crate::world::chunk::Chunk;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::index::ChunkIndex;
use glam::Vec3;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/// Keeps the index populated with exactly the square of chunks within
/// `cache_range` of the player's chunk. Chunks leaving the square are
/// disposed; their storage slots are reused by the chunks entering it.
pub struct ChunkCache {
    chunk: ChunkConfig,
    config: CacheConfig,
    index: Arc<RwLock<ChunkIndex>>,
    center: ChunkCoord,
    bounds: AABB,
}

impl ChunkCache {
    pub fn new(chunk: ChunkConfig, config: CacheConfig, index: Arc<RwLock<ChunkIndex>>) -> Self {
        Self {
            chunk,
            config,
            index,
            center: ChunkCoord::default(),
            bounds: AABB::new(Vec3::ZERO, Vec3::ZERO),
        }
    }

    pub fn center(&self) -> ChunkCoord {
        self.center
    }

    /// Block-space box covering every cached chunk.
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn in_cache_range(&self, coord: ChunkCoord) -> bool {
        coord.chebyshev_distance(&self.center) <= self.config.cache_range() as i32
    }

    pub fn in_view_range(&self, coord: ChunkCoord) -> bool {
        coord.chebyshev_distance(&self.center) <= self.config.view_range() as i32
    }

    /// Chunks inside the view square, for whoever draws them.
    pub fn visible_chunks(&self) -> Vec<Arc<Chunk>> {
        let index = self.index.read();
        let range = self.config.view_range() as i32;
        let mut visible = Vec::with_capacity(((2 * range + 1) * (2 * range + 1)) as usize);
        for x in self.center.x() - range..=self.center.x() + range {
            for z in self.center.z() - range..=self.center.z() + range {
                if let Some(chunk) = index.get(x, z) {
                    visible.push(chunk.clone());
                }
            }
        }
        visible
    }

    /// Fills the whole square around `center`, disposing anything cached before.
    pub fn spawn(&mut self, center: ChunkCoord) {
        let lock = self.index.clone();
        let mut index = lock.write();
        for chunk in index.drain() {
            chunk.dispose();
        }

        self.center = center;
        let range = self.config.cache_range() as i32;
        for x in center.x() - range..=center.x() + range {
            for z in center.z() - range..=center.z() + range {
                index.set(x, z, self.new_chunk(x, z));
            }
        }
        self.update_edges(&mut index);
        info!(
            "Spawned {} chunks around {:?}",
            index.len(),
            center
        );
    }

    /// Centres the cache on the player's chunk.
    pub fn spawn_at(&mut self, player: &mut PlayerState) {
        let coord = self.chunk_of(player.position);
        player.current_chunk = coord;
        player.last_chunk = coord;
        self.spawn(coord);
    }

    /// Follows the player. Returns the chunk displacement if the player
    /// crossed into another chunk since the last tick.
    pub fn tick(&mut self, player: &mut PlayerState) -> Option<ChunkCoord> {
        let now = self.chunk_of(player.position);
        if now == player.current_chunk {
            return None;
        }
        player.last_chunk = player.current_chunk;
        player.current_chunk = now;

        let displacement = now - self.center;
        if displacement.chebyshev_distance(&ChunkCoord::default()) > 1 && !player.is_flying {
            warn!(
                "Player moved {:?} chunks in one tick without flying",
                displacement
            );
        }
        self.recache(displacement);
        Some(displacement)
    }

    /// Moves the window by `displacement` chunks, one row or column at a time.
    /// A jump at least as wide as the window rebuilds it from scratch.
    pub fn recache(&mut self, displacement: ChunkCoord) {
        if displacement == ChunkCoord::default() {
            return;
        }
        let diameter = self.config.cache_diameter() as i32;
        if displacement.x().abs() >= diameter || displacement.z().abs() >= diameter {
            debug!("Displacement {:?} exceeds the cache, respawning", displacement);
            self.spawn(self.center + displacement);
            return;
        }

        let lock = self.index.clone();
        let mut index = lock.write();
        for _ in 0..displacement.x().abs() {
            self.shift_x(&mut index, displacement.x().signum());
        }
        for _ in 0..displacement.z().abs() {
            self.shift_z(&mut index, displacement.z().signum());
        }
        debug!("Recached around {:?}", self.center);
    }

    fn shift_x(&mut self, index: &mut ChunkIndex, dir: i32) {
        let range = self.config.cache_range() as i32;
        let trailing = self.center.x() - dir * range;
        let leading = self.center.x() + dir * (range + 1);
        for z in self.center.z() - range..=self.center.z() + range {
            if let Some(chunk) = index.remove(trailing, z) {
                chunk.dispose();
            }
            index.set(leading, z, self.new_chunk(leading, z));
        }
        self.center = self.center + ChunkCoord::new(dir, 0);
        self.update_edges(index);
    }

    fn shift_z(&mut self, index: &mut ChunkIndex, dir: i32) {
        let range = self.config.cache_range() as i32;
        let trailing = self.center.z() - dir * range;
        let leading = self.center.z() + dir * (range + 1);
        for x in self.center.x() - range..=self.center.x() + range {
            if let Some(chunk) = index.remove(x, trailing) {
                chunk.dispose();
            }
            index.set(x, leading, self.new_chunk(x, leading));
        }
        self.center = self.center + ChunkCoord::new(0, dir);
        self.update_edges(index);
    }

    fn update_edges(&mut self, index: &mut ChunkIndex) {
        let range = self.config.cache_range() as i32;
        let south_west = self.center - ChunkCoord::new(range, range);
        let north_east = self.center + ChunkCoord::new(range, range);
        index.set_edges(south_west, north_east);

        let width = self.chunk.width_in_blocks() as f32;
        let length = self.chunk.length_in_blocks() as f32;
        self.bounds = AABB::new(
            Vec3::new(south_west.x() as f32 * width, 0.0, south_west.z() as f32 * length),
            Vec3::new(
                (north_east.x() + 1) as f32 * width,
                self.chunk.height_in_blocks() as f32,
                (north_east.z() + 1) as f32 * length,
            ),
        );
    }

    fn new_chunk(&self, x: i32, z: i32) -> Arc<Chunk> {
        Arc::new(Chunk::new(ChunkCoord::new(x, z), &self.chunk))
    }

    fn chunk_of(&self, position: Vec3) -> ChunkCoord {
        ChunkCoord::from_world_pos(
            position,
            self.chunk.width_in_blocks(),
            self.chunk.length_in_blocks(),
        )
    }
}
