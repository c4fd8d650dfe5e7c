use crate::world::chunk_coord::ChunkCoord;
use glam::Vec3;

/// The part of the player the chunk cache follows.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Chunk the cache is currently centred on.
    pub current_chunk: ChunkCoord,
    /// Chunk the player was in before the last crossing.
    pub last_chunk: ChunkCoord,
    /// Flying players may cross several chunks per tick without a warning.
    pub is_flying: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            current_chunk: ChunkCoord::default(),
            last_chunk: ChunkCoord::default(),
            is_flying: false,
        }
    }
}

impl PlayerState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Integrates velocity over `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }
}
