use glam::{IVec2, Vec3};
use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// Horizontal chunk coordinate. Chunks span the full world height, so there is no y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkCoord(pub IVec2);

impl PartialOrd for ChunkCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChunkCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.x.cmp(&other.0.x) {
            Ordering::Equal => self.0.y.cmp(&other.0.y),
            ord => ord,
        }
    }
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self(IVec2::new(x, z))
    }

    pub fn x(&self) -> i32 {
        self.0.x
    }

    pub fn z(&self) -> i32 {
        self.0.y
    }

    /// Chunk containing the given block column. Floors toward negative infinity.
    pub fn from_block(world_x: i32, world_z: i32, width: usize, length: usize) -> Self {
        Self::new(
            world_x.div_euclid(width as i32),
            world_z.div_euclid(length as i32),
        )
    }

    pub fn from_world_pos(pos: Vec3, width: usize, length: usize) -> Self {
        Self::new(
            (pos.x / width as f32).floor() as i32,
            (pos.z / length as f32).floor() as i32,
        )
    }

    /// World block coordinates of this chunk's south-west corner column.
    pub fn to_block_origin(&self, width: usize, length: usize) -> (i32, i32) {
        (self.0.x * width as i32, self.0.y * length as i32)
    }

    /// Chebyshev distance, the metric the square cache window is built on.
    pub fn chebyshev_distance(&self, other: &Self) -> i32 {
        (self.0.x - other.0.x).abs().max((self.0.y - other.0.y).abs())
    }
}

impl Add for ChunkCoord {
    type Output = ChunkCoord;

    fn add(self, rhs: ChunkCoord) -> ChunkCoord {
        ChunkCoord(self.0 + rhs.0)
    }
}

impl Sub for ChunkCoord {
    type Output = ChunkCoord;

    fn sub(self, rhs: ChunkCoord) -> ChunkCoord {
        ChunkCoord(self.0 - rhs.0)
    }
}

impl From<IVec2> for ChunkCoord {
    fn from(vec: IVec2) -> Self {
        Self(vec)
    }
}

impl From<ChunkCoord> for IVec2 {
    fn from(coord: ChunkCoord) -> Self {
        coord.0
    }
}
