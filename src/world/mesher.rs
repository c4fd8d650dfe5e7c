use crate::config::ChunkConfig;
use crate::utils::error::ChunkError;
use crate::world::block::{Block, MAX_SUNLIGHT};
use crate::world::chunk::Chunk;
use crate::world::storage::BlockStorage;
use glam::Vec3;

/// Minimum brightness so faces in shadow stay visible.
const AMBIENT: f32 = 0.2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<f32>, // 3D positions (x, y, z)
    pub normals: Vec<f32>,  // Normal vectors (nx, ny, nz)
    pub colors: Vec<f32>,   // Lit vertex colors (r, g, b)
    pub indices: Vec<u32>,  // Vertex indices
    pub vertex_count: usize,
    pub index_count: usize,
}

impl ChunkMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_face(&mut self, positions: &[Vec3; 4], normal: Vec3, color: [f32; 3]) {
        let base_index = self.vertex_count as u32;

        for pos in positions {
            self.vertices.extend([pos.x, pos.y, pos.z]);
            self.normals.extend([normal.x, normal.y, normal.z]);
            self.colors.extend(color);
            self.vertex_count += 1;
        }

        // Two triangles per quad face
        self.indices.extend([
            base_index,
            base_index + 1,
            base_index + 2,
            base_index + 2,
            base_index + 3,
            base_index,
        ]);
        self.index_count += 6;
    }

    pub fn face_count(&self) -> usize {
        self.index_count / 6
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

/// Pipeline stage that turns a lit chunk into a mesh.
pub trait MeshStage: Send + Sync {
    fn build(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<ChunkMesh, ChunkError>;
}

#[derive(Debug, Clone, Copy)]
enum Face {
    Top,
    Bottom,
    North,
    South,
    East,
    West,
}

impl Face {
    const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::North,
        Face::South,
        Face::East,
        Face::West,
    ];

    fn offset(self) -> (i32, i32, i32) {
        match self {
            Face::Top => (0, 1, 0),
            Face::Bottom => (0, -1, 0),
            Face::North => (0, 0, 1),
            Face::South => (0, 0, -1),
            Face::East => (1, 0, 0),
            Face::West => (-1, 0, 0),
        }
    }

    fn corners(self, p: Vec3) -> [Vec3; 4] {
        match self {
            Face::Top => [
                p + Vec3::new(0.0, 1.0, 1.0),
                p + Vec3::new(1.0, 1.0, 1.0),
                p + Vec3::new(1.0, 1.0, 0.0),
                p + Vec3::new(0.0, 1.0, 0.0),
            ],
            Face::Bottom => [
                p + Vec3::new(0.0, 0.0, 0.0),
                p + Vec3::new(1.0, 0.0, 0.0),
                p + Vec3::new(1.0, 0.0, 1.0),
                p + Vec3::new(0.0, 0.0, 1.0),
            ],
            Face::North => [
                p + Vec3::new(0.0, 0.0, 1.0),
                p + Vec3::new(1.0, 0.0, 1.0),
                p + Vec3::new(1.0, 1.0, 1.0),
                p + Vec3::new(0.0, 1.0, 1.0),
            ],
            Face::South => [
                p + Vec3::new(1.0, 0.0, 0.0),
                p + Vec3::new(0.0, 0.0, 0.0),
                p + Vec3::new(0.0, 1.0, 0.0),
                p + Vec3::new(1.0, 1.0, 0.0),
            ],
            Face::East => [
                p + Vec3::new(1.0, 0.0, 1.0),
                p + Vec3::new(1.0, 0.0, 0.0),
                p + Vec3::new(1.0, 1.0, 0.0),
                p + Vec3::new(1.0, 1.0, 1.0),
            ],
            Face::West => [
                p + Vec3::new(0.0, 0.0, 0.0),
                p + Vec3::new(0.0, 0.0, 1.0),
                p + Vec3::new(0.0, 1.0, 1.0),
                p + Vec3::new(0.0, 1.0, 0.0),
            ],
        }
    }

    fn normal(self) -> Vec3 {
        let (x, y, z) = self.offset();
        Vec3::new(x as f32, y as f32, z as f32)
    }
}

/// Emits one quad per solid face that touches a non-solid block. Neighbours
/// are only read inside the chunk; faces on the chunk border are always kept.
pub struct FaceMesher {
    config: ChunkConfig,
}

impl FaceMesher {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    fn neighbour(&self, chunk: &Chunk, storage: &BlockStorage, x: i32, y: i32, z: i32) -> Option<Block> {
        let inside = x >= 0
            && z >= 0
            && y >= 0
            && x < self.config.width_in_blocks() as i32
            && z < self.config.length_in_blocks() as i32
            && y < self.config.height_in_blocks() as i32;
        if !inside {
            return None;
        }
        let origin = chunk.world_position();
        Some(storage.get(origin.x + x, y as usize, origin.y + z))
    }
}

impl MeshStage for FaceMesher {
    fn build(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<ChunkMesh, ChunkError> {
        let mut mesh = ChunkMesh::new();
        let origin = chunk.world_position();
        let top = chunk.highest_solid_block_offset() as i32;

        for x in 0..self.config.width_in_blocks() as i32 {
            if chunk.is_disposed() {
                return Err(ChunkError::Disposed(chunk.position()));
            }
            for z in 0..self.config.length_in_blocks() as i32 {
                for y in 0..=top {
                    let block = storage.get(origin.x + x, y as usize, origin.y + z);
                    if !block.is_solid() {
                        continue;
                    }
                    let position = Vec3::new((origin.x + x) as f32, y as f32, (origin.y + z) as f32);
                    let [r, g, b] = block.block_type.color();

                    for face in Face::ALL {
                        let (dx, dy, dz) = face.offset();
                        if y + dy < 0 {
                            continue;
                        }
                        let light = match self.neighbour(chunk, storage, x + dx, y + dy, z + dz) {
                            Some(n) if n.is_solid() => continue,
                            Some(n) => n.sun_light,
                            None => MAX_SUNLIGHT,
                        };
                        let brightness =
                            AMBIENT + (1.0 - AMBIENT) * light as f32 / MAX_SUNLIGHT as f32;
                        mesh.add_face(
                            &face.corners(position),
                            face.normal(),
                            [
                                r as f32 / 255.0 * brightness,
                                g as f32 / 255.0 * brightness,
                                b as f32 / 255.0 * brightness,
                            ],
                        );
                    }
                }
            }
        }

        Ok(mesh)
    }
}
