use crate::config::ChunkConfig;
use crate::utils::error::ChunkError;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::mesher::ChunkMesh;
use glam::IVec2;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Pipeline stage of a chunk. Only ever moves forward, except that an edit
/// sends a built chunk back to `AwaitingBuild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChunkState {
    AwaitingGenerate = 0,
    Generating = 1,
    AwaitingLighting = 2,
    AwaitingBuild = 3,
    Building = 4,
    Ready = 5,
}

impl ChunkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::AwaitingGenerate,
            1 => Self::Generating,
            2 => Self::AwaitingLighting,
            3 => Self::AwaitingBuild,
            4 => Self::Building,
            _ => Self::Ready,
        }
    }
}

/// Metadata for one full-height column of blocks. The blocks themselves live
/// in the shared `BlockStorage`; a chunk only knows where its columns are.
///
/// Every field is atomic so the scan loop, the workers and the main thread can
/// share a chunk through an `Arc` without a lock.
#[derive(Debug)]
pub struct Chunk {
    position: ChunkCoord,
    world_position: IVec2,
    state: AtomicU8,
    highest_solid_block_offset: AtomicU8,
    lowest_empty_block_offset: AtomicU8,
    dirty: AtomicBool,
    queued_for_generation: AtomicBool,
    queued_for_building: AtomicBool,
    disposed: AtomicBool,
    mesh: Mutex<Option<Arc<ChunkMesh>>>,
}

impl Chunk {
    pub fn new(position: ChunkCoord, config: &ChunkConfig) -> Self {
        let (world_x, world_z) =
            position.to_block_origin(config.width_in_blocks(), config.length_in_blocks());
        Self {
            position,
            world_position: IVec2::new(world_x, world_z),
            state: AtomicU8::new(ChunkState::AwaitingGenerate as u8),
            highest_solid_block_offset: AtomicU8::new(0),
            lowest_empty_block_offset: AtomicU8::new(config.max_height_index() as u8),
            dirty: AtomicBool::new(false),
            queued_for_generation: AtomicBool::new(false),
            queued_for_building: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            mesh: Mutex::new(None),
        }
    }

    /// Chunk coordinates.
    pub fn position(&self) -> ChunkCoord {
        self.position
    }

    /// Block coordinates of the south-west corner column.
    pub fn world_position(&self) -> IVec2 {
        self.world_position
    }

    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from -> to` atomically, failing if another party moved the chunk first.
    pub fn transition(&self, from: ChunkState, to: ChunkState) -> Result<(), ChunkError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| ChunkError::WrongState {
                coord: self.position,
                expected: from,
                actual: ChunkState::from_u8(actual),
            })
    }

    /// Rolls an interrupted stage back so the scan loop picks the chunk up again.
    pub(crate) fn reset_state(&self, from: ChunkState, to: ChunkState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn is_generated(&self) -> bool {
        self.state() >= ChunkState::AwaitingLighting
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ChunkState::Ready
    }

    pub fn highest_solid_block_offset(&self) -> u8 {
        self.highest_solid_block_offset.load(Ordering::Acquire)
    }

    pub fn lowest_empty_block_offset(&self) -> u8 {
        self.lowest_empty_block_offset.load(Ordering::Acquire)
    }

    pub(crate) fn set_bounds(&self, highest_solid: u8, lowest_empty: u8) {
        self.highest_solid_block_offset
            .store(highest_solid, Ordering::Release);
        self.lowest_empty_block_offset
            .store(lowest_empty, Ordering::Release);
    }

    /// Widens the vertical bounds to cover a block written at offset `y`.
    pub(crate) fn widen_bounds(&self, y: u8, solid: bool) {
        if solid {
            self.highest_solid_block_offset
                .fetch_max(y, Ordering::AcqRel);
        } else {
            self.lowest_empty_block_offset
                .fetch_min(y, Ordering::AcqRel);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clears the dirty flag, returning whether it was set.
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Records a block edit: the chunk needs a new mesh, but never new terrain.
    pub fn mark_edited(&self) {
        self.mark_dirty();
        self.reset_state(ChunkState::Ready, ChunkState::AwaitingBuild);
        self.reset_state(ChunkState::Building, ChunkState::AwaitingBuild);
    }

    pub fn is_queued_for_generation(&self) -> bool {
        self.queued_for_generation.load(Ordering::Acquire)
    }

    /// Sets the generation flag. Returns `false` if it was already set.
    pub(crate) fn try_queue_for_generation(&self) -> bool {
        self.queued_for_generation
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_queued_for_generation(&self) {
        self.queued_for_generation.store(false, Ordering::Release);
    }

    pub fn is_queued_for_building(&self) -> bool {
        self.queued_for_building.load(Ordering::Acquire)
    }

    /// Sets the building flag. Returns `false` if it was already set.
    pub(crate) fn try_queue_for_building(&self) -> bool {
        self.queued_for_building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_queued_for_building(&self) {
        self.queued_for_building.store(false, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.mesh.lock().take();
    }

    /// Opaque mesh handle, present once the chunk has been built.
    pub fn mesh(&self) -> Option<Arc<ChunkMesh>> {
        self.mesh.lock().clone()
    }

    pub(crate) fn set_mesh(&self, mesh: ChunkMesh) {
        *self.mesh.lock() = Some(Arc::new(mesh));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk::new(ChunkCoord::new(-2, 3), &ChunkConfig::new(16, 64, 8).unwrap())
    }

    #[test]
    fn test_new_chunk_awaits_generation() {
        let chunk = chunk();
        assert_eq!(chunk.state(), ChunkState::AwaitingGenerate);
        assert_eq!(chunk.world_position(), IVec2::new(-32, 24));
        assert_eq!(chunk.lowest_empty_block_offset(), 63);
        assert!(!chunk.is_generated());
        assert!(!chunk.is_dirty());
        assert!(chunk.mesh().is_none());
    }

    #[test]
    fn test_transition_rejects_unexpected_state() {
        let chunk = chunk();
        chunk
            .transition(ChunkState::AwaitingGenerate, ChunkState::Generating)
            .unwrap();
        let err = chunk
            .transition(ChunkState::AwaitingGenerate, ChunkState::Generating)
            .unwrap_err();
        assert_eq!(
            err,
            ChunkError::WrongState {
                coord: ChunkCoord::new(-2, 3),
                expected: ChunkState::AwaitingGenerate,
                actual: ChunkState::Generating,
            }
        );
    }

    #[test]
    fn test_queue_flags_are_set_once() {
        let chunk = chunk();
        assert!(chunk.try_queue_for_generation());
        assert!(!chunk.try_queue_for_generation());
        chunk.clear_queued_for_generation();
        assert!(chunk.try_queue_for_generation());

        assert!(chunk.try_queue_for_building());
        assert!(!chunk.try_queue_for_building());
    }

    #[test]
    fn test_edit_sends_ready_chunk_back_to_build() {
        let chunk = chunk();
        chunk.state.store(ChunkState::Ready as u8, Ordering::Release);
        chunk.mark_edited();
        assert_eq!(chunk.state(), ChunkState::AwaitingBuild);
        assert!(chunk.is_dirty());
        assert!(chunk.take_dirty());
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_widen_bounds_only_grows() {
        let chunk = chunk();
        chunk.set_bounds(17, 18);
        chunk.widen_bounds(30, true);
        chunk.widen_bounds(5, true);
        chunk.widen_bounds(10, false);
        chunk.widen_bounds(40, false);
        assert_eq!(chunk.highest_solid_block_offset(), 30);
        assert_eq!(chunk.lowest_empty_block_offset(), 10);
    }

    #[test]
    fn test_dispose_drops_mesh() {
        let chunk = chunk();
        chunk.set_mesh(ChunkMesh::new());
        assert!(chunk.mesh().is_some());
        chunk.dispose();
        assert!(chunk.is_disposed());
        assert!(chunk.mesh().is_none());
    }
}
