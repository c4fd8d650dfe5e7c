use crate::{
    config::{CacheConfig, ChunkConfig, EngineConfig},
    player::PlayerState,
    utils::error::{Result, WorldError},
    world::{
        block::Block,
        builder::{BuilderStats, ChunkBuilder},
        cache::ChunkCache,
        chunk::Chunk,
        chunk_coord::ChunkCoord,
        generator::TerrainGenerator,
        index::ChunkIndex,
        storage::BlockStorage,
    },
};
use glam::Vec3;
use log::{error, info};
use parking_lot::{Mutex, RwLock};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Owns the whole chunk pipeline: storage, index, cache window, generator and
/// builder, plus the thread that keeps the cache centred on the player.
pub struct VoxelEngine {
    pub config: EngineConfig,
    chunk_config: ChunkConfig,
    cache_config: CacheConfig,

    // Core systems
    storage: Arc<BlockStorage>,
    index: Arc<RwLock<ChunkIndex>>,
    terrain_generator: Arc<TerrainGenerator>,
    cache: Arc<Mutex<ChunkCache>>,
    builder: Arc<ChunkBuilder>,
    player: Arc<Mutex<PlayerState>>,

    // State
    running: Arc<AtomicBool>,
    frame_counter: Arc<AtomicU64>,
    scan_thread: Option<JoinHandle<()>>,
}

impl VoxelEngine {
    /// Validates the config and allocates block storage. Nothing runs until
    /// [`VoxelEngine::start`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        let (chunk_config, cache_config) = config.chunksys.validate()?;

        let storage = Arc::new(BlockStorage::new(&chunk_config, &cache_config));
        let diameter = cache_config.cache_diameter();
        let index = Arc::new(RwLock::new(ChunkIndex::with_capacity(diameter * diameter)));
        let terrain_generator = Arc::new(TerrainGenerator::new(
            config.worldgen.world_seed,
            config.worldgen.terrain,
            chunk_config,
        ));
        let cache = Arc::new(Mutex::new(ChunkCache::new(
            chunk_config,
            cache_config,
            index.clone(),
        )));
        let builder = Arc::new(ChunkBuilder::new(
            index.clone(),
            storage.clone(),
            terrain_generator.clone(),
            &cache_config,
            config.chunksys.worker_threads,
        )?);

        info!(
            "Engine ready: {} blocks of storage, {} cached chunks, seed {}",
            storage.len(),
            diameter * diameter,
            config.worldgen.world_seed
        );

        Ok(Self {
            config,
            chunk_config,
            cache_config,
            storage,
            index,
            terrain_generator,
            cache,
            builder,
            player: Arc::new(Mutex::new(PlayerState::default())),
            running: Arc::new(AtomicBool::new(false)),
            frame_counter: Arc::new(AtomicU64::new(0)),
            scan_thread: None,
        })
    }

    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk_config
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    pub fn terrain_generator(&self) -> &Arc<TerrainGenerator> {
        &self.terrain_generator
    }

    pub fn builder(&self) -> &ChunkBuilder {
        &self.builder
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Places the player and fills the cache around them.
    pub fn spawn(&self, position: Vec3) {
        let mut cache = self.cache.lock();
        let mut player = self.player.lock();
        player.position = position;
        cache.spawn_at(&mut player);
    }

    pub fn player(&self) -> PlayerState {
        self.player.lock().clone()
    }

    pub fn set_player_position(&self, position: Vec3) {
        self.player.lock().position = position;
    }

    pub fn set_flying(&self, flying: bool) {
        self.player.lock().is_flying = flying;
    }

    /// Starts the workers and the scan thread.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.builder.start()?;
        self.running.store(true, Ordering::Release);

        let running = self.running.clone();
        let cache = self.cache.clone();
        let player = self.player.clone();
        let builder = self.builder.clone();
        let frames = self.frame_counter.clone();
        let interval = Duration::from_millis(self.config.chunksys.scan_interval_ms);

        let handle = thread::Builder::new()
            .name("chunk-scan".to_string())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    frame(&cache, &player, &builder, &frames);
                    thread::sleep(interval);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                self.builder.stop();
                WorldError::ThreadPool(e.to_string())
            })?;

        self.scan_thread = Some(handle);
        info!("Engine started");
        Ok(())
    }

    /// Stops the scan thread, then lets in-flight work finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.scan_thread.take() {
            if handle.join().is_err() {
                error!("Chunk scan thread panicked");
            }
        }
        self.builder.stop();
    }

    /// One recache + scan step on the calling thread. The scan thread runs
    /// the same step in a loop once the engine is started.
    pub fn update(&self) {
        frame(&self.cache, &self.player, &self.builder, &self.frame_counter);
    }

    /// Runs updates and processes the queues on the calling thread until
    /// nothing is left to do.
    pub fn run_until_idle(&self) -> usize {
        self.update();
        self.builder.run_until_idle()
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Result<Block> {
        let chunk = self.generated_chunk_at(x, y, z)?;
        let _slot = self.builder.lock_slot(chunk.position());
        if chunk.is_disposed() {
            return Err(WorldError::OutOfRange { x, y, z });
        }
        Ok(self.storage.get(x, y as usize, z))
    }

    /// Replaces one block and schedules its chunk for a rebuild.
    pub fn set_block_at(&self, x: i32, y: i32, z: i32, block: Block) -> Result<()> {
        let chunk = self.generated_chunk_at(x, y, z)?;
        let _slot = self.builder.lock_slot(chunk.position());
        if chunk.is_disposed() {
            return Err(WorldError::OutOfRange { x, y, z });
        }
        self.storage.set(x, y as usize, z, block);
        chunk.widen_bounds(y as u8, block.is_solid());
        chunk.mark_edited();
        Ok(())
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.index.read().get_coord(coord).cloned()
    }

    pub fn visible_chunks(&self) -> Vec<Arc<Chunk>> {
        self.cache.lock().visible_chunks()
    }

    pub fn get_stats(&self) -> EngineStats {
        // The cache lock is always taken before the index lock.
        let center = self.cache.lock().center();
        let index = self.index.read();
        EngineStats {
            frame_count: self.frame_counter.load(Ordering::Relaxed),
            cached_chunks: index.len(),
            generated_chunks: index.iter().filter(|c| c.is_generated()).count(),
            ready_chunks: index.iter().filter(|c| c.is_ready()).count(),
            center,
            builder: self.builder.stats(),
        }
    }

    fn generated_chunk_at(&self, x: i32, y: i32, z: i32) -> Result<Arc<Chunk>> {
        if y < 0 || y as usize >= self.chunk_config.height_in_blocks() {
            return Err(WorldError::OutOfRange { x, y, z });
        }
        let coord = ChunkCoord::from_block(
            x,
            z,
            self.chunk_config.width_in_blocks(),
            self.chunk_config.length_in_blocks(),
        );
        let chunk = self
            .chunk(coord)
            .ok_or(WorldError::OutOfRange { x, y, z })?;
        if !chunk.is_generated() {
            return Err(WorldError::NotGenerated(coord));
        }
        Ok(chunk)
    }
}

impl Drop for VoxelEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn frame(
    cache: &Mutex<ChunkCache>,
    player: &Mutex<PlayerState>,
    builder: &ChunkBuilder,
    frames: &AtomicU64,
) {
    {
        let mut cache = cache.lock();
        let mut player = player.lock();
        cache.tick(&mut player);
    }
    builder.scan();
    frames.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub frame_count: u64,
    pub cached_chunks: usize,
    pub generated_chunks: usize,
    pub ready_chunks: usize,
    pub center: ChunkCoord,
    pub builder: BuilderStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkSysConfig, WorldGenConfig};
    use crate::world::block::BlockType;
    use crate::world::chunk::ChunkState;
    use crate::world::generator::TerrainVariant;
    use std::time::Instant;

    fn config(terrain: TerrainVariant) -> EngineConfig {
        EngineConfig {
            chunksys: ChunkSysConfig {
                chunk_width: 16,
                chunk_height: 64,
                chunk_length: 16,
                view_range: 1,
                cache_range: 2,
                cache_extra_chunks: true,
                worker_threads: 2,
                scan_interval_ms: 1,
            },
            worldgen: WorldGenConfig {
                world_seed: 42,
                terrain,
            },
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config(TerrainVariant::FlatDebug);
        config.chunksys.cache_range = 1;
        assert!(matches!(
            VoxelEngine::new(config),
            Err(WorldError::Config(_))
        ));
    }

    #[test]
    fn test_spawn_generates_every_cached_chunk() {
        let engine = VoxelEngine::new(config(TerrainVariant::Mountainous)).unwrap();
        engine.spawn(Vec3::new(8.0, 40.0, 8.0));
        engine.builder().scan();
        engine.builder().process_pending();

        let stats = engine.get_stats();
        assert_eq!(stats.cached_chunks, 25);
        assert_eq!(stats.generated_chunks, 25);
        for x in -2..=2 {
            for z in -2..=2 {
                let chunk = engine.chunk(ChunkCoord::new(x, z)).unwrap();
                assert!(chunk.state() >= ChunkState::AwaitingLighting);
            }
        }
        assert_eq!(engine.visible_chunks().len(), 9);
    }

    #[test]
    fn test_block_access_and_edits() {
        let engine = VoxelEngine::new(config(TerrainVariant::FlatDebug)).unwrap();
        engine.spawn(Vec3::ZERO);
        assert!(matches!(
            engine.block_at(0, 17, 0),
            Err(WorldError::NotGenerated(_))
        ));

        engine.run_until_idle();
        assert_eq!(engine.get_stats().ready_chunks, 25);
        assert_eq!(engine.block_at(-5, 17, 3).unwrap().block_type, BlockType::Dirt);
        assert_eq!(engine.block_at(-5, 16, 3).unwrap().block_type, BlockType::Rock);
        assert!(engine.block_at(-5, 18, 3).unwrap().is_empty());

        engine
            .set_block_at(-5, 30, 3, Block::new(BlockType::Log))
            .unwrap();
        let chunk = engine.chunk(ChunkCoord::new(-1, 0)).unwrap();
        assert_eq!(chunk.state(), ChunkState::AwaitingBuild);
        assert_eq!(engine.block_at(-5, 30, 3).unwrap().block_type, BlockType::Log);

        engine.run_until_idle();
        assert!(chunk.is_ready());
    }

    #[test]
    fn test_edit_above_terrain_reaches_mesh() {
        let engine = VoxelEngine::new(config(TerrainVariant::FlatDebug)).unwrap();
        engine.spawn(Vec3::ZERO);
        engine.run_until_idle();

        let chunk = engine.chunk(ChunkCoord::new(-1, 0)).unwrap();
        assert_eq!(chunk.highest_solid_block_offset(), 17);
        let before = chunk.mesh().unwrap().face_count();

        engine
            .set_block_at(-5, 30, 3, Block::new(BlockType::Log))
            .unwrap();
        assert_eq!(chunk.highest_solid_block_offset(), 30);
        engine.run_until_idle();

        // a floating block shows all six faces
        assert_eq!(chunk.mesh().unwrap().face_count(), before + 6);
    }

    #[test]
    fn test_carving_lowers_empty_bound() {
        let engine = VoxelEngine::new(config(TerrainVariant::FlatDebug)).unwrap();
        engine.spawn(Vec3::ZERO);
        engine.run_until_idle();

        let chunk = engine.chunk(ChunkCoord::new(-1, 0)).unwrap();
        assert_eq!(chunk.lowest_empty_block_offset(), 18);
        engine.set_block_at(-5, 10, 3, Block::AIR).unwrap();
        assert_eq!(chunk.lowest_empty_block_offset(), 10);
        assert_eq!(chunk.highest_solid_block_offset(), 17);

        engine.run_until_idle();
        assert!(chunk.is_ready());
        assert!(engine.block_at(-5, 10, 3).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_access() {
        let engine = VoxelEngine::new(config(TerrainVariant::FlatDebug)).unwrap();
        engine.spawn(Vec3::ZERO);
        engine.run_until_idle();

        for (x, y, z) in [(0, -1, 0), (0, 64, 0), (48, 10, 0), (0, 10, -33)] {
            assert!(matches!(
                engine.block_at(x, y, z),
                Err(WorldError::OutOfRange { .. })
            ));
        }
        assert!(engine
            .set_block_at(80, 10, 0, Block::new(BlockType::Rock))
            .is_err());
    }

    #[test]
    fn test_walking_player_is_followed() {
        let mut engine = VoxelEngine::new(config(TerrainVariant::Valley)).unwrap();
        engine.spawn(Vec3::new(8.0, 40.0, 8.0));
        engine.start().unwrap();

        engine.set_player_position(Vec3::new(24.0, 40.0, 8.0));
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let stats = engine.get_stats();
            if stats.center == ChunkCoord::new(1, 0) && stats.ready_chunks == 25 {
                break;
            }
            assert!(Instant::now() < deadline, "engine never settled: {:?}", stats);
            thread::sleep(Duration::from_millis(5));
        }

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.player().last_chunk, ChunkCoord::new(0, 0));
        assert!(engine.chunk(ChunkCoord::new(-2, 0)).is_none());
        assert!(engine.chunk(ChunkCoord::new(3, 0)).is_some());
    }
}
