use crate::config::{CacheConfig, ChunkConfig};
use crate::utils::error::{ChunkError, WorldError};
use crate::utils::math::wrap;
use crate::world::chunk::{Chunk, ChunkState};
use crate::world::chunk_coord::ChunkCoord;
use crate::world::generator::TerrainGenerator;
use crate::world::index::ChunkIndex;
use crate::world::lighting::{ColumnSunlight, LightingStage};
use crate::world::mesher::{FaceMesher, MeshStage};
use crate::world::queue::{WorkItem, WorkQueues};
use crate::world::storage::BlockStorage;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, trace};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters reported by the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderStats {
    pub generated: u64,
    pub built: u64,
    pub failures: u64,
    pub pending_generation: usize,
    pub pending_building: usize,
}

/// What one call to [`ChunkBuilder::scan`] enqueued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub queued_for_generation: usize,
    pub queued_for_building: usize,
}

struct BuilderShared {
    index: Arc<RwLock<ChunkIndex>>,
    storage: Arc<BlockStorage>,
    generator: Arc<TerrainGenerator>,
    lighting: Box<dyn LightingStage>,
    mesher: Box<dyn MeshStage>,
    queues: WorkQueues,
    /// One lock per wrapped chunk slot of the storage ring. A chunk and the
    /// chunk that replaces it after a recache share a slot, so the two can
    /// never write the same columns at once.
    slots: Vec<Mutex<()>>,
    cache_diameter: usize,
    generated: AtomicU64,
    built: AtomicU64,
    failures: AtomicU64,
}

struct Workers {
    pool: ThreadPool,
    shutdown: Sender<()>,
    exited: Receiver<()>,
    count: usize,
}

/// Drives chunks through generate -> light -> mesh on a fixed set of workers.
///
/// `scan` walks the index and enqueues work; workers drain the generation
/// queue before the building queue. A failing chunk is logged, rolled back and
/// picked up again by a later scan.
pub struct ChunkBuilder {
    shared: Arc<BuilderShared>,
    worker_count: usize,
    running: AtomicBool,
    workers: Mutex<Option<Workers>>,
}

impl ChunkBuilder {
    pub fn new(
        index: Arc<RwLock<ChunkIndex>>,
        storage: Arc<BlockStorage>,
        generator: Arc<TerrainGenerator>,
        cache: &CacheConfig,
        worker_count: usize,
    ) -> Result<Self, WorldError> {
        let chunk: ChunkConfig = *generator.chunk_config();
        Self::with_stages(
            index,
            storage,
            generator,
            cache,
            worker_count,
            Box::new(ColumnSunlight::new(chunk)),
            Box::new(FaceMesher::new(chunk)),
        )
    }

    pub fn with_stages(
        index: Arc<RwLock<ChunkIndex>>,
        storage: Arc<BlockStorage>,
        generator: Arc<TerrainGenerator>,
        cache: &CacheConfig,
        worker_count: usize,
        lighting: Box<dyn LightingStage>,
        mesher: Box<dyn MeshStage>,
    ) -> Result<Self, WorldError> {
        if worker_count == 0 {
            return Err(crate::utils::error::ConfigError::NoWorkers.into());
        }
        let cache_diameter = cache.cache_diameter();
        let slots = (0..cache_diameter * cache_diameter)
            .map(|_| Mutex::new(()))
            .collect();

        Ok(Self {
            shared: Arc::new(BuilderShared {
                index,
                storage,
                generator,
                lighting,
                mesher,
                queues: WorkQueues::new(),
                slots,
                cache_diameter,
                generated: AtomicU64::new(0),
                built: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
            worker_count,
            running: AtomicBool::new(false),
            workers: Mutex::new(None),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the worker pool. Calling it twice is a no-op.
    pub fn start(&self) -> Result<(), WorldError> {
        let mut workers = self.workers.lock();
        if workers.is_some() {
            return Ok(());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .thread_name(|i| format!("chunk-worker-{}", i))
            .build()
            .map_err(|e| WorldError::ThreadPool(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let (exit_tx, exit_rx) = bounded::<()>(self.worker_count);

        for _ in 0..self.worker_count {
            let shared = self.shared.clone();
            let shutdown = shutdown_rx.clone();
            let exit = exit_tx.clone();
            pool.spawn(move || {
                while let Some(item) = shared.queues.take(&shutdown) {
                    shared.process(item);
                }
                let _ = exit.send(());
            });
        }

        self.running.store(true, Ordering::Release);
        info!("Chunk builder started with {} workers", self.worker_count);
        *workers = Some(Workers {
            pool,
            shutdown: shutdown_tx,
            exited: exit_rx,
            count: self.worker_count,
        });
        Ok(())
    }

    /// Stops taking new work and waits for in-flight items to finish. Items
    /// still queued are dropped and their queue flags cleared.
    pub fn stop(&self) {
        let Some(workers) = self.workers.lock().take() else {
            return;
        };
        self.running.store(false, Ordering::Release);

        drop(workers.shutdown);
        for _ in 0..workers.count {
            if workers.exited.recv().is_err() {
                break;
            }
        }
        drop(workers.pool);

        let abandoned = self.shared.queues.drain();
        for item in &abandoned {
            match item {
                WorkItem::Generate(chunk) => chunk.clear_queued_for_generation(),
                WorkItem::Build(chunk) => chunk.clear_queued_for_building(),
            }
        }
        info!(
            "Chunk builder stopped ({} queued items dropped)",
            abandoned.len()
        );
    }

    /// One pass over the index, enqueueing every chunk that needs generating
    /// or (re)building and is not already queued.
    pub fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let index = self.shared.index.read();

        for chunk in index.iter() {
            if chunk.is_disposed() {
                continue;
            }
            let state = chunk.state();
            if state == ChunkState::AwaitingGenerate {
                if chunk.try_queue_for_generation() {
                    self.shared.queues.push_generation(chunk.clone());
                    report.queued_for_generation += 1;
                }
            } else if state >= ChunkState::AwaitingLighting
                && chunk.is_dirty()
                && chunk.try_queue_for_building()
            {
                self.shared.queues.push_building(chunk.clone());
                report.queued_for_building += 1;
            }
        }

        if report != ScanReport::default() {
            debug!(
                "Scan queued {} for generation, {} for building",
                report.queued_for_generation, report.queued_for_building
            );
        }
        report
    }

    /// Processes queued items on the calling thread until both queues are
    /// empty. Returns how many items were handled.
    pub fn process_pending(&self) -> usize {
        let mut processed = 0;
        while let Some(item) = self.shared.queues.try_take() {
            self.shared.process(item);
            processed += 1;
        }
        processed
    }

    /// Scans and processes synchronously until a scan finds nothing to do.
    pub fn run_until_idle(&self) -> usize {
        let mut processed = 0;
        loop {
            self.scan();
            let handled = self.process_pending();
            if handled == 0 {
                return processed;
            }
            processed += handled;
        }
    }

    /// Holds the storage slot of `coord` so no worker touches those columns
    /// while the guard lives.
    pub fn lock_slot(&self, coord: ChunkCoord) -> MutexGuard<'_, ()> {
        self.shared.slots[self.shared.slot_of(coord)].lock()
    }

    pub fn stats(&self) -> BuilderStats {
        BuilderStats {
            generated: self.shared.generated.load(Ordering::Relaxed),
            built: self.shared.built.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
            pending_generation: self.shared.queues.pending_generation(),
            pending_building: self.shared.queues.pending_building(),
        }
    }
}

impl Drop for ChunkBuilder {
    fn drop(&mut self) {
        self.stop();
    }
}

impl BuilderShared {
    fn slot_of(&self, coord: ChunkCoord) -> usize {
        wrap(coord.x(), self.cache_diameter) * self.cache_diameter
            + wrap(coord.z(), self.cache_diameter)
    }

    fn process(&self, item: WorkItem) {
        let chunk = item.chunk().clone();
        let _slot = self.slots[self.slot_of(chunk.position())].lock();

        let result = panic::catch_unwind(AssertUnwindSafe(|| match &item {
            WorkItem::Generate(chunk) => self.generate(chunk),
            WorkItem::Build(chunk) => self.build(chunk),
        }))
        .unwrap_or_else(|payload| {
            Err(ChunkError::Panicked {
                coord: chunk.position(),
                message: panic_message(payload.as_ref()),
            })
        });

        match item {
            WorkItem::Generate(_) => {
                match result {
                    Ok(()) => {
                        self.generated.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        chunk.reset_state(ChunkState::Generating, ChunkState::AwaitingGenerate);
                        self.report(err);
                    }
                }
                chunk.clear_queued_for_generation();
            }
            WorkItem::Build(_) => {
                match result {
                    Ok(()) => {
                        self.built.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        chunk.mark_dirty();
                        chunk.reset_state(ChunkState::Building, ChunkState::AwaitingBuild);
                        self.report(err);
                    }
                }
                chunk.clear_queued_for_building();
            }
        }
    }

    fn report(&self, err: ChunkError) {
        match err {
            // Evicted mid-flight; nothing will ever scan it again.
            ChunkError::Disposed(coord) => trace!("Dropped work for disposed chunk {:?}", coord),
            err => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!("{}", err);
            }
        }
    }

    fn generate(&self, chunk: &Chunk) -> Result<(), ChunkError> {
        if chunk.is_disposed() {
            return Err(ChunkError::Disposed(chunk.position()));
        }
        self.generator.generate(chunk, &self.storage)
    }

    fn build(&self, chunk: &Chunk) -> Result<(), ChunkError> {
        if chunk.is_disposed() {
            return Err(ChunkError::Disposed(chunk.position()));
        }
        // Edits that land from here on set the flag again and get another pass.
        chunk.take_dirty();

        if chunk.state() == ChunkState::AwaitingLighting {
            self.lighting.light(chunk, &self.storage)?;
            chunk.transition(ChunkState::AwaitingLighting, ChunkState::AwaitingBuild)?;
        }
        chunk.reset_state(ChunkState::Ready, ChunkState::AwaitingBuild);
        chunk.transition(ChunkState::AwaitingBuild, ChunkState::Building)?;

        let mesh = self.mesher.build(chunk, &self.storage)?;
        if chunk.is_disposed() {
            return Err(ChunkError::Disposed(chunk.position()));
        }
        chunk.set_mesh(mesh);

        // An edit during meshing already moved the chunk back to AwaitingBuild.
        if chunk
            .transition(ChunkState::Building, ChunkState::Ready)
            .is_err()
        {
            trace!("Chunk {:?} edited while building", chunk.position());
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generator::TerrainVariant;
    use crate::world::mesher::ChunkMesh;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    struct Fixture {
        index: Arc<RwLock<ChunkIndex>>,
        storage: Arc<BlockStorage>,
        generator: Arc<TerrainGenerator>,
        cache: CacheConfig,
        chunk: ChunkConfig,
    }

    fn fixture(range: i32) -> Fixture {
        let chunk = ChunkConfig::new(8, 32, 8).unwrap();
        let cache = CacheConfig::new(1, 2, true, &chunk).unwrap();
        let storage = Arc::new(BlockStorage::new(&chunk, &cache));
        let generator = Arc::new(TerrainGenerator::new(7, TerrainVariant::Valley, chunk));
        let mut index = ChunkIndex::default();
        for x in -range..=range {
            for z in -range..=range {
                index.set(x, z, Arc::new(Chunk::new(ChunkCoord::new(x, z), &chunk)));
            }
        }
        Fixture {
            index: Arc::new(RwLock::new(index)),
            storage,
            generator,
            cache,
            chunk,
        }
    }

    fn builder(f: &Fixture, workers: usize) -> ChunkBuilder {
        ChunkBuilder::new(
            f.index.clone(),
            f.storage.clone(),
            f.generator.clone(),
            &f.cache,
            workers,
        )
        .unwrap()
    }

    /// Fails (or panics) for the first `failures` builds, then meshes normally.
    struct FlakyMesher {
        inner: FaceMesher,
        failures: AtomicUsize,
        panic: bool,
    }

    impl MeshStage for FlakyMesher {
        fn build(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<ChunkMesh, ChunkError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                if self.panic {
                    panic!("mesher blew up");
                }
                return Err(ChunkError::StageFailed {
                    stage: "mesh",
                    coord: chunk.position(),
                    message: "flaky".to_string(),
                });
            }
            self.inner.build(chunk, storage)
        }
    }

    fn flaky_builder(f: &Fixture, failures: usize, panic: bool) -> ChunkBuilder {
        ChunkBuilder::with_stages(
            f.index.clone(),
            f.storage.clone(),
            f.generator.clone(),
            &f.cache,
            1,
            Box::new(ColumnSunlight::new(f.chunk)),
            Box::new(FlakyMesher {
                inner: FaceMesher::new(f.chunk),
                failures: AtomicUsize::new(failures),
                panic,
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        let f = fixture(0);
        assert!(ChunkBuilder::new(f.index, f.storage, f.generator, &f.cache, 0).is_err());
    }

    #[test]
    fn test_repeated_scans_do_not_duplicate_work() {
        let f = fixture(1);
        let builder = builder(&f, 1);

        assert_eq!(builder.scan().queued_for_generation, 9);
        assert_eq!(builder.scan(), ScanReport::default());
        assert_eq!(builder.stats().pending_generation, 9);

        assert_eq!(builder.process_pending(), 9);
        for chunk in f.index.read().iter() {
            assert_eq!(chunk.state(), ChunkState::AwaitingLighting);
            assert!(!chunk.is_queued_for_generation());
        }

        assert_eq!(builder.scan().queued_for_building, 9);
        assert_eq!(builder.scan(), ScanReport::default());
        assert_eq!(builder.process_pending(), 9);

        for chunk in f.index.read().iter() {
            assert!(chunk.is_ready());
            assert!(!chunk.is_dirty());
            assert!(!chunk.is_queued_for_building());
            assert!(chunk.mesh().is_some());
        }
        assert_eq!(builder.scan(), ScanReport::default());
    }

    #[test]
    fn test_failed_build_is_retried() {
        let f = fixture(0);
        let builder = flaky_builder(&f, 1, false);
        builder.scan();
        builder.process_pending();
        builder.scan();
        builder.process_pending();

        let chunk = f.index.read().get(0, 0).unwrap().clone();
        assert_eq!(chunk.state(), ChunkState::AwaitingBuild);
        assert!(chunk.is_dirty());
        assert!(!chunk.is_queued_for_building());
        assert_eq!(builder.stats().failures, 1);

        assert_eq!(builder.scan().queued_for_building, 1);
        builder.process_pending();
        assert!(chunk.is_ready());
        assert!(chunk.mesh().is_some());
    }

    #[test]
    fn test_panicking_stage_is_contained() {
        let f = fixture(1);
        let builder = flaky_builder(&f, 2, true);
        builder.run_until_idle();

        assert_eq!(builder.stats().failures, 2);
        for chunk in f.index.read().iter() {
            assert!(chunk.is_ready());
        }
    }

    #[test]
    fn test_edit_triggers_rebuild() {
        let f = fixture(0);
        let builder = builder(&f, 1);
        builder.run_until_idle();

        let chunk = f.index.read().get(0, 0).unwrap().clone();
        let before = chunk.mesh().unwrap();
        {
            let _slot = builder.lock_slot(chunk.position());
            f.storage.set(3, 30, 3, crate::world::block::Block::new(
                crate::world::block::BlockType::Rock,
            ));
            chunk.mark_edited();
        }
        assert_eq!(chunk.state(), ChunkState::AwaitingBuild);
        assert_eq!(builder.scan().queued_for_building, 1);
        builder.process_pending();

        assert!(chunk.is_ready());
        assert!(!Arc::ptr_eq(&before, &chunk.mesh().unwrap()));
        assert_eq!(builder.stats().generated, 1);
    }

    #[test]
    fn test_disposed_chunks_are_skipped() {
        let f = fixture(0);
        let builder = builder(&f, 1);
        builder.scan();
        let chunk = f.index.write().remove(0, 0).unwrap();
        chunk.dispose();

        builder.process_pending();
        assert_eq!(chunk.state(), ChunkState::AwaitingGenerate);
        assert_eq!(builder.stats().failures, 0);
    }

    /// Meshes normally, but slowly.
    struct SlowMesher {
        inner: FaceMesher,
        delay: Duration,
    }

    impl MeshStage for SlowMesher {
        fn build(&self, chunk: &Chunk, storage: &BlockStorage) -> Result<ChunkMesh, ChunkError> {
            std::thread::sleep(self.delay);
            self.inner.build(chunk, storage)
        }
    }

    #[test]
    fn test_stop_mid_drain_requeues_leftovers() {
        let f = fixture(2);
        let builder = ChunkBuilder::with_stages(
            f.index.clone(),
            f.storage.clone(),
            f.generator.clone(),
            &f.cache,
            1,
            Box::new(ColumnSunlight::new(f.chunk)),
            Box::new(SlowMesher {
                inner: FaceMesher::new(f.chunk),
                delay: Duration::from_millis(20),
            }),
        )
        .unwrap();

        builder.scan();
        assert_eq!(builder.process_pending(), 25);
        assert_eq!(builder.scan().queued_for_building, 25);

        builder.start().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        builder.stop();

        let stats = builder.stats();
        assert_eq!(stats.pending_generation, 0);
        assert_eq!(stats.pending_building, 0);

        let index = f.index.read();
        let mut unfinished = 0;
        for chunk in index.iter() {
            assert!(!chunk.is_queued_for_generation());
            assert!(!chunk.is_queued_for_building());
            // whatever was in flight ran to completion
            match chunk.state() {
                ChunkState::Ready => assert!(chunk.mesh().is_some()),
                ChunkState::AwaitingLighting => {
                    assert!(chunk.is_dirty());
                    unfinished += 1;
                }
                other => panic!("chunk left in {:?}", other),
            }
        }
        drop(index);

        assert!(unfinished > 0);
        assert_eq!(stats.built as usize, 25 - unfinished);
        assert_eq!(builder.scan().queued_for_building, unfinished);
    }

    #[test]
    fn test_workers_drain_queues_and_stop() {
        let f = fixture(1);
        let builder = builder(&f, 2);
        builder.start().unwrap();
        assert!(builder.is_running());

        let deadline = Instant::now() + Duration::from_secs(10);
        while !f.index.read().iter().all(|c| c.is_ready()) {
            assert!(Instant::now() < deadline, "chunks never became ready");
            builder.scan();
            std::thread::sleep(Duration::from_millis(5));
        }

        builder.stop();
        assert!(!builder.is_running());
        assert_eq!(builder.stats().generated, 9);
        // stopping twice is harmless
        builder.stop();
    }
}
