use crate::world::chunk::Chunk;
use crossbeam_channel::{select, unbounded, Receiver, Sender, TryRecvError};
use std::sync::Arc;

/// A unit of work pulled by a builder worker.
#[derive(Debug, Clone)]
pub enum WorkItem {
    Generate(Arc<Chunk>),
    Build(Arc<Chunk>),
}

impl WorkItem {
    pub fn chunk(&self) -> &Arc<Chunk> {
        match self {
            WorkItem::Generate(chunk) | WorkItem::Build(chunk) => chunk,
        }
    }
}

/// The generation and building queues. Generation always wins when both
/// have work, so meshing waits out sustained generation load.
pub struct WorkQueues {
    generation_tx: Sender<Arc<Chunk>>,
    generation_rx: Receiver<Arc<Chunk>>,
    building_tx: Sender<Arc<Chunk>>,
    building_rx: Receiver<Arc<Chunk>>,
}

impl Default for WorkQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueues {
    pub fn new() -> Self {
        let (generation_tx, generation_rx) = unbounded();
        let (building_tx, building_rx) = unbounded();
        Self {
            generation_tx,
            generation_rx,
            building_tx,
            building_rx,
        }
    }

    pub fn push_generation(&self, chunk: Arc<Chunk>) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.generation_tx.send(chunk);
    }

    pub fn push_building(&self, chunk: Arc<Chunk>) {
        let _ = self.building_tx.send(chunk);
    }

    pub fn pending_generation(&self) -> usize {
        self.generation_rx.len()
    }

    pub fn pending_building(&self) -> usize {
        self.building_rx.len()
    }

    /// Non-blocking priority take.
    pub fn try_take(&self) -> Option<WorkItem> {
        if let Ok(chunk) = self.generation_rx.try_recv() {
            return Some(WorkItem::Generate(chunk));
        }
        self.building_rx.try_recv().ok().map(WorkItem::Build)
    }

    /// Priority take that blocks while both queues are empty. Returns `None`
    /// once `shutdown` is disconnected, without dequeuing anything.
    pub fn take(&self, shutdown: &Receiver<()>) -> Option<WorkItem> {
        if let Err(TryRecvError::Disconnected) = shutdown.try_recv() {
            return None;
        }
        if let Some(item) = self.try_take() {
            return Some(item);
        }

        select! {
            recv(shutdown) -> _ => None,
            recv(self.generation_rx) -> chunk => chunk.ok().map(WorkItem::Generate),
            recv(self.building_rx) -> chunk => chunk.ok().map(WorkItem::Build),
        }
    }

    /// Empties both queues, returning whatever was still waiting.
    pub fn drain(&self) -> Vec<WorkItem> {
        let mut items: Vec<WorkItem> = self.generation_rx.try_iter().map(WorkItem::Generate).collect();
        items.extend(self.building_rx.try_iter().map(WorkItem::Build));
        items
    }
}
