//! Thread-safe handle for queuing instance additions and removals.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;
use glam::{Mat4, Vec4};

use crate::instance::{BillboardInstance, InstanceId};

/// A staged change to a batch's live store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatchCommand {
    Add(BillboardInstance),
    Remove(InstanceId),
}

/// Queues changes for one batch from any thread.
///
/// Commands are applied on the batch's next `update`; nothing here touches
/// the live store or the GPU buffer.
#[derive(Clone)]
pub struct InstanceSpawner {
    species: Arc<str>,
    sender: Sender<BatchCommand>,
    next_id: Arc<AtomicU64>,
}

impl InstanceSpawner {
    pub(crate) fn new(species: Arc<str>, sender: Sender<BatchCommand>, next_id: Arc<AtomicU64>) -> Self {
        Self {
            species,
            sender,
            next_id,
        }
    }

    /// Species this spawner feeds.
    pub fn species(&self) -> &str {
        &self.species
    }

    /// Reserves a fresh instance id.
    pub fn next_id(&self) -> InstanceId {
        InstanceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queues a new instance and returns its id.
    pub fn spawn(&self, transform: Mat4, tint: Vec4) -> InstanceId {
        let id = self.next_id();
        self.add(BillboardInstance { id, transform, tint });
        id
    }

    /// Queues an instance built by the caller. Its id should come from
    /// [`next_id`](Self::next_id).
    pub fn add(&self, instance: BillboardInstance) {
        self.send(BatchCommand::Add(instance));
    }

    /// Queues the removal of `id`.
    pub fn remove(&self, id: InstanceId) {
        self.send(BatchCommand::Remove(id));
    }

    fn send(&self, command: BatchCommand) {
        if self.sender.send(command).is_err() {
            tracing::trace!("billboard batch {} dropped; command ignored", self.species);
        }
    }
}
