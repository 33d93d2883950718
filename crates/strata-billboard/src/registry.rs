//! Name-keyed collection of instance batches.
//!
//! Surrounding code reaches batches only through the registry. Adds and
//! removes for a species that is not registered yet are silently dropped,
//! since producers may start before the renderer has set species up.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use glam::{Mat4, Vec4};

use crate::batch::{BatchSettings, InstanceBatch};
use crate::error::BillboardError;
use crate::gpu::BillboardRenderer;
use crate::instance::{BillboardInstance, CameraState, InstanceId};
use crate::spawner::InstanceSpawner;

/// Aggregate counts across every batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub species: usize,
    pub instances: usize,
    pub visible: usize,
}

/// All billboard species.
#[derive(Default)]
pub struct InstanceBatchRegistry {
    batches: DashMap<String, InstanceBatch>,
}

impl InstanceBatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch for `name`.
    pub fn register(&self, name: &str, settings: BatchSettings) -> Result<(), BillboardError> {
        match self.batches.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(BillboardError::DuplicateSpecies(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(InstanceBatch::new(name, settings)?);
            }
        }
        tracing::debug!("registered billboard species {name} (capacity {})", settings.capacity);
        Ok(())
    }

    /// Removes a species and everything in it.
    pub fn unregister(&self, name: &str) -> bool {
        self.batches.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.batches.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// A producer handle for `name`, if registered.
    pub fn spawner(&self, name: &str) -> Option<InstanceSpawner> {
        self.batches.get(name).map(|batch| batch.spawner())
    }

    /// Queues a new instance of `name`. Returns `None` for unknown species.
    pub fn spawn(&self, name: &str, transform: Mat4, tint: Vec4) -> Option<InstanceId> {
        match self.batches.get(name) {
            Some(batch) => Some(batch.spawn(transform, tint)),
            None => {
                tracing::trace!("spawn for unknown billboard species {name} ignored");
                None
            }
        }
    }

    /// Queues `instance` into `name`. Unknown species are a no-op.
    pub fn add(&self, name: &str, instance: BillboardInstance) {
        match self.batches.get(name) {
            Some(batch) => batch.add(instance),
            None => tracing::trace!("add for unknown billboard species {name} ignored"),
        }
    }

    /// Queues the removal of `id` from `name`. Unknown species are a no-op.
    pub fn remove(&self, name: &str, id: InstanceId) {
        match self.batches.get(name) {
            Some(batch) => batch.remove(id),
            None => tracing::trace!("remove for unknown billboard species {name} ignored"),
        }
    }

    /// Runs [`InstanceBatch::update`] on every batch. Returns how many
    /// re-sorted.
    pub fn update(&self, camera: &CameraState, dt: f32) -> usize {
        self.batches
            .iter_mut()
            .map(|mut batch| batch.update(camera, dt))
            .filter(|resorted| *resorted)
            .count()
    }

    /// Uploads every batch whose visible set changed.
    pub fn upload(&self, queue: &wgpu::Queue) {
        for mut batch in self.batches.iter_mut() {
            batch.upload(queue);
        }
    }

    /// Draws every species, in name order so frames are reproducible.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, renderer: &BillboardRenderer) {
        let mut names: Vec<String> = self.batches.iter().map(|b| b.key().clone()).collect();
        names.sort();
        for name in names {
            if let Some(batch) = self.batches.get(&name) {
                batch.render(pass, renderer);
            }
        }
    }

    /// Runs `f` with shared access to the batch for `name`.
    pub fn with_batch<R>(&self, name: &str, f: impl FnOnce(&InstanceBatch) -> R) -> Option<R> {
        self.batches.get(name).map(|batch| f(&batch))
    }

    /// Runs `f` with exclusive access to the batch for `name`, e.g. to attach
    /// GPU resources.
    pub fn with_batch_mut<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut InstanceBatch) -> R,
    ) -> Option<R> {
        self.batches.get_mut(name).map(|mut batch| f(&mut batch))
    }

    pub fn stats(&self) -> RegistryStats {
        self.batches.iter().fold(
            RegistryStats {
                species: self.batches.len(),
                ..RegistryStats::default()
            },
            |mut stats, batch| {
                stats.instances += batch.len();
                stats.visible += batch.visible_count();
                stats
            },
        )
    }
}
