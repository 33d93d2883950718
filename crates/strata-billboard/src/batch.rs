//! One species' instances: staged changes, the live store, and the
//! capacity-bounded visible set mirrored into a fixed-size GPU buffer.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crossbeam_channel::Receiver;
use glam::{Mat4, Vec4};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::BillboardError;
use crate::gpu::{BillboardRenderer, BlendMode, SpeciesGpu};
use crate::instance::{BillboardInstance, CameraState, InstanceId, InstanceRaw};
use crate::sorting::{DepthPolicy, Ranked, select_visible};
use crate::spawner::{BatchCommand, InstanceSpawner};

/// Per-species batch parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchSettings {
    /// Maximum instances drawn per frame; also the GPU buffer size.
    pub capacity: u32,
    /// Seconds between depth re-sorts.
    pub sort_interval: f32,
    /// Culling distance and behind-camera penalty used when scoring.
    pub depth: DepthPolicy,
    /// Pipeline blend state for this species.
    pub blend: BlendMode,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            capacity: 4096,
            sort_interval: 0.1,
            depth: DepthPolicy::default(),
            blend: BlendMode::default(),
        }
    }
}

/// A fixed-capacity instance batch for one sprite species.
///
/// `add`, `spawn` and `remove` may be called through a shared reference from
/// any thread; they only queue commands. [`update`](Self::update) and
/// [`render`](Self::render) belong to the render thread.
pub struct InstanceBatch {
    name: Arc<str>,
    settings: BatchSettings,
    spawner: InstanceSpawner,
    commands: Receiver<BatchCommand>,
    live: FxHashMap<InstanceId, BillboardInstance>,
    /// Visible ids, back to front.
    visible: Vec<InstanceId>,
    /// CPU mirror of the GPU buffer; never longer than `capacity`.
    raw: Vec<InstanceRaw>,
    /// Seconds since the last sort; starts full so the first update sorts.
    sort_timer: f32,
    upload_pending: bool,
    gpu: Option<SpeciesGpu>,
}

impl InstanceBatch {
    /// Creates an empty batch.
    pub fn new(name: &str, settings: BatchSettings) -> Result<Self, BillboardError> {
        if settings.capacity == 0 {
            return Err(BillboardError::ZeroCapacity(name.to_string()));
        }
        if !settings.sort_interval.is_finite() || settings.sort_interval < 0.0 {
            return Err(BillboardError::InvalidSortInterval {
                species: name.to_string(),
                interval: settings.sort_interval,
            });
        }

        let name: Arc<str> = Arc::from(name);
        let (sender, commands) = crossbeam_channel::unbounded();
        let spawner = InstanceSpawner::new(Arc::clone(&name), sender, Arc::new(AtomicU64::new(1)));
        Ok(Self {
            name,
            settings,
            spawner,
            commands,
            live: FxHashMap::default(),
            visible: Vec::new(),
            raw: Vec::with_capacity(settings.capacity as usize),
            sort_timer: settings.sort_interval,
            upload_pending: false,
            gpu: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub fn capacity(&self) -> usize {
        self.settings.capacity as usize
    }

    /// A handle producers can keep on other threads.
    pub fn spawner(&self) -> InstanceSpawner {
        self.spawner.clone()
    }

    /// Queues a new instance and returns its id.
    pub fn spawn(&self, transform: Mat4, tint: Vec4) -> InstanceId {
        self.spawner.spawn(transform, tint)
    }

    /// Queues an instance.
    pub fn add(&self, instance: BillboardInstance) {
        self.spawner.add(instance);
    }

    /// Queues the removal of `id`.
    pub fn remove(&self, id: InstanceId) {
        self.spawner.remove(id);
    }

    /// Applies queued commands: every addition first, then every removal.
    /// Returns the ids added in queue order, or `None` if nothing was queued.
    fn drain_commands(&mut self) -> Option<Vec<InstanceId>> {
        let (mut added, mut removed) = (Vec::new(), Vec::new());
        for command in self.commands.try_iter() {
            match command {
                BatchCommand::Add(instance) => added.push(instance),
                BatchCommand::Remove(id) => removed.push(id),
            }
        }
        if added.is_empty() && removed.is_empty() {
            return None;
        }

        let added_ids = added.iter().map(|instance| instance.id).collect();
        for instance in added {
            self.live.insert(instance.id, instance);
        }
        for id in removed {
            if self.live.remove(&id).is_none() {
                tracing::trace!("billboard {}: remove of unknown instance {:?}", self.name, id);
            }
        }
        Some(added_ids)
    }

    /// Per-frame update on the render thread.
    ///
    /// Applies staged changes and re-sorts only when the sort timer has run
    /// out. Between sorts, removed instances leave the visible set at once and
    /// additions are appended front-most while there is spare capacity; they
    /// take their depth place at the next sort. Returns `true` if a sort ran.
    pub fn update(&mut self, camera: &CameraState, dt: f32) -> bool {
        let drained = self.drain_commands();
        self.sort_timer += dt.max(0.0);
        if self.sort_timer >= self.settings.sort_interval {
            self.sort_timer = 0.0;
            self.refresh(camera);
            return true;
        }
        if let Some(added) = drained {
            self.patch_visible(added);
        }
        false
    }

    /// Brings the visible set in line with the live store without scoring.
    fn patch_visible(&mut self, added: Vec<InstanceId>) {
        self.visible.retain(|id| self.live.contains_key(id));

        let capacity = self.capacity();
        if self.visible.len() < capacity && !added.is_empty() {
            let mut shown: FxHashSet<InstanceId> = self.visible.iter().copied().collect();
            for id in added {
                if self.visible.len() >= capacity {
                    break;
                }
                if self.live.contains_key(&id) && shown.insert(id) {
                    self.visible.push(id);
                }
            }
        }

        self.rebuild_raw();
    }

    fn rebuild_raw(&mut self) {
        self.raw.clear();
        self.raw.extend(
            self.visible
                .iter()
                .filter_map(|id| self.live.get(id))
                .map(BillboardInstance::to_raw),
        );
        self.upload_pending = true;
    }

    /// Re-scores every live instance and rebuilds the visible set.
    pub fn refresh(&mut self, camera: &CameraState) {
        let policy = self.settings.depth;
        let ranked: Vec<Ranked> = self
            .live
            .values()
            .map(|instance| Ranked {
                score: policy.score(camera, instance.position()),
                id: instance.id,
            })
            .collect();

        self.visible = select_visible(ranked, self.capacity());
        self.rebuild_raw();

        if self.live.len() > self.capacity() {
            tracing::trace!(
                "billboard {}: {} of {} instances visible",
                self.name,
                self.visible.len(),
                self.live.len()
            );
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Visible instance ids, back to front.
    pub fn visible(&self) -> &[InstanceId] {
        &self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Looks up a live instance.
    pub fn instance(&self, id: InstanceId) -> Option<&BillboardInstance> {
        self.live.get(&id)
    }

    /// The packed visible set, as written to the GPU.
    pub fn instance_data(&self) -> &[InstanceRaw] {
        &self.raw
    }

    /// Size of the instance buffer in bytes. Depends only on capacity.
    pub fn buffer_size(&self) -> u64 {
        u64::from(self.settings.capacity) * std::mem::size_of::<InstanceRaw>() as u64
    }

    /// Allocates this species' GPU resources.
    pub fn attach_gpu(
        &mut self,
        device: &wgpu::Device,
        renderer: &BillboardRenderer,
        texture: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) {
        let gpu = renderer.create_species(
            device,
            &self.name,
            self.settings.capacity,
            self.settings.blend,
            texture,
            sampler,
        );
        self.gpu = Some(gpu);
        self.upload_pending = true;
    }

    pub fn gpu(&self) -> Option<&SpeciesGpu> {
        self.gpu.as_ref()
    }

    /// Writes the visible set to the GPU buffer if it changed since the last
    /// upload.
    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if !self.upload_pending {
            return;
        }
        if let Some(gpu) = &self.gpu {
            gpu.upload(queue, &self.raw);
            self.upload_pending = false;
        }
    }

    /// Draws the visible set with one instanced call. Does nothing when the
    /// set is empty or no GPU resources are attached.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, renderer: &BillboardRenderer) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        if self.raw.is_empty() {
            return;
        }
        renderer.draw(pass, gpu, self.raw.len() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn settings(capacity: u32) -> BatchSettings {
        BatchSettings {
            capacity,
            ..BatchSettings::default()
        }
    }

    fn camera() -> CameraState {
        CameraState::new(Vec3::ZERO, Vec3::NEG_Z)
    }

    fn at(z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, z))
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            InstanceBatch::new("grass", settings(0)).err(),
            Some(BillboardError::ZeroCapacity("grass".to_string()))
        );
    }

    #[test]
    fn test_negative_interval_rejected() {
        let bad = BatchSettings {
            sort_interval: -1.0,
            ..BatchSettings::default()
        };
        assert!(matches!(
            InstanceBatch::new("grass", bad),
            Err(BillboardError::InvalidSortInterval { .. })
        ));
    }

    #[test]
    fn test_add_is_staged_until_update() {
        let mut batch = InstanceBatch::new("tree", settings(8)).unwrap();
        batch.spawn(at(-1.0), Vec4::ONE);
        assert_eq!(batch.len(), 0);
        assert!(batch.update(&camera(), 0.0));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.visible_count(), 1);
    }

    #[test]
    fn test_add_then_remove_all_empties_visible_set() {
        let mut batch = InstanceBatch::new("tree", settings(8)).unwrap();
        let ids: Vec<_> = (0..5).map(|i| batch.spawn(at(-(i as f32) - 1.0), Vec4::ONE)).collect();
        batch.update(&camera(), 0.0);
        assert_eq!(batch.visible_count(), 5);

        for id in ids {
            batch.remove(id);
        }
        batch.update(&camera(), 0.0);
        assert!(batch.is_empty());
        assert!(batch.visible().is_empty());
        assert!(batch.instance_data().is_empty());
    }

    #[test]
    fn test_additions_apply_before_removals_in_one_drain() {
        let mut batch = InstanceBatch::new("tree", settings(8)).unwrap();
        let id = batch.spawn(at(-1.0), Vec4::ONE);
        batch.remove(id);
        batch.update(&camera(), 0.0);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_over_capacity_keeps_nearest_and_fixed_buffer() {
        let mut batch = InstanceBatch::new("tree", settings(4)).unwrap();
        let size_before = batch.buffer_size();
        let ids: Vec<_> = (1..=10).map(|i| batch.spawn(at(-(i as f32)), Vec4::ONE)).collect();
        batch.update(&camera(), 0.0);

        assert_eq!(batch.len(), 10);
        assert_eq!(batch.visible_count(), 4);
        assert_eq!(batch.instance_data().len(), 4);
        assert_eq!(batch.buffer_size(), size_before);

        // Back to front: the fourth-nearest first, the nearest last.
        assert_eq!(batch.visible(), &[ids[3], ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_sort_is_gated_by_timer() {
        let mut batch = InstanceBatch::new("tree", settings(1)).unwrap();
        let near = batch.spawn(at(-1.0), Vec4::ONE);
        let far = batch.spawn(at(-5.0), Vec4::ONE);
        batch.update(&camera(), 0.0);
        assert_eq!(batch.visible(), &[near]);

        // The camera moves next to the far instance, but the timer has not
        // run out yet.
        let moved = CameraState::new(Vec3::new(0.0, 0.0, -4.0), Vec3::NEG_Z);
        assert!(!batch.update(&moved, 0.05));
        assert_eq!(batch.visible(), &[near]);

        assert!(batch.update(&moved, 0.05));
        assert_eq!(batch.visible(), &[far]);
    }

    #[test]
    fn test_behind_camera_penalized_not_excluded() {
        let mut batch = InstanceBatch::new("tree", settings(2)).unwrap();
        let behind = batch.spawn(at(3.0), Vec4::ONE);
        batch.update(&camera(), 0.0);
        assert_eq!(batch.visible(), &[behind]);

        let ahead = batch.spawn(at(-20.0), Vec4::ONE);
        assert!(batch.update(&camera(), 0.1));
        // 3^2 * 100 = 900 sorts behind 20^2 = 400.
        assert_eq!(batch.visible(), &[behind, ahead]);
    }

    #[test]
    fn test_steady_spawning_sorts_on_timer_only() {
        let mut batch = InstanceBatch::new("tuft", settings(128)).unwrap();
        let mut resorts = 0;
        for frame in 0..60 {
            batch.spawn(at(-(frame as f32) - 1.0), Vec4::ONE);
            if batch.update(&camera(), 1.0 / 60.0) {
                resorts += 1;
            }
            assert_eq!(batch.visible_count(), frame + 1);
            assert_eq!(batch.instance_data().len(), frame + 1);
        }
        assert!((1..=11).contains(&resorts), "{resorts} re-sorts");
    }

    #[test]
    fn test_additions_between_sorts_fill_spare_capacity_only() {
        let mut batch = InstanceBatch::new("tree", settings(3)).unwrap();
        let first = batch.spawn(at(-1.0), Vec4::ONE);
        assert!(batch.update(&camera(), 0.0));

        let second = batch.spawn(at(-2.0), Vec4::ONE);
        let third = batch.spawn(at(-3.0), Vec4::ONE);
        batch.spawn(at(-4.0), Vec4::ONE);
        assert!(!batch.update(&camera(), 0.0));
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.visible(), &[first, second, third]);

        batch.remove(second);
        assert!(!batch.update(&camera(), 0.0));
        assert_eq!(batch.visible(), &[first, third]);
        assert_eq!(batch.instance_data().len(), 2);
    }

    #[test]
    fn test_producers_on_other_threads() {
        let mut batch = InstanceBatch::new("tree", settings(64)).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let spawner = batch.spawner();
                std::thread::spawn(move || {
                    for i in 0..8 {
                        spawner.spawn(at(-((t * 8 + i) as f32) - 1.0), Vec4::ONE);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        batch.update(&camera(), 0.0);
        assert_eq!(batch.len(), 32);
        let mut ids = batch.visible().to_vec();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn test_upload_and_render_without_gpu_are_noops() {
        let Some((device, queue)) = crate::gpu::tests::test_device() else {
            return;
        };
        let renderer =
            BillboardRenderer::new(&device, wgpu::TextureFormat::Rgba8UnormSrgb, None);
        let (view, sampler) = crate::gpu::tests::test_texture(&device);

        let mut batch = InstanceBatch::new("tree", settings(4)).unwrap();
        for i in 1..=6 {
            batch.spawn(at(-(i as f32)), Vec4::ONE);
        }
        batch.update(&camera(), 0.0);
        batch.upload(&queue);
        assert!(batch.gpu().is_none());

        batch.attach_gpu(&device, &renderer, &view, &sampler);
        batch.upload(&queue);
        assert_eq!(batch.gpu().map(SpeciesGpu::buffer_size), Some(batch.buffer_size()));
    }
}
