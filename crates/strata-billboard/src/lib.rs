//! Instanced billboard batching: fixed-capacity, depth-sorted sprite
//! instances per species, fed from any thread and drawn with one instanced
//! call per species.

pub mod batch;
pub mod error;
pub mod gpu;
pub mod instance;
pub mod registry;
pub mod sorting;
pub mod spawner;

pub use batch::{BatchSettings, InstanceBatch};
pub use error::BillboardError;
pub use gpu::{BILLBOARD_SHADER_SOURCE, BillboardCameraUniform, BillboardRenderer, BlendMode, SpeciesGpu};
pub use instance::{BillboardInstance, CameraState, InstanceId, InstanceRaw};
pub use registry::{InstanceBatchRegistry, RegistryStats};
pub use sorting::{DepthPolicy, Ranked, select_visible};
pub use spawner::{BatchCommand, InstanceSpawner};
