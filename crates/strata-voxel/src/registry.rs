//! Voxel and liquid type registries.
//!
//! Both registries are built once during startup and shared immutably with
//! the mesh workers. Id 0 is reserved in each: empty space for voxels and
//! "dry" for liquids, so zero-initialized chunk memory is empty.
//!
//! Texture references are checked against the atlas size at registration
//! and chunk contents are checked with `validate_chunk` at load time, so the
//! meshers never meet an unknown type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::ChunkData;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored inside every voxel cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelTypeId(pub u16);

impl VoxelTypeId {
    /// Empty space.
    pub const EMPTY: Self = Self(0);
}

/// Compact identifier stored inside every liquid cell. `0` means dry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiquidTypeId(pub u8);

impl LiquidTypeId {
    /// No liquid.
    pub const DRY: Self = Self(0);
}

/// Index of a layer in the texture atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u16);

/// Texture set for the faces of a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceTextures {
    /// +Y face.
    pub top: TextureId,
    /// -Y face.
    pub bottom: TextureId,
    /// The four horizontal faces.
    pub side: TextureId,
}

impl FaceTextures {
    /// Uses the same texture on every face.
    pub const fn uniform(texture: TextureId) -> Self {
        Self {
            top: texture,
            bottom: texture,
            side: texture,
        }
    }

    fn all(&self) -> [TextureId; 3] {
        [self.top, self.bottom, self.side]
    }
}

/// Full descriptor for a voxel type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoxelTypeDef {
    /// Human-readable name (e.g. "stone", "grass").
    pub name: String,
    /// Whether exposed top corners may slope toward empty neighbors.
    pub ramp_capable: bool,
    /// Textures used when the voxel is not ramped.
    pub textures: FaceTextures,
    /// Alternate textures used when any top corner is ramped.
    pub ramp_textures: Option<FaceTextures>,
}

impl VoxelTypeDef {
    /// Texture set for a voxel of this type, depending on whether it is ramped.
    pub fn textures_for(&self, ramped: bool) -> &FaceTextures {
        match (&self.ramp_textures, ramped) {
            (Some(ramp), true) => ramp,
            _ => &self.textures,
        }
    }
}

/// Full descriptor for a liquid type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiquidTypeDef {
    /// Human-readable name (e.g. "water", "lava").
    pub name: String,
    /// Surface texture.
    pub texture: TextureId,
}

/// Errors raised while registering types or validating loaded chunks.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate type name: {0}")]
    DuplicateName(String),
    /// All id slots have been consumed.
    #[error("type registry is full (max {0} types)")]
    RegistryFull(usize),
    /// A face texture points outside the texture atlas.
    #[error("type {name} references texture {texture} but the atlas has {count} layers")]
    UnknownTexture {
        /// Offending type name.
        name: String,
        /// Referenced texture layer.
        texture: u16,
        /// Number of layers in the atlas.
        count: u16,
    },
    /// A chunk contains a voxel id with no registered type.
    #[error("unknown voxel type id {0}")]
    UnknownVoxelType(u16),
    /// A chunk contains a liquid id with no registered type.
    #[error("unknown liquid type id {0}")]
    UnknownLiquidType(u8),
}

fn check_textures(name: &str, textures: &[TextureId], count: u16) -> Result<(), RegistryError> {
    match textures.iter().find(|t| t.0 >= count) {
        Some(bad) => Err(RegistryError::UnknownTexture {
            name: name.to_string(),
            texture: bad.0,
            count,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Voxel registry
// ---------------------------------------------------------------------------

/// Maps [`VoxelTypeId`] → [`VoxelTypeDef`] with O(1) lookup by index and
/// reverse lookup by name.
#[derive(Debug)]
pub struct VoxelTypeRegistry {
    /// Dense array where `index == VoxelTypeId.0`.
    types: Vec<VoxelTypeDef>,
    name_to_id: HashMap<String, VoxelTypeId>,
    /// Number of layers in the texture atlas.
    texture_count: u16,
}

impl VoxelTypeRegistry {
    /// Creates a registry with "empty" pre-registered as id 0 and no limit on
    /// texture indices.
    pub fn new() -> Self {
        Self::with_texture_count(u16::MAX)
    }

    /// Creates a registry that rejects textures at or beyond `texture_count`.
    pub fn with_texture_count(texture_count: u16) -> Self {
        let empty = VoxelTypeDef {
            name: "empty".to_string(),
            ramp_capable: false,
            textures: FaceTextures::uniform(TextureId(0)),
            ramp_textures: None,
        };

        let mut name_to_id = HashMap::new();
        name_to_id.insert(empty.name.clone(), VoxelTypeId::EMPTY);

        Self {
            types: vec![empty],
            name_to_id,
            texture_count,
        }
    }

    /// Registers a new voxel type and returns its assigned id.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken,
    /// [`RegistryError::UnknownTexture`] if any face or ramp texture is
    /// outside the atlas, [`RegistryError::RegistryFull`] when out of ids.
    pub fn register(&mut self, def: VoxelTypeDef) -> Result<VoxelTypeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull(u16::MAX as usize + 1));
        }
        check_textures(&def.name, &def.textures.all(), self.texture_count)?;
        if let Some(ramp) = &def.ramp_textures {
            check_textures(&def.name, &ramp.all(), self.texture_count)?;
        }

        let id = VoxelTypeId(self.types.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given id, or `None` if unregistered.
    pub fn get(&self, id: VoxelTypeId) -> Option<&VoxelTypeDef> {
        self.types.get(id.0 as usize)
    }

    /// Returns the id for a named voxel type.
    pub fn lookup_by_name(&self, name: &str) -> Option<VoxelTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns `true` if voxels of this type may be ramped.
    pub fn is_ramp_capable(&self, id: VoxelTypeId) -> bool {
        self.get(id).is_some_and(|def| def.ramp_capable)
    }

    /// Returns the total number of registered types (including empty).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if only the empty type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Checks that every voxel in `data` has a registered type.
    pub fn validate_chunk(&self, data: &ChunkData) -> Result<(), RegistryError> {
        match data.voxels().iter().find(|v| v.kind.0 as usize >= self.types.len()) {
            Some(bad) => Err(RegistryError::UnknownVoxelType(bad.kind.0)),
            None => Ok(()),
        }
    }
}

impl Default for VoxelTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Liquid registry
// ---------------------------------------------------------------------------

/// Maps [`LiquidTypeId`] → [`LiquidTypeDef`]. Id 0 is reserved for "dry".
#[derive(Debug)]
pub struct LiquidTypeRegistry {
    types: Vec<LiquidTypeDef>,
    name_to_id: HashMap<String, LiquidTypeId>,
    texture_count: u16,
}

impl LiquidTypeRegistry {
    /// Creates a registry with only the reserved dry slot.
    pub fn new() -> Self {
        Self::with_texture_count(u16::MAX)
    }

    /// Creates a registry that rejects textures at or beyond `texture_count`.
    pub fn with_texture_count(texture_count: u16) -> Self {
        let dry = LiquidTypeDef {
            name: "dry".to_string(),
            texture: TextureId(0),
        };
        let mut name_to_id = HashMap::new();
        name_to_id.insert(dry.name.clone(), LiquidTypeId::DRY);
        Self {
            types: vec![dry],
            name_to_id,
            texture_count,
        }
    }

    /// Registers a new liquid type and returns its assigned id.
    pub fn register(&mut self, def: LiquidTypeDef) -> Result<LiquidTypeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.types.len() > u8::MAX as usize {
            return Err(RegistryError::RegistryFull(u8::MAX as usize + 1));
        }
        check_textures(&def.name, &[def.texture], self.texture_count)?;

        let id = LiquidTypeId(self.types.len() as u8);
        self.name_to_id.insert(def.name.clone(), id);
        self.types.push(def);
        Ok(id)
    }

    /// Returns the definition for a given id, or `None` if unregistered.
    pub fn get(&self, id: LiquidTypeId) -> Option<&LiquidTypeDef> {
        self.types.get(id.0 as usize)
    }

    /// Returns the id for a named liquid type.
    pub fn lookup_by_name(&self, name: &str) -> Option<LiquidTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the total number of registered types (including dry).
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if only the dry slot exists.
    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    /// Checks that every liquid cell in `data` has a registered type.
    pub fn validate_chunk(&self, data: &ChunkData) -> Result<(), RegistryError> {
        match data
            .liquids()
            .iter()
            .find(|c| c.liquid.0 as usize >= self.types.len())
        {
            Some(bad) => Err(RegistryError::UnknownLiquidType(bad.liquid.0)),
            None => Ok(()),
        }
    }
}

impl Default for LiquidTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkDims;
    use crate::voxel::{LiquidCell, Voxel};

    fn grass_def() -> VoxelTypeDef {
        VoxelTypeDef {
            name: "grass".to_string(),
            ramp_capable: true,
            textures: FaceTextures {
                top: TextureId(1),
                bottom: TextureId(2),
                side: TextureId(3),
            },
            ramp_textures: Some(FaceTextures::uniform(TextureId(4))),
        }
    }

    fn stone_def() -> VoxelTypeDef {
        VoxelTypeDef {
            name: "stone".to_string(),
            ramp_capable: false,
            textures: FaceTextures::uniform(TextureId(5)),
            ramp_textures: None,
        }
    }

    #[test]
    fn test_empty_is_id_zero() {
        let registry = VoxelTypeRegistry::new();
        let empty = registry.get(VoxelTypeId::EMPTY).unwrap();
        assert_eq!(empty.name, "empty");
        assert!(!empty.ramp_capable);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut registry = VoxelTypeRegistry::new();
        assert_eq!(registry.register(grass_def()).unwrap(), VoxelTypeId(1));
        assert_eq!(registry.register(stone_def()).unwrap(), VoxelTypeId(2));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup_by_name("stone"), Some(VoxelTypeId(2)));
        assert_eq!(registry.lookup_by_name("nonexistent"), None);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = VoxelTypeRegistry::new();
        registry.register(stone_def()).unwrap();
        let result = registry.register(stone_def());
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }

    #[test]
    fn test_texture_outside_atlas_fails_fast() {
        let mut registry = VoxelTypeRegistry::with_texture_count(4);
        // Ramp texture 4 is one past the end.
        let result = registry.register(grass_def());
        assert!(matches!(
            result,
            Err(RegistryError::UnknownTexture { texture: 4, count: 4, .. })
        ));
        assert_eq!(registry.lookup_by_name("grass"), None);
    }

    #[test]
    fn test_ramp_textures_selected_only_when_ramped() {
        let def = grass_def();
        assert_eq!(def.textures_for(false).side, TextureId(3));
        assert_eq!(def.textures_for(true).side, TextureId(4));
        let stone = stone_def();
        assert_eq!(stone.textures_for(true).side, TextureId(5));
    }

    #[test]
    fn test_is_ramp_capable() {
        let mut registry = VoxelTypeRegistry::new();
        let grass = registry.register(grass_def()).unwrap();
        let stone = registry.register(stone_def()).unwrap();
        assert!(registry.is_ramp_capable(grass));
        assert!(!registry.is_ramp_capable(stone));
        assert!(!registry.is_ramp_capable(VoxelTypeId(999)));
    }

    #[test]
    fn test_validate_chunk_rejects_unknown_voxel() {
        let mut registry = VoxelTypeRegistry::new();
        registry.register(stone_def()).unwrap();
        let mut data = ChunkData::new(ChunkDims::cube(2));
        data.set_voxel(0, 0, 0, Voxel::new(VoxelTypeId(1)));
        assert!(registry.validate_chunk(&data).is_ok());

        data.set_voxel(1, 1, 1, Voxel::new(VoxelTypeId(7)));
        assert!(matches!(
            registry.validate_chunk(&data),
            Err(RegistryError::UnknownVoxelType(7))
        ));
    }

    #[test]
    fn test_liquid_registry_reserves_dry() {
        let mut liquids = LiquidTypeRegistry::new();
        let water = liquids
            .register(LiquidTypeDef {
                name: "water".to_string(),
                texture: TextureId(9),
            })
            .unwrap();
        assert_eq!(water, LiquidTypeId(1));
        assert_eq!(liquids.get(LiquidTypeId::DRY).unwrap().name, "dry");
        assert_eq!(liquids.lookup_by_name("water"), Some(water));
    }

    #[test]
    fn test_liquid_validate_chunk() {
        let liquids = LiquidTypeRegistry::new();
        let mut data = ChunkData::new(ChunkDims::cube(2));
        assert!(liquids.validate_chunk(&data).is_ok());
        data.set_liquid(0, 1, 0, LiquidCell::new(LiquidTypeId(3), 100));
        assert!(matches!(
            liquids.validate_chunk(&data),
            Err(RegistryError::UnknownLiquidType(3))
        ));
    }
}
