//! Solid chunk meshing: face visibility, ramped corner geometry, baked
//! colors and jitter.
//!
//! One quad is emitted per visible voxel face. Faces are not merged: ramps,
//! per-corner colors and jitter make every quad unique.

use glam::IVec3;
use strata_voxel::{
    ChunkAddress, ChunkData, CubeCorner, FaceTextures, RampMask, Voxel, VoxelQuery,
};

use crate::chunk_mesh::{ChunkMesh, ChunkVertex, FaceInfo, SliceMesh, SolidMesh, texture_layer};
use crate::context::{MeshContext, SliceMode};
use crate::face_direction::FaceDirection;
use crate::face_visibility::FaceVisibilityTable;
use crate::visible_faces::VisibleFaces;

/// Returns `true` if every face neighbor of `pos` that resolves is a solid,
/// visible voxel, and at least one resolves.
pub fn is_fully_surrounded<Q: VoxelQuery + ?Sized>(query: &Q, pos: IVec3) -> bool {
    let near = query.non_null_voxels_near(pos);
    !near.is_empty() && near.iter().all(|(_, voxel)| voxel.occludes())
}

/// Decides which faces of `voxel` at world position `pos` are drawn.
///
/// With a `view_limit`, a voxel at that level always shows its top face.
pub fn visible_faces<Q: VoxelQuery + ?Sized>(
    query: &Q,
    pos: IVec3,
    voxel: &Voxel,
    table: &FaceVisibilityTable,
    view_limit: Option<i32>,
) -> VisibleFaces {
    let mut faces = VisibleFaces::NONE;
    if !voxel.occludes() {
        return faces;
    }

    let mut surrounded = None;
    for face in FaceDirection::ALL {
        let visible = if face == FaceDirection::Top && view_limit == Some(pos.y) {
            true
        } else {
            match query.voxel_at(pos + face.offset()) {
                None => !*surrounded.get_or_insert_with(|| is_fully_surrounded(query, pos)),
                Some(neighbor) if !neighbor.occludes() => true,
                Some(neighbor) => table.should_draw(face, voxel.ramp, neighbor.ramp),
            }
        };
        if visible {
            faces.set_visible(face);
        }
    }
    faces
}

/// Builds the solid mesh of one chunk.
///
/// `chunk` holds the cells of the chunk at `addr`; `query` resolves its
/// neighbors. Voxels above the view limit are skipped.
pub fn build_chunk_mesh<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    ctx: &MeshContext,
) -> ChunkMesh {
    let dims = chunk.dims();
    let origin = addr.origin(dims);
    let limit = ctx.settings.view_limit;
    let mut mesh = ChunkMesh::new();

    for y in 0..dims.y {
        if limit.is_some_and(|l| origin.y + y as i32 > l) {
            break;
        }
        for z in 0..dims.z {
            for x in 0..dims.x {
                let voxel = chunk.voxel(x, y, z);
                if !voxel.occludes() {
                    continue;
                }
                let local = IVec3::new(x as i32, y as i32, z as i32);
                let faces = visible_faces(query, origin + local, &voxel, &ctx.face_table, limit);
                emit_voxel(&mut mesh, ctx, origin, local, &voxel, faces);
            }
        }
    }

    tracing::trace!("chunk {:?}: {} faces", addr, mesh.quad_count());
    mesh
}

/// Builds one [`SliceMesh`] per horizontal layer of the chunk.
///
/// A renderer cutting the world at layer `L` draws every body up to `L` and
/// the cap of `L`. The view limit in `ctx` is ignored.
pub fn build_sliced_meshes<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    ctx: &MeshContext,
) -> Vec<SliceMesh> {
    let dims = chunk.dims();
    let origin = addr.origin(dims);

    (0..dims.y)
        .map(|y| {
            let mut slice = SliceMesh {
                layer: y,
                ..SliceMesh::default()
            };
            for z in 0..dims.z {
                for x in 0..dims.x {
                    let voxel = chunk.voxel(x, y, z);
                    if !voxel.occludes() {
                        continue;
                    }
                    let local = IVec3::new(x as i32, y as i32, z as i32);
                    let faces = visible_faces(query, origin + local, &voxel, &ctx.face_table, None);
                    emit_voxel(&mut slice.body, ctx, origin, local, &voxel, faces);

                    if !faces.is_visible(FaceDirection::Top) {
                        let mut cap = VisibleFaces::NONE;
                        cap.set_visible(FaceDirection::Top);
                        emit_voxel(&mut slice.cap, ctx, origin, local, &voxel, cap);
                    }
                }
            }
            slice
        })
        .collect()
}

/// Builds solid geometry in the layout selected by `ctx.settings.slice_mode`.
pub fn build_solid_mesh<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    ctx: &MeshContext,
) -> SolidMesh {
    match ctx.settings.slice_mode {
        SliceMode::Whole => SolidMesh::Whole(build_chunk_mesh(addr, chunk, query, ctx)),
        SliceMode::Layers => SolidMesh::Sliced(build_sliced_meshes(addr, chunk, query, ctx)),
    }
}

fn face_texture(textures: &FaceTextures, face: FaceDirection) -> u32 {
    texture_layer(match face {
        FaceDirection::Top => textures.top,
        FaceDirection::Bottom => textures.bottom,
        _ => textures.side,
    })
}

fn emit_voxel(
    mesh: &mut ChunkMesh,
    ctx: &MeshContext,
    origin: IVec3,
    local: IVec3,
    voxel: &Voxel,
    faces: VisibleFaces,
) {
    if faces.count() == 0 {
        return;
    }
    let Some(def) = ctx.voxel_types.get(voxel.kind) else {
        tracing::trace!("skipping unregistered voxel type {:?}", voxel.kind);
        return;
    };
    let ramp = voxel.ramp.normalized();
    let textures = def.textures_for(!ramp.is_none());

    for face in faces.iter() {
        let texture = face_texture(textures, face);
        let corners = face
            .corners()
            .map(|corner| corner_vertex(ctx, origin, local, voxel, ramp, face, corner, texture));
        let info = FaceInfo {
            direction: face,
            voxel: [local.x as u16, local.y as u16, local.z as u16],
            ramped: !ramp.is_none(),
        };
        mesh.push_face(info, corners);
    }
}

#[allow(clippy::too_many_arguments)]
fn corner_vertex(
    ctx: &MeshContext,
    origin: IVec3,
    local: IVec3,
    voxel: &Voxel,
    ramp: RampMask,
    face: FaceDirection,
    corner: CubeCorner,
    texture: u32,
) -> ChunkVertex {
    let unit = IVec3::from_array(corner.unit().map(i32::from));
    let mut position = (local + unit).as_vec3();
    let mut uv = face.uv(corner);

    if corner.top_corner().is_some_and(|top| ramp.contains(top)) {
        let depth = ctx.settings.ramp_depth;
        position.y -= depth;
        if face.is_side() {
            uv[1] += depth;
        }
    }
    position += ctx.jitter().offset(origin + local + unit);

    ChunkVertex {
        position: position.to_array(),
        normal: face.normal(),
        uv,
        color: voxel.color_at(corner),
        texture,
    }
}
