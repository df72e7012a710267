//! glTF / GLB loading
//!
//! Every triangle primitive reachable from the default scene is merged into one
//! solid with its node transforms baked in.

use std::path::Path;

use glam::{DMat4, DVec3, Mat4};

use super::{MeshBuilder, MeshError, Solid};

/// Load a `.gltf` or `.glb` file
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let path = path.as_ref();
    let (document, buffers, _images) =
        gltf::import(path).map_err(|e| MeshError::Parse(format!("{path:?}: {e}")))?;

    let mut builder = MeshBuilder::default();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                visit_node(&node, DMat4::IDENTITY, &buffers, &mut builder);
            }
        }
        // Scene-less files: take every mesh as-is
        None => {
            for mesh in document.meshes() {
                append_mesh(&mesh, DMat4::IDENTITY, &buffers, &mut builder);
            }
        }
    }

    builder.finish()
}

fn visit_node(
    node: &gltf::Node,
    parent: DMat4,
    buffers: &[gltf::buffer::Data],
    builder: &mut MeshBuilder,
) {
    let local = Mat4::from_cols_array_2d(&node.transform().matrix()).as_dmat4();
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        append_mesh(&mesh, world, buffers, builder);
    }
    for child in node.children() {
        visit_node(&child, world, buffers, builder);
    }
}

fn append_mesh(
    mesh: &gltf::Mesh,
    world: DMat4,
    buffers: &[gltf::buffer::Data],
    builder: &mut MeshBuilder,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!(
                "Skipping non-triangle primitive in mesh {:?}",
                mesh.name().unwrap_or("unnamed")
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };

        let positions: Vec<[f32; 3]> = positions
            .map(|p| {
                world
                    .transform_point3(DVec3::from_array(p.map(f64::from)))
                    .as_vec3()
                    .to_array()
            })
            .collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        builder.append(positions, &indices);
    }
}
