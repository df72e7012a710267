//! STEP file loading via the truck kernel
//!
//! This module requires the `step` feature to be enabled.

use std::path::Path;

use truck_meshalgo::prelude::*;
use truck_polymesh::PolygonMesh;
use truck_stepio::r#in::Table;

use crate::constants::STEP_TESSELLATION_FRACTION;

use super::{MeshBuilder, MeshError, Solid};

/// Load a STEP file, tessellating every shell into one solid
pub fn load_step(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|e| MeshError::Io(format!("{path:?}: {e}")))?;
    load_step_from_str(&content)
}

pub(crate) fn load_step_from_str(content: &str) -> Result<Solid, MeshError> {
    let exchange = truck_stepio::r#in::ruststep::parser::parse(content)
        .map_err(|e| MeshError::Parse(format!("failed to parse STEP: {e}")))?;
    let data = exchange
        .data
        .first()
        .ok_or_else(|| MeshError::Parse("STEP file contains no data section".into()))?;

    let table = Table::from_data_section(data);
    let mut builder = MeshBuilder::default();

    for shell_holder in table.shell.values() {
        let shell = match table.to_compressed_shell(shell_holder) {
            Ok(shell) => shell,
            Err(e) => {
                tracing::warn!("Skipping STEP shell that failed to convert: {e:?}");
                continue;
            }
        };

        // Coarse pass to size the tolerance from the shell's extent
        let coarse = shell.robust_triangulation(0.01).to_polygon();
        let tolerance = coarse.bounding_box().diameter() * STEP_TESSELLATION_FRACTION;
        let polygon = shell.robust_triangulation(tolerance).to_polygon();

        append_polygon(&polygon, &mut builder);
    }

    builder.finish()
}

fn append_polygon(poly: &PolygonMesh, builder: &mut MeshBuilder) {
    let vertices = poly
        .positions()
        .iter()
        .map(|p| [p.x as f32, p.y as f32, p.z as f32]);

    let mut indices = Vec::new();
    for tri in poly.tri_faces() {
        indices.extend([tri[0].pos, tri[1].pos, tri[2].pos].map(|i| i as u32));
    }
    for quad in poly.quad_faces() {
        let [a, b, c, d] = [quad[0].pos, quad[1].pos, quad[2].pos, quad[3].pos].map(|i| i as u32);
        indices.extend([a, b, c, a, c, d]);
    }

    builder.append(vertices, &indices);
}
