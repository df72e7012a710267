//! Merged binary STL output (all parts in world space, millimetres)

use crate::assembly::PlacedPart;
use crate::mesh::triangle_normal;

use super::{ExportError, world_vertices};

/// Encode every part's triangles into one binary STL
pub fn encode_stl(parts: &[PlacedPart], mm_per_unit: f64) -> Result<Vec<u8>, ExportError> {
    let mut triangles = Vec::new();

    for part in parts {
        let world: Vec<[f32; 3]> = world_vertices(part, mm_per_unit)
            .into_iter()
            .map(|v| v.as_vec3().to_array())
            .collect();

        for tri in part.solid.indices.chunks_exact(3) {
            let [v0, v1, v2] = [tri[0], tri[1], tri[2]].map(|i| world[i as usize]);
            triangles.push(stl_io::Triangle {
                normal: stl_io::Normal::new(triangle_normal(v0, v1, v2)),
                vertices: [
                    stl_io::Vertex::new(v0),
                    stl_io::Vertex::new(v1),
                    stl_io::Vertex::new(v2),
                ],
            });
        }
    }

    let mut bytes = Vec::new();
    stl_io::write_stl(&mut bytes, triangles.iter()).map_err(|e| ExportError::Encode {
        format: "STL",
        reason: e.to_string(),
    })?;
    Ok(bytes)
}
