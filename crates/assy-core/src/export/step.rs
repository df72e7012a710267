//! STEP output via the truck kernel
//!
//! Meshes carry no analytic surfaces, so every triangle becomes a planar face
//! of a single faceted shell.

use truck_modeling::{Curve, InnerSpace, Point3, Surface, builder};
use truck_stepio::out::{CompleteStepDisplay, StepHeaderDescriptor, StepModel};
use truck_topology::{Face, Shell, Wire};

use crate::assembly::PlacedPart;

use super::{ExportError, world_vertices};

const DEGENERATE_AREA: f64 = 1e-10;

fn encode_error(reason: impl Into<String>) -> ExportError {
    ExportError::Encode {
        format: "STEP",
        reason: reason.into(),
    }
}

/// Encode all parts into one STEP document
pub fn encode_step(
    parts: &[PlacedPart],
    mm_per_unit: f64,
    name: &str,
) -> Result<String, ExportError> {
    let mut faces = Vec::new();
    let mut skipped = 0usize;

    for part in parts {
        let world: Vec<Point3> = world_vertices(part, mm_per_unit)
            .into_iter()
            .map(|v| Point3::new(v.x, v.y, v.z))
            .collect();

        for tri in part.solid.indices.chunks_exact(3) {
            let [p0, p1, p2] = [tri[0], tri[1], tri[2]].map(|i| world[i as usize]);
            match triangle_face(p0, p1, p2) {
                Some(face) => faces.push(face),
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} degenerate triangles in STEP output", skipped);
    }
    if faces.is_empty() {
        return Err(encode_error("no valid triangles to write"));
    }

    let shell: Shell<Point3, Curve, Surface> = faces.into();
    let compressed = shell.compress();

    let document = CompleteStepDisplay::new(
        StepModel::from(&compressed),
        StepHeaderDescriptor {
            file_name: format!("{name}.step"),
            organization_system: format!("assy-core {}", env!("CARGO_PKG_VERSION")),
            ..Default::default()
        },
    );
    Ok(document.to_string())
}

fn triangle_face(p0: Point3, p1: Point3, p2: Point3) -> Option<Face<Point3, Curve, Surface>> {
    if (p1 - p0).cross(p2 - p0).magnitude() < DEGENERATE_AREA {
        return None;
    }

    let v0 = builder::vertex(p0);
    let v1 = builder::vertex(p1);
    let v2 = builder::vertex(p2);
    let wire = Wire::from(vec![
        builder::line(&v0, &v1),
        builder::line(&v1, &v2),
        builder::line(&v2, &v0),
    ]);
    builder::try_attach_plane(&[wire]).ok()
}
