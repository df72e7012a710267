//! Normal calculation for triangle meshes

use glam::Vec3;

/// Unit normal of a triangle (+Z for degenerate triangles)
pub fn triangle_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let (a, b, c) = (Vec3::from(v0), Vec3::from(v1), Vec3::from(v2));
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z).to_array()
}
