//! World transforms and anchor alignment

use glam::{DMat3, DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

use crate::part::{Anchor, Transform};

/// Axis relation enforced between two mated anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAlignment {
    /// Axes point into each other (mating faces)
    AntiParallel,
    /// Axes point the same way
    Parallel,
}

impl AxisAlignment {
    /// Direction the mated anchor's axis must take, given the target anchor's axis
    pub fn target_axis(self, axis: DVec3) -> DVec3 {
        match self {
            AxisAlignment::AntiParallel => -axis,
            AxisAlignment::Parallel => axis,
        }
    }
}

/// Convention applied to every mate
pub const MATE_ALIGNMENT: AxisAlignment = AxisAlignment::AntiParallel;

/// Rotation matrix for X, then Y, then Z rotations given in degrees (`Rx * Ry * Rz`)
pub fn rotation_from_degrees(r_deg: DVec3) -> DMat3 {
    DMat3::from_rotation_x(r_deg.x.to_radians())
        * DMat3::from_rotation_y(r_deg.y.to_radians())
        * DMat3::from_rotation_z(r_deg.z.to_radians())
}

/// Resolved placement of a part in assembly space
///
/// Geometry maps as `R * (s * x) + t`. Anchors are not scaled: `R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldTransform {
    pub translation: DVec3,
    pub rotation: DMat3,
    pub scale: f64,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DMat3::IDENTITY,
        scale: 1.0,
    };

    /// Direct placement of an unmated part
    pub fn from_transform(xform: &Transform) -> Self {
        Self {
            translation: xform.t,
            rotation: rotation_from_degrees(xform.r_deg),
            scale: xform.s,
        }
    }

    /// Map a point of the part's geometry into assembly space
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * (point * self.scale) + self.translation
    }

    /// Anchor position and axis in assembly space
    pub fn anchor_frame(&self, anchor: &Anchor) -> (DVec3, DVec3) {
        (
            self.rotation * anchor.position() + self.translation,
            (self.rotation * anchor.axis()).normalize(),
        )
    }

    /// Rotation as X, Y, Z angles in degrees (inverse of [`rotation_from_degrees`])
    pub fn rotation_degrees(&self) -> DVec3 {
        let (x, y, z) = DQuat::from_mat3(&self.rotation).to_euler(EulerRot::XYZ);
        DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// 4x4 matrix including scale
    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_translation(self.translation) * DMat4::from_mat3(self.rotation * self.scale)
    }

    /// Convert lengths by `factor` (e.g. inches to millimetres)
    pub fn in_units(&self, factor: f64) -> Self {
        Self {
            translation: self.translation * factor,
            rotation: self.rotation,
            scale: self.scale * factor,
        }
    }
}

/// Placement of a mated part
///
/// The pre-rotated anchor is turned so its axis follows `alignment` relative to
/// `target_axis` and moved onto `target_position`. Scale stays on the geometry only.
pub fn mate_transform(
    pre_rotation: DMat3,
    scale: f64,
    anchor: &Anchor,
    target_position: DVec3,
    target_axis: DVec3,
    alignment: AxisAlignment,
) -> WorldTransform {
    let position = pre_rotation * anchor.position();
    let axis = (pre_rotation * anchor.axis()).normalize();
    let goal = alignment.target_axis(target_axis).normalize();

    let align = DMat3::from_quat(DQuat::from_rotation_arc(axis, goal));

    WorldTransform {
        translation: target_position - align * position,
        rotation: align * pre_rotation,
        scale,
    }
}
