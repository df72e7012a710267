//! Part, Anchor and Mate definitions

use std::collections::BTreeMap;
use std::path::PathBuf;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::mesh::{MeshFormat, ScadDefine};

/// Local placement record of a part
///
/// Rotation is in degrees and applied in the fixed axis order X, then Y, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Translation in assembly units
    pub t: DVec3,
    /// Rotation about X, Y and Z in degrees
    pub r_deg: DVec3,
    /// Uniform scale factor applied to the part's geometry
    pub s: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            t: DVec3::ZERO,
            r_deg: DVec3::ZERO,
            s: 1.0,
        }
    }
}

impl Transform {
    pub fn new(t: DVec3, r_deg: DVec3, s: f64) -> Self {
        Self { t, r_deg, s }
    }

    /// Pure translation
    pub fn from_translation(t: DVec3) -> Self {
        Self {
            t,
            ..Self::default()
        }
    }
}

/// Named reference frame fixed in a part's local coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    position: DVec3,
    axis: DVec3,
}

impl Anchor {
    /// Create an anchor; the axis is normalized. Returns `None` for a zero-length axis.
    pub fn new(position: DVec3, axis: DVec3) -> Option<Self> {
        let axis = axis.try_normalize()?;
        Some(Self { position, axis })
    }

    /// Anchor point in the part's local frame
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Unit principal direction in the part's local frame
    pub fn axis(&self) -> DVec3 {
        self.axis
    }
}

/// Directed constraint: `my_anchor` of this part coincides with `to_anchor` of `to_part`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mate {
    pub my_anchor: String,
    pub to_part: String,
    pub to_anchor: String,
}

impl Mate {
    pub fn new(
        my_anchor: impl Into<String>,
        to_part: impl Into<String>,
        to_anchor: impl Into<String>,
    ) -> Self {
        Self {
            my_anchor: my_anchor.into(),
            to_part: to_part.into(),
            to_anchor: to_anchor.into(),
        }
    }
}

/// How a part is placed into the assembly
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Placed directly by its own transform relative to the assembly origin
    Free(Transform),
    /// Placed by a mate; only rotation and scale of the transform are kept.
    /// The rotation is a pre-rotation of the local frame before the anchor is matched.
    Mated {
        mate: Mate,
        pre_rotation_deg: DVec3,
        scale: f64,
    },
}

impl Placement {
    /// Build the placement from a manifest transform and optional mate.
    /// The translation is discarded for mated parts.
    pub fn from_parts(xform: Transform, mate: Option<Mate>) -> Self {
        match mate {
            None => Placement::Free(xform),
            Some(mate) => Placement::Mated {
                mate,
                pre_rotation_deg: xform.r_deg,
                scale: xform.s,
            },
        }
    }

    /// Get the mate, if any
    pub fn mate(&self) -> Option<&Mate> {
        match self {
            Placement::Free(_) => None,
            Placement::Mated { mate, .. } => Some(mate),
        }
    }

    /// Uniform geometry scale
    pub fn scale(&self) -> f64 {
        match self {
            Placement::Free(xform) => xform.s,
            Placement::Mated { scale, .. } => *scale,
        }
    }
}

/// A named part of the assembly
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    /// Geometry source (resolved against the manifest directory)
    pub file: PathBuf,
    /// Format derived from the file extension
    pub format: MeshFormat,
    /// Anchors by name
    pub anchors: BTreeMap<String, Anchor>,
    pub placement: Placement,
    /// OpenSCAD `-D` overrides (only used for `.scad` sources)
    pub scad_defines: BTreeMap<String, ScadDefine>,
}

impl Part {
    /// Create an unmated part at the origin with no anchors
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        Self {
            name: name.into(),
            format: MeshFormat::from_path(&file),
            file,
            anchors: BTreeMap::new(),
            placement: Placement::Free(Transform::default()),
            scad_defines: BTreeMap::new(),
        }
    }

    /// Place freely by the given transform
    pub fn with_transform(mut self, xform: Transform) -> Self {
        self.placement = Placement::Free(xform);
        self
    }

    /// Add an anchor (axis is normalized; a zero axis is ignored)
    pub fn with_anchor(mut self, name: impl Into<String>, position: DVec3, axis: DVec3) -> Self {
        if let Some(anchor) = Anchor::new(position, axis) {
            self.anchors.insert(name.into(), anchor);
        }
        self
    }

    /// Mate this part, keeping rotation and scale of `xform`
    pub fn with_mate(mut self, mate: Mate, xform: Transform) -> Self {
        self.placement = Placement::from_parts(xform, Some(mate));
        self
    }

    /// Get an anchor by name
    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.get(name)
    }

    /// Get the mate, if any
    pub fn mate(&self) -> Option<&Mate> {
        self.placement.mate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_axis_normalized() {
        let anchor = Anchor::new(DVec3::new(1.0, 2.0, 3.0), DVec3::new(0.0, 0.0, 5.0)).unwrap();
        assert_eq!(anchor.axis(), DVec3::Z);
        assert_eq!(anchor.position(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_anchor_zero_axis_rejected() {
        assert!(Anchor::new(DVec3::ZERO, DVec3::ZERO).is_none());
    }

    #[test]
    fn test_mated_placement_drops_translation() {
        let xform = Transform::new(
            DVec3::new(10.0, 20.0, 30.0),
            DVec3::new(90.0, 0.0, 0.0),
            2.0,
        );
        let placement = Placement::from_parts(xform, Some(Mate::new("a", "base", "b")));
        match placement {
            Placement::Mated {
                pre_rotation_deg,
                scale,
                ..
            } => {
                assert_eq!(pre_rotation_deg, DVec3::new(90.0, 0.0, 0.0));
                assert_eq!(scale, 2.0);
            }
            Placement::Free(_) => panic!("expected mated placement"),
        }
    }

    #[test]
    fn test_part_format_from_extension() {
        let part = Part::new("bracket", "assets/bracket.STL");
        assert_eq!(part.format, MeshFormat::Stl);
        assert!(part.mate().is_none());
    }
}
