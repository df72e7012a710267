//! Placement resolution: world transforms from local transforms and anchor mates

mod graph;
mod transform;

use std::collections::BTreeMap;

use crate::part::{Part, Placement};

pub use transform::{
    AxisAlignment, MATE_ALIGNMENT, WorldTransform, mate_transform, rotation_from_degrees,
};

use graph::MateGraph;

/// Resolved world transforms, keyed by part name
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    transforms: BTreeMap<String, WorldTransform>,
    order: Vec<String>,
}

impl Resolution {
    /// World transform of a part
    pub fn get(&self, name: &str) -> Option<&WorldTransform> {
        self.transforms.get(name)
    }

    /// Iterate over (name, transform) in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorldTransform)> {
        self.transforms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Part names in the order they were resolved
    pub fn resolution_order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Consume into the name -> transform map
    pub fn into_map(self) -> BTreeMap<String, WorldTransform> {
        self.transforms
    }
}

/// Resolve every part's world transform.
///
/// Unmated parts are placed by their own transform. A mated part is pre-rotated,
/// then turned and moved so its anchor meets the target anchor with axes
/// following [`MATE_ALIGNMENT`]. Resolution is all-or-nothing: a dangling
/// reference or a mate cycle fails the whole call.
pub fn resolve(parts: &[Part]) -> Result<Resolution, ResolveError> {
    let graph = MateGraph::build(parts)?;
    let order = graph.topological_order()?;

    let mut resolved: Vec<Option<WorldTransform>> = vec![None; parts.len()];

    for &idx in &order {
        let part = &parts[idx];
        let world = match &part.placement {
            Placement::Free(xform) => WorldTransform::from_transform(xform),
            Placement::Mated {
                mate,
                pre_rotation_deg,
                scale,
            } => {
                let target_idx = graph.targets[idx]
                    .ok_or_else(|| ResolveError::Unresolved(part.name.clone()))?;
                let target_world = resolved[target_idx]
                    .ok_or_else(|| ResolveError::Unresolved(parts[target_idx].name.clone()))?;

                let own = part.anchor(&mate.my_anchor).ok_or_else(|| {
                    ReferenceError::MissingAnchor {
                        part: part.name.clone(),
                        anchor: mate.my_anchor.clone(),
                    }
                })?;
                let target = parts[target_idx].anchor(&mate.to_anchor).ok_or_else(|| {
                    ReferenceError::UnknownAnchor {
                        part: part.name.clone(),
                        to_part: mate.to_part.clone(),
                        to_anchor: mate.to_anchor.clone(),
                    }
                })?;

                let (target_position, target_axis) = target_world.anchor_frame(target);
                mate_transform(
                    rotation_from_degrees(*pre_rotation_deg),
                    *scale,
                    own,
                    target_position,
                    target_axis,
                    MATE_ALIGNMENT,
                )
            }
        };

        tracing::debug!(
            part = %part.name,
            translation = ?world.translation,
            scale = world.scale,
            "resolved placement"
        );

        debug_assert!(resolved[idx].is_none(), "part resolved twice");
        resolved[idx] = Some(world);
    }

    let mut transforms = BTreeMap::new();
    for (part, world) in parts.iter().zip(resolved) {
        let world = world.ok_or_else(|| ResolveError::Unresolved(part.name.clone()))?;
        transforms.insert(part.name.clone(), world);
    }

    Ok(Resolution {
        transforms,
        order: order.iter().map(|&i| parts[i].name.clone()).collect(),
    })
}

/// Check that every mate names an existing anchor on an existing part
pub fn check_references(parts: &[Part]) -> Result<(), ResolveError> {
    MateGraph::build(parts).map(|_| ())
}

/// A mate names a part or anchor that does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("part '{part}': anchor '{anchor}' not defined")]
    MissingAnchor { part: String, anchor: String },
    #[error("part '{part}' mates to unknown part '{to_part}'")]
    UnknownPart { part: String, to_part: String },
    #[error("part '{part}' mates to anchor '{to_anchor}' which is not defined on part '{to_part}'")]
    UnknownAnchor {
        part: String,
        to_part: String,
        to_anchor: String,
    },
}

/// Placement resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("structural error: {0}")]
    Reference(#[from] ReferenceError),
    #[error("duplicate part name: {0}")]
    DuplicatePart(String),
    #[error("circular mate dependency: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("part '{0}' could not be resolved")]
    Unresolved(String),
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{DMat3, DVec3};

    use super::*;
    use crate::part::{Mate, Transform};

    const EPS: f64 = 1e-9;

    fn base() -> Part {
        Part::new("base", "base.step")
            .with_transform(Transform::new(
                DVec3::new(100.0, 0.0, 0.0),
                DVec3::new(0.0, 0.0, 90.0),
                1.0,
            ))
            .with_anchor("mount_face", DVec3::new(10.0, 0.0, 20.0), DVec3::Z)
    }

    fn spindle(xform: Transform) -> Part {
        Part::new("spindle", "spindle.stl")
            .with_anchor("bore_top", DVec3::new(0.0, 0.0, 5.0), DVec3::Z)
            .with_mate(Mate::new("bore_top", "base", "mount_face"), xform)
    }

    #[test]
    fn test_unmated_matches_hand_computed_matrix() {
        let xform = Transform::new(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(90.0, 0.0, 0.0),
            2.0,
        );
        let parts = vec![Part::new("p", "p.stl").with_transform(xform)];
        let resolution = resolve(&parts).unwrap();
        let world = resolution.get("p").unwrap();

        // Rx(90): y -> z, z -> -y
        let expected = DMat3::from_cols(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, -1.0, 0.0),
        );
        assert!(world.rotation.abs_diff_eq(expected, EPS));
        assert_eq!(world.translation, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.scale, 2.0);

        let p = world.transform_point(DVec3::new(0.0, 1.0, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(1.0, 2.0, 5.0), EPS));
    }

    #[test]
    fn test_unmated_combined_rotation() {
        let xform = Transform::new(
            DVec3::new(-5.0, 0.0, 0.0),
            DVec3::new(0.0, 90.0, 90.0),
            1.0,
        );
        let parts = vec![Part::new("p", "p.stl").with_transform(xform)];
        let world = *resolve(&parts).unwrap().get("p").unwrap();
        // Ry(90) * Rz(90) on +X: Rz gives +Y, Ry keeps +Y
        let p = world.transform_point(DVec3::X);
        assert!(p.abs_diff_eq(DVec3::new(-5.0, 1.0, 0.0), EPS), "got {p:?}");
        // +Z: Rz keeps +Z, Ry(90) takes +Z to +X
        let q = world.transform_point(DVec3::Z);
        assert!(q.abs_diff_eq(DVec3::new(-4.0, 0.0, 0.0), EPS), "got {q:?}");
    }

    #[test]
    fn test_mated_anchor_coincides_and_faces_target() {
        let parts = vec![base(), spindle(Transform::default())];
        let resolution = resolve(&parts).unwrap();

        let base_world = resolution.get("base").unwrap();
        let spindle_world = resolution.get("spindle").unwrap();

        let (target_pos, target_axis) =
            base_world.anchor_frame(parts[0].anchor("mount_face").unwrap());
        let (pos, axis) = spindle_world.anchor_frame(parts[1].anchor("bore_top").unwrap());

        // base: Rz(90) takes (10, 0, 20) to (0, 10, 20), then +100 in x
        assert!(target_pos.abs_diff_eq(DVec3::new(100.0, 10.0, 20.0), EPS));
        assert_relative_eq!(pos.x, target_pos.x, epsilon = EPS);
        assert_relative_eq!(pos.y, target_pos.y, epsilon = EPS);
        assert_relative_eq!(pos.z, target_pos.z, epsilon = EPS);

        assert!(axis.abs_diff_eq(-target_axis, EPS), "axes must be anti-parallel");
        assert!(!axis.abs_diff_eq(target_axis, 1e-3), "axes must not be parallel");
    }

    #[test]
    fn test_mated_translation_ignored() {
        let a = resolve(&[base(), spindle(Transform::default())]).unwrap();
        let b = resolve(&[
            base(),
            spindle(Transform::from_translation(DVec3::new(500.0, -3.0, 7.0))),
        ])
        .unwrap();
        assert_eq!(a.get("spindle"), b.get("spindle"));
    }

    #[test]
    fn test_pre_rotation_applies_before_mating() {
        // Anchor axis +X, pre-rotated by Ry(-90) to +Z, which then has to flip to -Z
        let part = Part::new("arm", "arm.stl")
            .with_anchor("tip", DVec3::new(3.0, 0.0, 0.0), DVec3::X)
            .with_mate(
                Mate::new("tip", "base", "mount_face"),
                Transform::new(DVec3::ZERO, DVec3::new(0.0, -90.0, 0.0), 1.0),
            );
        let parts = vec![base(), part];
        let resolution = resolve(&parts).unwrap();
        let world = resolution.get("arm").unwrap();

        let (pos, axis) = world.anchor_frame(parts[1].anchor("tip").unwrap());
        assert!(pos.abs_diff_eq(DVec3::new(100.0, 10.0, 20.0), EPS));
        assert!(axis.abs_diff_eq(DVec3::NEG_Z, EPS), "got {axis:?}");
    }

    #[test]
    fn test_mate_chain_with_forward_reference() {
        let tool = Part::new("tool", "tool.stl")
            .with_anchor("shank", DVec3::ZERO, DVec3::NEG_Z)
            .with_mate(Mate::new("shank", "spindle", "nose"), Transform::default());
        let spindle = spindle(Transform::default()).with_anchor(
            "nose",
            DVec3::new(0.0, 0.0, -40.0),
            DVec3::NEG_Z,
        );
        // tool declared before the part it depends on
        let parts = vec![tool, spindle, base()];
        let resolution = resolve(&parts).unwrap();
        assert_eq!(resolution.resolution_order(), ["base", "spindle", "tool"]);

        let spindle_world = resolution.get("spindle").unwrap();
        let tool_world = resolution.get("tool").unwrap();
        let (nose_pos, nose_axis) =
            spindle_world.anchor_frame(parts[1].anchor("nose").unwrap());
        let (shank_pos, shank_axis) = tool_world.anchor_frame(parts[0].anchor("shank").unwrap());
        assert!(shank_pos.abs_diff_eq(nose_pos, EPS));
        assert!(shank_axis.abs_diff_eq(-nose_axis, EPS));
    }

    #[test]
    fn test_parallel_axes_get_flipped() {
        // Both anchors point +Z: the mated part must turn half a revolution
        let part = Part::new("cap", "cap.stl")
            .with_anchor("face", DVec3::new(0.0, 0.0, 1.0), DVec3::Z)
            .with_mate(Mate::new("face", "floor", "top"), Transform::default());
        let floor = Part::new("floor", "floor.stl").with_anchor("top", DVec3::ZERO, DVec3::Z);
        let parts = vec![floor, part];
        let resolution = resolve(&parts).unwrap();
        let world = resolution.get("cap").unwrap();
        let (pos, axis) = world.anchor_frame(parts[1].anchor("face").unwrap());
        assert!(pos.abs_diff_eq(DVec3::ZERO, EPS));
        assert!(axis.abs_diff_eq(DVec3::NEG_Z, EPS));
    }

    #[test]
    fn test_cycle_fails_without_output() {
        let a = Part::new("a", "a.stl")
            .with_anchor("x", DVec3::ZERO, DVec3::Z)
            .with_mate(Mate::new("x", "b", "x"), Transform::default());
        let b = Part::new("b", "b.stl")
            .with_anchor("x", DVec3::ZERO, DVec3::Z)
            .with_mate(Mate::new("x", "a", "x"), Transform::default());

        let err = resolve(&[a, b]).unwrap_err();
        match &err {
            ResolveError::Cycle { path } => assert_eq!(path, &["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(err.to_string(), "circular mate dependency: a -> b -> a");
    }

    #[test]
    fn test_unknown_part_named() {
        let part = Part::new("p", "p.stl")
            .with_anchor("x", DVec3::ZERO, DVec3::Z)
            .with_mate(Mate::new("x", "ghost", "x"), Transform::default());
        let err = resolve(&[part]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Reference(ReferenceError::UnknownPart {
                part: "p".into(),
                to_part: "ghost".into(),
            })
        );
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_unknown_anchor_named() {
        let part = Part::new("p", "p.stl")
            .with_anchor("x", DVec3::ZERO, DVec3::Z)
            .with_mate(Mate::new("x", "base", "nope"), Transform::default());
        let err = resolve(&[base(), part]).unwrap_err();
        assert!(matches!(
            &err,
            ResolveError::Reference(ReferenceError::UnknownAnchor { to_anchor, .. }) if to_anchor == "nope"
        ));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_missing_own_anchor_named() {
        let part = Part::new("p", "p.stl")
            .with_mate(Mate::new("bore", "base", "mount_face"), Transform::default());
        let err = resolve(&[base(), part]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Reference(ReferenceError::MissingAnchor { ref anchor, .. }) if anchor == "bore"
        ));
    }

    #[test]
    fn test_declaration_order_independent() {
        let forward = resolve(&[base(), spindle(Transform::default())]).unwrap();
        let reverse = resolve(&[spindle(Transform::default()), base()]).unwrap();
        assert_eq!(forward.into_map(), reverse.into_map());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let parts = vec![
            base(),
            spindle(Transform::new(DVec3::ZERO, DVec3::new(12.5, -33.0, 71.0), 0.5)),
        ];
        let first = resolve(&parts).unwrap();
        let second = resolve(&parts).unwrap();
        for (name, world) in first.iter() {
            let other = second.get(name).unwrap();
            assert_eq!(world.translation.to_array(), other.translation.to_array());
            assert_eq!(world.rotation.to_cols_array(), other.rotation.to_cols_array());
            assert_eq!(world.scale.to_bits(), other.scale.to_bits());
        }
    }

    #[test]
    fn test_scale_does_not_move_mate() {
        let unit = resolve(&[base(), spindle(Transform::default())]).unwrap();
        let scaled = resolve(&[
            base(),
            spindle(Transform::new(DVec3::ZERO, DVec3::ZERO, 4.0)),
        ])
        .unwrap();
        let a = unit.get("spindle").unwrap();
        let b = scaled.get("spindle").unwrap();
        assert_eq!(a.translation, b.translation);
        assert_eq!(a.rotation, b.rotation);
        assert_eq!(b.scale, 4.0);
    }
}
