//! Placed assembly: resolved transforms joined with loaded geometry

use std::path::PathBuf;

use crate::export::{ExportError, ExportOptions, ExportReport, export_assembly};
use crate::manifest::{Manifest, ManifestError, Units};
use crate::mesh::{GeometryLoader, MeshError, Solid};
use crate::resolve::{Resolution, ResolveError, WorldTransform, resolve};

/// One part with its geometry and world placement (manifest units)
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPart {
    pub name: String,
    pub solid: Solid,
    pub transform: WorldTransform,
}

/// Fully placed assembly, ready for export
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub name: String,
    pub units: Units,
    /// Parts in manifest declaration order
    pub parts: Vec<PlacedPart>,
}

impl Assembly {
    /// Resolve all placements, then load every part's geometry
    ///
    /// Placement is solved before any file is opened, so structural errors
    /// surface without touching geometry.
    pub fn build(manifest: &Manifest, loader: &dyn GeometryLoader) -> Result<Self, AssemblyError> {
        let resolution = resolve(manifest.parts())?;
        Self::from_resolution(manifest, &resolution, loader)
    }

    /// Load geometry for an already resolved manifest
    pub fn from_resolution(
        manifest: &Manifest,
        resolution: &Resolution,
        loader: &dyn GeometryLoader,
    ) -> Result<Self, AssemblyError> {
        let mut parts = Vec::with_capacity(manifest.parts().len());

        for part in manifest.parts() {
            let transform = *resolution
                .get(&part.name)
                .ok_or_else(|| ResolveError::Unresolved(part.name.clone()))?;
            let solid = loader.load(part).map_err(|source| AssemblyError::Load {
                part: part.name.clone(),
                path: part.file.clone(),
                source,
            })?;
            parts.push(PlacedPart {
                name: part.name.clone(),
                solid,
                transform,
            });
        }

        tracing::info!(
            "Built assembly '{}' with {} parts ({})",
            manifest.name,
            parts.len(),
            manifest.units
        );

        Ok(Self {
            name: manifest.name.clone(),
            units: manifest.units,
            parts,
        })
    }

    /// Get a placed part by name
    pub fn part(&self, name: &str) -> Option<&PlacedPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Total triangle count
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.solid.triangle_count()).sum()
    }

    /// Write the requested outputs (lengths converted to millimetres)
    pub fn export(&self, options: &ExportOptions) -> Result<ExportReport, AssemblyError> {
        Ok(export_assembly(
            &self.parts,
            self.units.mm_per_unit(),
            &self.name,
            options,
        )?)
    }
}

/// Any failure between reading the manifest and writing outputs
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to load part '{part}' from {path:?}: {source}")]
    Load {
        part: String,
        path: PathBuf,
        source: MeshError,
    },
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    use glam::DVec3;

    use super::*;
    use crate::manifest::ManifestFormat;
    use crate::part::Part;

    /// Serves one triangle per part and records load order
    #[derive(Default)]
    struct MemoryLoader {
        solids: HashMap<String, Solid>,
        loaded: RefCell<Vec<String>>,
    }

    impl MemoryLoader {
        fn with_triangles(names: &[&str]) -> Self {
            let solids = names
                .iter()
                .map(|n| {
                    let solid = Solid::new(
                        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        vec![0, 1, 2],
                    )
                    .unwrap();
                    (n.to_string(), solid)
                })
                .collect();
            Self {
                solids,
                ..Default::default()
            }
        }
    }

    impl GeometryLoader for MemoryLoader {
        fn load(&self, part: &Part) -> Result<Solid, MeshError> {
            self.loaded.borrow_mut().push(part.name.clone());
            self.solids
                .get(&part.name)
                .cloned()
                .ok_or_else(|| MeshError::NotFound(part.file.clone()))
        }
    }

    fn manifest(json: &str) -> Manifest {
        Manifest::from_str_with_format(json, ManifestFormat::Json, Path::new("/proj")).unwrap()
    }

    const MATED: &str = r#"{
        "name": "rig",
        "units": "inch",
        "parts": [
            {"name": "arm", "file": "arm.stl",
             "anchors": {"root": {"t": [0, 0, 0], "axis": [0, 0, -1]}},
             "mates": [{"my_anchor": "root", "to_part": "base", "to_anchor": "top"}]},
            {"name": "base", "file": "base.stl", "xform": {"t": [1, 2, 0]},
             "anchors": {"top": {"t": [0, 0, 3], "axis": [0, 0, 1]}}}
        ]
    }"#;

    #[test]
    fn test_build_places_parts() {
        let loader = MemoryLoader::with_triangles(&["arm", "base"]);
        let assembly = Assembly::build(&manifest(MATED), &loader).unwrap();

        assert_eq!(assembly.name, "rig");
        assert_eq!(assembly.units, Units::Inches);
        assert_eq!(assembly.parts[0].name, "arm");
        assert_eq!(assembly.triangle_count(), 2);

        let arm = assembly.part("arm").unwrap();
        let origin = arm.transform.transform_point(DVec3::ZERO);
        approx::assert_relative_eq!(origin.x, 1.0, epsilon = 1e-9);
        approx::assert_relative_eq!(origin.y, 2.0, epsilon = 1e-9);
        approx::assert_relative_eq!(origin.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cycle_fails_before_loading() {
        let json = r#"{"parts": [
            {"name": "a", "file": "a.stl", "anchors": {"x": {}},
             "mates": [{"my_anchor": "x", "to_part": "b", "to_anchor": "x"}]},
            {"name": "b", "file": "b.stl", "anchors": {"x": {}},
             "mates": [{"my_anchor": "x", "to_part": "a", "to_anchor": "x"}]}
        ]}"#;
        let loader = MemoryLoader::with_triangles(&["a", "b"]);
        let err = Assembly::build(&manifest(json), &loader).unwrap_err();

        assert!(matches!(err, AssemblyError::Resolve(ResolveError::Cycle { .. })));
        assert!(loader.loaded.borrow().is_empty());
    }

    #[test]
    fn test_load_failure_names_part() {
        let loader = MemoryLoader::with_triangles(&["base"]);
        let err = Assembly::build(&manifest(MATED), &loader).unwrap_err();
        match err {
            AssemblyError::Load { part, path, .. } => {
                assert_eq!(part, "arm");
                assert_eq!(path, PathBuf::from("/proj/arm.stl"));
            }
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_export_converts_to_millimetres() {
        let loader = MemoryLoader::with_triangles(&["arm", "base"]);
        let assembly = Assembly::build(&manifest(MATED), &loader).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions::new(dir.path()).without_step().with_stl("rig.stl");
        let report = assembly.export(&options).unwrap();

        let bytes = std::fs::read(report.written[0].1.as_path()).unwrap();
        let mesh = stl_io::read_stl(&mut std::io::Cursor::new(bytes)).unwrap();
        let max_x = mesh.vertices.iter().map(|v| v[0]).fold(f32::MIN, f32::max);
        // base spans x = 1..2 inches
        approx::assert_relative_eq!(max_x, 50.8, epsilon = 1e-3);
    }
}
