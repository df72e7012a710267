//! Part geometry loading (STL, OBJ, PLY, glTF, STEP, OpenSCAD)

mod gltf_scene;
mod normals;
mod obj;
mod ply;
mod scad;
#[cfg(feature = "step")]
mod step;
mod stl;

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::part::Part;

pub use gltf_scene::load_gltf;
pub use normals::triangle_normal;
pub use obj::{load_obj, load_obj_from_bytes};
pub use ply::{load_ply, load_ply_from_bytes};
pub use scad::{ScadDefine, define_args, find_openscad, load_scad};
#[cfg(feature = "step")]
pub use step::load_step;
pub use stl::{load_stl, load_stl_from_bytes};

/// Triangle mesh of one part, in the part's local frame and manifest units
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solid {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub bbox_min: [f32; 3],
    pub bbox_max: [f32; 3],
}

impl Solid {
    /// Build a solid from indexed triangles
    pub fn new(vertices: Vec<[f32; 3]>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::Parse(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::Parse(format!(
                "index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }

        let mut solid = Self {
            vertices,
            indices,
            ..Default::default()
        };
        solid.calculate_bounding_box();
        Ok(solid)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn calculate_bounding_box(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in &self.vertices {
            let p = Vec3::from(*v);
            min = min.min(p);
            max = max.max(p);
        }
        self.bbox_min = min.to_array();
        self.bbox_max = max.to_array();
    }
}

/// Accumulates submeshes into one indexed buffer
#[derive(Debug, Default)]
pub(crate) struct MeshBuilder {
    vertices: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    /// Append a submesh; indices are relative to `vertices`
    pub fn append(&mut self, vertices: impl IntoIterator<Item = [f32; 3]>, indices: &[u32]) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(vertices);
        self.indices.extend(indices.iter().map(|&i| offset + i));
    }

    pub fn finish(self) -> Result<Solid, MeshError> {
        Solid::new(self.vertices, self.indices)
    }
}

/// Geometry format, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Ply,
    Gltf,
    Step,
    Scad,
    /// Python generator script
    Generator,
    Unknown,
}

impl MeshFormat {
    /// Detect format from file path
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("stl") => MeshFormat::Stl,
            Some("obj") => MeshFormat::Obj,
            Some("ply") => MeshFormat::Ply,
            Some("glb") | Some("gltf") => MeshFormat::Gltf,
            Some("step") | Some("stp") => MeshFormat::Step,
            Some("scad") => MeshFormat::Scad,
            Some("py") => MeshFormat::Generator,
            _ => MeshFormat::Unknown,
        }
    }

    /// Check if the format can be loaded by this build
    pub fn is_supported(&self) -> bool {
        match self {
            MeshFormat::Stl
            | MeshFormat::Obj
            | MeshFormat::Ply
            | MeshFormat::Gltf
            | MeshFormat::Scad => true,
            #[cfg(feature = "step")]
            MeshFormat::Step => true,
            #[cfg(not(feature = "step"))]
            MeshFormat::Step => false,
            MeshFormat::Generator | MeshFormat::Unknown => false,
        }
    }

    /// Get format name
    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "STL",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Ply => "PLY",
            MeshFormat::Gltf => "glTF",
            MeshFormat::Step => "STEP",
            MeshFormat::Scad => "OpenSCAD",
            MeshFormat::Generator => "Python generator",
            MeshFormat::Unknown => "Unknown",
        }
    }
}

/// Load a mesh file by extension (STL, OBJ, PLY, glTF, STEP)
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let path = path.as_ref();

    match MeshFormat::from_path(path) {
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Ply => load_ply(path),
        MeshFormat::Gltf => load_gltf(path),
        #[cfg(feature = "step")]
        MeshFormat::Step => load_step(path),
        #[cfg(not(feature = "step"))]
        MeshFormat::Step => Err(MeshError::UnsupportedFormat(
            "STEP import requires the 'step' feature to be enabled".into(),
        )),
        MeshFormat::Scad => Err(MeshError::UnsupportedFormat(
            "OpenSCAD sources must be loaded through a GeometryLoader".into(),
        )),
        MeshFormat::Generator => Err(MeshError::UnsupportedFormat(
            "Python generator scripts are not executed, export the part to STEP or STL".into(),
        )),
        MeshFormat::Unknown => Err(MeshError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        )),
    }
}

/// Source of part geometry
pub trait GeometryLoader {
    fn load(&self, part: &Part) -> Result<Solid, MeshError>;
}

/// Loads part geometry from disk
#[derive(Debug, Clone)]
pub struct FileLoader {
    /// Directory for intermediate files (OpenSCAD output)
    pub work_dir: PathBuf,
}

impl FileLoader {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl GeometryLoader for FileLoader {
    fn load(&self, part: &Part) -> Result<Solid, MeshError> {
        if !part.file.is_file() {
            return Err(MeshError::NotFound(part.file.clone()));
        }

        let solid = match part.format {
            MeshFormat::Scad => load_scad(&part.file, &part.scad_defines, &self.work_dir)?,
            _ => load_mesh(&part.file)?,
        };

        tracing::debug!(
            "Loaded {} part '{}': {} vertices, {} triangles",
            part.format.name(),
            part.name,
            solid.vertices.len(),
            solid.triangle_count()
        );
        Ok(solid)
    }
}

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("File not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("External tool failed: {0}")]
    Tool(String),
}
