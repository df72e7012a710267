//! Manifest loading and validation
//!
//! Reads the declarative assembly description (JSON, RON or TOML) and turns it
//! into validated [`Part`]s. All mate references are checked here; nothing is
//! placed yet.

mod types;
mod units;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::mesh::MeshFormat;
use crate::part::{Anchor, Part, Placement};
use crate::resolve::{ResolveError, check_references};

pub use types::{AnchorEntry, ManifestData, PartEntry, ScadEntry};
pub use units::Units;

/// Manifest document format, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Ron,
    Toml,
}

impl ManifestFormat {
    /// Detect format from file path
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(ManifestFormat::Json),
            "ron" => Ok(ManifestFormat::Ron),
            "toml" => Ok(ManifestFormat::Toml),
            "yaml" | "yml" => Err(ManifestError::UnsupportedFormat(
                "YAML manifests are not supported, use .json, .ron or .toml".into(),
            )),
            other => Err(ManifestError::UnsupportedFormat(format!(
                "unknown manifest type '.{other}' (use .json, .ron or .toml)"
            ))),
        }
    }

    /// Parse a document in this format
    pub fn parse(&self, content: &str) -> Result<ManifestData, ManifestError> {
        match self {
            ManifestFormat::Json => {
                serde_json::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))
            }
            ManifestFormat::Ron => {
                ron::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))
            }
            ManifestFormat::Toml => {
                toml::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))
            }
        }
    }
}

/// Validated assembly description
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub units: Units,
    /// Output directory (relative paths already joined to `base_dir`)
    pub out_dir: PathBuf,
    /// Directory the manifest's relative paths resolve against
    pub base_dir: PathBuf,
    parts: Vec<Part>,
}

impl Manifest {
    /// Load a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let format = ManifestFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let manifest = Self::from_str_with_format(&content, format, &base_dir)?;
        tracing::info!(
            "Loaded manifest '{}' with {} parts from {:?}",
            manifest.name,
            manifest.parts.len(),
            path
        );
        Ok(manifest)
    }

    /// Parse and validate a manifest document
    pub fn from_str_with_format(
        content: &str,
        format: ManifestFormat,
        base_dir: &Path,
    ) -> Result<Self, ManifestError> {
        let data = format.parse(content)?;
        Self::from_data(data, base_dir)
    }

    /// Validate raw manifest data
    pub fn from_data(data: ManifestData, base_dir: &Path) -> Result<Self, ManifestError> {
        if data.parts.is_empty() {
            return Err(ManifestError::EmptyParts);
        }

        let mut seen = HashSet::new();
        let mut parts = Vec::with_capacity(data.parts.len());

        for (index, entry) in data.parts.into_iter().enumerate() {
            parts.push(build_part(index, entry, base_dir, &mut seen)?);
        }

        check_references(&parts)?;

        Ok(Self {
            name: data.name,
            units: data.units,
            out_dir: resolve_path(base_dir, &data.out_dir),
            base_dir: base_dir.to_path_buf(),
            parts,
        })
    }

    /// All parts in declaration order
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get a part by name
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }
}

fn build_part(
    index: usize,
    entry: PartEntry,
    base_dir: &Path,
    seen: &mut HashSet<String>,
) -> Result<Part, ManifestError> {
    if entry.name.trim().is_empty() {
        return Err(ManifestError::MissingField {
            index,
            field: "name",
        });
    }
    if entry.file.trim().is_empty() {
        return Err(ManifestError::MissingField {
            index,
            field: "file",
        });
    }
    if !seen.insert(entry.name.clone()) {
        return Err(ManifestError::DuplicatePart(entry.name));
    }
    if entry.mates.len() > 1 {
        return Err(ManifestError::MultipleMates {
            part: entry.name,
            count: entry.mates.len(),
        });
    }
    if !entry.xform.s.is_finite() || entry.xform.s <= 0.0 {
        return Err(ManifestError::InvalidScale {
            part: entry.name,
            scale: entry.xform.s,
        });
    }

    let mut anchors = BTreeMap::new();
    for (anchor_name, raw) in entry.anchors {
        let anchor = Anchor::new(raw.t, raw.axis).ok_or_else(|| ManifestError::ZeroAxis {
            part: entry.name.clone(),
            anchor: anchor_name.clone(),
        })?;
        anchors.insert(anchor_name, anchor);
    }

    let file = resolve_path(base_dir, Path::new(&entry.file));
    let mate = entry.mates.into_iter().next();

    Ok(Part {
        name: entry.name,
        format: MeshFormat::from_path(&file),
        file,
        anchors,
        placement: Placement::from_parts(entry.xform, mate),
        scad_defines: entry.scad.map(|s| s.defines).unwrap_or_default(),
    })
}

/// Join a relative path to the base directory
fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Manifest-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error reading {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Manifest must contain a non-empty 'parts' list")]
    EmptyParts,
    #[error("Part #{index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("Duplicate part name: {0}")]
    DuplicatePart(String),
    #[error("Part '{part}' declares {count} mates, at most one is supported")]
    MultipleMates { part: String, count: usize },
    #[error("Part '{part}' has invalid scale {scale}")]
    InvalidScale { part: String, scale: f64 },
    #[error("Part '{part}': anchor '{anchor}' has a zero-length axis")]
    ZeroAxis { part: String, anchor: String },
    #[error(transparent)]
    Structural(#[from] ResolveError),
}
