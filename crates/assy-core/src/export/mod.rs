//! Combined assembly output (STEP, GLB, STL)
//!
//! Every requested file is encoded in memory first; nothing is written until all
//! encoders have succeeded. Files are staged as `<name>.partial` and renamed into
//! place once all of them are on disk. Output lengths are millimetres.

mod glb;
mod options;
#[cfg(feature = "step")]
mod step;
mod stl;

use std::path::{Path, PathBuf};

use glam::DVec3;

use crate::assembly::PlacedPart;
use crate::resolve::WorldTransform;

pub use glb::encode_glb;
pub use options::ExportOptions;
pub use stl::encode_stl;

/// Output file kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Step,
    Glb,
    Stl,
}

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Step => "STEP",
            ExportFormat::Glb => "GLB",
            ExportFormat::Stl => "STL",
        }
    }
}

/// Files written by one export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub written: Vec<(ExportFormat, PathBuf)>,
}

impl ExportReport {
    /// Path written for a format, if any
    pub fn path(&self, format: ExportFormat) -> Option<&PathBuf> {
        self.written
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, p)| p)
    }
}

/// Encode a STEP document (one faceted shell holding every part)
#[cfg(feature = "step")]
pub fn encode_step(
    parts: &[PlacedPart],
    mm_per_unit: f64,
    name: &str,
) -> Result<String, ExportError> {
    step::encode_step(parts, mm_per_unit, name)
}

#[cfg(not(feature = "step"))]
pub fn encode_step(
    _parts: &[PlacedPart],
    _mm_per_unit: f64,
    _name: &str,
) -> Result<String, ExportError> {
    Err(ExportError::Unsupported(
        "STEP export requires the 'step' feature to be enabled".into(),
    ))
}

/// Encode every requested output, then write them all
pub fn export_assembly(
    parts: &[PlacedPart],
    mm_per_unit: f64,
    name: &str,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    if parts.is_empty() {
        return Err(ExportError::EmptyAssembly);
    }

    let mut encoded: Vec<(ExportFormat, PathBuf, Vec<u8>)> = Vec::new();
    if let Some(path) = &options.step {
        let data = encode_step(parts, mm_per_unit, name)?;
        encoded.push((ExportFormat::Step, options.resolve(path), data.into_bytes()));
    }
    if let Some(path) = &options.glb {
        let data = encode_glb(parts, mm_per_unit, name)?;
        encoded.push((ExportFormat::Glb, options.resolve(path), data));
    }
    if let Some(path) = &options.stl {
        let data = encode_stl(parts, mm_per_unit)?;
        encoded.push((ExportFormat::Stl, options.resolve(path), data));
    }

    // Stage every file next to its target; nothing is renamed until all are staged
    let mut staged: Vec<(ExportFormat, PathBuf, PathBuf, usize)> = Vec::new();
    for (format, path, data) in encoded {
        match stage_output(&path, &data) {
            Ok(partial) => staged.push((format, path, partial, data.len())),
            Err(e) => {
                discard_staged(staged.iter().map(|(_, _, partial, _)| partial));
                return Err(e);
            }
        }
    }

    let mut report = ExportReport::default();
    let mut pending = staged.into_iter();
    while let Some((format, path, partial, len)) = pending.next() {
        if let Err(e) = std::fs::rename(&partial, &path) {
            let _ = std::fs::remove_file(&partial);
            discard_staged(pending.map(|(_, _, partial, _)| partial));
            return Err(ExportError::Io {
                path,
                reason: e.to_string(),
            });
        }
        tracing::info!("Wrote {}: {:?} ({} bytes)", format.name(), path, len);
        report.written.push((format, path));
    }

    Ok(report)
}

/// Write `data` to `<path>.partial`, creating parent directories
fn stage_output(path: &Path, data: &[u8]) -> Result<PathBuf, ExportError> {
    let io_err = |path: &Path, reason: String| ExportError::Io {
        path: path.to_path_buf(),
        reason,
    };

    if path.is_dir() {
        return Err(io_err(path, "is a directory".into()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e.to_string()))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);
    std::fs::write(&partial, data).map_err(|e| io_err(&partial, e.to_string()))?;
    Ok(partial)
}

fn discard_staged<P: AsRef<Path>>(partials: impl IntoIterator<Item = P>) {
    for partial in partials {
        let partial = partial.as_ref();
        if let Err(e) = std::fs::remove_file(partial) {
            tracing::warn!("Failed to remove {:?}: {}", partial, e);
        }
    }
}

/// World-space vertices of a part, in millimetres
pub(crate) fn world_vertices(part: &PlacedPart, mm_per_unit: f64) -> Vec<DVec3> {
    let transform: WorldTransform = part.transform.in_units(mm_per_unit);
    part.solid
        .vertices
        .iter()
        .map(|v| transform.transform_point(DVec3::from_array(v.map(f64::from))))
        .collect()
}

/// Export-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("IO error writing {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("Nothing to export: assembly has no parts")]
    EmptyAssembly,
    #[error("{format} encoding failed: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },
    #[error("Unsupported output: {0}")]
    Unsupported(String),
}
