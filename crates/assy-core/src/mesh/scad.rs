//! OpenSCAD sources, compiled to STL through the OpenSCAD CLI

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::constants::OPENSCAD_ENV;

use super::{MeshError, Solid};

/// Value of a `-D name=value` parameter override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScadDefine {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ScadDefine {
    /// OpenSCAD expression for this value (strings are quoted)
    pub fn expression(&self) -> String {
        match self {
            ScadDefine::Bool(b) => b.to_string(),
            ScadDefine::Number(n) => n.to_string(),
            ScadDefine::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }
}

/// `-D` arguments for a set of defines, in name order
pub fn define_args(defines: &BTreeMap<String, ScadDefine>) -> Vec<String> {
    defines
        .iter()
        .flat_map(|(name, value)| ["-D".to_string(), format!("{name}={}", value.expression())])
        .collect()
}

/// Locate the OpenSCAD executable: `$OPENSCAD` first, then `PATH`
pub fn find_openscad() -> Option<PathBuf> {
    openscad_from(std::env::var_os(OPENSCAD_ENV))
}

fn openscad_from(env_override: Option<OsString>) -> Option<PathBuf> {
    match env_override.filter(|p| !p.is_empty()) {
        // Bare names go through PATH; anything else is used as given
        Some(exe) => which::which(&exe).ok().or_else(|| Some(PathBuf::from(exe))),
        None => which::which("openscad").ok(),
    }
}

/// Compile a `.scad` file to STL in `work_dir` and load the result
pub fn load_scad(
    path: &Path,
    defines: &BTreeMap<String, ScadDefine>,
    work_dir: &Path,
) -> Result<Solid, MeshError> {
    let openscad = find_openscad().ok_or_else(|| {
        MeshError::Tool(format!(
            "OpenSCAD CLI not found, needed to convert {path:?}. \
             Install OpenSCAD or set {OPENSCAD_ENV}"
        ))
    })?;
    compile_scad(&openscad, path, defines, work_dir)
}

fn compile_scad(
    openscad: &Path,
    path: &Path,
    defines: &BTreeMap<String, ScadDefine>,
    work_dir: &Path,
) -> Result<Solid, MeshError> {
    std::fs::create_dir_all(work_dir).map_err(|e| MeshError::Io(format!("{work_dir:?}: {e}")))?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("part");
    let out_stl = work_dir.join(format!("{stem}.scad.stl"));

    tracing::info!("Compiling {:?} with {:?}", path, openscad);
    let output = Command::new(openscad)
        .arg("-o")
        .arg(&out_stl)
        .args(define_args(defines))
        .arg(path)
        .output()
        .map_err(|e| MeshError::Tool(format!("failed to run {openscad:?}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MeshError::Tool(format!(
            "OpenSCAD failed on {path:?} ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    super::stl::load_stl(&out_stl)
}
