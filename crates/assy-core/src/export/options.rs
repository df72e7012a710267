//! Output selection for assembly export

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_STEP_FILE;

/// Which files to write, and where
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output directory (created if missing)
    pub out_dir: PathBuf,
    /// STEP output path
    pub step: Option<PathBuf>,
    /// GLB output path
    pub glb: Option<PathBuf>,
    /// Merged STL output path
    pub stl: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            step: Some(PathBuf::from(DEFAULT_STEP_FILE)),
            glb: None,
            stl: None,
        }
    }
}

impl ExportOptions {
    /// Default outputs (STEP only) in `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_step(mut self, path: impl Into<PathBuf>) -> Self {
        self.step = Some(path.into());
        self
    }

    pub fn with_glb(mut self, path: impl Into<PathBuf>) -> Self {
        self.glb = Some(path.into());
        self
    }

    pub fn with_stl(mut self, path: impl Into<PathBuf>) -> Self {
        self.stl = Some(path.into());
        self
    }

    pub fn without_step(mut self) -> Self {
        self.step = None;
        self
    }

    /// Resolve an output path (relative paths land in `out_dir`)
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.out_dir.join(path)
        }
    }
}
