//! Global constants for assy-core

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Assembly name used when the manifest omits one
pub const DEFAULT_ASSEMBLY_NAME: &str = "assembly";

/// Output directory used when the manifest omits one (relative to the manifest)
pub const DEFAULT_OUT_DIR: &str = "build";

/// Default STEP output file name
pub const DEFAULT_STEP_FILE: &str = "assembly.step";

/// Anchor axis used when the manifest omits one
pub const DEFAULT_ANCHOR_AXIS: [f64; 3] = [0.0, 0.0, 1.0];

/// Environment variable overriding the OpenSCAD binary location
pub const OPENSCAD_ENV: &str = "OPENSCAD";

/// STEP tessellation tolerance as a fraction of the shell's bounding diagonal
pub const STEP_TESSELLATION_FRACTION: f64 = 0.001;
