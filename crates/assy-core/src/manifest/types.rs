//! Raw manifest document as written by the user (before validation)

use std::collections::BTreeMap;
use std::path::PathBuf;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ANCHOR_AXIS, DEFAULT_ASSEMBLY_NAME, DEFAULT_OUT_DIR};
use crate::mesh::ScadDefine;
use crate::part::{Mate, Transform};

use super::units::Units;

/// Top-level manifest document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestData {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default)]
    pub parts: Vec<PartEntry>,
}

/// One entry of the `parts` list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub xform: Transform,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub anchors: BTreeMap<String, AnchorEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mates: Vec<Mate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scad: Option<ScadEntry>,
}

/// Anchor as written in the manifest (axis not yet normalized)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnchorEntry {
    #[serde(default)]
    pub t: DVec3,
    #[serde(default = "default_axis")]
    pub axis: DVec3,
}

/// OpenSCAD options of a part
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScadEntry {
    #[serde(default)]
    pub defines: BTreeMap<String, ScadDefine>,
}

fn default_name() -> String {
    DEFAULT_ASSEMBLY_NAME.to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

fn default_axis() -> DVec3 {
    DVec3::from_array(DEFAULT_ANCHOR_AXIS)
}
