//! PLY mesh file loading (ASCII and binary)

use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::{MeshError, Solid};

/// Load a PLY file; polygon faces are fan-triangulated
pub fn load_ply(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| MeshError::Io(format!("{path:?}: {e}")))?;
    load_ply_from_reader(&mut BufReader::new(file))
}

/// Load a PLY from bytes
pub fn load_ply_from_bytes(data: &[u8]) -> Result<Solid, MeshError> {
    load_ply_from_reader(&mut Cursor::new(data))
}

fn load_ply_from_reader(reader: &mut impl BufRead) -> Result<Solid, MeshError> {
    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(reader)
        .map_err(|e| MeshError::Parse(format!("PLY header: {e}")))?;
    let payload = parser
        .read_payload(reader, &header)
        .map_err(|e| MeshError::Parse(format!("PLY payload: {e}")))?;

    let mut vertices = Vec::new();
    if let Some(elements) = payload.get("vertex") {
        vertices.reserve(elements.len());
        for element in elements {
            let coord = |key: &str| {
                float_property(element, key)
                    .ok_or_else(|| MeshError::Parse(format!("PLY vertex without '{key}'")))
            };
            vertices.push([coord("x")?, coord("y")?, coord("z")?]);
        }
    }

    let mut indices = Vec::new();
    if let Some(elements) = payload.get("face") {
        for element in elements {
            let face = index_list(element);
            for i in 1..face.len().saturating_sub(1) {
                indices.extend([face[0], face[i], face[i + 1]]);
            }
        }
    }

    Solid::new(vertices, indices)
}

fn float_property(element: &DefaultElement, key: &str) -> Option<f32> {
    match element.get(key)? {
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        _ => None,
    }
}

fn index_list(element: &DefaultElement) -> Vec<u32> {
    ["vertex_indices", "vertex_index"]
        .iter()
        .find_map(|key| match element.get(*key)? {
            Property::ListInt(v) => Some(v.iter().map(|&i| i as u32).collect()),
            Property::ListUInt(v) => Some(v.clone()),
            Property::ListUChar(v) => Some(v.iter().map(|&i| u32::from(i)).collect()),
            Property::ListUShort(v) => Some(v.iter().map(|&i| u32::from(i)).collect()),
            Property::ListShort(v) => Some(v.iter().map(|&i| i as u32).collect()),
            _ => None,
        })
        .unwrap_or_default()
}
