//! Binary glTF output: one node per part, geometry in part-local units,
//! placement carried by the node matrix (millimetres)

use std::borrow::Cow;
use std::collections::BTreeMap;

use gltf::json;
use json::validation::Checked::Valid;
use json::validation::USize64;

use crate::assembly::PlacedPart;

use super::ExportError;

const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_HEADER_LEN: usize = 8;

fn encode_error(reason: impl ToString) -> ExportError {
    ExportError::Encode {
        format: "GLB",
        reason: reason.to_string(),
    }
}

fn padded(len: usize) -> usize {
    len.div_ceil(4) * 4
}

/// Byte ranges of one part inside the shared binary chunk
struct PartLayout {
    positions: (usize, usize),
    indices: (usize, usize),
}

/// Encode a GLB document
pub fn encode_glb(
    parts: &[PlacedPart],
    mm_per_unit: f64,
    name: &str,
) -> Result<Vec<u8>, ExportError> {
    // Binary chunk: positions then indices for each part, all 4-byte aligned
    let mut bin: Vec<u8> = Vec::new();
    let mut layouts = Vec::with_capacity(parts.len());
    for part in parts {
        let start = bin.len();
        for v in &part.solid.vertices {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        let positions = (start, bin.len() - start);

        let start = bin.len();
        for i in &part.solid.indices {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        let indices = (start, bin.len() - start);

        layouts.push(PartLayout { positions, indices });
    }

    let mut root = json::Root::default();
    root.asset.generator = Some(format!("assy-core {}", env!("CARGO_PKG_VERSION")));

    let buffer = root.push(json::Buffer {
        byte_length: USize64::from(bin.len()),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    });

    let mut nodes = Vec::with_capacity(parts.len());
    for (part, layout) in parts.iter().zip(&layouts) {
        let position_view = root.push(json::buffer::View {
            buffer,
            byte_length: USize64::from(layout.positions.1),
            byte_offset: Some(USize64::from(layout.positions.0)),
            byte_stride: Some(json::buffer::Stride(12)),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(json::buffer::Target::ArrayBuffer)),
        });
        let index_view = root.push(json::buffer::View {
            buffer,
            byte_length: USize64::from(layout.indices.1),
            byte_offset: Some(USize64::from(layout.indices.0)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(json::buffer::Target::ElementArrayBuffer)),
        });

        let positions = root.push(json::Accessor {
            buffer_view: Some(position_view),
            byte_offset: Some(USize64(0)),
            count: USize64::from(part.solid.vertices.len()),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(json::Value::from(part.solid.bbox_min.to_vec())),
            max: Some(json::Value::from(part.solid.bbox_max.to_vec())),
            name: None,
            normalized: false,
            sparse: None,
        });
        let indices = root.push(json::Accessor {
            buffer_view: Some(index_view),
            byte_offset: Some(USize64(0)),
            count: USize64::from(part.solid.indices.len()),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::U32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Scalar),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
        });

        let primitive = json::mesh::Primitive {
            attributes: BTreeMap::from([(Valid(json::mesh::Semantic::Positions), positions)]),
            extensions: Default::default(),
            extras: Default::default(),
            indices: Some(indices),
            material: None,
            mode: Valid(json::mesh::Mode::Triangles),
            targets: None,
        };
        let mesh = root.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(part.name.clone()),
            primitives: vec![primitive],
            weights: None,
        });

        let matrix = part.transform.in_units(mm_per_unit).to_mat4().as_mat4();
        nodes.push(root.push(json::Node {
            mesh: Some(mesh),
            name: Some(part.name.clone()),
            matrix: Some(matrix.to_cols_array()),
            ..Default::default()
        }));
    }

    let scene = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name.to_string()),
        nodes,
    });
    root.scene = Some(scene);

    let json_bytes = json::serialize::to_vec(&root).map_err(encode_error)?;
    let total = GLB_HEADER_LEN
        + GLB_CHUNK_HEADER_LEN
        + padded(json_bytes.len())
        + GLB_CHUNK_HEADER_LEN
        + padded(bin.len());
    let length = u32::try_from(total).map_err(|_| encode_error("GLB exceeds 4 GiB"))?;

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length,
        },
        bin: Some(Cow::Owned(bin)),
        json: Cow::Owned(json_bytes),
    };
    glb.to_vec().map_err(encode_error)
}
