//! OBJ mesh file loading

use std::io::{BufRead, Cursor};
use std::path::Path;

use super::{MeshBuilder, MeshError, Solid};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Load an OBJ file, merging all models into one solid
pub fn load_obj(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let (models, _materials) = tobj::load_obj(path.as_ref(), &load_options())
        .map_err(|e| MeshError::Parse(e.to_string()))?;
    merge_models(&models)
}

/// Load an OBJ from bytes (materials are ignored)
pub fn load_obj_from_bytes(data: &[u8]) -> Result<Solid, MeshError> {
    load_obj_from_reader(&mut Cursor::new(data))
}

fn load_obj_from_reader(reader: &mut impl BufRead) -> Result<Solid, MeshError> {
    let (models, _materials) =
        tobj::load_obj_buf(reader, &load_options(), |_| Ok(Default::default()))
            .map_err(|e| MeshError::Parse(e.to_string()))?;
    merge_models(&models)
}

fn merge_models(models: &[tobj::Model]) -> Result<Solid, MeshError> {
    if models.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let mut builder = MeshBuilder::default();
    for model in models {
        let mesh = &model.mesh;
        let positions = mesh
            .positions
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]]);
        builder.append(positions, &mesh.indices);
    }
    builder.finish()
}
