//! STL mesh file loading

use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use super::{MeshError, Solid};

/// Load an STL file (ASCII or binary)
pub fn load_stl(path: impl AsRef<Path>) -> Result<Solid, MeshError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| MeshError::Io(format!("{path:?}: {e}")))?;
    load_stl_from_reader(&mut BufReader::new(file))
}

/// Load an STL from bytes
pub fn load_stl_from_bytes(data: &[u8]) -> Result<Solid, MeshError> {
    load_stl_from_reader(&mut Cursor::new(data))
}

fn load_stl_from_reader(reader: &mut (impl Read + Seek)) -> Result<Solid, MeshError> {
    let mesh = stl_io::read_stl(reader).map_err(|e| MeshError::Parse(e.to_string()))?;

    // stl_io already merges identical vertices
    let vertices: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| [v[0], v[1], v[2]]).collect();
    let indices: Vec<u32> = mesh
        .faces
        .iter()
        .flat_map(|face| face.vertices.map(|i| i as u32))
        .collect();

    Solid::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "solid tetra
facet normal 0 0 -1
  outer loop
    vertex 0 0 0
    vertex 0 1 0
    vertex 1 0 0
  endloop
endfacet
facet normal 0 -1 0
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 0 1
  endloop
endfacet
facet normal -1 0 0
  outer loop
    vertex 0 0 0
    vertex 0 0 1
    vertex 0 1 0
  endloop
endfacet
facet normal 1 1 1
  outer loop
    vertex 1 0 0
    vertex 0 1 0
    vertex 0 0 1
  endloop
endfacet
endsolid tetra
";

    #[test]
    fn test_load_ascii_stl() {
        let solid = load_stl_from_bytes(TETRA.as_bytes()).unwrap();
        assert_eq!(solid.triangle_count(), 4);
        assert_eq!(solid.vertices.len(), 4);
        assert_eq!(solid.bbox_min, [0.0, 0.0, 0.0]);
        assert_eq!(solid.bbox_max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_load_binary_stl_file() {
        let triangle = stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
            vertices: [
                stl_io::Vertex::new([0.0, 0.0, 0.0]),
                stl_io::Vertex::new([2.0, 0.0, 0.0]),
                stl_io::Vertex::new([0.0, 2.0, 0.0]),
            ],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        let mut file = std::fs::File::create(&path).unwrap();
        stl_io::write_stl(&mut file, [triangle].iter()).unwrap();
        drop(file);

        let solid = load_stl(&path).unwrap();
        assert_eq!(solid.triangle_count(), 1);
        assert_eq!(solid.bbox_max, [2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(load_stl_from_bytes(b"not an stl").is_err());
    }
}
