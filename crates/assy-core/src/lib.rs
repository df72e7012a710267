//! Assembly composition core
//!
//! This crate turns a declarative part manifest into a placed assembly:
//! - Manifest: parts, local transforms, anchors and mates
//! - Resolve: anchor-mate placement solving over the part dependency graph
//! - Mesh: geometry loading (STL, OBJ, glTF, STEP, OpenSCAD)
//! - Export: combined STEP / GLB / STL output

pub mod assembly;
pub mod constants;
pub mod export;
pub mod manifest;
pub mod mesh;
pub mod part;
pub mod resolve;

pub use assembly::*;
pub use constants::*;
pub use export::*;
pub use manifest::*;
pub use mesh::*;
pub use part::*;
pub use resolve::*;
