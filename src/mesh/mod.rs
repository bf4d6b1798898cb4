//! Core mesh data structures.
//!
//! This module provides the editable polygon mesh and the layers built
//! directly on top of it.
//!
//! # Overview
//!
//! The primary type is [`EditableMesh`], which stores vertices, edges,
//! faces, UV coordinates and materials in ordered collections keyed by
//! type-safe ids. Faces are arbitrary polygons (triangles, quads or n-gons)
//! described by a vertex ring and a parallel edge ring.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe id wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`EdgeId`] - Identifies an edge
//! - [`FaceId`] - Identifies a face
//! - [`UvId`] - Identifies a UV coordinate
//! - [`MaterialId`] - Identifies a material
//!
//! These ids are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size. Each mesh
//! draws them from its own [`IdAllocator`].
//!
//! # Construction
//!
//! Meshes are usually built through a [`PrimitiveBuilder`], which merges
//! repeated vertices and edges, or from face-vertex lists:
//!
//! ```
//! use polyedit::mesh::{build_from_quads, validate_mesh_topology, EditableMesh};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2, 3]];
//!
//! let mesh: EditableMesh = build_from_quads(&vertices, &faces).unwrap();
//! assert!(validate_mesh_topology(&mesh).is_valid);
//! ```

mod builder;
mod editable;
mod index;
pub mod topology;
mod validate;

pub use builder::{
    build_from_polygons, build_from_quads, build_from_triangles, position_key, DedupCache,
    PositionKey, PrimitiveBuilder, POSITION_DECIMALS,
};
pub use editable::{edge_key, Edge, EditableMesh, Face, FaceKind, Material, UvCoord, Vertex};
pub use index::{EdgeId, FaceId, IdAllocator, MaterialId, MeshIndex, UvId, VertexId};
pub use validate::{
    collect_issues, validate_mesh_topology, validate_mesh_topology_with, TopologyIssue,
    ValidateOptions, ValidationReport,
};
