//! # polyedit
//!
//! An editable polygon mesh kernel for interactive modeling tools.
//!
//! polyedit stores meshes as explicit vertex, edge and face collections
//! (faces may be triangles, quads or n-gons) and provides the editing
//! operators a modeler needs on top of them.
//!
//! ## Features
//!
//! - **Editable store**: ordered, id-keyed collections with O(1) lookup and
//!   incremental adjacency
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit ids
//! - **Deduplicating builder**: shared vertices and edges are created once
//! - **Primitives**: plane, grid, cube, Platonic solids, cylinder, UV sphere
//! - **Operators**: extrude, subdivide, merge, triangulate, quadrangulate,
//!   dissolve, bevel, bridge, loop cut
//! - **Validation**: topology diagnostics after any edit
//!
//! ## Quick Start
//!
//! ```
//! use polyedit::prelude::*;
//! use polyedit::algo::{extrude_faces, triangulate_faces};
//!
//! let mut mesh: EditableMesh = polyedit::primitives::cube(2.0).unwrap();
//! assert_eq!(mesh.num_faces(), 6);
//!
//! // Pull one face outwards, then triangulate everything
//! let top = mesh.face_ids().next().unwrap();
//! extrude_faces(&mut mesh, &[top], 1.0).unwrap();
//!
//! let faces: Vec<FaceId> = mesh.face_ids().collect();
//! triangulate_faces(&mut mesh, &faces);
//! assert!(mesh.is_triangle_mesh());
//!
//! let report = validate_mesh_topology(&mesh);
//! assert!(report.is_valid);
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use polyedit::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh: EditableMesh = EditableMesh::new();
//! let mut builder = PrimitiveBuilder::new(&mut mesh);
//!
//! let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
//! let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
//! let c = builder.add_vertex(Point3::new(1.0, 1.0, 0.0)).unwrap();
//! let d = builder.add_vertex(Point3::new(0.0, 1.0, 0.0)).unwrap();
//! // Asking again for the same position returns the same vertex
//! assert_eq!(builder.add_vertex(Point3::new(1.0, 1.0, 0.0)).unwrap(), c);
//!
//! builder.add_quad([a, b, c, d]).unwrap();
//! assert_eq!(mesh.num_edges(), 4);
//! ```
//!
//! ## Topology Queries
//!
//! ```
//! use polyedit::prelude::*;
//! use polyedit::mesh::topology;
//!
//! let mesh: EditableMesh = polyedit::primitives::grid(2.0, 2.0, 2, 2).unwrap();
//! let v = mesh.vertex_ids().next().unwrap();
//!
//! assert_eq!(topology::connected_faces(&mesh, v).len(), 1);
//! assert!(topology::is_boundary_vertex(&mesh, v));
//! assert_eq!(topology::boundary_edges(&mesh).len(), 8);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;
pub mod primitives;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use polyedit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{MeshDelta, Skipped};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, validate_mesh_topology, Edge,
        EdgeId, EditableMesh, Face, FaceId, FaceKind, MaterialId, MeshIndex, PrimitiveBuilder, UvId,
        Vertex, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::algo::{
        bevel_edges, dissolve_edges, dissolve_faces, extrude_faces, loop_cut,
        merge_vertices, quadrangulate_faces, subdivide_edges, triangulate_faces, BevelOptions,
        LoopCutOptions,
    };
    use crate::mesh::{collect_issues, topology, ValidateOptions};
    use crate::primitives;
    use nalgebra::Point3;

    fn assert_sound(mesh: &EditableMesh, step: &str) {
        let issues = collect_issues(mesh, &ValidateOptions::default().sequential());
        assert!(issues.is_empty(), "after {}: {:?}", step, issues);
    }

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh: EditableMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert!(validate_mesh_topology(&mesh).is_valid);

        // Closed mesh: no boundary vertices
        for v in mesh.vertex_ids() {
            assert!(
                !topology::is_boundary_vertex(&mesh, v),
                "vertex {:?} should not be on boundary",
                v
            );
        }
    }

    #[test]
    fn test_editing_session_stays_sound() {
        let mut mesh: EditableMesh = primitives::cube(2.0).unwrap();
        assert_sound(&mesh, "cube");

        let faces: Vec<FaceId> = mesh.face_ids().take(2).collect();
        extrude_faces(&mut mesh, &faces, 0.5).unwrap();
        assert_sound(&mesh, "extrude");

        let edges: Vec<EdgeId> = mesh.edge_ids().step_by(5).collect();
        subdivide_edges(&mut mesh, &edges);
        assert_sound(&mesh, "subdivide");

        let ngons: Vec<FaceId> = mesh.faces().filter(|f| f.len() > 4).map(|f| f.id).collect();
        quadrangulate_faces(&mut mesh, &ngons);
        assert_sound(&mesh, "quadrangulate");

        let some: Vec<FaceId> = mesh.face_ids().take(4).collect();
        triangulate_faces(&mut mesh, &some);
        assert_sound(&mesh, "triangulate");

        let interior: Vec<EdgeId> = mesh
            .edges()
            .filter(|e| e.faces().len() == 2)
            .map(|e| e.id)
            .take(3)
            .collect();
        dissolve_edges(&mut mesh, &interior);
        assert_sound(&mesh, "dissolve edges");

        let edge = mesh.edge_ids().next().unwrap();
        bevel_edges(&mut mesh, &[edge], &BevelOptions::new(0.1)).unwrap();
        assert_sound(&mesh, "bevel");

        merge_vertices(&mut mesh, 1e-4).unwrap();
        assert_sound(&mesh, "merge");
    }

    #[test]
    fn test_grid_workflow() {
        let mut mesh: EditableMesh = primitives::grid(4.0, 4.0, 4, 4).unwrap();

        let rung = mesh
            .edge_ids()
            .find(|&e| topology::edge_faces(&mesh, e).len() == 2)
            .unwrap();
        loop_cut(&mut mesh, rung, &LoopCutOptions::default()).unwrap();
        assert_sound(&mesh, "loop cut");
        assert!(mesh.is_quad_mesh());

        let patch: Vec<FaceId> = mesh.face_ids().take(2).collect();
        dissolve_faces(&mut mesh, &patch);
        assert_sound(&mesh, "dissolve faces");
        // The cut split one border edge at each end of the ring
        assert_eq!(topology::boundary_edges(&mesh).len(), 18);
    }
}
