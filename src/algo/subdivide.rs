//! Edge subdivision.
//!
//! [`subdivide_edge`] splits an edge at its midpoint and rebuilds every face
//! that used it so the new vertex sits between the edge's endpoints in each
//! face ring:
//!
//! - a triangle becomes a quad;
//! - a larger face is fanned into triangles from its first vertex.
//!
//! The original edge is replaced by its two halves. Materials and names
//! carry over to the rebuilt faces, and a face with UVs gets an
//! interpolated UV for the new corner.
//!
//! # Example
//!
//! ```
//! use polyedit::prelude::*;
//! use polyedit::algo::subdivide_edge;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 2.0, 0.0),
//! ];
//! let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
//! let [a, b] = [VertexId::new(0), VertexId::new(1)];
//! let edge = mesh.find_edge(a, b).unwrap();
//!
//! let mid = subdivide_edge(&mut mesh, edge).unwrap();
//! assert_eq!(mesh.position(mid), Some(Point3::new(1.0, 0.0, 0.0)));
//! assert!(mesh.is_quad_mesh());
//! ```

use nalgebra::Point3;
use tracing::{debug, trace};

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{EdgeId, EditableMesh, Face, MeshIndex, PrimitiveBuilder, VertexId};

use super::triangulate::fan;
use super::{add_face_like, lerp_uv, skipped_error, Batch, Progress};

/// Split `edge` at its midpoint and return the new vertex.
///
/// Fails with `NotFound` if the edge does not exist and with
/// `ReferenceError` if one of its endpoints is gone.
pub fn subdivide_edge<I: MeshIndex>(mesh: &mut EditableMesh<I>, edge: EdgeId<I>) -> Result<VertexId<I>> {
    let e = mesh.require_edge(edge)?.clone();
    let [a, b] = e.vertices;
    let pa = mesh
        .position(a)
        .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, a.index()))?;
    let pb = mesh
        .position(b)
        .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, b.index()))?;
    let faces: Vec<Face<I>> = e.faces().iter().filter_map(|&f| mesh.face(f).cloned()).collect();

    let mut builder = PrimitiveBuilder::for_edit(mesh);
    let mid = builder.add_vertex(Point3::from((pa.coords + pb.coords) * 0.5))?;

    for face in &faces {
        builder.mesh_mut().remove_face(face.id)?;
    }
    builder.mesh_mut().remove_edge(edge)?;
    builder.add_edge(a, mid)?;
    builder.add_edge(mid, b)?;

    for face in &faces {
        let Some(i) = face.edge_ids.iter().position(|&x| x == edge) else {
            continue;
        };
        let n = face.len();

        let mut ring = face.vertex_ids.clone();
        ring.insert(i + 1, mid);

        let uvs = face.uvs.as_ref().and_then(|list| {
            let uv = lerp_uv(builder.mesh_mut(), *list.get(i)?, *list.get((i + 1) % n)?, 0.5, mid)?;
            let mut list = list.clone();
            list.insert(i + 1, uv);
            Some(list)
        });

        if ring.len() <= 4 {
            add_face_like(&mut builder, &ring, face, uvs)?;
        } else {
            for [x, y, z] in fan(ring.len()) {
                let corner_uvs = uvs.as_ref().map(|l| vec![l[x], l[y], l[z]]);
                add_face_like(&mut builder, &[ring[x], ring[y], ring[z]], face, corner_uvs)?;
            }
        }
    }

    trace!(edge = %edge, vertex = %mid, faces = faces.len(), "subdivided edge");
    Ok(mid)
}

/// Subdivide every edge in `edges`.
///
/// Edges that cannot be split (including ids made stale by an earlier item
/// of the same batch) are skipped.
pub fn subdivide_edges<I: MeshIndex>(mesh: &mut EditableMesh<I>, edges: &[EdgeId<I>]) -> Batch<VertexId<I>> {
    subdivide_edges_with_progress(mesh, edges, &Progress::none())
}

/// Subdivide edges with progress reporting.
pub fn subdivide_edges_with_progress<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    edges: &[EdgeId<I>],
    progress: &Progress,
) -> Batch<VertexId<I>> {
    let mut batch = Batch::default();
    let total = edges.len();

    for (k, &edge) in edges.iter().enumerate() {
        progress.report(k, total, "Subdividing edges");
        match subdivide_edge(mesh, edge) {
            Ok(v) => batch.items.push(v),
            Err(err) => batch
                .skipped
                .push(skipped_error(ElementKind::Edge, edge.index(), &err)),
        }
    }
    progress.report(total, total, "Subdivision complete");

    debug!(
        subdivided = batch.items.len(),
        skipped = batch.skipped.len(),
        "subdivide_edges"
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::test_meshes::quad_grid;
    use crate::mesh::{build_from_triangles, validate_mesh_topology, FaceId, UvId};
    use nalgebra::Point2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn triangle() -> EditableMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap()
    }

    #[test]
    fn test_midpoint_vertex() {
        let mut mesh = triangle();
        let a = VertexId::new(0);
        let b = VertexId::new(1);
        let edge = mesh.find_edge(a, b).unwrap();

        let mid = subdivide_edge(&mut mesh, edge).unwrap();
        assert_eq!(mesh.position(mid), Some(Point3::new(1.0, 0.0, 0.0)));

        // The triangle became a quad with the new vertex between a and b
        let face = mesh.faces().next().unwrap();
        assert_eq!(face.vertex_ids, vec![a, mid, b, VertexId::new(2)]);

        // The edge was replaced by its halves
        assert!(mesh.find_edge(a, b).is_none());
        assert!(mesh.find_edge(a, mid).is_some());
        assert!(mesh.find_edge(mid, b).is_some());
        assert_eq!(mesh.num_edges(), 4);
        assert!(validate_mesh_topology(&mesh).is_valid);
    }

    #[test]
    fn test_midpoint_of_coincident_endpoints_is_new() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let (a, b) = (VertexId::new(0), VertexId::new(1));
        let edge = mesh.find_edge(a, b).unwrap();

        // The midpoint lands on both endpoints but is never welded to them
        let mid = subdivide_edge(&mut mesh, edge).unwrap();
        assert_ne!(mid, a);
        assert_ne!(mid, b);
        assert_eq!(mesh.num_vertices(), 4);
        let face = mesh.faces().next().unwrap();
        assert_eq!(face.vertex_ids, vec![a, mid, b, VertexId::new(2)]);
    }

    #[test]
    fn test_wrap_edge_inserts_at_end() {
        let mut mesh = triangle();
        let c = VertexId::new(2);
        let a = VertexId::new(0);
        let edge = mesh.find_edge(c, a).unwrap();

        let mid = subdivide_edge(&mut mesh, edge).unwrap();
        let face = mesh.faces().next().unwrap();
        assert_eq!(face.vertex_ids, vec![a, VertexId::new(1), c, mid]);
        assert!(validate_mesh_topology(&mesh).is_valid);
    }

    #[test]
    fn test_shared_edge_fans_both_quads() {
        let mut mesh = quad_grid(2, 1);
        // Vertices 1 and 4 form the edge shared by both quads
        let edge = mesh.find_edge(VertexId::new(1), VertexId::new(4)).unwrap();
        subdivide_edge(&mut mesh, edge).unwrap();

        // Each quad gained a vertex and was fanned into three triangles
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.is_triangle_mesh());
        assert!((mesh.surface_area() - 2.0).abs() < 1e-10);

        let report = validate_mesh_topology(&mesh);
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_missing_edge() {
        let mut mesh = triangle();
        let err = subdivide_edge(&mut mesh, EdgeId::new(99)).unwrap_err();
        assert!(matches!(err, MeshError::NotFound { kind: ElementKind::Edge, id: 99 }));
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn test_material_and_uvs_carry_over() {
        let mut mesh = triangle();
        let f: FaceId = mesh.face_ids().next().unwrap();
        let m = mesh.add_material("red").unwrap();
        mesh.set_face_material(f, Some(m)).unwrap();
        let coords = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let uvs: Vec<UvId> = coords
            .iter()
            .enumerate()
            .map(|(i, &(u, v))| mesh.add_uv(VertexId::new(i), Point2::new(u, v)).unwrap())
            .collect();
        mesh.set_face_uvs(f, Some(uvs)).unwrap();

        let edge = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        let mid = subdivide_edge(&mut mesh, edge).unwrap();

        let face = mesh.faces().next().unwrap();
        assert_eq!(face.material, Some(m));
        let new_uv = mesh.uv(face.uv_at(1).unwrap()).unwrap();
        assert_eq!(new_uv.vertex, mid);
        assert!((new_uv.coord - Point2::new(0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_batch_skips_stale_ids() {
        let mut mesh = quad_grid(1, 1);
        let edges: Vec<EdgeId> = mesh.edge_ids().take(2).collect();
        let selection = vec![edges[0], EdgeId::new(500), edges[1], edges[0]];

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let progress = Progress::new(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let batch = subdivide_edges_with_progress(&mut mesh, &selection, &progress);

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].id, 500);
        assert_eq!(calls.load(Ordering::SeqCst), selection.len() + 1);
        assert!(validate_mesh_topology(&mesh).is_valid);
    }

    #[test]
    fn test_empty_selection() {
        let mut mesh = triangle();
        let batch = subdivide_edges(&mut mesh, &[]);
        assert!(batch.items.is_empty());
        assert!(batch.skipped.is_empty());
        assert_eq!(mesh.num_faces(), 1);
    }
}
