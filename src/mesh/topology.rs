//! Stateless topology queries.
//!
//! Every function here scans the mesh's collections and recomputes its
//! answer on each call. Nothing is cached, so the results stay correct across
//! arbitrary edits as long as faces and edges reference existing vertices.
//!
//! For O(degree) lookups use the adjacency sets kept by the store instead
//! ([`Vertex::edges`](super::Vertex::edges), [`Edge::faces`](super::Edge::faces)).

use super::editable::EditableMesh;
use super::index::{EdgeId, FaceId, MeshIndex, VertexId};

/// All faces whose vertex ring contains `v`, in storage order.
pub fn connected_faces<I: MeshIndex>(mesh: &EditableMesh<I>, v: VertexId<I>) -> Vec<FaceId<I>> {
    mesh.faces()
        .filter(|f| f.vertex_ids.contains(&v))
        .map(|f| f.id)
        .collect()
}

/// All edges with `v` as an endpoint, in storage order.
pub fn connected_edges<I: MeshIndex>(mesh: &EditableMesh<I>, v: VertexId<I>) -> Vec<EdgeId<I>> {
    mesh.edges()
        .filter(|e| e.contains(v))
        .map(|e| e.id)
        .collect()
}

/// All faces whose edge ring contains `e`, in storage order.
pub fn edge_faces<I: MeshIndex>(mesh: &EditableMesh<I>, e: EdgeId<I>) -> Vec<FaceId<I>> {
    mesh.faces()
        .filter(|f| f.edge_ids.contains(&e))
        .map(|f| f.id)
        .collect()
}

/// Returns true if at most one face references `e`.
///
/// This covers both open-boundary edges and loose edges with no face.
pub fn is_boundary_edge<I: MeshIndex>(mesh: &EditableMesh<I>, e: EdgeId<I>) -> bool {
    mesh.faces().filter(|f| f.edge_ids.contains(&e)).take(2).count() <= 1
}

/// Returns true if any edge touching `v` is a boundary edge.
///
/// An isolated vertex has no edges and is not on a boundary.
pub fn is_boundary_vertex<I: MeshIndex>(mesh: &EditableMesh<I>, v: VertexId<I>) -> bool {
    connected_edges(mesh, v)
        .into_iter()
        .any(|e| is_boundary_edge(mesh, e))
}

/// All boundary edges of the mesh, in storage order.
pub fn boundary_edges<I: MeshIndex>(mesh: &EditableMesh<I>) -> Vec<EdgeId<I>> {
    mesh.edge_ids().filter(|&e| is_boundary_edge(mesh, e)).collect()
}

/// Returns true if the mesh has no boundary edges.
pub fn is_closed<I: MeshIndex>(mesh: &EditableMesh<I>) -> bool {
    mesh.edge_ids().all(|e| !is_boundary_edge(mesh, e))
}
