//! Bridging two edge loops with quads.

use tracing::{debug, trace};

use crate::error::Result;
use crate::mesh::{EdgeId, EditableMesh, FaceId, MeshIndex, PrimitiveBuilder, VertexId};

use super::unique;

/// Result of [`bridge_edges`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeResult<I: MeshIndex = u32> {
    /// Faces created between the loops, in creation order.
    pub new_faces: Vec<FaceId<I>>,
}

/// Connect two edge loops with a band of faces.
///
/// Each loop is reduced to its vertices in the order the edges first mention
/// them. Quads `(a[i], a[i+1], b[i+1], b[i])` are created for
/// `i < min(len_a, len_b) - 1`; when both loops are closed cycles of the
/// same length the band is closed with `(a[n-1], a[0], b[0], b[n-1])`.
/// A quad whose corners coincide degrades to a triangle, or is dropped if
/// fewer than three distinct corners remain.
///
/// Fails with `NotFound` if any edge is missing; nothing is created then.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::bridge_edges;
/// use nalgebra::Point3;
///
/// let mut mesh: EditableMesh = EditableMesh::new();
/// let a: Vec<VertexId> = (0..3).map(|i| mesh.add_vertex(Point3::new(i as f64, 0.0, 0.0)).unwrap()).collect();
/// let b: Vec<VertexId> = (0..3).map(|i| mesh.add_vertex(Point3::new(i as f64, 1.0, 0.0)).unwrap()).collect();
/// let loop_a = vec![mesh.add_edge(a[0], a[1]).unwrap(), mesh.add_edge(a[1], a[2]).unwrap()];
/// let loop_b = vec![mesh.add_edge(b[0], b[1]).unwrap(), mesh.add_edge(b[1], b[2]).unwrap()];
///
/// let result = bridge_edges(&mut mesh, &loop_a, &loop_b).unwrap();
/// assert_eq!(result.new_faces.len(), 2);
/// ```
pub fn bridge_edges<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    loop_a: &[EdgeId<I>],
    loop_b: &[EdgeId<I>],
) -> Result<BridgeResult<I>> {
    let (a, closed_a) = loop_vertices(mesh, loop_a)?;
    let (b, closed_b) = loop_vertices(mesh, loop_b)?;

    let mut result = BridgeResult {
        new_faces: Vec::new(),
    };
    let n = a.len().min(b.len());
    if n < 2 {
        return Ok(result);
    }

    let mut quads: Vec<[VertexId<I>; 4]> = (0..n - 1).map(|i| [a[i], a[i + 1], b[i + 1], b[i]]).collect();
    if closed_a && closed_b && a.len() == b.len() {
        quads.push([a[n - 1], a[0], b[0], b[n - 1]]);
    }

    let mut builder = PrimitiveBuilder::for_edit(mesh);
    for quad in quads {
        let ring = distinct_corners(&quad);
        if ring.len() < 3 {
            trace!(?quad, "dropping collapsed bridge quad");
            continue;
        }
        result.new_faces.push(builder.add_ngon(&ring)?);
    }

    debug!(
        len_a = a.len(),
        len_b = b.len(),
        faces = result.new_faces.len(),
        "bridge_edges"
    );
    Ok(result)
}

/// Vertices of a loop in edge-encounter order, and whether the edges form a
/// closed cycle.
fn loop_vertices<I: MeshIndex>(mesh: &EditableMesh<I>, edges: &[EdgeId<I>]) -> Result<(Vec<VertexId<I>>, bool)> {
    let mut vertices = Vec::with_capacity(edges.len() + 1);
    for &e in edges {
        vertices.extend(mesh.require_edge(e)?.vertices);
    }
    let vertices = unique(&vertices);
    let edge_count = unique(edges).len();
    let closed = vertices.len() >= 3 && edge_count == vertices.len();
    Ok((vertices, closed))
}

/// Drop corners that repeat their predecessor, wrapping around.
fn distinct_corners<I: MeshIndex>(quad: &[VertexId<I>; 4]) -> Vec<VertexId<I>> {
    let mut ring: Vec<VertexId<I>> = Vec::with_capacity(4);
    for &v in quad {
        if ring.last() != Some(&v) {
            ring.push(v);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}
