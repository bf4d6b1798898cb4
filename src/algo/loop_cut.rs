//! Loop cut through a ring of quads.
//!
//! Starting from one edge, the cut walks across quads from each edge to the
//! opposite one, in both directions, until the ring closes on itself or
//! reaches a boundary edge. Every ring edge gets a cut vertex and every quad
//! on the ring is split in two along the line joining its cut vertices.
//!
//! The direction of each ring edge is propagated from the starting edge, so
//! a `factor` other than 0.5 places all cut vertices on the same side of the
//! loop.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{EdgeId, EditableMesh, Face, FaceId, MeshIndex, PrimitiveBuilder, VertexId};

use super::{add_face_like, all_uvs, lerp_uv, MeshDelta, Watermark};

/// Options for [`loop_cut`].
#[derive(Debug, Clone)]
pub struct LoopCutOptions {
    /// Where the cut crosses each ring edge, as a fraction from the edge's
    /// propagated start (default: 0.5).
    pub factor: f64,
}

impl Default for LoopCutOptions {
    fn default() -> Self {
        Self { factor: 0.5 }
    }
}

impl LoopCutOptions {
    /// Set the cut position along each ring edge.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }
}

/// A directed ring edge.
#[derive(Debug, Clone, Copy)]
struct RingEdge<I: MeshIndex> {
    id: EdgeId<I>,
    from: VertexId<I>,
    to: VertexId<I>,
}

/// A quad crossed by the ring, entered through `entry` and left through
/// `exit` (both directed the same way).
#[derive(Debug, Clone)]
struct Crossing<I: MeshIndex> {
    face: Face<I>,
    entry: RingEdge<I>,
    exit: RingEdge<I>,
    /// True when `entry` runs along the face's winding.
    forward: bool,
}

/// Cut the quad ring through `edge`.
///
/// Fails with `InvalidParameter` unless `0 < factor < 1`, with `NotFound`
/// if the edge is missing, and with `InvalidTopology` if the edge has no
/// face, is non-manifold, or the ring runs into a face that is not a quad.
/// The mesh is untouched on failure.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::{loop_cut, LoopCutOptions};
///
/// let mut mesh: EditableMesh = polyedit::primitives::grid(3.0, 1.0, 3, 1).unwrap();
/// // An edge across the strip
/// let edge = mesh
///     .edge_ids()
///     .find(|&e| polyedit::mesh::topology::edge_faces(&mesh, e).len() == 2)
///     .unwrap();
///
/// let delta = loop_cut(&mut mesh, edge, &LoopCutOptions::default()).unwrap();
/// assert_eq!(delta.created_vertices.len(), 4);
/// assert_eq!(mesh.num_faces(), 6);
/// ```
pub fn loop_cut<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    edge: EdgeId<I>,
    options: &LoopCutOptions,
) -> Result<MeshDelta<I>> {
    let t = options.factor;
    if !(t.is_finite() && t > 0.0 && t < 1.0) {
        return Err(MeshError::invalid_param("factor", t, "must lie strictly between 0 and 1"));
    }

    let (ring, crossings, closed) = walk_ring(mesh, edge)?;

    let mark = Watermark::of(mesh);
    let mut delta = MeshDelta::default();
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    let mut cuts: HashMap<EdgeId<I>, VertexId<I>> = HashMap::with_capacity(ring.len());
    for r in &ring {
        let mesh = builder.mesh();
        let pf = mesh
            .position(r.from)
            .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, r.from.index()))?;
        let pt = mesh
            .position(r.to)
            .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, r.to.index()))?;
        // One vertex per ring edge, even where two ring edges coincide
        let v = builder.mesh_mut().add_vertex(pf + (pt - pf) * t)?;
        cuts.insert(r.id, v);
    }

    for c in &crossings {
        delta.remove_face(builder.mesh_mut(), c.face.id)?;
    }
    // Ring edges still used by a face off the ring stay in place
    for r in &ring {
        if builder.mesh().edge(r.id).is_some_and(|e| e.faces().is_empty()) {
            delta.remove_edge(builder.mesh_mut(), r.id)?;
        }
    }

    for c in &crossings {
        let cut = |r: &RingEdge<I>| {
            cuts.get(&r.id)
                .copied()
                .ok_or_else(|| MeshError::topology(format!("ring edge {} has no cut", r.id)))
        };
        let cin = cut(&c.entry)?;
        let cout = cut(&c.exit)?;
        let RingEdge { from, to, .. } = c.entry;
        let RingEdge {
            from: opp_from,
            to: opp_to,
            ..
        } = c.exit;

        let uv_of = |v: VertexId<I>| c.face.position_of(v).and_then(|i| c.face.uv_at(i));
        let uv_in = match (uv_of(from), uv_of(to)) {
            (Some(a), Some(b)) => lerp_uv(builder.mesh_mut(), a, b, t, cin),
            _ => None,
        };
        let uv_out = match (uv_of(opp_from), uv_of(opp_to)) {
            (Some(a), Some(b)) => lerp_uv(builder.mesh_mut(), a, b, t, cout),
            _ => None,
        };
        let uvs_for = |quad: &[VertexId<I>; 4]| {
            all_uvs(quad.iter().map(|&v| match v {
                v if v == cin => uv_in,
                v if v == cout => uv_out,
                v => uv_of(v),
            }))
        };

        let halves = if c.forward {
            [[from, cin, cout, opp_from], [cin, to, opp_to, cout]]
        } else {
            [[cin, from, opp_from, cout], [to, cin, cout, opp_to]]
        };
        for quad in &halves {
            add_face_like(&mut builder, quad, &c.face, uvs_for(quad))?;
        }
    }

    mark.finish(mesh, &mut delta);
    debug!(
        edges = ring.len(),
        faces = crossings.len(),
        closed,
        "loop_cut"
    );
    Ok(delta)
}

/// Collect the ring edges and crossed quads through `start`, without
/// touching the mesh. Returns the edges in walk order and whether the ring
/// closed on itself.
fn walk_ring<I: MeshIndex>(
    mesh: &EditableMesh<I>,
    start: EdgeId<I>,
) -> Result<(Vec<RingEdge<I>>, Vec<Crossing<I>>, bool)> {
    let edge = mesh.require_edge(start)?;
    let faces = edge.faces().to_vec();
    match faces.len() {
        0 => {
            return Err(MeshError::topology(format!(
                "edge {} has no face to cut through",
                start
            )))
        }
        1 | 2 => {}
        n => {
            return Err(MeshError::topology(format!(
                "edge {} is shared by {} faces",
                start, n
            )))
        }
    }

    let first = RingEdge {
        id: start,
        from: edge.vertices[0],
        to: edge.vertices[1],
    };
    let mut visited = HashSet::new();

    let mut ring = vec![first];
    let mut crossings = Vec::new();
    let closed = walk(mesh, first, faces[0], &mut visited, &mut ring, &mut crossings)?;

    if !closed && faces.len() == 2 {
        let mut back_ring = Vec::new();
        let mut back_crossings = Vec::new();
        walk(
            mesh,
            first,
            faces[1],
            &mut visited,
            &mut back_ring,
            &mut back_crossings,
        )?;
        back_ring.reverse();
        back_ring.extend(ring);
        ring = back_ring;
        back_crossings.reverse();
        back_crossings.extend(crossings);
        crossings = back_crossings;
    }

    Ok((ring, crossings, closed))
}

/// Walk from `entry` into `face` and onwards. Returns true if the walk came
/// back to its starting edge.
fn walk<I: MeshIndex>(
    mesh: &EditableMesh<I>,
    entry: RingEdge<I>,
    face: FaceId<I>,
    visited: &mut HashSet<FaceId<I>>,
    ring: &mut Vec<RingEdge<I>>,
    crossings: &mut Vec<Crossing<I>>,
) -> Result<bool> {
    let start = entry.id;
    let mut current = entry;
    let mut face_id = face;

    loop {
        if !visited.insert(face_id) {
            return Ok(false);
        }
        let face = mesh.require_face(face_id)?;
        if !face.is_quad() {
            return Err(MeshError::topology(format!(
                "face {} on the loop has {} vertices, expected a quad",
                face_id,
                face.len()
            )));
        }

        let not_on_face = || {
            MeshError::topology(format!("edge {} is not part of face {}", current.id, face_id))
        };
        let p = face.position_of(current.from).ok_or_else(not_on_face)?;
        let q = face.position_of(current.to).ok_or_else(not_on_face)?;
        let d = if (p + 1) % 4 == q {
            1
        } else if (q + 1) % 4 == p {
            3
        } else {
            return Err(not_on_face());
        };

        // The opposite side, running parallel to the entry edge
        let i = (p + 4 - d) % 4;
        let j = (q + d) % 4;
        let exit_id = if (i + 1) % 4 == j {
            face.edge_ids[i]
        } else {
            face.edge_ids[j]
        };
        let exit = RingEdge {
            id: exit_id,
            from: face.vertex_ids[i],
            to: face.vertex_ids[j],
        };
        crossings.push(Crossing {
            face: face.clone(),
            entry: current,
            exit,
            forward: d == 1,
        });

        if exit_id == start {
            return Ok(true);
        }
        ring.push(exit);

        let exit_edge = mesh.require_edge(exit_id)?;
        if exit_edge.faces().len() != 2 {
            return Ok(false);
        }
        let Some(&next) = exit_edge.faces().iter().find(|&&f| f != face_id) else {
            return Ok(false);
        };
        current = exit;
        face_id = next;
    }
}
