//! Mesh editing operators.
//!
//! Every operator mutates an [`EditableMesh`] in place, takes a selection of
//! ids plus numeric parameters, and goes through a
//! [`PrimitiveBuilder`](crate::mesh::PrimitiveBuilder) seeded with the mesh's
//! current edges so that recreated faces reuse surviving edges.
//!
//! - **Extrusion**: [`extrude_faces`]
//! - **Subdivision**: [`subdivide_edge`], [`subdivide_edges`]
//! - **Merging**: [`merge_vertices`], [`merge_specific_vertices`]
//! - **Re-tessellation**: [`triangulate_faces`], [`quadrangulate_faces`]
//! - **Dissolving**: [`dissolve_edges`], [`dissolve_faces`]
//! - **Bevel**: [`bevel_edges`]
//! - **Bridging**: [`bridge_edges`]
//! - **Loop cut**: [`loop_cut`]
//!
//! # Batches and skipped items
//!
//! Batch operators never abort on a bad item. A stale id, or an element the
//! operator cannot handle, is recorded as a [`Skipped`] entry, logged with
//! `tracing::warn!`, and the rest of the selection is processed. An empty
//! selection is a no-op.
//!
//! # Example
//!
//! ```
//! use polyedit::prelude::*;
//! use polyedit::algo::extrude_faces;
//!
//! let mut mesh: EditableMesh = polyedit::primitives::cube(2.0).unwrap();
//! let top: Vec<FaceId> = mesh.face_ids().take(1).collect();
//!
//! let delta = extrude_faces(&mut mesh, &top, 0.5).unwrap();
//! assert_eq!(delta.deleted_faces, top);
//! assert!(validate_mesh_topology(&mesh).is_valid);
//! ```

mod bevel;
mod bridge;
mod dissolve;
mod extrude;
mod loop_cut;
mod merge;
pub mod progress;
mod subdivide;
mod triangulate;

pub use bevel::{bevel_edges, BevelOptions};
pub use bridge::{bridge_edges, BridgeResult};
pub use dissolve::{dissolve_edges, dissolve_faces};
pub use extrude::extrude_faces;
pub use loop_cut::{loop_cut, LoopCutOptions};
pub use merge::{merge_specific_vertices, merge_vertices, merge_vertices_with_progress, MergeResult};
pub use progress::Progress;
pub use subdivide::{subdivide_edge, subdivide_edges, subdivide_edges_with_progress};
pub use triangulate::{quadrangulate_faces, triangulate_faces, QuadrangulateResult};

use std::fmt;

use nalgebra::Point2;
use tracing::warn;

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{
    EdgeId, EditableMesh, Face, FaceId, MeshIndex, PrimitiveBuilder, UvId, VertexId,
};

/// An item a batch operator could not process.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// The element class of the skipped id.
    pub kind: ElementKind,
    /// The raw id value.
    pub id: usize,
    /// Why it was skipped.
    pub reason: String,
}

impl Skipped {
    /// Create a skipped entry.
    pub fn new(kind: ElementKind, id: usize, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.id, self.reason)
    }
}

/// Results of a batch operator: one output per processed item plus the
/// items that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Outputs, in selection order.
    pub items: Vec<T>,
    /// Items that could not be processed.
    pub skipped: Vec<Skipped>,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// What an operator changed.
///
/// Created ids are listed in creation order. Elements that were created and
/// removed again within the same call appear in neither list.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDelta<I: MeshIndex = u32> {
    /// Vertices added by the operator.
    pub created_vertices: Vec<VertexId<I>>,
    /// Edges added by the operator.
    pub created_edges: Vec<EdgeId<I>>,
    /// Faces added by the operator.
    pub created_faces: Vec<FaceId<I>>,
    /// Vertices removed by the operator.
    pub deleted_vertices: Vec<VertexId<I>>,
    /// Edges removed by the operator.
    pub deleted_edges: Vec<EdgeId<I>>,
    /// Faces removed by the operator.
    pub deleted_faces: Vec<FaceId<I>>,
    /// Selected items that were not processed.
    pub skipped: Vec<Skipped>,
}

impl<I: MeshIndex> Default for MeshDelta<I> {
    fn default() -> Self {
        Self {
            created_vertices: Vec::new(),
            created_edges: Vec::new(),
            created_faces: Vec::new(),
            deleted_vertices: Vec::new(),
            deleted_edges: Vec::new(),
            deleted_faces: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<I: MeshIndex> MeshDelta<I> {
    /// Returns true if nothing was created, deleted or skipped.
    pub fn is_empty(&self) -> bool {
        self.created_vertices.is_empty()
            && self.created_edges.is_empty()
            && self.created_faces.is_empty()
            && self.deleted_vertices.is_empty()
            && self.deleted_edges.is_empty()
            && self.deleted_faces.is_empty()
            && self.skipped.is_empty()
    }

    pub(crate) fn remove_face(&mut self, mesh: &mut EditableMesh<I>, id: FaceId<I>) -> Result<Face<I>> {
        let face = mesh.remove_face(id)?;
        self.deleted_faces.push(id);
        Ok(face)
    }

    pub(crate) fn remove_edge(&mut self, mesh: &mut EditableMesh<I>, id: EdgeId<I>) -> Result<()> {
        mesh.remove_edge(id)?;
        self.deleted_edges.push(id);
        Ok(())
    }

    /// Remove candidate edges left without faces, then candidate vertices
    /// left without edges (together with the UVs they own).
    ///
    /// Candidates should come from faces the operator removed, so loose
    /// geometry that existed before the edit is never touched.
    pub(crate) fn prune(
        &mut self,
        mesh: &mut EditableMesh<I>,
        edges: impl IntoIterator<Item = EdgeId<I>>,
        vertices: impl IntoIterator<Item = VertexId<I>>,
    ) -> Result<()> {
        for e in edges {
            if mesh.edge(e).is_some_and(|edge| edge.faces().is_empty()) {
                self.remove_edge(mesh, e)?;
            }
        }
        for v in vertices {
            if mesh.vertex(v).is_some_and(|vertex| vertex.edges().is_empty()) {
                mesh.remove_uvs_owned_by(v);
                mesh.remove_vertex(v)?;
                self.deleted_vertices.push(v);
            }
        }
        Ok(())
    }

    pub(crate) fn skip(&mut self, kind: ElementKind, id: usize, reason: impl Into<String>) {
        self.skipped.push(skipped(kind, id, reason));
    }
}

/// Log and build a [`Skipped`] entry.
pub(crate) fn skipped(kind: ElementKind, id: usize, reason: impl Into<String>) -> Skipped {
    let entry = Skipped::new(kind, id, reason);
    warn!(kind = %entry.kind, id = entry.id, reason = %entry.reason, "skipping element");
    entry
}

pub(crate) fn skipped_error(kind: ElementKind, id: usize, err: &MeshError) -> Skipped {
    skipped(kind, id, err.to_string())
}

/// Id counters at the start of an operator.
///
/// Ids only grow, so everything at or above the watermark that still
/// exists when the operator finishes was created by it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Watermark {
    vertices: usize,
    edges: usize,
    faces: usize,
}

impl Watermark {
    pub(crate) fn of<I: MeshIndex>(mesh: &EditableMesh<I>) -> Self {
        let ids = mesh.allocator();
        Self {
            vertices: ids.vertices_issued(),
            edges: ids.edges_issued(),
            faces: ids.faces_issued(),
        }
    }

    /// Fill the created lists of `delta` and drop short-lived elements from
    /// its deleted lists.
    pub(crate) fn finish<I: MeshIndex>(self, mesh: &EditableMesh<I>, delta: &mut MeshDelta<I>) {
        delta.created_vertices = mesh.vertex_ids().filter(|v| v.index() >= self.vertices).collect();
        delta.created_edges = mesh.edge_ids().filter(|e| e.index() >= self.edges).collect();
        delta.created_faces = mesh.face_ids().filter(|f| f.index() >= self.faces).collect();

        delta.deleted_vertices.retain(|v| v.index() < self.vertices);
        delta.deleted_edges.retain(|e| e.index() < self.edges);
        delta.deleted_faces.retain(|f| f.index() < self.faces);
    }
}

/// Create a face with the given ring that inherits `template`'s name and
/// material. `uvs` is applied when it matches the ring length.
pub(crate) fn add_face_like<I: MeshIndex>(
    builder: &mut PrimitiveBuilder<'_, I>,
    ring: &[VertexId<I>],
    template: &Face<I>,
    uvs: Option<Vec<UvId<I>>>,
) -> Result<FaceId<I>> {
    let id = match &template.name {
        Some(name) => builder.add_ngon_named(ring, name.clone())?,
        None => builder.add_ngon(ring)?,
    };

    let mesh = builder.mesh_mut();
    if let Some(m) = template.material {
        if mesh.material(m).is_some() {
            mesh.set_face_material(id, Some(m))?;
        }
    }
    if let Some(uvs) = uvs {
        if uvs.len() == ring.len() && uvs.iter().all(|&uv| mesh.uv(uv).is_some()) {
            mesh.set_face_uvs(id, Some(uvs))?;
        }
    }
    Ok(id)
}

/// Create a UV for `owner` at `a + t * (b - a)`.
pub(crate) fn lerp_uv<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    a: UvId<I>,
    b: UvId<I>,
    t: f64,
    owner: VertexId<I>,
) -> Option<UvId<I>> {
    let ca = mesh.uv(a)?.coord;
    let cb = mesh.uv(b)?.coord;
    let coord = Point2::from(ca.coords + (cb.coords - ca.coords) * t);
    mesh.add_uv(owner, coord).ok()
}

/// Collect a list of UVs only if every entry is present.
pub(crate) fn all_uvs<I: MeshIndex>(uvs: impl IntoIterator<Item = Option<UvId<I>>>) -> Option<Vec<UvId<I>>> {
    uvs.into_iter().collect()
}

/// Keep the first occurrence of each id, preserving order.
pub(crate) fn unique<T: Copy + Eq + std::hash::Hash>(ids: &[T]) -> Vec<T> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
