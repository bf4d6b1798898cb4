//! Vertex merging.
//!
//! [`merge_vertices`] welds every group of vertices that are transitively
//! within a distance threshold of each other: if `a` is close to `b` and `b`
//! is close to `c`, all three end up as one vertex even when `a` and `c` are
//! further apart than the threshold. Candidate pairs come from a uniform
//! hash grid with cells the size of the threshold, so only the 27 cells
//! around each vertex are searched.
//!
//! Each cluster collapses onto its lowest id, which keeps its position.
//! Faces touching a merged vertex are rebuilt with their ids substituted;
//! repeated consecutive vertices are collapsed and faces left with fewer than
//! three vertices are removed. Edges are rebuilt through the builder, so
//! edges that coincide after the merge exist once.

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;
use tracing::{debug, trace};

use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, EditableMesh, Face, MeshIndex, PrimitiveBuilder, UvId, VertexId};

use super::{add_face_like, all_uvs, unique, Progress};

/// Result of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Number of vertices removed by merging.
    pub merged_vertices: usize,
    /// Number of faces whose vertex list changed, including faces removed
    /// because they collapsed below three vertices.
    pub updated_faces: usize,
}

/// Merge all vertices within `threshold` of each other (transitively).
///
/// Fails with `InvalidParameter` unless `threshold` is positive and finite.
/// Vertices with non-finite positions are never merged.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::merge_vertices;
/// use nalgebra::Point3;
///
/// let mut mesh: EditableMesh = EditableMesh::new();
/// mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
/// mesh.add_vertex(Point3::new(0.0005, 0.0, 0.0)).unwrap();
/// mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
///
/// let result = merge_vertices(&mut mesh, 0.001).unwrap();
/// assert_eq!(result.merged_vertices, 1);
/// assert_eq!(mesh.num_vertices(), 2);
/// ```
pub fn merge_vertices<I: MeshIndex>(mesh: &mut EditableMesh<I>, threshold: f64) -> Result<MergeResult> {
    merge_vertices_with_progress(mesh, threshold, &Progress::none())
}

/// Merge vertices with progress reporting.
pub fn merge_vertices_with_progress<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    threshold: f64,
    progress: &Progress,
) -> Result<MergeResult> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(MeshError::invalid_param(
            "threshold",
            threshold,
            "must be positive and finite",
        ));
    }

    let points: Vec<(VertexId<I>, Point3<f64>)> = mesh.vertices().map(|v| (v.id, v.position)).collect();
    let total = points.len();
    let cell = |p: &Point3<f64>| {
        [
            (p.x / threshold).floor() as i64,
            (p.y / threshold).floor() as i64,
            (p.z / threshold).floor() as i64,
        ]
    };

    let mut sets = DisjointSet::new(total);
    let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();

    for (i, (_, p)) in points.iter().enumerate() {
        if i % 1024 == 0 {
            progress.report(i, total, "Clustering vertices");
        }
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            continue;
        }

        let c = cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    // Cells saturate at the ends of i64 for huge coordinates
                    let Some(bucket) = neighbor(c, [dx, dy, dz]).and_then(|n| grid.get(&n)) else {
                        continue;
                    };
                    for &j in bucket {
                        if (points[j].1 - p).norm() <= threshold {
                            sets.union(i, j);
                        }
                    }
                }
            }
        }
        grid.entry(c).or_default().push(i);
    }

    let mut lowest: HashMap<usize, VertexId<I>> = HashMap::new();
    for (i, &(id, _)) in points.iter().enumerate() {
        let root = sets.find(i);
        lowest
            .entry(root)
            .and_modify(|rep| {
                if id < *rep {
                    *rep = id;
                }
            })
            .or_insert(id);
    }

    let mut map = HashMap::new();
    for (i, &(id, _)) in points.iter().enumerate() {
        let root = sets.find(i);
        if let Some(&rep) = lowest.get(&root) {
            if rep != id {
                map.insert(id, rep);
            }
        }
    }

    progress.report(total, total, "Merging vertices");
    let result = apply_merge(mesh, &map)?;
    debug!(
        threshold,
        merged = result.merged_vertices,
        updated_faces = result.updated_faces,
        "merge_vertices"
    );
    Ok(result)
}

/// Merge an explicit set of vertices into the one with the lowest id.
///
/// The survivor keeps its position. A single vertex is a no-op that returns
/// it unchanged. Fails with `InvalidParameter` for an empty set and with
/// `NotFound` if any id is missing (before anything is modified).
pub fn merge_specific_vertices<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    vertices: &[VertexId<I>],
) -> Result<VertexId<I>> {
    if vertices.is_empty() {
        return Err(MeshError::invalid_param("vertices", "[]", "must not be empty"));
    }
    for &v in vertices {
        mesh.require_vertex(v)?;
    }

    let ids = unique(vertices);
    let Some(&rep) = ids.iter().min() else {
        return Err(MeshError::invalid_param("vertices", "[]", "must not be empty"));
    };
    if ids.len() == 1 {
        return Ok(rep);
    }

    let map: HashMap<VertexId<I>, VertexId<I>> =
        ids.iter().filter(|&&v| v != rep).map(|&v| (v, rep)).collect();
    let result = apply_merge(mesh, &map)?;
    debug!(
        into = %rep,
        merged = result.merged_vertices,
        updated_faces = result.updated_faces,
        "merge_specific_vertices"
    );
    Ok(rep)
}

/// Replace every key of `map` by its value throughout the mesh.
fn apply_merge<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    map: &HashMap<VertexId<I>, VertexId<I>>,
) -> Result<MergeResult> {
    if map.is_empty() {
        return Ok(MergeResult::default());
    }
    let resolve = |v: VertexId<I>| map.get(&v).copied().unwrap_or(v);
    let touches = |v: &VertexId<I>| map.contains_key(v);

    let affected: Vec<Face<I>> = mesh
        .faces()
        .filter(|f| f.vertex_ids.iter().any(touches))
        .cloned()
        .collect();
    let loose: Vec<(VertexId<I>, VertexId<I>)> = mesh
        .edges()
        .filter(|e| e.faces().is_empty() && e.vertices.iter().any(touches))
        .map(|e| (resolve(e.vertices[0]), resolve(e.vertices[1])))
        .collect();
    let doomed: Vec<EdgeId<I>> = mesh
        .edges()
        .filter(|e| e.vertices.iter().any(touches))
        .map(|e| e.id)
        .collect();

    let mut merged: Vec<VertexId<I>> = map.keys().copied().collect();
    merged.sort();

    let mut builder = PrimitiveBuilder::for_edit(mesh);
    for face in &affected {
        builder.mesh_mut().remove_face(face.id)?;
    }
    for e in doomed {
        builder.mesh_mut().remove_edge(e)?;
    }
    for &v in &merged {
        let target = resolve(v);
        let mesh = builder.mesh_mut();
        mesh.retarget_uvs(v, target);
        mesh.remove_vertex(v)?;
    }

    for face in &affected {
        let corners: Vec<(VertexId<I>, Option<UvId<I>>)> = face
            .vertex_ids
            .iter()
            .enumerate()
            .map(|(i, &v)| (resolve(v), face.uv_at(i)))
            .collect();
        let corners = collapse_runs(corners);
        if corners.len() < 3 {
            trace!(face = %face.id, "face collapsed by merge");
            continue;
        }

        let ring: Vec<VertexId<I>> = corners.iter().map(|c| c.0).collect();
        let uvs = face
            .uvs
            .as_ref()
            .and_then(|_| all_uvs(corners.iter().map(|c| c.1)));
        add_face_like(&mut builder, &ring, face, uvs)?;
    }

    let mut kept = HashSet::new();
    for (a, b) in loose {
        if a != b {
            kept.insert(builder.add_edge(a, b)?);
        }
    }

    // Edges only used by faces that collapsed
    let mesh = builder.mesh_mut();
    for face in &affected {
        for &e in &face.edge_ids {
            if !kept.contains(&e) && mesh.edge(e).is_some_and(|edge| edge.faces().is_empty()) {
                mesh.remove_edge(e)?;
            }
        }
    }

    Ok(MergeResult {
        merged_vertices: merged.len(),
        updated_faces: affected.len(),
    })
}

fn neighbor(c: [i64; 3], d: [i64; 3]) -> Option<[i64; 3]> {
    Some([
        c[0].checked_add(d[0])?,
        c[1].checked_add(d[1])?,
        c[2].checked_add(d[2])?,
    ])
}

/// Drop consecutive corners that name the same vertex, wrapping around.
fn collapse_runs<I: MeshIndex, T>(corners: Vec<(VertexId<I>, T)>) -> Vec<(VertexId<I>, T)> {
    let mut out: Vec<(VertexId<I>, T)> = Vec::with_capacity(corners.len());
    for corner in corners {
        if out.last().map(|c| c.0) != Some(corner.0) {
            out.push(corner);
        }
    }
    while out.len() > 1 && out.first().map(|c| c.0) == out.last().map(|c| c.0) {
        out.pop();
    }
    out
}

/// Union-find over vertex slots, joining towards the smaller root.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
