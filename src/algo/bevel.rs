//! Edge bevel.
//!
//! Each selected edge grows a strip of thin quads, one strip per incident
//! face (or one for a loose edge), following the direction in which that
//! face traverses the edge. The strip rises in `segments` equal steps along
//! a constant up vector `(0, 1, 0)` scaled by `distance`; it does not follow
//! the surface normal. The two strips of a manifold edge cover the same
//! vertices and collapse into one.
//!
//! All edges of one call share a builder session, so strips of edges that
//! meet at a vertex share their offset vertices there.

use std::collections::HashSet;

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{EdgeId, EditableMesh, Face, MeshIndex, PrimitiveBuilder, VertexId};

use super::{add_face_like, skipped_error, unique, MeshDelta, Watermark};

/// Options for [`bevel_edges`].
#[derive(Debug, Clone)]
pub struct BevelOptions {
    /// Height of the strip along the up vector.
    pub distance: f64,

    /// Number of quads per strip (default: 1).
    pub segments: usize,
}

impl Default for BevelOptions {
    fn default() -> Self {
        Self {
            distance: 0.1,
            segments: 1,
        }
    }
}

impl BevelOptions {
    /// Create options with the given distance and a single segment.
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            ..Self::default()
        }
    }

    /// Set the strip height.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Set the number of quads per strip.
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }
}

/// Bevel `edges`.
///
/// Fails with `InvalidParameter` if the distance is zero or not finite, or
/// if `segments` is zero.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::{bevel_edges, BevelOptions};
///
/// let mut mesh: EditableMesh = polyedit::primitives::cube(2.0).unwrap();
/// let edge = mesh.edge_ids().next().unwrap();
///
/// let options = BevelOptions::new(0.2).with_segments(2);
/// let delta = bevel_edges(&mut mesh, &[edge], &options).unwrap();
/// assert_eq!(delta.created_faces.len(), 2);
/// assert_eq!(delta.created_vertices.len(), 4);
/// ```
pub fn bevel_edges<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    edges: &[EdgeId<I>],
    options: &BevelOptions,
) -> Result<MeshDelta<I>> {
    if !(options.distance.is_finite() && options.distance != 0.0) {
        return Err(MeshError::invalid_param(
            "distance",
            options.distance,
            "must be finite and non-zero",
        ));
    }
    if options.segments == 0 {
        return Err(MeshError::invalid_param("segments", options.segments, "must be at least 1"));
    }

    let mark = Watermark::of(mesh);
    let mut delta = MeshDelta::default();
    let up = Vector3::y() * options.distance;
    let mut strips: HashSet<Vec<VertexId<I>>> = HashSet::new();
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    for e in unique(edges) {
        if let Err(err) = bevel_edge(&mut builder, e, up, options.segments, &mut strips) {
            delta.skipped.push(skipped_error(ElementKind::Edge, e.index(), &err));
        }
    }

    mark.finish(mesh, &mut delta);
    debug!(
        edges = edges.len(),
        faces = delta.created_faces.len(),
        skipped = delta.skipped.len(),
        "bevel_edges"
    );
    Ok(delta)
}

fn bevel_edge<I: MeshIndex>(
    builder: &mut PrimitiveBuilder<'_, I>,
    e: EdgeId<I>,
    up: Vector3<f64>,
    segments: usize,
    strips: &mut HashSet<Vec<VertexId<I>>>,
) -> Result<()> {
    let edge = builder.mesh().require_edge(e)?.clone();
    let faces: Vec<Face<I>> = edge
        .faces()
        .iter()
        .filter_map(|&f| builder.mesh().face(f).cloned())
        .collect();

    // One (from, to, template) per incident face, in that face's direction
    let mut sides: Vec<(VertexId<I>, VertexId<I>, Option<&Face<I>>)> = faces
        .iter()
        .filter_map(|face| {
            let i = face.edge_ids.iter().position(|&x| x == e)?;
            let j = (i + 1) % face.len();
            Some((face.vertex_ids[i], face.vertex_ids[j], Some(face)))
        })
        .collect();
    if sides.is_empty() {
        sides.push((edge.vertices[0], edge.vertices[1], None));
    }

    for (from, to, template) in sides {
        let pf = builder
            .mesh()
            .position(from)
            .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, from.index()))?;
        let pt = builder
            .mesh()
            .position(to)
            .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, to.index()))?;

        let mut rows = vec![(from, to)];
        for k in 1..=segments {
            let lift = up * (k as f64 / segments as f64);
            rows.push((builder.add_vertex(pf + lift)?, builder.add_vertex(pt + lift)?));
        }

        for k in 0..segments {
            let quad = [rows[k].0, rows[k].1, rows[k + 1].1, rows[k + 1].0];
            let mut key = quad.to_vec();
            key.sort();
            if !strips.insert(key) {
                continue;
            }
            match template {
                Some(face) => add_face_like(builder, &quad, face, None)?,
                None => builder.add_quad(quad)?,
            };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::validate_mesh_topology;
    use crate::primitives;
    use nalgebra::Point3;

    fn assert_valid(mesh: &EditableMesh) {
        let report = validate_mesh_topology(mesh);
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_manifold_edge_gets_one_strip() {
        let mut mesh: EditableMesh = primitives::cube(2.0).unwrap();
        let edge = mesh.edge_ids().next().unwrap();
        assert_eq!(mesh.edge(edge).unwrap().faces().len(), 2);

        let delta = bevel_edges(&mut mesh, &[edge], &BevelOptions::new(0.5)).unwrap();
        assert_eq!(delta.created_faces.len(), 1);
        assert_eq!(delta.created_vertices.len(), 2);
        assert!(delta.deleted_faces.is_empty());
        assert_valid(&mesh);
    }

    #[test]
    fn test_strip_follows_up_vector() {
        let mut mesh = EditableMesh::<u32>::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
        let e = mesh.add_edge(a, b).unwrap();

        let options = BevelOptions::default().with_distance(0.3).with_segments(3);
        let delta = bevel_edges(&mut mesh, &[e], &options).unwrap();
        assert_eq!(delta.created_faces.len(), 3);
        assert_eq!(delta.created_vertices.len(), 6);

        let top = delta.created_vertices[4];
        let p = mesh.position(top).unwrap();
        assert!((p - Point3::new(0.0, 0.3, 0.0)).norm() < 1e-12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_adjacent_edges_share_offsets() {
        let mut mesh: EditableMesh = primitives::plane(2.0).unwrap();
        let f = mesh.faces().next().unwrap().clone();

        let delta = bevel_edges(&mut mesh, &f.edge_ids[..2], &BevelOptions::new(0.25)).unwrap();
        assert_eq!(delta.created_faces.len(), 2);
        // Three offset vertices: the shared corner is created once
        assert_eq!(delta.created_vertices.len(), 3);
        assert_valid(&mesh);
    }

    #[test]
    fn test_material_follows_face() {
        let mut mesh: EditableMesh = primitives::plane(1.0).unwrap();
        let f = mesh.face_ids().next().unwrap();
        let m = mesh.add_material("trim").unwrap();
        mesh.set_face_material(f, Some(m)).unwrap();
        let edge = mesh.edge_ids().next().unwrap();

        let delta = bevel_edges(&mut mesh, &[edge], &BevelOptions::new(0.1)).unwrap();
        assert_eq!(mesh.face(delta.created_faces[0]).unwrap().material, Some(m));
    }

    #[test]
    fn test_invalid_options_and_stale_edges() {
        let mut mesh: EditableMesh = primitives::plane(1.0).unwrap();
        let edge = mesh.edge_ids().next().unwrap();

        assert!(bevel_edges(&mut mesh, &[edge], &BevelOptions::new(0.0)).is_err());
        assert!(bevel_edges(&mut mesh, &[edge], &BevelOptions::new(0.1).with_segments(0)).is_err());

        let delta = bevel_edges(&mut mesh, &[EdgeId::new(77)], &BevelOptions::default()).unwrap();
        assert_eq!(delta.skipped.len(), 1);
        assert_eq!(mesh.num_faces(), 1);
    }
}
