//! Dissolving edges and faces.
//!
//! Dissolving removes elements while keeping the surface covered:
//!
//! - [`dissolve_edges`] joins the two faces on either side of each edge into
//!   one face.
//! - [`dissolve_faces`] replaces each connected patch of selected faces by a
//!   single face bounded by the patch outline.
//!
//! Edges and vertices that end up unused are removed as well.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{Edge, EdgeId, EditableMesh, Face, FaceId, MeshIndex, PrimitiveBuilder, UvId, VertexId};

use super::{add_face_like, all_uvs, skipped_error, unique, MeshDelta, Watermark};

type Corner<I> = (VertexId<I>, Option<UvId<I>>);

/// Dissolve `edges`, merging the faces on either side.
///
/// For an edge with two faces, the first face's winding is kept and the
/// second face is reversed if it runs the same way along the edge. A loose
/// edge is simply removed. Boundary edges, non-manifold edges and edges
/// whose dissolve would leave a degenerate face are skipped.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::dissolve_edges;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
/// let diagonal = mesh.find_edge(VertexId::new(0), VertexId::new(2)).unwrap();
///
/// dissolve_edges(&mut mesh, &[diagonal]);
/// assert_eq!(mesh.num_faces(), 1);
/// assert!(mesh.is_quad_mesh());
/// ```
pub fn dissolve_edges<I: MeshIndex>(mesh: &mut EditableMesh<I>, edges: &[EdgeId<I>]) -> MeshDelta<I> {
    let mark = Watermark::of(mesh);
    let mut delta = MeshDelta::default();
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    for e in unique(edges) {
        let Some(edge) = builder.mesh().edge(e).cloned() else {
            delta.skip(ElementKind::Edge, e.index(), "edge not found");
            continue;
        };

        let outcome = match edge.faces().len() {
            0 => delta.remove_edge(builder.mesh_mut(), e),
            2 => join_faces(&mut builder, &edge, &mut delta),
            1 => Err(MeshError::topology("boundary edge")),
            n => Err(MeshError::topology(format!("non-manifold edge with {} faces", n))),
        };
        if let Err(err) = outcome {
            delta.skipped.push(skipped_error(ElementKind::Edge, e.index(), &err));
        }
    }

    mark.finish(mesh, &mut delta);
    debug!(
        removed = delta.deleted_edges.len(),
        skipped = delta.skipped.len(),
        "dissolve_edges"
    );
    delta
}

/// Splice the two faces of `edge` into one.
fn join_faces<I: MeshIndex>(
    builder: &mut PrimitiveBuilder<'_, I>,
    edge: &Edge<I>,
    delta: &mut MeshDelta<I>,
) -> Result<()> {
    let fa = builder.mesh().require_face(edge.faces()[0])?.clone();
    let fb = builder.mesh().require_face(edge.faces()[1])?.clone();
    let missing = || MeshError::topology(format!("face ring does not contain edge {}", edge.id));

    // Walk A from the far endpoint of the edge around to the near one
    let i = fa.edge_ids.iter().position(|&x| x == edge.id).ok_or_else(missing)?;
    let na = fa.len();
    let ca = corners(&fa);
    let x = fa.vertex_ids[i];
    let y = fa.vertex_ids[(i + 1) % na];
    let mut ring: Vec<Corner<I>> = (0..na).map(|k| ca[(i + 1 + k) % na]).collect();

    // Walk B from x back to y, against its own direction if it agrees with A
    let j = fb.edge_ids.iter().position(|&x| x == edge.id).ok_or_else(missing)?;
    let nb = fb.len();
    let cb = corners(&fb);
    let path_b: Vec<Corner<I>> = if fb.vertex_ids[j] == y {
        (0..nb).map(|k| cb[(j + 1 + k) % nb]).collect()
    } else {
        trace!(face = %fb.id, "reversing second face to match winding");
        (0..nb).map(|k| cb[(j + nb - k) % nb]).collect()
    };
    debug_assert_eq!(path_b.first().map(|c| c.0), Some(x));
    ring.extend_from_slice(&path_b[1..nb - 1]);

    let ring = clean_ring(ring);
    if ring.len() < 3 {
        return Err(MeshError::topology("dissolving would leave a degenerate face"));
    }

    let mesh = builder.mesh_mut();
    delta.remove_face(mesh, fa.id)?;
    delta.remove_face(mesh, fb.id)?;
    delta.remove_edge(mesh, edge.id)?;

    let vertices: Vec<VertexId<I>> = ring.iter().map(|c| c.0).collect();
    let uvs = match (&fa.uvs, &fb.uvs) {
        (Some(_), Some(_)) => all_uvs(ring.iter().map(|c| c.1)),
        _ => None,
    };
    add_face_like(builder, &vertices, &fa, uvs)?;

    let old_edges = fa.edge_ids.iter().chain(&fb.edge_ids).copied();
    let old_vertices = unique(&[fa.vertex_ids.as_slice(), fb.vertex_ids.as_slice()].concat());
    delta.prune(builder.mesh_mut(), old_edges, old_vertices)
}

/// Dissolve each connected region of `faces` into a single face.
///
/// Faces are connected through shared edges. A region whose outline is one
/// simple loop becomes one face following the region's winding, inheriting
/// the name and material of its first selected face. Regions with holes,
/// pinched outlines or no outline at all (closed shells) are skipped.
/// Single-face regions are left untouched.
pub fn dissolve_faces<I: MeshIndex>(mesh: &mut EditableMesh<I>, faces: &[FaceId<I>]) -> MeshDelta<I> {
    let mark = Watermark::of(mesh);
    let mut delta = MeshDelta::default();

    let mut selection: Vec<Face<I>> = Vec::new();
    for f in unique(faces) {
        match mesh.face(f) {
            Some(face) => selection.push(face.clone()),
            None => delta.skip(ElementKind::Face, f.index(), "face not found"),
        }
    }

    let regions = connected_regions(mesh, &selection);
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    for region in &regions {
        if region.len() < 2 {
            continue;
        }
        let first = region[0].id;
        let ring = match outline(region) {
            Ok(ring) => ring,
            Err(reason) => {
                delta.skip(ElementKind::Face, first.index(), reason);
                continue;
            }
        };
        if let Err(err) = replace_region(&mut builder, region, &ring, &mut delta) {
            delta.skipped.push(skipped_error(ElementKind::Face, first.index(), &err));
        }
    }

    mark.finish(mesh, &mut delta);
    debug!(
        regions = regions.len(),
        created = delta.created_faces.len(),
        skipped = delta.skipped.len(),
        "dissolve_faces"
    );
    delta
}

/// Group faces into edge-connected regions, in selection order.
fn connected_regions<I: MeshIndex>(mesh: &EditableMesh<I>, selection: &[Face<I>]) -> Vec<Vec<Face<I>>> {
    let index: HashMap<FaceId<I>, usize> = selection.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
    let mut assigned = vec![false; selection.len()];
    let mut regions = Vec::new();

    for seed in 0..selection.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut region = Vec::new();
        let mut stack = vec![seed];

        while let Some(k) = stack.pop() {
            let face = &selection[k];
            region.push(face.clone());
            for &e in &face.edge_ids {
                let Some(edge) = mesh.edge(e) else { continue };
                for f in edge.faces() {
                    if let Some(&n) = index.get(f) {
                        if !assigned[n] {
                            assigned[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }
        }
        regions.push(region);
    }
    regions
}

/// The single outline loop of a region, following the faces' winding.
fn outline<I: MeshIndex>(region: &[Face<I>]) -> std::result::Result<Vec<Corner<I>>, &'static str> {
    let directed: HashSet<(VertexId<I>, VertexId<I>)> =
        region.iter().flat_map(|f| f.vertex_pairs()).collect();

    let mut next: HashMap<VertexId<I>, Corner<I>> = HashMap::new();
    let mut start = None;
    for face in region {
        for (i, (a, b)) in face.vertex_pairs().enumerate() {
            if directed.contains(&(b, a)) {
                continue;
            }
            if next.insert(a, (b, face.uv_at(i))).is_some() {
                return Err("region outline is pinched");
            }
            start.get_or_insert(a);
        }
    }
    let Some(start) = start else {
        return Err("region has no outline");
    };

    let mut ring = Vec::with_capacity(next.len());
    let mut current = start;
    loop {
        let Some(&(to, uv)) = next.get(&current) else {
            return Err("region outline is not closed");
        };
        ring.push((current, uv));
        current = to;
        if current == start || ring.len() > next.len() {
            break;
        }
    }

    if current != start {
        return Err("region outline is not closed");
    }
    if ring.len() != next.len() {
        return Err("region has holes");
    }
    if ring.len() < 3 {
        return Err("region outline is degenerate");
    }
    Ok(ring)
}

fn replace_region<I: MeshIndex>(
    builder: &mut PrimitiveBuilder<'_, I>,
    region: &[Face<I>],
    ring: &[Corner<I>],
    delta: &mut MeshDelta<I>,
) -> Result<()> {
    for face in region {
        delta.remove_face(builder.mesh_mut(), face.id)?;
    }

    let vertices: Vec<VertexId<I>> = ring.iter().map(|c| c.0).collect();
    let uvs = all_uvs(ring.iter().map(|c| c.1));
    add_face_like(builder, &vertices, &region[0], uvs)?;

    let old_edges: Vec<EdgeId<I>> = region.iter().flat_map(|f| f.edge_ids.iter().copied()).collect();
    let old_vertices: Vec<VertexId<I>> = region.iter().flat_map(|f| f.vertex_ids.iter().copied()).collect();
    delta.prune(builder.mesh_mut(), unique(&old_edges), unique(&old_vertices))
}

fn corners<I: MeshIndex>(face: &Face<I>) -> Vec<Corner<I>> {
    (0..face.len()).map(|i| (face.vertex_ids[i], face.uv_at(i))).collect()
}

/// Remove repeated consecutive vertices and spikes (`p, s, p`) until none
/// remain.
fn clean_ring<K: Copy + PartialEq, U: Copy>(mut ring: Vec<(K, U)>) -> Vec<(K, U)> {
    loop {
        let n = ring.len();
        if n < 3 {
            return ring;
        }
        if let Some(k) = (0..n).find(|&k| ring[k].0 == ring[(k + 1) % n].0) {
            ring.remove((k + 1) % n);
            continue;
        }
        if let Some(k) = (0..n).find(|&k| ring[(k + n - 1) % n].0 == ring[(k + 1) % n].0) {
            let (a, b) = (k, (k + 1) % n);
            ring.remove(a.max(b));
            ring.remove(a.min(b));
            continue;
        }
        return ring;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::test_meshes::quad_grid;
    use crate::mesh::{build_from_triangles, validate_mesh_topology};
    use crate::primitives;
    use nalgebra::Point3;

    fn assert_valid(mesh: &EditableMesh) {
        let report = validate_mesh_topology(mesh);
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_clean_ring() {
        let ring = |ids: &[u32]| ids.iter().map(|&i| (i, ())).collect::<Vec<_>>();
        let keys = |r: Vec<(u32, ())>| r.into_iter().map(|c| c.0).collect::<Vec<_>>();

        assert_eq!(keys(clean_ring(ring(&[1, 2, 3, 4, 3]))), vec![1, 2, 3]);
        assert_eq!(keys(clean_ring(ring(&[1, 1, 2, 3]))), vec![1, 2, 3]);
        assert_eq!(keys(clean_ring(ring(&[1, 2, 3, 1]))), vec![1, 2, 3]);
        assert_eq!(keys(clean_ring(ring(&[1, 2, 3, 4]))), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_dissolve_shared_edge() {
        let mut mesh = quad_grid(2, 1);
        let edge = mesh.find_edge(VertexId::new(1), VertexId::new(4)).unwrap();

        let delta = dissolve_edges(&mut mesh, &[edge]);
        assert_eq!(delta.deleted_faces.len(), 2);
        assert_eq!(delta.deleted_edges, vec![edge]);
        assert_eq!(delta.created_faces.len(), 1);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_edges(), 6);

        let f = delta.created_faces[0];
        assert_eq!(mesh.face(f).unwrap().len(), 6);
        assert!((mesh.face_normal(f).unwrap().z - 1.0).abs() < 1e-12);
        assert!((mesh.face_area(f).unwrap() - 2.0).abs() < 1e-12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_dissolve_fixes_disagreeing_winding() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        // Both triangles run 0 -> 1 along the shared edge
        let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 1, 3]]).unwrap();
        let edge = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();

        let delta = dissolve_edges(&mut mesh, &[edge]);
        let f = delta.created_faces[0];
        assert_eq!(mesh.face(f).unwrap().len(), 4);
        // The first face's winding wins
        assert!((mesh.face_normal(f).unwrap().z - 1.0).abs() < 1e-12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_dissolve_skips_boundary_and_degenerate() {
        let mut mesh = quad_grid(1, 1);
        let edge = mesh.edge_ids().next().unwrap();
        let delta = dissolve_edges(&mut mesh, &[edge, EdgeId::new(40)]);
        assert_eq!(delta.skipped.len(), 2);
        assert_eq!(mesh.num_faces(), 1);

        // A double-sided triangle would collapse entirely
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2], [1, 0, 2]]).unwrap();
        let edge = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        let delta = dissolve_edges(&mut mesh, &[edge]);
        assert_eq!(delta.skipped.len(), 1);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_dissolve_loose_edge() {
        let mut mesh = EditableMesh::<u32>::new();
        let a = mesh.add_vertex(Point3::origin()).unwrap();
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
        let e = mesh.add_edge(a, b).unwrap();

        let delta = dissolve_edges(&mut mesh, &[e]);
        assert_eq!(delta.deleted_edges, vec![e]);
        assert_eq!(mesh.num_edges(), 0);
        assert_eq!(mesh.num_vertices(), 2);
    }

    #[test]
    fn test_dissolve_face_patch() {
        let mut mesh = quad_grid(2, 2);
        let faces: Vec<FaceId> = mesh.face_ids().collect();

        let delta = dissolve_faces(&mut mesh, &faces);
        assert_eq!(delta.created_faces.len(), 1);
        assert_eq!(delta.deleted_faces.len(), 4);
        // The center vertex and the four inner edges are gone
        assert_eq!(delta.deleted_vertices, vec![VertexId::new(4)]);
        assert_eq!(delta.deleted_edges.len(), 4);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 8);

        let f = delta.created_faces[0];
        assert_eq!(mesh.face(f).unwrap().len(), 8);
        assert!((mesh.face_area(f).unwrap() - 4.0).abs() < 1e-12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_dissolve_l_shape() {
        let mut mesh = quad_grid(2, 2);
        let faces: Vec<FaceId> = mesh.face_ids().take(3).collect();

        let delta = dissolve_faces(&mut mesh, &faces);
        assert_eq!(delta.created_faces.len(), 1);
        assert_eq!(mesh.num_faces(), 2);
        assert!((mesh.surface_area() - 4.0).abs() < 1e-12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_dissolve_region_with_hole_is_skipped() {
        let mut mesh = quad_grid(3, 3);
        let faces: Vec<FaceId> = mesh.face_ids().filter(|f| f.index() != 4).collect();

        let delta = dissolve_faces(&mut mesh, &faces);
        assert_eq!(delta.skipped.len(), 1);
        assert!(delta.created_faces.is_empty());
        assert_eq!(mesh.num_faces(), 9);
    }

    #[test]
    fn test_dissolve_closed_shell_is_skipped() {
        let mut mesh: EditableMesh = primitives::cube(1.0).unwrap();
        let faces: Vec<FaceId> = mesh.face_ids().collect();

        let delta = dissolve_faces(&mut mesh, &faces);
        assert_eq!(delta.skipped.len(), 1);
        assert_eq!(mesh.num_faces(), 6);
    }

    #[test]
    fn test_single_face_regions_untouched() {
        let mut mesh = quad_grid(3, 1);
        let faces: Vec<FaceId> = mesh.face_ids().collect();

        let delta = dissolve_faces(&mut mesh, &[faces[0], faces[2]]);
        assert!(delta.is_empty());
        assert_eq!(mesh.face_ids().collect::<Vec<_>>(), faces);
    }
}
