//! Face extrusion.
//!
//! Selected faces are grouped by their normal (quantized to 6 decimals, the
//! same precision the builder uses for positions). Each group is extruded as
//! one region: its vertices are offset along the group normal, and offset
//! vertices are shared between adjacent faces of the group. Every original
//! face is replaced by a cap with the same winding, and each edge on the
//! region's border grows a side quad `(orig[i], orig[i+1], ext[i+1], ext[i])`.
//! Edges shared by two faces of the same group get no side quad; they are
//! removed along with any original vertex left without edges.
//!
//! The face normal is taken from the first three vertices, so a non-planar
//! n-gon is extruded along the normal of its leading corner.

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{
    position_key, EdgeId, EditableMesh, Face, FaceId, MeshIndex, PositionKey, PrimitiveBuilder,
};

use super::{add_face_like, all_uvs, lerp_uv, unique, MeshDelta, Watermark};

struct Group<I: MeshIndex> {
    key: PositionKey,
    normal: Vector3<f64>,
    faces: Vec<Face<I>>,
}

/// Extrude `faces` by `distance` along their normals.
///
/// Fails with `InvalidParameter` if `distance` is not finite. Stale ids,
/// faces without a normal (collinear leading corner) and faces whose
/// extruded corners would weld together are skipped and left in place.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::extrude_faces;
///
/// let mut mesh: EditableMesh = polyedit::primitives::plane(1.0).unwrap();
/// let faces: Vec<FaceId> = mesh.face_ids().collect();
///
/// let delta = extrude_faces(&mut mesh, &faces, 0.25).unwrap();
/// // One cap and four side quads
/// assert_eq!(delta.created_faces.len(), 5);
/// assert_eq!(mesh.num_vertices(), 8);
/// ```
pub fn extrude_faces<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    faces: &[FaceId<I>],
    distance: f64,
) -> Result<MeshDelta<I>> {
    if !distance.is_finite() {
        return Err(MeshError::invalid_param("distance", distance, "must be finite"));
    }

    let mark = Watermark::of(mesh);
    let mut delta = MeshDelta::default();

    let mut groups: Vec<Group<I>> = Vec::new();
    for f in unique(faces) {
        let Some(face) = mesh.face(f).cloned() else {
            delta.skip(ElementKind::Face, f.index(), "face not found");
            continue;
        };
        let Some(normal) = mesh.face_normal(f) else {
            delta.skip(ElementKind::Face, f.index(), "face has no normal");
            continue;
        };
        let Some(key) = position_key(&Point3::from(normal)) else {
            delta.skip(ElementKind::Face, f.index(), "face normal is not finite");
            continue;
        };

        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.faces.push(face),
            None => groups.push(Group {
                key,
                normal,
                faces: vec![face],
            }),
        }
    }

    for group in &groups {
        extrude_group(mesh, &group.faces, group.normal * distance, &mut delta)?;
    }

    mark.finish(mesh, &mut delta);
    debug!(
        groups = groups.len(),
        faces = delta.created_faces.len(),
        skipped = delta.skipped.len(),
        "extrude_faces"
    );
    Ok(delta)
}

fn extrude_group<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    faces: &[Face<I>],
    offset: Vector3<f64>,
    delta: &mut MeshDelta<I>,
) -> Result<()> {
    // Faces that cannot be rebuilt stay in the mesh untouched
    let faces: Vec<&Face<I>> = faces
        .iter()
        .filter(|face| match check_face(mesh, face, offset) {
            Ok(()) => true,
            Err(reason) => {
                delta.skip(ElementKind::Face, face.id.index(), reason);
                false
            }
        })
        .collect();
    if faces.is_empty() {
        return Ok(());
    }

    let mut uses: HashMap<EdgeId<I>, usize> = HashMap::new();
    for face in &faces {
        for &e in &face.edge_ids {
            *uses.entry(e).or_default() += 1;
        }
    }

    // A fresh vertex cache per group: offset vertices are shared inside the
    // region but never with another group or the original geometry.
    let mut builder = PrimitiveBuilder::for_edit(mesh);
    for face in &faces {
        delta.remove_face(builder.mesh_mut(), face.id)?;
    }

    for &face in &faces {
        let n = face.len();
        let mut ext = Vec::with_capacity(n);
        for &v in &face.vertex_ids {
            let p = builder
                .mesh()
                .position(v)
                .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, v.index()))?;
            ext.push(builder.add_vertex(p + offset)?);
        }

        let cap_uvs = face.uvs.as_ref().and_then(|list| {
            all_uvs(
                list.iter()
                    .zip(&ext)
                    .map(|(&uv, &v)| lerp_uv(builder.mesh_mut(), uv, uv, 0.0, v)),
            )
        });
        add_face_like(&mut builder, &ext, face, cap_uvs)?;

        for i in 0..n {
            if uses.get(&face.edge_ids[i]).copied().unwrap_or(0) > 1 {
                continue;
            }
            let j = (i + 1) % n;
            let side = [face.vertex_ids[i], face.vertex_ids[j], ext[j], ext[i]];
            add_face_like(&mut builder, &side, face, None)?;
        }
    }

    let edges: Vec<EdgeId<I>> = faces.iter().flat_map(|f| f.edge_ids.iter().copied()).collect();
    let vertices: Vec<_> = faces.iter().flat_map(|f| f.vertex_ids.iter().copied()).collect();
    delta.prune(builder.mesh_mut(), edges, unique(&vertices))
}

/// Check that `face` can be replaced by a cap and side quads.
///
/// Corners whose offset positions share a dedup key would be welded into
/// one vertex, leaving a ring that repeats an id.
fn check_face<I: MeshIndex>(
    mesh: &EditableMesh<I>,
    face: &Face<I>,
    offset: Vector3<f64>,
) -> std::result::Result<(), String> {
    let mut seen: HashSet<PositionKey> = HashSet::with_capacity(face.len());
    for &v in &face.vertex_ids {
        let p = mesh
            .position(v)
            .ok_or_else(|| MeshError::missing_ref(ElementKind::Vertex, v.index()).to_string())?;
        if let Some(key) = position_key(&(p + offset)) {
            if !seen.insert(key) {
                return Err(format!("extruded corners of face {} coincide", face.id));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::merge_specific_vertices;
    use crate::algo::test_meshes::{ngon, quad_grid};
    use crate::mesh::{build_from_triangles, topology, validate_mesh_topology, VertexId};
    use crate::primitives;

    fn assert_valid(mesh: &EditableMesh) {
        let report = validate_mesh_topology(mesh);
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_extrude_single_quad() {
        let mut mesh = quad_grid(1, 1);
        let f = mesh.face_ids().next().unwrap();

        let delta = extrude_faces(&mut mesh, &[f], 1.0).unwrap();
        assert_eq!(delta.deleted_faces, vec![f]);
        assert_eq!(delta.created_vertices.len(), 4);
        assert_eq!(delta.created_faces.len(), 5);
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(mesh.num_edges(), 12);

        // The cap keeps the winding and sits one unit up
        let cap = delta.created_faces[0];
        let n = mesh.face_normal(cap).unwrap();
        assert!((n.z - 1.0).abs() < 1e-12);
        for p in mesh.face_positions(cap).unwrap() {
            assert!((p.z - 1.0).abs() < 1e-12);
        }
        assert_valid(&mesh);
    }

    #[test]
    fn test_region_shares_offset_vertices() {
        let mut mesh = quad_grid(2, 1);
        let faces: Vec<FaceId> = mesh.face_ids().collect();

        let delta = extrude_faces(&mut mesh, &faces, 0.5).unwrap();
        // Six shared offset vertices, two caps and one side per border edge
        assert_eq!(delta.created_vertices.len(), 6);
        assert_eq!(mesh.num_faces(), 2 + 6);
        // The old interior edge is gone
        assert_eq!(delta.deleted_edges.len(), 1);
        assert_eq!(mesh.num_vertices(), 12);
        assert_valid(&mesh);
    }

    #[test]
    fn test_extrude_cube_face_stays_closed() {
        let mut mesh: EditableMesh = primitives::cube(2.0).unwrap();
        let f = mesh.face_ids().next().unwrap();
        let centroid = mesh.face_centroid(f).unwrap();

        let delta = extrude_faces(&mut mesh, &[f], 1.0).unwrap();
        assert!(topology::is_closed(&mesh));
        assert_eq!(mesh.num_faces(), 10);
        let chi = mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64;
        assert_eq!(chi, 2);

        // The cap moved outwards
        let cap = mesh.face_centroid(delta.created_faces[0]).unwrap();
        assert!(cap.coords.norm() > centroid.coords.norm());
        assert_valid(&mesh);
    }

    #[test]
    fn test_groups_by_normal() {
        let mut mesh: EditableMesh = primitives::cube(2.0).unwrap();
        let faces: Vec<FaceId> = mesh.face_ids().take(2).collect();

        let delta = extrude_faces(&mut mesh, &faces, 0.5).unwrap();
        // Each face is its own group: 4 offset vertices, a cap and 4 sides
        assert_eq!(delta.created_vertices.len(), 8);
        assert_eq!(delta.created_faces.len(), 10);
        assert_valid(&mesh);
    }

    #[test]
    fn test_material_carries_to_cap() {
        let mut mesh = quad_grid(1, 1);
        let f = mesh.face_ids().next().unwrap();
        let m = mesh.add_material("paint").unwrap();
        mesh.set_face_material(f, Some(m)).unwrap();

        let delta = extrude_faces(&mut mesh, &[f], 1.0).unwrap();
        assert_eq!(mesh.face(delta.created_faces[0]).unwrap().material, Some(m));
    }

    #[test]
    fn test_degenerate_face_is_skipped_and_kept() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e-7, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        let (sliver, good) = (faces[0], faces[1]);
        let before = mesh.face(sliver).unwrap().clone();

        // Both face +Z and land in one group
        let delta = extrude_faces(&mut mesh, &faces, 1.0).unwrap();
        assert_eq!(delta.skipped.len(), 1);
        assert_eq!(delta.skipped[0].id, sliver.index());

        let kept = mesh.face(sliver).unwrap();
        assert_eq!(kept.vertex_ids, before.vertex_ids);
        assert_eq!(kept.edge_ids, before.edge_ids);

        assert_eq!(delta.deleted_faces, vec![good]);
        assert!(!mesh.contains_face(good));
        // A cap and three sides
        assert_eq!(delta.created_faces.len(), 4);
        assert_eq!(mesh.num_faces(), 5);
        assert_valid(&mesh);
    }

    #[test]
    fn test_pinched_face_is_skipped_and_kept() {
        let mut mesh = ngon(5);
        let ids: Vec<VertexId> = mesh.vertex_ids().collect();
        merge_specific_vertices(&mut mesh, &[ids[0], ids[3]]).unwrap();
        let f = mesh.face_ids().next().unwrap();
        let before = mesh.face(f).unwrap().clone();
        assert_eq!(before.vertex_ids[0], before.vertex_ids[3]);

        let delta = extrude_faces(&mut mesh, &[f], 1.0).unwrap();
        assert_eq!(delta.skipped.len(), 1);
        assert!(delta.created_faces.is_empty());
        assert!(delta.deleted_faces.is_empty());
        assert_eq!(mesh.face(f).unwrap().vertex_ids, before.vertex_ids);
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_invalid_distance_and_stale_ids() {
        let mut mesh = quad_grid(1, 1);
        let f = mesh.face_ids().next().unwrap();
        assert!(matches!(
            extrude_faces(&mut mesh, &[f], f64::NAN),
            Err(MeshError::InvalidParameter { .. })
        ));

        let delta = extrude_faces(&mut mesh, &[FaceId::new(9)], 1.0).unwrap();
        assert_eq!(delta.skipped.len(), 1);
        assert!(delta.created_faces.is_empty());
        assert_eq!(mesh.num_faces(), 1);

        let delta = extrude_faces(&mut mesh, &[], 1.0).unwrap();
        assert!(delta.is_empty());
    }
}
