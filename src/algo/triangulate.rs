//! Re-tessellation of faces into triangles or quads.
//!
//! Both operators split a face along diagonals from its first vertex, so
//! they are exact for convex faces and for star-shaped faces whose kernel
//! contains vertex 0. Each piece inherits the face's name, material and
//! per-corner UVs.

use tracing::debug;

use crate::error::{ElementKind, MeshError, Result};
use crate::mesh::{EditableMesh, Face, FaceId, MeshIndex, PrimitiveBuilder, VertexId};

use super::{add_face_like, skipped, unique, Batch, Skipped};

/// Corner indices of a triangle fan over an `n`-gon, anchored on corner 0.
pub(crate) fn fan(n: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..n.saturating_sub(1)).map(|i| [0, i, i + 1])
}

/// Corner index lists splitting an `n`-gon into quads anchored on corner 0.
///
/// Quads `(0, i, i+1, i+2)` for `i = 1, 3, 5, …`; when one corner is left
/// over, a trailing triangle `(0, n-2, n-1)` closes the face.
pub(crate) fn quad_strip(n: usize) -> Vec<Vec<usize>> {
    let mut pieces = Vec::new();
    let mut i = 1;
    while i + 2 < n {
        pieces.push(vec![0, i, i + 1, i + 2]);
        i += 2;
    }
    if i + 1 < n {
        pieces.push(vec![0, i, i + 1]);
    }
    pieces
}

/// Result of [`quadrangulate_faces`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadrangulateResult<I: MeshIndex = u32> {
    /// Faces created, in creation order.
    pub new_faces: Vec<FaceId<I>>,
    /// N-gons that were replaced.
    pub deleted_faces: Vec<FaceId<I>>,
    /// Selected faces that could not be processed.
    pub skipped: Vec<Skipped>,
}

/// Split each selected face into a triangle fan from its first vertex.
///
/// Triangles pass through untouched and are returned with their own id.
/// The output lists every resulting triangle in selection order.
///
/// # Example
///
/// ```
/// use polyedit::prelude::*;
/// use polyedit::algo::triangulate_faces;
///
/// let mut mesh: EditableMesh = polyedit::primitives::cube(1.0).unwrap();
/// let faces: Vec<FaceId> = mesh.face_ids().collect();
///
/// let batch = triangulate_faces(&mut mesh, &faces);
/// assert_eq!(batch.items.len(), 12);
/// assert!(mesh.is_triangle_mesh());
/// ```
pub fn triangulate_faces<I: MeshIndex>(mesh: &mut EditableMesh<I>, faces: &[FaceId<I>]) -> Batch<FaceId<I>> {
    let mut batch = Batch::default();
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    for f in unique(faces) {
        let Some(face) = builder.mesh().face(f).cloned() else {
            batch
                .skipped
                .push(skipped(ElementKind::Face, f.index(), "face not found"));
            continue;
        };
        if face.is_triangle() {
            batch.items.push(f);
            continue;
        }

        let pieces: Vec<Vec<usize>> = fan(face.len()).map(|c| c.to_vec()).collect();
        match replace_face(&mut builder, &face, &pieces) {
            Ok(new) => batch.items.extend(new),
            Err(err) => batch
                .skipped
                .push(skipped(ElementKind::Face, f.index(), err.to_string())),
        }
    }

    debug!(
        triangles = batch.items.len(),
        skipped = batch.skipped.len(),
        "triangulate_faces"
    );
    batch
}

/// Split each selected n-gon into quads anchored on its first vertex, with a
/// trailing triangle when the corner count is odd.
///
/// Triangles and quads are left untouched and do not appear in the result.
pub fn quadrangulate_faces<I: MeshIndex>(
    mesh: &mut EditableMesh<I>,
    faces: &[FaceId<I>],
) -> QuadrangulateResult<I> {
    let mut result = QuadrangulateResult {
        new_faces: Vec::new(),
        deleted_faces: Vec::new(),
        skipped: Vec::new(),
    };
    let mut builder = PrimitiveBuilder::for_edit(mesh);

    for f in unique(faces) {
        let Some(face) = builder.mesh().face(f).cloned() else {
            result
                .skipped
                .push(skipped(ElementKind::Face, f.index(), "face not found"));
            continue;
        };
        if face.len() <= 4 {
            continue;
        }

        match replace_face(&mut builder, &face, &quad_strip(face.len())) {
            Ok(new) => {
                result.new_faces.extend(new);
                result.deleted_faces.push(f);
            }
            Err(err) => result
                .skipped
                .push(skipped(ElementKind::Face, f.index(), err.to_string())),
        }
    }

    debug!(
        new = result.new_faces.len(),
        replaced = result.deleted_faces.len(),
        skipped = result.skipped.len(),
        "quadrangulate_faces"
    );
    result
}

/// Remove `face` and create one face per corner index list in `pieces`.
///
/// Every piece is checked before the face is touched; a piece that would
/// repeat a vertex fails the call and leaves the face as it was.
fn replace_face<I: MeshIndex>(
    builder: &mut PrimitiveBuilder<'_, I>,
    face: &Face<I>,
    pieces: &[Vec<usize>],
) -> Result<Vec<FaceId<I>>> {
    let rings: Vec<Vec<VertexId<I>>> = pieces
        .iter()
        .map(|corners| corners.iter().map(|&c| face.vertex_ids[c]).collect())
        .collect();
    for ring in &rings {
        if unique(ring).len() != ring.len() {
            return Err(MeshError::topology(format!(
                "face {} repeats a vertex, piece {:?} would be degenerate",
                face.id, ring
            )));
        }
    }

    builder.mesh_mut().remove_face(face.id)?;

    let mut created = Vec::with_capacity(pieces.len());
    for (corners, ring) in pieces.iter().zip(&rings) {
        let uvs = face
            .uvs
            .as_ref()
            .map(|list| corners.iter().map(|&c| list[c]).collect());
        created.push(add_face_like(builder, ring, face, uvs)?);
    }
    Ok(created)
}
