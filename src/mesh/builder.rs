//! Deduplicating mesh construction.
//!
//! [`PrimitiveBuilder`] wraps an [`EditableMesh`] for one construction or
//! edit session and guarantees that asking twice for "the same" vertex or
//! edge yields the same id:
//!
//! - vertices are keyed by their position rounded to 6 decimal places, with
//!   `-0.0` and `0.0` treated as equal;
//! - edges are keyed by their unordered endpoint pair.
//!
//! The keys live in a [`DedupCache`], which is an ordinary value. A builder
//! holds the mesh by `&mut`, so only one builder can be live on a mesh at a
//! time; to continue deduplicating across sessions, take the cache out with
//! [`PrimitiveBuilder::into_cache`] and hand it to the next builder with
//! [`PrimitiveBuilder::with_cache`]. A fresh cache knows nothing about
//! geometry already in the mesh, so a second session started from an empty
//! cache can recreate existing vertices and edges.
//!
//! The free functions [`build_from_triangles`], [`build_from_quads`] and
//! [`build_from_polygons`] build a mesh from face-vertex lists as commonly
//! found in mesh file formats.

use std::collections::HashMap;

use nalgebra::Point3;

use super::editable::{edge_key, EditableMesh};
use super::index::{EdgeId, FaceId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Number of decimal places kept in a vertex position key.
pub const POSITION_DECIMALS: i32 = 6;

const POSITION_SCALE: f64 = 1e6;

/// Rounded, sign-normalized position key.
pub type PositionKey = [i64; 3];

/// Compute the deduplication key of a position.
///
/// Returns `None` for non-finite coordinates, which never deduplicate.
pub fn position_key(p: &Point3<f64>) -> Option<PositionKey> {
    if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
        return None;
    }
    // Integer keys have a single zero, so -0.0 and 0.0 collapse here.
    let q = |c: f64| (c * POSITION_SCALE).round() as i64;
    Some([q(p.x), q(p.y), q(p.z)])
}

/// Vertex and edge keys remembered by a builder session.
#[derive(Debug, Clone)]
pub struct DedupCache<I: MeshIndex = u32> {
    vertices: HashMap<PositionKey, VertexId<I>>,
    edges: HashMap<(VertexId<I>, VertexId<I>), EdgeId<I>>,
}

impl<I: MeshIndex> Default for DedupCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> DedupCache<I> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Create a cache that knows every edge currently in `mesh`.
    ///
    /// Vertices are not seeded, so new vertices are only merged with ones
    /// created in the same session.
    pub fn edges_of(mesh: &EditableMesh<I>) -> Self {
        let mut cache = Self::new();
        for edge in mesh.edges() {
            cache.edges.entry(edge.key()).or_insert(edge.id);
        }
        cache
    }

    /// Create a cache that knows every vertex and edge currently in `mesh`.
    ///
    /// When several vertices share a key the earliest one wins.
    pub fn seeded_from(mesh: &EditableMesh<I>) -> Self {
        let mut cache = Self::edges_of(mesh);
        for v in mesh.vertices() {
            if let Some(key) = position_key(&v.position) {
                cache.vertices.entry(key).or_insert(v.id);
            }
        }
        cache
    }

    /// Number of remembered vertex keys.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of remembered edge keys.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
    }
}

/// Session-scoped deduplicating builder over an [`EditableMesh`].
///
/// # Example
///
/// ```
/// use polyedit::mesh::{EditableMesh, PrimitiveBuilder};
/// use nalgebra::Point3;
///
/// let mut mesh: EditableMesh = EditableMesh::new();
/// let mut builder = PrimitiveBuilder::new(&mut mesh);
///
/// let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
/// let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
/// let c = builder.add_vertex(Point3::new(0.0, 1.0, 0.0)).unwrap();
/// let d = builder.add_vertex(Point3::new(1.0, 1.0, 0.0)).unwrap();
///
/// builder.add_triangle([a, b, c]).unwrap();
/// builder.add_triangle([c, b, d]).unwrap();
///
/// // The shared edge b-c was only created once
/// assert_eq!(mesh.num_edges(), 5);
/// ```
#[derive(Debug)]
pub struct PrimitiveBuilder<'m, I: MeshIndex = u32> {
    mesh: &'m mut EditableMesh<I>,
    cache: DedupCache<I>,
}

impl<'m, I: MeshIndex> PrimitiveBuilder<'m, I> {
    /// Start a session with an empty cache.
    pub fn new(mesh: &'m mut EditableMesh<I>) -> Self {
        Self::with_cache(mesh, DedupCache::new())
    }

    /// Start a session with a cache carried over from an earlier one.
    pub fn with_cache(mesh: &'m mut EditableMesh<I>, cache: DedupCache<I>) -> Self {
        Self { mesh, cache }
    }

    /// Start an editing session: the cache is seeded with the mesh's edges so
    /// recreated faces reuse surviving edges.
    pub fn for_edit(mesh: &'m mut EditableMesh<I>) -> Self {
        let cache = DedupCache::edges_of(mesh);
        Self::with_cache(mesh, cache)
    }

    /// The mesh under construction.
    pub fn mesh(&self) -> &EditableMesh<I> {
        &*self.mesh
    }

    /// Mutable access to the mesh, for removals and attribute updates.
    ///
    /// Cached ids whose element is removed through this handle are detected
    /// and recreated on the next request.
    pub fn mesh_mut(&mut self) -> &mut EditableMesh<I> {
        &mut *self.mesh
    }

    /// End the session and keep its cache.
    pub fn into_cache(self) -> DedupCache<I> {
        self.cache
    }

    /// Return the vertex at `position`, creating it if this session has not
    /// seen an equal (to 6 decimals) position yet.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> Result<VertexId<I>> {
        self.vertex_with(position, None)
    }

    /// Like [`add_vertex`](Self::add_vertex); the name only applies when a
    /// vertex is actually created.
    pub fn add_vertex_named(&mut self, position: Point3<f64>, name: impl Into<String>) -> Result<VertexId<I>> {
        self.vertex_with(position, Some(name.into()))
    }

    fn vertex_with(&mut self, position: Point3<f64>, name: Option<String>) -> Result<VertexId<I>> {
        let key = position_key(&position);
        if let Some(id) = key.and_then(|k| self.cache.vertices.get(&k).copied()) {
            if self.mesh.contains_vertex(id) {
                return Ok(id);
            }
        }

        let id = match name {
            Some(name) => self.mesh.add_vertex_named(position, name)?,
            None => self.mesh.add_vertex(position)?,
        };
        if let Some(key) = key {
            self.cache.vertices.insert(key, id);
        }
        Ok(id)
    }

    /// Return the edge joining `a` and `b`, creating it if needed.
    pub fn add_edge(&mut self, a: VertexId<I>, b: VertexId<I>) -> Result<EdgeId<I>> {
        self.edge_with(a, b, None)
    }

    /// Like [`add_edge`](Self::add_edge) with a name for a newly created edge.
    pub fn add_edge_named(
        &mut self,
        a: VertexId<I>,
        b: VertexId<I>,
        name: impl Into<String>,
    ) -> Result<EdgeId<I>> {
        self.edge_with(a, b, Some(name.into()))
    }

    fn edge_with(&mut self, a: VertexId<I>, b: VertexId<I>, name: Option<String>) -> Result<EdgeId<I>> {
        let key = edge_key(a, b);
        if let Some(&id) = self.cache.edges.get(&key) {
            if self.mesh.contains_edge(id) {
                return Ok(id);
            }
        }

        let id = match name {
            Some(name) => self.mesh.add_edge_named(key.0, key.1, name)?,
            None => self.mesh.add_edge(key.0, key.1)?,
        };
        self.cache.edges.insert(key, id);
        Ok(id)
    }

    /// Add a triangle, deriving its edges.
    pub fn add_triangle(&mut self, vertices: [VertexId<I>; 3]) -> Result<FaceId<I>> {
        self.add_ngon(&vertices)
    }

    /// Add a quad, deriving its edges.
    pub fn add_quad(&mut self, vertices: [VertexId<I>; 4]) -> Result<FaceId<I>> {
        self.add_ngon(&vertices)
    }

    /// Add a face with any number (≥ 3) of vertices, deriving its edges.
    pub fn add_ngon(&mut self, vertices: &[VertexId<I>]) -> Result<FaceId<I>> {
        let edges = self.ring_edges(vertices)?;
        self.mesh.add_face(vertices, &edges)
    }

    /// Like [`add_ngon`](Self::add_ngon) with a face name.
    pub fn add_ngon_named(&mut self, vertices: &[VertexId<I>], name: impl Into<String>) -> Result<FaceId<I>> {
        let edges = self.ring_edges(vertices)?;
        self.mesh.add_face_named(vertices, &edges, name)
    }

    fn ring_edges(&mut self, vertices: &[VertexId<I>]) -> Result<Vec<EdgeId<I>>> {
        let n = vertices.len();
        if n < 3 {
            return Err(MeshError::topology(format!(
                "face needs at least 3 vertices, got {}",
                n
            )));
        }
        (0..n)
            .map(|i| self.add_edge(vertices[i], vertices[(i + 1) % n]))
            .collect()
    }
}

/// Build a mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use polyedit::mesh::{build_from_triangles, EditableMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: EditableMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_edges(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<EditableMesh<I>> {
    build_from_polygons(vertices, faces.iter().map(|f| f.as_slice()))
}

/// Build a mesh from vertices and quad faces.
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<EditableMesh<I>> {
    build_from_polygons(vertices, faces.iter().map(|f| f.as_slice()))
}

/// Build a mesh from vertices and polygon faces of any size.
///
/// Every input vertex becomes one mesh vertex (coincident positions are not
/// merged); edges shared between faces are created once.
pub fn build_from_polygons<'a, I, F>(vertices: &[Point3<f64>], faces: F) -> Result<EditableMesh<I>>
where
    I: MeshIndex,
    F: IntoIterator<Item = &'a [usize]>,
{
    let mut mesh = EditableMesh::new();
    let ids: Vec<VertexId<I>> = vertices
        .iter()
        .map(|&p| mesh.add_vertex(p))
        .collect::<Result<_>>()?;

    let mut builder = PrimitiveBuilder::new(&mut mesh);
    for (fi, face) in faces.into_iter().enumerate() {
        let ring = face
            .iter()
            .map(|&vi| {
                ids.get(vi).copied().ok_or_else(|| {
                    MeshError::topology(format!("face {} references invalid vertex index {}", fi, vi))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        builder.add_ngon(&ring)?;
    }
    drop(builder);

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_dedup_within_precision() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);

        let a = builder.add_vertex(Point3::new(1.0000001, 0.0, 0.0)).unwrap();
        let b = builder.add_vertex(Point3::new(1.0000002, 0.0, 0.0)).unwrap();
        assert_eq!(a, b);

        let c = builder.add_vertex(Point3::new(1.00, 0.0, 0.0)).unwrap();
        let d = builder.add_vertex(Point3::new(1.01, 0.0, 0.0)).unwrap();
        assert_ne!(c, d);
        drop(builder);

        assert_eq!(mesh.num_vertices(), 2);
    }

    #[test]
    fn test_signed_zero_dedup() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let a = builder.add_vertex(Point3::new(0.0, -0.0, 0.0)).unwrap();
        let b = builder.add_vertex(Point3::new(-0.0, 0.0, -0.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(position_key(&Point3::new(-0.0, 0.0, 0.0)), Some([0, 0, 0]));
    }

    #[test]
    fn test_non_finite_never_dedups() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let a = builder.add_vertex(Point3::new(f64::NAN, 0.0, 0.0)).unwrap();
        let b = builder.add_vertex(Point3::new(f64::NAN, 0.0, 0.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_edge_dedup_is_unordered() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();

        let e0 = builder.add_edge(b, a).unwrap();
        let e1 = builder.add_edge(a, b).unwrap();
        assert_eq!(e0, e1);
        drop(builder);

        // The stored pair is canonical (smaller id first)
        assert_eq!(mesh.edge(e0).unwrap().vertices, [a, b]);
    }

    #[test]
    fn test_add_quad_derives_edges() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let v: Vec<VertexId> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| builder.add_vertex(Point3::new(x, y, 0.0)).unwrap())
            .collect();
        let f = builder.add_quad([v[0], v[1], v[2], v[3]]).unwrap();
        drop(builder);

        let face = mesh.face(f).unwrap();
        assert_eq!(face.edge_ids.len(), 4);
        for (i, (a, b)) in face.vertex_pairs().enumerate() {
            assert!(mesh.edge(face.edge_ids[i]).unwrap().connects(a, b));
        }
    }

    #[test]
    fn test_add_ngon_rejects_short_ring() {
        let mut mesh = EditableMesh::<u32>::new();
        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(matches!(
            builder.add_ngon(&[a, b]),
            Err(MeshError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_independent_sessions_can_duplicate() {
        let mut mesh = EditableMesh::<u32>::new();
        let p = Point3::new(3.0, 2.0, 1.0);

        let first = PrimitiveBuilder::new(&mut mesh).add_vertex(p).unwrap();
        let second = PrimitiveBuilder::new(&mut mesh).add_vertex(p).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_cache_carries_across_sessions() {
        let mut mesh = EditableMesh::<u32>::new();
        let p = Point3::new(3.0, 2.0, 1.0);

        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let first = builder.add_vertex(p).unwrap();
        let cache = builder.into_cache();

        let second = PrimitiveBuilder::with_cache(&mut mesh, cache).add_vertex(p).unwrap();
        assert_eq!(first, second);
        assert_eq!(mesh.num_vertices(), 1);
    }

    #[test]
    fn test_stale_cache_entry_is_recreated() {
        let mut mesh = EditableMesh::<u32>::new();
        let p = Point3::new(1.0, 1.0, 1.0);

        let mut builder = PrimitiveBuilder::new(&mut mesh);
        let first = builder.add_vertex(p).unwrap();
        builder.mesh_mut().remove_vertex(first).unwrap();
        let second = builder.add_vertex(p).unwrap();
        assert_ne!(first, second);
        assert!(builder.mesh().contains_vertex(second));
    }

    #[test]
    fn test_for_edit_reuses_existing_edges() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mut mesh: EditableMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let ids: Vec<VertexId> = mesh.vertex_ids().collect();

        let mut builder = PrimitiveBuilder::for_edit(&mut mesh);
        builder.add_triangle([ids[0], ids[2], ids[1]]).unwrap();
        drop(builder);

        assert_eq!(mesh.num_edges(), 3);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_build_from_polygons_mixed() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.5, 0.0),
        ];
        let faces: Vec<Vec<usize>> = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
        let mesh: EditableMesh =
            build_from_polygons(&vertices, faces.iter().map(|f| f.as_slice())).unwrap();

        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 2);
        // 4 quad edges + 2 new triangle edges (1-2 shared)
        assert_eq!(mesh.num_edges(), 6);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let faces = vec![[0, 1, 2]]; // Indices 1 and 2 are invalid

        let result: Result<EditableMesh<u32>> = build_from_triangles(&vertices, &faces);
        assert!(result.is_err());
    }

    #[test]
    fn test_degenerate_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 0, 2]]; // Degenerate: v0 == v1

        let result: Result<EditableMesh<u32>> = build_from_triangles(&vertices, &faces);
        assert!(result.is_err());
    }
}
