//! Editable polygon mesh store.
//!
//! [`EditableMesh`] owns every element of a polygon mesh in ordered,
//! id-keyed collections. Faces may be triangles, quads or n-gons; each face
//! stores its vertex ring together with a parallel ring of edge ids, so that
//! `edge_ids[i]` joins `vertex_ids[i]` and `vertex_ids[(i + 1) % n]`.
//!
//! # Low-level contract
//!
//! The store is deliberately permissive. It checks that referenced elements
//! exist and that face rings have matching lengths, but it does not prevent
//! duplicate edges and it never cascades a removal: removing a vertex leaves
//! any edge that names it dangling. Higher layers ([`PrimitiveBuilder`] and
//! the editing operators) keep the mesh sound, and
//! [`validate_mesh_topology`] reports anything that slipped through.
//!
//! # Adjacency
//!
//! Vertices track their incident edges and edges track their incident faces.
//! Both sets are maintained incrementally on every insert and removal.
//!
//! [`PrimitiveBuilder`]: super::PrimitiveBuilder
//! [`validate_mesh_topology`]: super::validate_mesh_topology

use indexmap::IndexMap;
use nalgebra::{Point2, Point3, Vector3};

use super::index::{EdgeId, FaceId, IdAllocator, MaterialId, MeshIndex, UvId, VertexId};
use crate::error::{MeshError, Result};

/// A vertex in the editable mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The vertex id.
    pub id: VertexId<I>,

    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Optional display name.
    pub name: Option<String>,

    pub(crate) edges: Vec<EdgeId<I>>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Edges that reference this vertex, in creation order.
    pub fn edges(&self) -> &[EdgeId<I>] {
        &self.edges
    }
}

/// An edge joining two distinct vertices.
#[derive(Debug, Clone)]
pub struct Edge<I: MeshIndex = u32> {
    /// The edge id.
    pub id: EdgeId<I>,

    /// The two endpoints, in the order they were given at creation.
    pub vertices: [VertexId<I>; 2],

    /// Optional display name.
    pub name: Option<String>,

    pub(crate) faces: Vec<FaceId<I>>,
}

impl<I: MeshIndex> Edge<I> {
    /// Faces that reference this edge, in creation order.
    pub fn faces(&self) -> &[FaceId<I>] {
        &self.faces
    }

    /// Returns true if this edge connects the given vertices (in either direction).
    pub fn connects(&self, a: VertexId<I>, b: VertexId<I>) -> bool {
        let [v0, v1] = self.vertices;
        (v0 == a && v1 == b) || (v0 == b && v1 == a)
    }

    /// Returns true if `v` is one of the endpoints.
    pub fn contains(&self, v: VertexId<I>) -> bool {
        self.vertices[0] == v || self.vertices[1] == v
    }

    /// Returns the other endpoint of this edge.
    pub fn other_vertex(&self, v: VertexId<I>) -> Option<VertexId<I>> {
        let [v0, v1] = self.vertices;
        if v0 == v {
            Some(v1)
        } else if v1 == v {
            Some(v0)
        } else {
            None
        }
    }

    /// The unordered endpoint pair with the smaller id first.
    pub fn key(&self) -> (VertexId<I>, VertexId<I>) {
        edge_key(self.vertices[0], self.vertices[1])
    }
}

/// Classification of a face by its vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    /// Fewer than three vertices.
    Degenerate,
    /// Three vertices.
    Triangle,
    /// Four vertices.
    Quad,
    /// More than four vertices.
    NGon,
}

impl FaceKind {
    /// Classify a vertex count.
    pub fn from_len(n: usize) -> Self {
        match n {
            0..=2 => FaceKind::Degenerate,
            3 => FaceKind::Triangle,
            4 => FaceKind::Quad,
            _ => FaceKind::NGon,
        }
    }
}

/// A polygonal face.
#[derive(Debug, Clone)]
pub struct Face<I: MeshIndex = u32> {
    /// The face id.
    pub id: FaceId<I>,

    /// Vertex ring; its order defines the winding.
    pub vertex_ids: Vec<VertexId<I>>,

    /// Edge ring, parallel to `vertex_ids`.
    pub edge_ids: Vec<EdgeId<I>>,

    /// Optional display name.
    pub name: Option<String>,

    /// Optional material assignment.
    pub material: Option<MaterialId<I>>,

    /// Optional per-corner UVs, parallel to `vertex_ids`.
    pub uvs: Option<Vec<UvId<I>>>,
}

impl<I: MeshIndex> Face<I> {
    /// Number of vertices in the ring.
    pub fn len(&self) -> usize {
        self.vertex_ids.len()
    }

    /// Returns true if the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty()
    }

    /// Classify this face by vertex count.
    pub fn kind(&self) -> FaceKind {
        FaceKind::from_len(self.vertex_ids.len())
    }

    /// Returns true if this is a triangle.
    pub fn is_triangle(&self) -> bool {
        self.vertex_ids.len() == 3
    }

    /// Returns true if this is a quad.
    pub fn is_quad(&self) -> bool {
        self.vertex_ids.len() == 4
    }

    /// Position of `v` in the vertex ring.
    pub fn position_of(&self, v: VertexId<I>) -> Option<usize> {
        self.vertex_ids.iter().position(|&x| x == v)
    }

    /// Consecutive vertex pairs `(v[i], v[i + 1])`, wrapping around.
    pub fn vertex_pairs(&self) -> impl Iterator<Item = (VertexId<I>, VertexId<I>)> + '_ {
        let n = self.vertex_ids.len();
        (0..n).map(move |i| (self.vertex_ids[i], self.vertex_ids[(i + 1) % n]))
    }

    /// UV at corner `i`, if this face carries UVs.
    pub fn uv_at(&self, i: usize) -> Option<UvId<I>> {
        self.uvs.as_ref().and_then(|uvs| uvs.get(i).copied())
    }
}

/// A descriptive material referenced by faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Material<I: MeshIndex = u32> {
    /// The material id.
    pub id: MaterialId<I>,
    /// Material name.
    pub name: String,
    /// Optional RGB color.
    pub color: Option<[f64; 3]>,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Whether the material is rendered transparent.
    pub transparent: bool,
}

/// A texture coordinate owned by a vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct UvCoord<I: MeshIndex = u32> {
    /// The UV id.
    pub id: UvId<I>,
    /// The vertex this coordinate belongs to.
    pub vertex: VertexId<I>,
    /// The 2D coordinate.
    pub coord: Point2<f64>,
}

/// Canonical key of an unordered vertex pair (smaller id first).
#[inline]
pub fn edge_key<I: MeshIndex>(a: VertexId<I>, b: VertexId<I>) -> (VertexId<I>, VertexId<I>) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// An editable polygon mesh.
///
/// Elements are stored in insertion order and addressed by id in O(1).
/// Ids come from the mesh's own [`IdAllocator`] and are never reused.
#[derive(Debug, Clone)]
pub struct EditableMesh<I: MeshIndex = u32> {
    vertices: IndexMap<VertexId<I>, Vertex<I>>,
    edges: IndexMap<EdgeId<I>, Edge<I>>,
    faces: IndexMap<FaceId<I>, Face<I>>,
    uvs: IndexMap<UvId<I>, UvCoord<I>>,
    materials: IndexMap<MaterialId<I>, Material<I>>,
    ids: IdAllocator,
}

impl<I: MeshIndex> Default for EditableMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> EditableMesh<I> {
    /// Create a new empty mesh with a fresh id allocator.
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::new())
    }

    /// Create a new empty mesh that draws ids from `ids`.
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            vertices: IndexMap::new(),
            edges: IndexMap::new(),
            faces: IndexMap::new(),
            uvs: IndexMap::new(),
            materials: IndexMap::new(),
            ids,
        }
    }

    /// The id allocator of this mesh.
    pub fn allocator(&self) -> &IdAllocator {
        &self.ids
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of UV coordinates.
    #[inline]
    pub fn num_uvs(&self) -> usize {
        self.uvs.len()
    }

    /// Get the number of materials.
    #[inline]
    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    /// Returns true if the mesh holds no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get a vertex by id.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> Option<&Vertex<I>> {
        self.vertices.get(&id)
    }

    /// Get an edge by id.
    #[inline]
    pub fn edge(&self, id: EdgeId<I>) -> Option<&Edge<I>> {
        self.edges.get(&id)
    }

    /// Get a face by id.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> Option<&Face<I>> {
        self.faces.get(&id)
    }

    /// Get a UV coordinate by id.
    #[inline]
    pub fn uv(&self, id: UvId<I>) -> Option<&UvCoord<I>> {
        self.uvs.get(&id)
    }

    /// Get a material by id.
    #[inline]
    pub fn material(&self, id: MaterialId<I>) -> Option<&Material<I>> {
        self.materials.get(&id)
    }

    /// Get a mutable material by id. Materials are descriptive only.
    pub fn material_mut(&mut self, id: MaterialId<I>) -> Option<&mut Material<I>> {
        self.materials.get_mut(&id)
    }

    /// Get a vertex by id, or a `NotFound` error.
    pub fn require_vertex(&self, id: VertexId<I>) -> Result<&Vertex<I>> {
        self.vertex(id)
            .ok_or_else(|| MeshError::not_found(VertexId::<I>::KIND, id.index()))
    }

    /// Get an edge by id, or a `NotFound` error.
    pub fn require_edge(&self, id: EdgeId<I>) -> Result<&Edge<I>> {
        self.edge(id)
            .ok_or_else(|| MeshError::not_found(EdgeId::<I>::KIND, id.index()))
    }

    /// Get a face by id, or a `NotFound` error.
    pub fn require_face(&self, id: FaceId<I>) -> Result<&Face<I>> {
        self.face(id)
            .ok_or_else(|| MeshError::not_found(FaceId::<I>::KIND, id.index()))
    }

    /// Check whether a vertex id resolves.
    #[inline]
    pub fn contains_vertex(&self, id: VertexId<I>) -> bool {
        self.vertices.contains_key(&id)
    }

    /// Check whether an edge id resolves.
    #[inline]
    pub fn contains_edge(&self, id: EdgeId<I>) -> bool {
        self.edges.contains_key(&id)
    }

    /// Check whether a face id resolves.
    #[inline]
    pub fn contains_face(&self, id: FaceId<I>) -> bool {
        self.faces.contains_key(&id)
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, id: VertexId<I>) -> Option<Point3<f64>> {
        self.vertices.get(&id).map(|v| v.position)
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex ids in storage order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertices.keys().copied()
    }

    /// Iterate over all edge ids in storage order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        self.edges.keys().copied()
    }

    /// Iterate over all face ids in storage order.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.faces.keys().copied()
    }

    /// Iterate over all vertices in storage order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<I>> + '_ {
        self.vertices.values()
    }

    /// Iterate over all edges in storage order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<I>> + '_ {
        self.edges.values()
    }

    /// Iterate over all faces in storage order.
    pub fn faces(&self) -> impl Iterator<Item = &Face<I>> + '_ {
        self.faces.values()
    }

    /// Iterate over all UV coordinates in storage order.
    pub fn uvs(&self) -> impl Iterator<Item = &UvCoord<I>> + '_ {
        self.uvs.values()
    }

    /// Iterate over all materials in storage order.
    pub fn materials(&self) -> impl Iterator<Item = &Material<I>> + '_ {
        self.materials.values()
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its id.
    ///
    /// Fails with `InvalidParameter` only when the index type has no ids
    /// left to issue.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> Result<VertexId<I>> {
        self.insert_vertex(position, None)
    }

    /// Add a new named vertex and return its id.
    pub fn add_vertex_named(&mut self, position: Point3<f64>, name: impl Into<String>) -> Result<VertexId<I>> {
        self.insert_vertex(position, Some(name.into()))
    }

    fn insert_vertex(&mut self, position: Point3<f64>, name: Option<String>) -> Result<VertexId<I>> {
        let id = self.ids.vertex()?;
        self.vertices.insert(
            id,
            Vertex {
                id,
                position,
                name,
                edges: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Add a new edge between `a` and `b`.
    ///
    /// No check is made for an existing edge over the same pair; use
    /// [`PrimitiveBuilder`](super::PrimitiveBuilder) when deduplication is
    /// wanted.
    pub fn add_edge(&mut self, a: VertexId<I>, b: VertexId<I>) -> Result<EdgeId<I>> {
        self.insert_edge(a, b, None)
    }

    /// Add a new named edge between `a` and `b`.
    pub fn add_edge_named(
        &mut self,
        a: VertexId<I>,
        b: VertexId<I>,
        name: impl Into<String>,
    ) -> Result<EdgeId<I>> {
        self.insert_edge(a, b, Some(name.into()))
    }

    fn insert_edge(&mut self, a: VertexId<I>, b: VertexId<I>, name: Option<String>) -> Result<EdgeId<I>> {
        for v in [a, b] {
            if !self.contains_vertex(v) {
                return Err(MeshError::missing_ref(VertexId::<I>::KIND, v.index()));
            }
        }
        if a == b {
            return Err(MeshError::topology(format!(
                "edge endpoints must differ (vertex {} twice)",
                a
            )));
        }

        let id = self.ids.edge()?;
        self.edges.insert(
            id,
            Edge {
                id,
                vertices: [a, b],
                name,
                faces: Vec::new(),
            },
        );
        for v in [a, b] {
            if let Some(vertex) = self.vertices.get_mut(&v) {
                vertex.edges.push(id);
            }
        }
        Ok(id)
    }

    /// Add a new face from a vertex ring and its parallel edge ring.
    ///
    /// Fails with `InvalidTopology` if the rings differ in length or hold
    /// fewer than three elements, and with `ReferenceError` if any id does
    /// not resolve.
    pub fn add_face(&mut self, vertex_ids: &[VertexId<I>], edge_ids: &[EdgeId<I>]) -> Result<FaceId<I>> {
        self.insert_face(vertex_ids, edge_ids, None)
    }

    /// Add a new named face.
    pub fn add_face_named(
        &mut self,
        vertex_ids: &[VertexId<I>],
        edge_ids: &[EdgeId<I>],
        name: impl Into<String>,
    ) -> Result<FaceId<I>> {
        self.insert_face(vertex_ids, edge_ids, Some(name.into()))
    }

    fn insert_face(
        &mut self,
        vertex_ids: &[VertexId<I>],
        edge_ids: &[EdgeId<I>],
        name: Option<String>,
    ) -> Result<FaceId<I>> {
        if vertex_ids.len() != edge_ids.len() {
            return Err(MeshError::topology(format!(
                "face has {} vertices but {} edges",
                vertex_ids.len(),
                edge_ids.len()
            )));
        }
        if vertex_ids.len() < 3 {
            return Err(MeshError::topology(format!(
                "face needs at least 3 vertices, got {}",
                vertex_ids.len()
            )));
        }
        if let Some(v) = vertex_ids.iter().find(|v| !self.contains_vertex(**v)) {
            return Err(MeshError::missing_ref(VertexId::<I>::KIND, v.index()));
        }
        if let Some(e) = edge_ids.iter().find(|e| !self.contains_edge(**e)) {
            return Err(MeshError::missing_ref(EdgeId::<I>::KIND, e.index()));
        }

        let id = self.ids.face()?;
        for e in edge_ids {
            if let Some(edge) = self.edges.get_mut(e) {
                if !edge.faces.contains(&id) {
                    edge.faces.push(id);
                }
            }
        }
        self.faces.insert(
            id,
            Face {
                id,
                vertex_ids: vertex_ids.to_vec(),
                edge_ids: edge_ids.to_vec(),
                name,
                material: None,
                uvs: None,
            },
        );
        Ok(id)
    }

    /// Add a material with default appearance (opaque, no color).
    pub fn add_material(&mut self, name: impl Into<String>) -> Result<MaterialId<I>> {
        let id = self.ids.material()?;
        self.materials.insert(
            id,
            Material {
                id,
                name: name.into(),
                color: None,
                opacity: 1.0,
                transparent: false,
            },
        );
        Ok(id)
    }

    /// Add a UV coordinate owned by `vertex`.
    pub fn add_uv(&mut self, vertex: VertexId<I>, coord: Point2<f64>) -> Result<UvId<I>> {
        if !self.contains_vertex(vertex) {
            return Err(MeshError::missing_ref(VertexId::<I>::KIND, vertex.index()));
        }
        let id = self.ids.uv()?;
        self.uvs.insert(id, UvCoord { id, vertex, coord });
        Ok(id)
    }

    /// Assign (or clear) the material of a face.
    pub fn set_face_material(&mut self, face: FaceId<I>, material: Option<MaterialId<I>>) -> Result<()> {
        if let Some(m) = material {
            if !self.materials.contains_key(&m) {
                return Err(MeshError::missing_ref(MaterialId::<I>::KIND, m.index()));
            }
        }
        let f = self
            .faces
            .get_mut(&face)
            .ok_or_else(|| MeshError::not_found(FaceId::<I>::KIND, face.index()))?;
        f.material = material;
        Ok(())
    }

    /// Assign (or clear) the per-corner UVs of a face.
    ///
    /// The list must have one entry per face vertex.
    pub fn set_face_uvs(&mut self, face: FaceId<I>, uvs: Option<Vec<UvId<I>>>) -> Result<()> {
        let n = self.require_face(face)?.len();
        if let Some(list) = &uvs {
            if list.len() != n {
                return Err(MeshError::topology(format!(
                    "face {} has {} vertices but {} uvs",
                    face,
                    n,
                    list.len()
                )));
            }
            if let Some(uv) = list.iter().find(|uv| !self.uvs.contains_key(*uv)) {
                return Err(MeshError::missing_ref(UvId::<I>::KIND, uv.index()));
            }
        }
        if let Some(f) = self.faces.get_mut(&face) {
            f.uvs = uvs;
        }
        Ok(())
    }

    // ==================== Mutation ====================

    /// Move a vertex. Topology is untouched.
    pub fn move_vertex(&mut self, id: VertexId<I>, position: Point3<f64>) -> Result<()> {
        let v = self
            .vertices
            .get_mut(&id)
            .ok_or_else(|| MeshError::not_found(VertexId::<I>::KIND, id.index()))?;
        v.position = position;
        Ok(())
    }

    /// Remove a vertex. Edges and faces that reference it are left in place.
    pub fn remove_vertex(&mut self, id: VertexId<I>) -> Result<Vertex<I>> {
        self.vertices
            .shift_remove(&id)
            .ok_or_else(|| MeshError::not_found(VertexId::<I>::KIND, id.index()))
    }

    /// Remove an edge and detach it from its endpoints.
    ///
    /// Faces that still reference the edge are left in place.
    pub fn remove_edge(&mut self, id: EdgeId<I>) -> Result<Edge<I>> {
        let edge = self
            .edges
            .shift_remove(&id)
            .ok_or_else(|| MeshError::not_found(EdgeId::<I>::KIND, id.index()))?;
        for v in edge.vertices {
            if let Some(vertex) = self.vertices.get_mut(&v) {
                vertex.edges.retain(|&e| e != id);
            }
        }
        Ok(edge)
    }

    /// Remove a face and detach it from its edges.
    pub fn remove_face(&mut self, id: FaceId<I>) -> Result<Face<I>> {
        let face = self
            .faces
            .shift_remove(&id)
            .ok_or_else(|| MeshError::not_found(FaceId::<I>::KIND, id.index()))?;
        for e in &face.edge_ids {
            if let Some(edge) = self.edges.get_mut(e) {
                edge.faces.retain(|&f| f != id);
            }
        }
        Ok(face)
    }

    /// Hand every UV owned by `from` over to `to`.
    pub(crate) fn retarget_uvs(&mut self, from: VertexId<I>, to: VertexId<I>) {
        for uv in self.uvs.values_mut() {
            if uv.vertex == from {
                uv.vertex = to;
            }
        }
    }

    /// Remove every UV owned by `vertex`, returning how many were dropped.
    pub(crate) fn remove_uvs_owned_by(&mut self, vertex: VertexId<I>) -> usize {
        let before = self.uvs.len();
        self.uvs.retain(|_, uv| uv.vertex != vertex);
        before - self.uvs.len()
    }

    /// Remove a UV coordinate.
    pub fn remove_uv(&mut self, id: UvId<I>) -> Result<UvCoord<I>> {
        self.uvs
            .shift_remove(&id)
            .ok_or_else(|| MeshError::not_found(UvId::<I>::KIND, id.index()))
    }

    /// Remove a material. Faces that use it keep the dangling assignment.
    pub fn remove_material(&mut self, id: MaterialId<I>) -> Result<Material<I>> {
        self.materials
            .shift_remove(&id)
            .ok_or_else(|| MeshError::not_found(MaterialId::<I>::KIND, id.index()))
    }

    // ==================== Topology ====================

    /// Find an edge joining `a` and `b`, in either direction.
    pub fn find_edge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<EdgeId<I>> {
        let va = self.vertex(a)?;
        va.edges
            .iter()
            .copied()
            .find(|e| self.edge(*e).is_some_and(|edge| edge.connects(a, b)))
    }

    /// Returns true if every face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces.values().all(|f| f.is_triangle())
    }

    /// Returns true if every face is a quad.
    pub fn is_quad_mesh(&self) -> bool {
        self.faces.values().all(|f| f.is_quad())
    }

    // ==================== Geometry ====================

    /// Positions of a face's vertices, in ring order.
    pub fn face_positions(&self, id: FaceId<I>) -> Option<Vec<Point3<f64>>> {
        let face = self.face(id)?;
        face.vertex_ids.iter().map(|&v| self.position(v)).collect()
    }

    /// Normal of a face from its first three vertices.
    ///
    /// This is not a Newell normal: non-planar n-gons get the normal of their
    /// leading corner. Returns `None` when those three points are collinear.
    pub fn face_normal(&self, id: FaceId<I>) -> Option<Vector3<f64>> {
        let face = self.face(id)?;
        if face.len() < 3 {
            return None;
        }
        let p0 = self.position(face.vertex_ids[0])?;
        let p1 = self.position(face.vertex_ids[1])?;
        let p2 = self.position(face.vertex_ids[2])?;
        (p1 - p0).cross(&(p2 - p0)).try_normalize(1e-12)
    }

    /// Compute the centroid (vertex average) of a face.
    pub fn face_centroid(&self, id: FaceId<I>) -> Option<Point3<f64>> {
        let positions = self.face_positions(id)?;
        if positions.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = positions.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / positions.len() as f64))
    }

    /// Compute the area of a face as a triangle fan from its first vertex.
    pub fn face_area(&self, id: FaceId<I>) -> Option<f64> {
        let p = self.face_positions(id)?;
        let mut twice = Vector3::zeros();
        for i in 1..p.len().saturating_sub(1) {
            twice += (p[i] - p[0]).cross(&(p[i + 1] - p[0]));
        }
        Some(0.5 * twice.norm())
    }

    /// Compute the midpoint of an edge.
    pub fn edge_midpoint(&self, id: EdgeId<I>) -> Option<Point3<f64>> {
        let [a, b] = self.edge(id)?.vertices;
        let pa = self.position(a)?;
        let pb = self.position(b)?;
        Some(Point3::from((pa.coords + pb.coords) * 0.5))
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, id: EdgeId<I>) -> Option<f64> {
        let [a, b] = self.edge(id)?.vertices;
        Some((self.position(b)? - self.position(a)?).norm())
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut positions = self.vertices.values().map(|v| v.position);
        let first = positions.next()?;
        let (mut min, mut max) = (first, first);

        for p in positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().filter_map(|f| self.face_area(f)).sum()
    }

    // ==================== Export ====================

    /// Flatten the mesh into dense positions and per-face index lists.
    ///
    /// Indices follow vertex storage order. Faces referencing a missing
    /// vertex are left out. N-gons are emitted as-is; triangulating them for
    /// rendering is the consumer's job.
    pub fn to_face_vertex(&self) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
        let positions: Vec<Point3<f64>> = self.vertices.values().map(|v| v.position).collect();
        let faces = self
            .faces
            .values()
            .filter_map(|f| {
                f.vertex_ids
                    .iter()
                    .map(|v| self.vertices.get_index_of(v))
                    .collect::<Option<Vec<usize>>>()
            })
            .collect();
        (positions, faces)
    }
}
