//! Topological soundness checks.
//!
//! [`validate_mesh_topology`] inspects a mesh without mutating it and
//! returns a [`ValidationReport`] with one human-readable diagnostic per
//! problem found. It is meant to be run after a batch of edits so the caller
//! can decide whether to roll back.
//!
//! Per-face checks are independent and run on the rayon thread pool by
//! default. Diagnostics are always reported in storage order.

use std::collections::HashSet;
use std::fmt;

use rayon::prelude::*;

use super::editable::{EditableMesh, Face};
use super::index::{EdgeId, FaceId, MeshIndex, VertexId};

/// Options for mesh validation.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Whether to run the per-face checks in parallel (default: true).
    pub parallel: bool,

    /// Whether to cross-check the store's adjacency sets (default: true).
    pub check_adjacency: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            check_adjacency: true,
        }
    }
}

impl ValidateOptions {
    /// Use single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set whether adjacency sets are cross-checked.
    pub fn with_adjacency_check(mut self, check: bool) -> Self {
        self.check_adjacency = check;
        self
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no problem was found.
    pub is_valid: bool,
    /// One diagnostic per problem.
    pub errors: Vec<String>,
}

/// A single topology problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyIssue<I: MeshIndex = u32> {
    /// Vertex and edge rings differ in length.
    RingLengthMismatch {
        /// Offending face.
        face: FaceId<I>,
        /// Vertex count.
        vertices: usize,
        /// Edge count.
        edges: usize,
    },
    /// Fewer than three vertices.
    TooFewVertices {
        /// Offending face.
        face: FaceId<I>,
        /// Vertex count.
        count: usize,
    },
    /// Face references a vertex that does not exist.
    MissingVertex {
        /// Offending face.
        face: FaceId<I>,
        /// The missing vertex.
        vertex: VertexId<I>,
    },
    /// Face references an edge that does not exist.
    MissingEdge {
        /// Offending face.
        face: FaceId<I>,
        /// The missing edge.
        edge: EdgeId<I>,
    },
    /// `edge_ids[i]` does not join `vertex_ids[i]` and `vertex_ids[i + 1]`.
    EdgeMismatch {
        /// Offending face.
        face: FaceId<I>,
        /// Corner index.
        corner: usize,
        /// The declared edge.
        edge: EdgeId<I>,
        /// Expected endpoints.
        expected: (VertexId<I>, VertexId<I>),
    },
    /// The same vertex appears twice in a row.
    RepeatedVertex {
        /// Offending face.
        face: FaceId<I>,
        /// The repeated vertex.
        vertex: VertexId<I>,
    },
    /// Face UV list has the wrong length or names a missing UV.
    BadUvs {
        /// Offending face.
        face: FaceId<I>,
    },
    /// Face names a material that does not exist.
    MissingMaterial {
        /// Offending face.
        face: FaceId<I>,
    },
    /// Edge endpoint does not exist.
    DanglingEdge {
        /// Offending edge.
        edge: EdgeId<I>,
        /// The missing vertex.
        vertex: VertexId<I>,
    },
    /// Edge joins a vertex to itself.
    DegenerateEdge {
        /// Offending edge.
        edge: EdgeId<I>,
    },
    /// An adjacency set disagrees with the collections.
    StaleAdjacency {
        /// Description of the disagreement.
        details: String,
    },
}

impl<I: MeshIndex> fmt::Display for TopologyIssue<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyIssue::RingLengthMismatch { face, vertices, edges } => write!(
                f,
                "face {} has {} vertices but {} edges",
                face, vertices, edges
            ),
            TopologyIssue::TooFewVertices { face, count } => {
                write!(f, "face {} has only {} vertices", face, count)
            }
            TopologyIssue::MissingVertex { face, vertex } => {
                write!(f, "face {} references missing vertex {}", face, vertex)
            }
            TopologyIssue::MissingEdge { face, edge } => {
                write!(f, "face {} references missing edge {}", face, edge)
            }
            TopologyIssue::EdgeMismatch {
                face,
                corner,
                edge,
                expected,
            } => write!(
                f,
                "face {} edge {} at corner {} does not connect vertices {} and {}",
                face, edge, corner, expected.0, expected.1
            ),
            TopologyIssue::RepeatedVertex { face, vertex } => {
                write!(f, "face {} repeats vertex {} consecutively", face, vertex)
            }
            TopologyIssue::BadUvs { face } => {
                write!(f, "face {} has inconsistent uvs", face)
            }
            TopologyIssue::MissingMaterial { face } => {
                write!(f, "face {} references a missing material", face)
            }
            TopologyIssue::DanglingEdge { edge, vertex } => {
                write!(f, "edge {} references missing vertex {}", edge, vertex)
            }
            TopologyIssue::DegenerateEdge { edge } => {
                write!(f, "edge {} joins a vertex to itself", edge)
            }
            TopologyIssue::StaleAdjacency { details } => {
                write!(f, "stale adjacency: {}", details)
            }
        }
    }
}

/// Check a mesh for topological soundness with default options.
///
/// # Example
///
/// ```
/// use polyedit::mesh::{validate_mesh_topology, EditableMesh};
/// use polyedit::primitives;
///
/// let mesh: EditableMesh = primitives::cube(2.0).unwrap();
/// let report = validate_mesh_topology(&mesh);
/// assert!(report.is_valid, "{:?}", report.errors);
/// ```
pub fn validate_mesh_topology<I: MeshIndex>(mesh: &EditableMesh<I>) -> ValidationReport {
    validate_mesh_topology_with(mesh, &ValidateOptions::default())
}

/// Check a mesh for topological soundness.
pub fn validate_mesh_topology_with<I: MeshIndex>(
    mesh: &EditableMesh<I>,
    options: &ValidateOptions,
) -> ValidationReport {
    let issues = collect_issues(mesh, options);
    ValidationReport {
        is_valid: issues.is_empty(),
        errors: issues.iter().map(|issue| issue.to_string()).collect(),
    }
}

/// Collect every topology problem as a structured value.
pub fn collect_issues<I: MeshIndex>(
    mesh: &EditableMesh<I>,
    options: &ValidateOptions,
) -> Vec<TopologyIssue<I>> {
    let faces: Vec<&Face<I>> = mesh.faces().collect();
    let per_face: Vec<Vec<TopologyIssue<I>>> = if options.parallel {
        faces.par_iter().map(|f| check_face(mesh, f)).collect()
    } else {
        faces.iter().map(|f| check_face(mesh, f)).collect()
    };

    let mut issues: Vec<TopologyIssue<I>> = per_face.into_iter().flatten().collect();

    for edge in mesh.edges() {
        for v in edge.vertices {
            if !mesh.contains_vertex(v) {
                issues.push(TopologyIssue::DanglingEdge { edge: edge.id, vertex: v });
            }
        }
        if edge.vertices[0] == edge.vertices[1] {
            issues.push(TopologyIssue::DegenerateEdge { edge: edge.id });
        }
    }

    if options.check_adjacency {
        check_adjacency(mesh, &mut issues);
    }

    issues
}

fn check_face<I: MeshIndex>(mesh: &EditableMesh<I>, face: &Face<I>) -> Vec<TopologyIssue<I>> {
    let mut issues = Vec::new();
    let n = face.vertex_ids.len();

    if n != face.edge_ids.len() {
        issues.push(TopologyIssue::RingLengthMismatch {
            face: face.id,
            vertices: n,
            edges: face.edge_ids.len(),
        });
    }
    if n < 3 {
        issues.push(TopologyIssue::TooFewVertices { face: face.id, count: n });
    }

    for &v in &face.vertex_ids {
        if !mesh.contains_vertex(v) {
            issues.push(TopologyIssue::MissingVertex { face: face.id, vertex: v });
        }
    }

    for (i, &e) in face.edge_ids.iter().enumerate() {
        let Some(edge) = mesh.edge(e) else {
            issues.push(TopologyIssue::MissingEdge { face: face.id, edge: e });
            continue;
        };
        if i < n {
            let a = face.vertex_ids[i];
            let b = face.vertex_ids[(i + 1) % n];
            if !edge.connects(a, b) {
                issues.push(TopologyIssue::EdgeMismatch {
                    face: face.id,
                    corner: i,
                    edge: e,
                    expected: (a, b),
                });
            }
        }
    }

    for (a, b) in face.vertex_pairs() {
        if a == b {
            issues.push(TopologyIssue::RepeatedVertex { face: face.id, vertex: a });
        }
    }

    if let Some(uvs) = &face.uvs {
        if uvs.len() != n || uvs.iter().any(|uv| mesh.uv(*uv).is_none()) {
            issues.push(TopologyIssue::BadUvs { face: face.id });
        }
    }
    if let Some(m) = face.material {
        if mesh.material(m).is_none() {
            issues.push(TopologyIssue::MissingMaterial { face: face.id });
        }
    }

    issues
}

fn check_adjacency<I: MeshIndex>(mesh: &EditableMesh<I>, issues: &mut Vec<TopologyIssue<I>>) {
    for v in mesh.vertices() {
        let recorded: HashSet<EdgeId<I>> = v.edges().iter().copied().collect();
        let actual: HashSet<EdgeId<I>> = mesh
            .edges()
            .filter(|e| e.contains(v.id))
            .map(|e| e.id)
            .collect();
        if recorded != actual {
            issues.push(TopologyIssue::StaleAdjacency {
                details: format!("vertex {} edge set out of date", v.id),
            });
        }
    }

    for e in mesh.edges() {
        let recorded: HashSet<FaceId<I>> = e.faces().iter().copied().collect();
        let actual: HashSet<FaceId<I>> = mesh
            .faces()
            .filter(|f| f.edge_ids.contains(&e.id))
            .map(|f| f.id)
            .collect();
        if recorded != actual {
            issues.push(TopologyIssue::StaleAdjacency {
                details: format!("edge {} face set out of date", e.id),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use nalgebra::Point3;

    fn single_triangle() -> EditableMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap()
    }

    #[test]
    fn test_valid_triangle() {
        let mesh = single_triangle();
        let report = validate_mesh_topology(&mesh);
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_empty_mesh_is_valid() {
        let mesh = EditableMesh::<u32>::new();
        assert!(validate_mesh_topology(&mesh).is_valid);
    }

    #[test]
    fn test_detects_edge_mismatch() {
        let mut mesh = EditableMesh::<u32>::new();
        let v: Vec<VertexId> = (0..3)
            .map(|i| mesh.add_vertex(Point3::new(i as f64, (i % 2) as f64, 0.0)).unwrap())
            .collect();
        let e01 = mesh.add_edge(v[0], v[1]).unwrap();
        let e12 = mesh.add_edge(v[1], v[2]).unwrap();
        let e20 = mesh.add_edge(v[2], v[0]).unwrap();
        // Edge ring rotated by one: every corner is wrong
        mesh.add_face(&v, &[e12, e20, e01]).unwrap();

        let report = validate_mesh_topology(&mesh);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].contains("does not connect"));
    }

    #[test]
    fn test_detects_missing_vertex_and_dangling_edge() {
        let mut mesh = single_triangle();
        let v0 = mesh.vertex_ids().next().unwrap();
        mesh.remove_vertex(v0).unwrap();

        let report = validate_mesh_topology(&mesh);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("missing vertex")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("edge") && e.contains("missing vertex")));
    }

    #[test]
    fn test_detects_repeated_vertex() {
        let mut mesh = EditableMesh::<u32>::new();
        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0)).unwrap();
        let ab = mesh.add_edge(a, b).unwrap();
        let ba = mesh.add_edge(b, a).unwrap();
        // a, b, b: the middle edge cannot exist, so reuse ab to keep lengths equal
        mesh.add_face(&[a, b, b], &[ab, ab, ba]).unwrap();

        let issues = collect_issues(&mesh, &ValidateOptions::default().sequential());
        assert!(issues
            .iter()
            .any(|i| matches!(i, TopologyIssue::RepeatedVertex { vertex, .. } if *vertex == b)));
    }

    #[test]
    fn test_detects_face_using_removed_edge() {
        let mut mesh = single_triangle();
        let e = mesh.edge_ids().next().unwrap();
        mesh.remove_edge(e).unwrap();

        let report = validate_mesh_topology(&mesh);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|m| m.contains("missing edge")));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let mut mesh = single_triangle();
        let v0 = mesh.vertex_ids().next().unwrap();
        mesh.remove_vertex(v0).unwrap();

        let par = validate_mesh_topology_with(&mesh, &ValidateOptions::default());
        let seq = validate_mesh_topology_with(&mesh, &ValidateOptions::default().sequential());
        assert_eq!(par, seq);
    }
}
