//! Error types for polyedit.
//!
//! This module defines all error types used throughout the library.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// The class of mesh element an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A vertex.
    Vertex,
    /// An edge.
    Edge,
    /// A face.
    Face,
    /// A UV coordinate.
    Uv,
    /// A material.
    Material,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
            ElementKind::Face => "face",
            ElementKind::Uv => "uv",
            ElementKind::Material => "material",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during mesh operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A stale or invalid id was looked up.
    #[error("{kind} {id} not found")]
    NotFound {
        /// The element class.
        kind: ElementKind,
        /// The raw id value.
        id: usize,
    },

    /// The request violates a structural precondition.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// An element would reference another element that does not exist.
    #[error("reference to missing {kind} {id}")]
    ReferenceError {
        /// The element class of the missing reference.
        kind: ElementKind,
        /// The raw id value.
        id: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create a not-found error.
    pub fn not_found(kind: ElementKind, id: usize) -> Self {
        MeshError::NotFound { kind, id }
    }

    /// Create a dangling-reference error.
    pub fn missing_ref(kind: ElementKind, id: usize) -> Self {
        MeshError::ReferenceError { kind, id }
    }

    /// Create an invalid topology error.
    pub fn topology(details: impl Into<String>) -> Self {
        MeshError::InvalidTopology(details.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
