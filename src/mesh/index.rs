//! Index types and id allocation for mesh elements.
//!
//! Every element class (vertex, edge, face, UV, material) has its own
//! type-safe id wrapper. The ids are generic over the underlying integer type
//! to support meshes of different sizes (u16 for small meshes, u32 for
//! typical meshes, u64 for massive meshes).
//!
//! Ids are issued by an [`IdAllocator`] owned by one mesh. An allocator only
//! counts upwards, so an id is never handed out twice during its lifetime,
//! even after the element it named has been removed.

use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use crate::error::{ElementKind, MeshError, Result};

/// Trait for types that can be used as mesh indices.
///
/// This trait is implemented for `u16`, `u32`, and `u64`, allowing users to choose
/// the appropriate index size for their mesh.
pub trait MeshIndex:
    Copy + Clone + Eq + PartialEq + Ord + PartialOrd + Hash + Debug + Send + Sync + 'static
{
    /// The maximum valid index value.
    const MAX: Self;

    /// Convert from usize to this index type.
    ///
    /// # Panics
    /// Panics in debug builds if the value is too large for this index type.
    fn from_usize(v: usize) -> Self;

    /// Convert from usize, returning `None` if the value does not fit.
    fn try_from_usize(v: usize) -> Option<Self>;

    /// Convert to usize.
    fn to_usize(self) -> usize;
}

macro_rules! impl_mesh_index {
    ($ty:ty) => {
        impl MeshIndex for $ty {
            const MAX: Self = <$ty>::MAX;

            #[inline]
            fn from_usize(v: usize) -> Self {
                debug_assert!(
                    v as u128 <= Self::MAX as u128,
                    "index {} too large for {}",
                    v,
                    stringify!($ty)
                );
                v as $ty
            }

            #[inline]
            fn try_from_usize(v: usize) -> Option<Self> {
                <$ty>::try_from(v).ok()
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    };
}

impl_mesh_index!(u16);
impl_mesh_index!(u32);
impl_mesh_index!(u64);

/// A type-safe vertex id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// A type-safe edge id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId<I: MeshIndex = u32>(I);

/// A type-safe face id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

/// A type-safe UV coordinate id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UvId<I: MeshIndex = u32>(I);

/// A type-safe material id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct MaterialId<I: MeshIndex = u32>(I);

macro_rules! impl_id_type {
    ($name:ident, $display:literal, $kind:expr) => {
        impl<I: MeshIndex> $name<I> {
            /// The element class this id names.
            pub const KIND: ElementKind = $kind;

            /// Create an id from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// Get the raw id value.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Get the raw value of the underlying type.
            #[inline]
            pub fn raw(self) -> I {
                self.0
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.index())
            }
        }

        impl<I: MeshIndex> Display for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.index())
            }
        }

        impl<I: MeshIndex> From<usize> for $name<I> {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_id_type!(VertexId, "V", ElementKind::Vertex);
impl_id_type!(EdgeId, "E", ElementKind::Edge);
impl_id_type!(FaceId, "F", ElementKind::Face);
impl_id_type!(UvId, "UV", ElementKind::Uv);
impl_id_type!(MaterialId, "M", ElementKind::Material);

/// Issues monotonically increasing ids, one counter per element class.
///
/// Each [`EditableMesh`](super::EditableMesh) owns its own allocator, so
/// independent meshes never share id space. Constructing a fresh allocator
/// restarts every counter at zero.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_vertex: usize,
    next_edge: usize,
    next_face: usize,
    next_uv: usize,
    next_material: usize,
}

impl IdAllocator {
    /// Create an allocator whose counters all start at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next vertex id.
    ///
    /// Fails once every value of the index type has been issued; the
    /// counter is left untouched in that case.
    pub fn vertex<I: MeshIndex>(&mut self) -> Result<VertexId<I>> {
        bump::<I>(&mut self.next_vertex, "vertex id").map(VertexId)
    }

    /// Allocate the next edge id.
    pub fn edge<I: MeshIndex>(&mut self) -> Result<EdgeId<I>> {
        bump::<I>(&mut self.next_edge, "edge id").map(EdgeId)
    }

    /// Allocate the next face id.
    pub fn face<I: MeshIndex>(&mut self) -> Result<FaceId<I>> {
        bump::<I>(&mut self.next_face, "face id").map(FaceId)
    }

    /// Allocate the next UV id.
    pub fn uv<I: MeshIndex>(&mut self) -> Result<UvId<I>> {
        bump::<I>(&mut self.next_uv, "uv id").map(UvId)
    }

    /// Allocate the next material id.
    pub fn material<I: MeshIndex>(&mut self) -> Result<MaterialId<I>> {
        bump::<I>(&mut self.next_material, "material id").map(MaterialId)
    }

    /// Number of vertex ids issued so far.
    pub fn vertices_issued(&self) -> usize {
        self.next_vertex
    }

    /// Number of edge ids issued so far.
    pub fn edges_issued(&self) -> usize {
        self.next_edge
    }

    /// Number of face ids issued so far.
    pub fn faces_issued(&self) -> usize {
        self.next_face
    }
}

fn bump<I: MeshIndex>(counter: &mut usize, name: &'static str) -> Result<I> {
    let id = I::try_from_usize(*counter)
        .ok_or_else(|| MeshError::invalid_param(name, *counter, "does not fit the index type"))?;
    *counter += 1;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert_eq!(VertexId::<u32>::KIND, ElementKind::Vertex);
    }

    #[test]
    fn test_type_safety() {
        // These are different types and cannot be mixed
        let v: VertexId = VertexId::new(0);
        let e: EdgeId = EdgeId::new(0);
        let f: FaceId = FaceId::new(0);

        // All have the same raw value but are distinct types
        assert_eq!(v.index(), e.index());
        assert_eq!(e.index(), f.index());
    }

    #[test]
    fn test_small_indices() {
        let v: VertexId<u16> = VertexId::new(1000);
        assert_eq!(v.index(), 1000);
        assert_eq!(v.raw(), 1000u16);
    }

    #[test]
    fn test_debug_format() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(format!("{:?}", v), "V(42)");
        assert_eq!(format!("{}", v), "42");

        let uv: UvId = UvId::new(3);
        assert_eq!(format!("{:?}", uv), "UV(3)");
    }

    #[test]
    fn test_allocator_is_monotonic_per_class() {
        let mut alloc = IdAllocator::new();
        let v0: VertexId = alloc.vertex().unwrap();
        let v1: VertexId = alloc.vertex().unwrap();
        let e0: EdgeId = alloc.edge().unwrap();
        let f0: FaceId = alloc.face().unwrap();

        assert_eq!(v0.index(), 0);
        assert_eq!(v1.index(), 1);
        assert_eq!(e0.index(), 0);
        assert_eq!(f0.index(), 0);
        assert_eq!(alloc.vertices_issued(), 2);
    }

    #[test]
    fn test_independent_allocators() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        let _: VertexId = a.vertex().unwrap();
        let _: VertexId = a.vertex().unwrap();
        let first_b: VertexId = b.vertex().unwrap();
        assert_eq!(first_b.index(), 0);
    }

    #[test]
    fn test_allocator_refuses_to_wrap() {
        let mut alloc = IdAllocator::new();
        alloc.next_vertex = u16::MAX as usize;

        let last: VertexId<u16> = alloc.vertex().unwrap();
        assert_eq!(last.raw(), u16::MAX);

        let err = alloc.vertex::<u16>().unwrap_err();
        assert!(matches!(err, MeshError::InvalidParameter { .. }));
        // The counter does not move on failure, and wider types still fit
        assert_eq!(alloc.vertices_issued(), u16::MAX as usize + 1);
        let wide: VertexId<u32> = alloc.vertex().unwrap();
        assert_eq!(wide.index(), u16::MAX as usize + 1);

        // Other classes are unaffected
        let e: EdgeId<u16> = alloc.edge().unwrap();
        assert_eq!(e.index(), 0);
    }

    #[test]
    fn test_try_from_usize() {
        assert_eq!(u16::try_from_usize(65_535), Some(u16::MAX));
        assert_eq!(u16::try_from_usize(65_536), None);
        assert_eq!(u32::try_from_usize(7), Some(7));
    }
}
