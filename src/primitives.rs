//! Primitive mesh generators.
//!
//! Every generator builds its mesh through a [`PrimitiveBuilder`], so shared
//! vertices and edges exist exactly once. Closed solids are centered at the
//! origin and wound counter-clockwise when seen from outside, which makes
//! each face normal point away from the center.
//!
//! | Generator | Vertices | Faces |
//! |-----------|----------|-------|
//! | [`plane`] | 4 | 1 quad |
//! | [`grid`] | (nx+1)(nz+1) | nx·nz quads |
//! | [`cube`] | 8 | 6 quads |
//! | [`tetrahedron`] | 4 | 4 triangles |
//! | [`octahedron`] | 6 | 8 triangles |
//! | [`icosahedron`] | 12 | 20 triangles |
//! | [`dodecahedron`] | 20 | 12 pentagons |
//! | [`cylinder`] | 2n | n quads + 2 n-gon caps |
//! | [`uv_sphere`] | 2 + n(r-1) | n(r-2) quads + 2n triangles |

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{EditableMesh, MeshIndex, PrimitiveBuilder, VertexId};

/// A flat square of side `size` in the XZ plane, facing +Y.
pub fn plane<I: MeshIndex>(size: f64) -> Result<EditableMesh<I>> {
    grid(size, size, 1, 1)
}

/// A `width` × `depth` grid of quads in the XZ plane, facing +Y.
pub fn grid<I: MeshIndex>(
    width: f64,
    depth: f64,
    segments_x: usize,
    segments_z: usize,
) -> Result<EditableMesh<I>> {
    if segments_x == 0 {
        return Err(MeshError::invalid_param("segments_x", segments_x, "must be at least 1"));
    }
    if segments_z == 0 {
        return Err(MeshError::invalid_param("segments_z", segments_z, "must be at least 1"));
    }

    let mut mesh = EditableMesh::new();
    let mut builder = PrimitiveBuilder::new(&mut mesh);

    let x_at = |i: usize| -width / 2.0 + width * i as f64 / segments_x as f64;
    let z_at = |j: usize| -depth / 2.0 + depth * j as f64 / segments_z as f64;

    let mut ids: Vec<VertexId<I>> = Vec::with_capacity((segments_x + 1) * (segments_z + 1));
    for j in 0..=segments_z {
        for i in 0..=segments_x {
            ids.push(builder.add_vertex(Point3::new(x_at(i), 0.0, z_at(j)))?);
        }
    }

    let row = segments_x + 1;
    for j in 0..segments_z {
        for i in 0..segments_x {
            let v00 = ids[j * row + i];
            let v10 = ids[j * row + i + 1];
            let v01 = ids[(j + 1) * row + i];
            let v11 = ids[(j + 1) * row + i + 1];
            // (x0,z0) -> (x0,z1) -> (x1,z1) -> (x1,z0) winds towards +Y
            builder.add_quad([v00, v01, v11, v10])?;
        }
    }
    drop(builder);

    Ok(mesh)
}

/// An axis-aligned cube with edge length `size`.
pub fn cube<I: MeshIndex>(size: f64) -> Result<EditableMesh<I>> {
    let h = size / 2.0;
    let positions: Vec<Point3<f64>> = (0..8)
        .map(|i| {
            let c = |bit: usize| if i & bit != 0 { h } else { -h };
            Point3::new(c(1), c(2), c(4))
        })
        .collect();
    let faces: Vec<Vec<usize>> = vec![
        vec![0, 2, 6, 4],
        vec![1, 3, 7, 5],
        vec![0, 1, 5, 4],
        vec![2, 3, 7, 6],
        vec![0, 1, 3, 2],
        vec![4, 5, 7, 6],
    ];
    convex_polyhedron(&positions, &faces)
}

/// A regular tetrahedron inscribed in a sphere of `radius`.
pub fn tetrahedron<I: MeshIndex>(radius: f64) -> Result<EditableMesh<I>> {
    let positions = on_sphere(
        &[
            [1.0, 1.0, 1.0],
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
        ],
        radius,
    );
    let faces = vec![vec![0, 1, 2], vec![0, 3, 1], vec![0, 2, 3], vec![1, 3, 2]];
    convex_polyhedron(&positions, &faces)
}

/// A regular octahedron inscribed in a sphere of `radius`.
pub fn octahedron<I: MeshIndex>(radius: f64) -> Result<EditableMesh<I>> {
    let positions = on_sphere(
        &[
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ],
        radius,
    );
    let mut faces = Vec::with_capacity(8);
    for x in [0, 1] {
        for y in [2, 3] {
            for z in [4, 5] {
                faces.push(vec![x, y, z]);
            }
        }
    }
    convex_polyhedron(&positions, &faces)
}

/// A regular icosahedron inscribed in a sphere of `radius`.
pub fn icosahedron<I: MeshIndex>(radius: f64) -> Result<EditableMesh<I>> {
    let (positions, faces) = icosahedron_tables();
    convex_polyhedron(&on_sphere(&positions, radius), &faces)
}

/// A regular dodecahedron inscribed in a sphere of `radius`.
///
/// Built as the dual of the icosahedron: one vertex per icosahedron face and
/// one pentagon per icosahedron vertex.
pub fn dodecahedron<I: MeshIndex>(radius: f64) -> Result<EditableMesh<I>> {
    let (ico_raw, ico_faces) = icosahedron_tables();
    let ico = on_sphere(&ico_raw, 1.0);

    let centers: Vec<[f64; 3]> = ico_faces
        .iter()
        .map(|f| {
            let sum: Vector3<f64> = f.iter().map(|&i| ico[i].coords).sum();
            let c = sum / f.len() as f64;
            [c.x, c.y, c.z]
        })
        .collect();
    let positions = on_sphere(&centers, radius);

    let mut faces = Vec::with_capacity(ico.len());
    for (vi, v) in ico.iter().enumerate() {
        let axis = v.coords;
        let mut ring: Vec<usize> = (0..ico_faces.len())
            .filter(|&fi| ico_faces[fi].contains(&vi))
            .collect();
        if ring.is_empty() {
            continue;
        }

        // Sort the surrounding face centers by angle around the vertex axis
        let reference = tangent(&(positions[ring[0]].coords), &axis);
        let binormal = axis.cross(&reference);
        ring.sort_by(|&a, &b| {
            let angle = |i: usize| {
                let d = tangent(&positions[i].coords, &axis);
                d.dot(&binormal).atan2(d.dot(&reference))
            };
            angle(a).total_cmp(&angle(b))
        });
        faces.push(ring);
    }

    convex_polyhedron(&positions, &faces)
}

/// A closed cylinder along the Y axis with `segments` sides.
pub fn cylinder<I: MeshIndex>(radius: f64, height: f64, segments: usize) -> Result<EditableMesh<I>> {
    if segments < 3 {
        return Err(MeshError::invalid_param("segments", segments, "must be at least 3"));
    }

    let h = height / 2.0;
    let mut positions = Vec::with_capacity(segments * 2);
    for y in [-h, h] {
        for j in 0..segments {
            let phi = 2.0 * PI * j as f64 / segments as f64;
            positions.push(Point3::new(radius * phi.cos(), y, radius * phi.sin()));
        }
    }

    let mut faces: Vec<Vec<usize>> = (0..segments)
        .map(|j| {
            let k = (j + 1) % segments;
            vec![j, k, segments + k, segments + j]
        })
        .collect();
    faces.push((0..segments).collect());
    faces.push((segments..2 * segments).collect());

    convex_polyhedron(&positions, &faces)
}

/// A UV sphere with `segments` meridians and `rings` latitude bands.
///
/// The poles are single vertices fanned with triangles; every other band is
/// made of quads.
pub fn uv_sphere<I: MeshIndex>(radius: f64, segments: usize, rings: usize) -> Result<EditableMesh<I>> {
    if segments < 3 {
        return Err(MeshError::invalid_param("segments", segments, "must be at least 3"));
    }
    if rings < 2 {
        return Err(MeshError::invalid_param("rings", rings, "must be at least 2"));
    }

    let mut positions = vec![Point3::new(0.0, radius, 0.0)];
    for k in 1..rings {
        let theta = PI * k as f64 / rings as f64;
        for j in 0..segments {
            let phi = 2.0 * PI * j as f64 / segments as f64;
            positions.push(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
                radius * theta.sin() * phi.sin(),
            ));
        }
    }
    let south = positions.len();
    positions.push(Point3::new(0.0, -radius, 0.0));

    let ring_at = |k: usize, j: usize| 1 + (k - 1) * segments + j % segments;
    let mut faces = Vec::with_capacity(segments * rings);
    for j in 0..segments {
        faces.push(vec![0, ring_at(1, j), ring_at(1, j + 1)]);
    }
    for k in 1..rings - 1 {
        for j in 0..segments {
            faces.push(vec![
                ring_at(k, j),
                ring_at(k + 1, j),
                ring_at(k + 1, j + 1),
                ring_at(k, j + 1),
            ]);
        }
    }
    for j in 0..segments {
        faces.push(vec![south, ring_at(rings - 1, j + 1), ring_at(rings - 1, j)]);
    }

    convex_polyhedron(&positions, &faces)
}

/// Build a convex solid, flipping any face whose winding points inwards.
fn convex_polyhedron<I: MeshIndex>(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
) -> Result<EditableMesh<I>> {
    let center = positions
        .iter()
        .map(|p| p.coords)
        .sum::<Vector3<f64>>()
        / positions.len().max(1) as f64;

    let mut mesh = EditableMesh::new();
    let mut builder = PrimitiveBuilder::new(&mut mesh);
    let ids: Vec<VertexId<I>> = positions
        .iter()
        .map(|&p| builder.add_vertex(p))
        .collect::<Result<_>>()?;

    for face in faces {
        let mut ring = face.clone();
        if !points_outward(positions, &ring, &center) {
            ring.reverse();
        }
        let ring_ids: Vec<VertexId<I>> = ring.iter().map(|&i| ids[i]).collect();
        builder.add_ngon(&ring_ids)?;
    }
    drop(builder);

    Ok(mesh)
}

fn points_outward(positions: &[Point3<f64>], ring: &[usize], center: &Vector3<f64>) -> bool {
    if ring.len() < 3 {
        return true;
    }
    let p0 = positions[ring[0]];
    let normal = (positions[ring[1]] - p0).cross(&(positions[ring[2]] - p0));
    let centroid = ring.iter().map(|&i| positions[i].coords).sum::<Vector3<f64>>() / ring.len() as f64;
    normal.dot(&(centroid - center)) >= 0.0
}

fn on_sphere(raw: &[[f64; 3]], radius: f64) -> Vec<Point3<f64>> {
    raw.iter()
        .map(|&[x, y, z]| Point3::from(Vector3::new(x, y, z).normalize() * radius))
        .collect()
}

fn tangent(v: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    v - axis * v.dot(axis)
}

fn icosahedron_tables() -> (Vec<[f64; 3]>, Vec<Vec<usize>>) {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let positions = vec![
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    let faces = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ]
    .iter()
    .map(|f| f.to_vec())
    .collect();
    (positions, faces)
}
