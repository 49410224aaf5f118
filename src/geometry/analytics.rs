// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::Mesh;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Enclosed volume in cubic units
    pub volume: f64,
    /// Signed volume; positive when triangles wind counter-clockwise from outside
    pub signed_volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Vertex centroid [x, y, z]
    pub centroid: [f64; 3],
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangles
    pub triangle_count: usize,
    /// Every edge shared by exactly two triangles
    pub is_watertight: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            signed_volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    let vertex_count = mesh.vertices.len();
    let triangle_count = mesh.triangles.len();

    if vertex_count == 0 || triangle_count == 0 {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    let signed_volume = calculate_signed_volume(mesh);

    GeometryStats {
        volume: signed_volume.abs(),
        signed_volume,
        surface_area: calculate_surface_area(mesh),
        bbox: [
            bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z,
        ],
        centroid: calculate_centroid(mesh),
        vertex_count,
        triangle_count,
        is_watertight: check_watertight(mesh),
    }
}

fn corners(mesh: &Mesh, indices: [u32; 3]) -> [nalgebra::Vector3<f64>; 3] {
    indices.map(|i| {
        let p = mesh.vertices[i as usize].position;
        nalgebra::Vector3::new(p.x as f64, p.y as f64, p.z as f64)
    })
}

/// Signed volume of tetrahedra against the origin
fn calculate_signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|t| {
            let [v0, v1, v2] = corners(mesh, t.indices);
            v0.dot(&v1.cross(&v2)) / 6.0
        })
        .sum()
}

fn calculate_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|t| {
            let [v0, v1, v2] = corners(mesh, t.indices);
            (v1 - v0).cross(&(v2 - v0)).norm() / 2.0
        })
        .sum()
}

fn calculate_centroid(mesh: &Mesh) -> [f64; 3] {
    let mut sum = [0.0; 3];
    for vertex in &mesh.vertices {
        sum[0] += vertex.position.x as f64;
        sum[1] += vertex.position.y as f64;
        sum[2] += vertex.position.z as f64;
    }
    let count = mesh.vertices.len() as f64;
    sum.map(|s| s / count)
}

fn check_watertight(mesh: &Mesh) -> bool {
    let mut edge_count: AHashMap<(u32, u32), usize> = AHashMap::new();

    for triangle in &mesh.triangles {
        let indices = &triangle.indices;
        for i in 0..3 {
            let v1 = indices[i];
            let v2 = indices[(i + 1) % 3];
            let edge = if v1 < v2 { (v1, v2) } else { (v2, v1) };
            *edge_count.entry(edge).or_insert(0) += 1;
        }
    }

    edge_count.values().all(|&count| count == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Triangle, Vertex};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    /// Regular octahedron with unit circumradius, CCW from outside
    fn octahedron() -> Mesh {
        let mut mesh = Mesh::new();
        let points = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        for p in points {
            let position = Point3::new(p[0], p[1], p[2]);
            mesh.add_vertex(Vertex::new(position, Vector3::new(p[0], p[1], p[2])));
        }
        for indices in [
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ] {
            mesh.add_triangle(Triangle::new(indices));
        }
        mesh
    }

    #[test]
    fn test_analyze_octahedron() {
        let stats = analyze(&octahedron());

        assert_relative_eq!(stats.signed_volume, 4.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(stats.surface_area, 4.0 * 3.0_f64.sqrt(), epsilon = 1e-5);
        assert!(stats.is_watertight);
        assert_eq!(stats.triangle_count, 8);
        assert!(stats.centroid.iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_flipped_mesh_has_negative_signed_volume() {
        let mut mesh = octahedron();
        for triangle in &mut mesh.triangles {
            *triangle = triangle.flipped();
        }
        let stats = analyze(&mesh);
        assert!(stats.signed_volume < 0.0);
        assert_relative_eq!(stats.volume, 4.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_mesh_is_not_watertight() {
        let mut mesh = octahedron();
        mesh.triangles.pop();
        assert!(!analyze(&mesh).is_watertight);
        assert_eq!(analyze(&Mesh::empty()).triangle_count, 0);
    }
}
