// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Continuation polygonizer
//!
//! Starting from a cube that straddles the surface, the marcher visits only
//! cubes the surface passes through, crossing into a neighbour whenever the
//! shared face shows a sign change. Vertices are shared between cubes through
//! a cache keyed by lattice edge, so a closed surface yields a closed mesh.

mod cube_table;

use crate::error::{FieldError, Result};
use crate::geometry::convert::{point_to_f32, vector_to_f32};
use crate::geometry::{Mesh, Triangle, Vertex};
use ahash::{AHashMap, AHashSet};
use cube_table::{corner_offset, cube_table, EDGE_CORNERS, FACES};
use nalgebra::{Point3, Vector3};
use tracing::debug;

/// Regula falsi steps used to place a vertex on a crossing edge
pub const REFINE_STEPS: usize = 6;

/// Default cap on cubes visited by one march
pub const DEFAULT_MAX_CUBES: usize = 1_000_000;

/// Scalar field the polygonizer can mesh. Positive inside, negative outside;
/// the surface is the zero set.
pub trait ImplicitFunction {
    fn eval(&self, p: &Point3<f64>) -> f64;

    fn grad(&self, p: &Point3<f64>) -> Vector3<f64>;
}

/// Why a march produced no triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The seed point is not finite
    InvalidSeed,
    /// No cube around the seed straddles the surface
    NoSignChange,
    /// No seed point on the surface could be found
    NoSeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarchStatus {
    /// Every reachable cube was visited
    Complete,
    /// The cube cap or the lattice bounds cut the surface off
    Truncated,
    Empty(EmptyReason),
}

/// Mesh produced by one march with its completion status
#[derive(Debug, Clone, PartialEq)]
pub struct Polygonization {
    pub mesh: Mesh,
    pub status: MarchStatus,
    /// Cubes visited
    pub cubes: usize,
}

impl Polygonization {
    pub fn empty(reason: EmptyReason) -> Self {
        Self {
            mesh: Mesh::empty(),
            status: MarchStatus::Empty(reason),
            cubes: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == MarchStatus::Complete
    }
}

type Cell = [i32; 3];

/// Cube marcher over a regular lattice
#[derive(Debug, Clone, PartialEq)]
pub struct Polygonizer {
    cell_size: f64,
    bounds: i32,
    max_cubes: usize,
}

impl Polygonizer {
    /// Marcher with cubes of edge `cell_size`, reaching at most `bounds`
    /// cubes away from the seed cube along each axis
    pub fn new(cell_size: f64, bounds: usize) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(FieldError::invalid(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        let bounds = i32::try_from(bounds)
            .map_err(|_| FieldError::invalid(format!("bounds {bounds} too large")))?;
        Ok(Self {
            cell_size,
            bounds,
            max_cubes: DEFAULT_MAX_CUBES,
        })
    }

    pub fn with_max_cubes(mut self, max_cubes: usize) -> Self {
        self.max_cubes = max_cubes.max(1);
        self
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn bounds(&self) -> usize {
        self.bounds as usize
    }

    pub fn max_cubes(&self) -> usize {
        self.max_cubes
    }

    /// Mesh the surface component passing near `seed`
    pub fn march<F>(&self, function: &F, seed: &Point3<f64>) -> Polygonization
    where
        F: ImplicitFunction + ?Sized,
    {
        if !seed.iter().all(|c| c.is_finite()) {
            return Polygonization::empty(EmptyReason::InvalidSeed);
        }

        let half = Vector3::repeat(self.cell_size / 2.0);
        let mut march = March {
            function,
            origin: seed - half,
            cell_size: self.cell_size,
            corners: AHashMap::new(),
            vertices: AHashMap::new(),
            mesh: Mesh::new(),
        };

        let Some(start) = march.find_start_cube() else {
            debug!(?seed, "no sign change around seed");
            return Polygonization::empty(EmptyReason::NoSignChange);
        };

        let mut visited: AHashSet<Cell> = AHashSet::new();
        visited.insert(start);
        let mut stack = vec![start];
        let mut cubes = 0;
        let mut truncated = false;

        while let Some(cell) = stack.pop() {
            if cubes == self.max_cubes {
                truncated = true;
                break;
            }
            cubes += 1;

            let values = march.cube_values(cell);
            march.polygonize_cube(cell, &values);

            for (corners, step) in FACES.iter() {
                let first = values[corners[0]] > 0.0;
                if corners.iter().all(|&c| (values[c] > 0.0) == first) {
                    continue;
                }
                let next = [cell[0] + step[0], cell[1] + step[1], cell[2] + step[2]];
                if next.iter().any(|c| c.abs() > self.bounds) {
                    truncated = true;
                    continue;
                }
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }

        let mesh = march.mesh;
        debug!(
            cubes,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            truncated,
            "polygonized surface"
        );
        let status = if mesh.is_empty() {
            MarchStatus::Empty(EmptyReason::NoSignChange)
        } else if truncated {
            MarchStatus::Truncated
        } else {
            MarchStatus::Complete
        };
        Polygonization { mesh, status, cubes }
    }
}

/// State of one march
struct March<'a, F: ?Sized> {
    function: &'a F,
    origin: Point3<f64>,
    cell_size: f64,
    corners: AHashMap<Cell, f64>,
    vertices: AHashMap<(Cell, Cell), u32>,
    mesh: Mesh,
}

impl<F: ImplicitFunction + ?Sized> March<'_, F> {
    fn position(&self, lattice: Cell) -> Point3<f64> {
        self.origin
            + Vector3::new(lattice[0] as f64, lattice[1] as f64, lattice[2] as f64) * self.cell_size
    }

    fn corner_value(&mut self, lattice: Cell) -> f64 {
        if let Some(&value) = self.corners.get(&lattice) {
            return value;
        }
        let value = self.function.eval(&self.position(lattice));
        self.corners.insert(lattice, value);
        value
    }

    fn cube_values(&mut self, cell: Cell) -> [f64; 8] {
        std::array::from_fn(|c| self.corner_value(corner_lattice(cell, c)))
    }

    /// Seed cube first, then its 26 neighbours nearest first
    fn find_start_cube(&mut self) -> Option<Cell> {
        let mut candidates: Vec<Cell> = (-1..=1)
            .flat_map(|i| (-1..=1).flat_map(move |j| (-1..=1).map(move |k| [i, j, k])))
            .collect();
        candidates.sort_by_key(|c| c.iter().map(|v| v.abs()).sum::<i32>());

        candidates.into_iter().find(|&cell| {
            let values = self.cube_values(cell);
            let first = values[0] > 0.0;
            values.iter().any(|&v| (v > 0.0) != first)
        })
    }

    fn polygonize_cube(&mut self, cell: Cell, values: &[f64; 8]) {
        let config = values
            .iter()
            .enumerate()
            .fold(0usize, |acc, (c, &v)| if v > 0.0 { acc | 1 << c } else { acc });

        for polygon in &cube_table()[config] {
            let indices: Vec<u32> = polygon
                .iter()
                .map(|&edge| self.edge_vertex(cell, edge, values))
                .collect();
            self.emit_polygon(&indices);
        }
    }

    fn edge_vertex(&mut self, cell: Cell, edge: usize, values: &[f64; 8]) -> u32 {
        let [ca, cb] = EDGE_CORNERS[edge];
        let (a, b) = (corner_lattice(cell, ca), corner_lattice(cell, cb));
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&index) = self.vertices.get(&key) {
            return index;
        }

        let (pa, pb) = (self.position(a), self.position(b));
        let point = self.refine(pa, values[ca], pb, values[cb]);
        let outward = -self.function.grad(&point);
        let normal = outward.try_normalize(1e-12).unwrap_or_else(|| {
            // Points from the inside corner to the outside one
            let across = if values[ca] > 0.0 { pb - pa } else { pa - pb };
            across / self.cell_size
        });

        let index = self
            .mesh
            .add_vertex(Vertex::new(point_to_f32(&point), vector_to_f32(&normal)));
        self.vertices.insert(key, index);
        index
    }

    /// Regula falsi between two points of opposite sign
    fn refine(&self, a: Point3<f64>, va: f64, b: Point3<f64>, vb: f64) -> Point3<f64> {
        let (mut lo, mut flo, mut hi, mut fhi) = (a, va, b, vb);
        let mut point = lo + (hi - lo) * (flo / (flo - fhi));
        for _ in 0..REFINE_STEPS {
            let value = self.function.eval(&point);
            if value == 0.0 {
                break;
            }
            if (value > 0.0) == (flo > 0.0) {
                lo = point;
                flo = value;
            } else {
                hi = point;
                fhi = value;
            }
            point = lo + (hi - lo) * (flo / (flo - fhi));
        }
        point
    }

    /// Fan-triangulate, wound counter-clockwise as seen from outside
    fn emit_polygon(&mut self, indices: &[u32]) {
        let positions: Vec<Vector3<f64>> = indices
            .iter()
            .map(|&i| self.mesh.vertices[i as usize].position.coords.cast::<f64>())
            .collect();

        // Newell normal of the loop against the averaged vertex normals
        let mut area = Vector3::zeros();
        for (i, p) in positions.iter().enumerate() {
            area += p.cross(&positions[(i + 1) % positions.len()]);
        }
        let outward: Vector3<f64> = indices
            .iter()
            .map(|&i| self.mesh.vertices[i as usize].normal.cast::<f64>())
            .sum();
        let flip = area.dot(&outward) < 0.0;

        for i in 1..indices.len() - 1 {
            let triangle = Triangle::new([indices[0], indices[i], indices[i + 1]]);
            self.mesh
                .add_triangle(if flip { triangle.flipped() } else { triangle });
        }
    }
}

fn corner_lattice(cell: Cell, corner: usize) -> Cell {
    let offset = corner_offset(corner);
    [cell[0] + offset[0], cell[1] + offset[1], cell[2] + offset[2]]
}
