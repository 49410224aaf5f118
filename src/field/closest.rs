// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Best-effort searches for the iso-surface point nearest to a query point
//!
//! Neither search is exact. Callers should read
//! [`SurfaceSearch::NoConvergence`] as "no surface found nearby".

use super::FieldModel;
use crate::error::{FieldError, Result};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Outcome of a closest-surface-point search
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceSearch {
    Found {
        point: Point3<f64>,
        distance: f64,
        iterations: usize,
    },
    NoConvergence {
        last: Point3<f64>,
        residual: f64,
        iterations: usize,
    },
}

impl SurfaceSearch {
    pub fn point(&self) -> Option<Point3<f64>> {
        match self {
            SurfaceSearch::Found { point, .. } => Some(*point),
            SurfaceSearch::NoConvergence { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SurfaceSearch::Found { .. })
    }
}

const AXES: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

impl FieldModel {
    /// Cast rays from `p` toward the surface and keep the nearest hit.
    ///
    /// The first ray follows the gradient (inward from outside, outward from
    /// inside), then the six axes, then `closest_point_attempts` random
    /// directions drawn from the configured seed.
    pub fn find_closest_surface_point(&self, p: &Point3<f64>) -> Result<SurfaceSearch> {
        Self::check_point(p)?;
        if self.is_empty() {
            return Err(FieldError::EmptyModel);
        }

        let tol = self.config.surface_tolerance;
        let (value, gradient) = self.eval_grad(p);
        if value.abs() < tol {
            return Ok(SurfaceSearch::Found {
                point: *p,
                distance: 0.0,
                iterations: 0,
            });
        }

        let toward_surface = if value > 0.0 { -gradient } else { gradient };
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let random = (0..self.config.closest_point_attempts).map(move |_| {
            Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        });
        let directions = std::iter::once(toward_surface)
            .chain(AXES.iter().map(|a| Vector3::new(a[0], a[1], a[2])))
            .chain(random)
            .filter(|d| d.norm() > 1e-9);

        let mut best: Option<(Point3<f64>, f64)> = None;
        let mut iterations = 0;
        for dir in directions {
            iterations += 1;
            let Some(hit) = self.ray_intersection(p, &dir, tol)? else {
                continue;
            };
            let distance = (hit - p).norm();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((hit, distance));
            }
        }

        trace!(iterations, found = best.is_some(), "ray closest-point search");
        Ok(match best {
            Some((point, distance)) => SurfaceSearch::Found {
                point,
                distance,
                iterations,
            },
            None => SurfaceSearch::NoConvergence {
                last: *p,
                residual: value,
                iterations,
            },
        })
    }

    /// Newton stepping on the field value along the gradient until
    /// `|eval| < surface_tolerance` or `max_surface_iterations` is spent.
    ///
    /// Where the gradient vanishes (far outside every support, or at a
    /// center) the walk jumps to the effective sphere of the nearest
    /// primitive. Steps never exceed the largest support radius.
    pub fn find_closest_surface_point_v2(&self, p: &Point3<f64>) -> Result<SurfaceSearch> {
        Self::check_point(p)?;
        if self.is_empty() {
            return Err(FieldError::EmptyModel);
        }

        let tol = self.config.surface_tolerance;
        let max_step = self
            .balls
            .iter()
            .map(|b| b.radius())
            .fold(0.0_f64, f64::max);

        let mut x = *p;
        let mut residual = 0.0;
        for iteration in 0..=self.config.max_surface_iterations {
            let (value, gradient) = self.eval_grad(&x);
            residual = value;
            if value.abs() < tol {
                return Ok(SurfaceSearch::Found {
                    point: x,
                    distance: (x - p).norm(),
                    iterations: iteration,
                });
            }
            if iteration == self.config.max_surface_iterations {
                break;
            }

            let g2 = gradient.norm_squared();
            if g2 < 1e-18 {
                x = self.nearest_effective_sphere_point(&x);
                continue;
            }
            let mut step = gradient * (value / g2);
            let length = step.norm();
            if length > max_step {
                step *= max_step / length;
            }
            x -= step;
        }

        trace!(residual, "gradient closest-point search did not converge");
        Ok(SurfaceSearch::NoConvergence {
            last: x,
            residual,
            iterations: self.config.max_surface_iterations,
        })
    }

    fn nearest_effective_sphere_point(&self, x: &Point3<f64>) -> Point3<f64> {
        let nearest = self.balls.iter().min_by(|a, b| {
            let da = (x - a.position()).norm_squared();
            let db = (x - b.position()).norm_squared();
            da.total_cmp(&db)
        });
        let Some(ball) = nearest else {
            return *x;
        };
        let offset = x - ball.position();
        let dir = offset.try_normalize(1e-12).unwrap_or_else(Vector3::x);
        ball.position() + dir * (ball.radius() * self.effective_radius_ratio())
    }
}
