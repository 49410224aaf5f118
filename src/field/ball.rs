// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Single radial primitive ("metaball") with a compact polynomial kernel
//!
//! The kernel is `k(t) = 2t³ - 3t² + 1` on `t = |p - c|² / R²`, zero for
//! `t >= 1`. Value and first derivative are fixed at both ends of `[0, 1]`, so
//! the summed field is C¹ everywhere. Because `t` is quadratic along any line,
//! the field restricted to a line is an exact degree-6 polynomial, which is
//! what [`PolynomialField::line_profile`] returns.

use crate::error::{FieldError, Result};
use crate::geometry::{BoundingBox, LineProfile};
use nalgebra::{Point3, Vector3};

/// Newton iterations allowed when solving for the effective radius
pub const MAX_NEWTON_ITERATIONS: usize = 64;

/// Parameter tolerance used by the pairwise connectivity tests
pub const CONNECTION_TOLERANCE: f64 = 1e-9;

/// Result of intersecting a ray with a primitive's bounding sphere.
/// Distances are signed and measured in units of the ray direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SphereHits {
    /// The ray misses the sphere or the sphere lies behind the origin
    None,
    /// The origin is inside the sphere; `entry` is negative
    Inside { entry: f64, exit: f64 },
    /// Both crossings lie ahead of the origin
    Ahead { entry: f64, exit: f64 },
}

impl SphereHits {
    /// Number of crossings at non-negative distance
    pub fn count(&self) -> usize {
        match self {
            SphereHits::None => 0,
            SphereHits::Inside { .. } => 1,
            SphereHits::Ahead { .. } => 2,
        }
    }

    /// Signed entry and exit distances
    pub fn distances(&self) -> Option<(f64, f64)> {
        match *self {
            SphereHits::None => None,
            SphereHits::Inside { entry, exit } | SphereHits::Ahead { entry, exit } => {
                Some((entry, exit))
            }
        }
    }
}

/// Radial field primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialField {
    position: Point3<f64>,
    radius: f64,
}

impl PolynomialField {
    pub fn new(position: Point3<f64>, radius: f64) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(FieldError::invalid(format!(
                "radius must be positive and finite, got {radius}"
            )));
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(FieldError::invalid("position must be finite"));
        }
        Ok(Self { position, radius })
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Decay kernel on the normalized squared distance
    pub fn kernel(t: f64) -> f64 {
        if !(0.0..1.0).contains(&t) {
            return if t < 0.0 { 1.0 } else { 0.0 };
        }
        (2.0 * t - 3.0) * t * t + 1.0
    }

    /// dk/dt
    pub fn kernel_derivative(t: f64) -> f64 {
        if !(0.0..1.0).contains(&t) {
            return 0.0;
        }
        6.0 * t * (t - 1.0)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_sphere(&self.position, self.radius)
    }

    /// Inside the bounding sphere (where the primitive contributes)
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (p - self.position).norm_squared() < self.radius * self.radius
    }

    pub fn eval(&self, p: &Point3<f64>) -> f64 {
        let r2 = (p - self.position).norm_squared();
        let big_r2 = self.radius * self.radius;
        if r2 >= big_r2 {
            return 0.0;
        }
        Self::kernel(r2 / big_r2)
    }

    pub fn grad(&self, p: &Point3<f64>) -> Vector3<f64> {
        let offset = p - self.position;
        let big_r2 = self.radius * self.radius;
        let r2 = offset.norm_squared();
        if r2 >= big_r2 {
            return Vector3::zeros();
        }
        offset * (2.0 * Self::kernel_derivative(r2 / big_r2) / big_r2)
    }

    /// Ray against the bounding sphere
    pub fn intersects(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> SphereHits {
        let a = dir.norm_squared();
        if a == 0.0 {
            return SphereHits::None;
        }
        let oc = origin - self.position;
        let half_b = dir.dot(&oc);
        let c = oc.norm_squared() - self.radius * self.radius;
        let disc = half_b * half_b - a * c;
        if disc < 0.0 {
            return SphereHits::None;
        }

        let root = disc.sqrt();
        let entry = (-half_b - root) / a;
        let exit = (-half_b + root) / a;
        if exit < 0.0 {
            SphereHits::None
        } else if entry < 0.0 {
            SphereHits::Inside { entry, exit }
        } else {
            SphereHits::Ahead { entry, exit }
        }
    }

    /// Ratio of the iso-surface radius of an isolated primitive to its
    /// support radius, i.e. `sqrt(t)` with `k(t) = iso`.
    ///
    /// A root is accepted once both the residual and the last Newton step
    /// are within `tol`.
    pub fn effective_radius_ratio(iso: f64, tol: f64) -> Result<f64> {
        Self::solve_effective_radius(iso, tol, MAX_NEWTON_ITERATIONS)
    }

    fn solve_effective_radius(iso: f64, tol: f64, max_iterations: usize) -> Result<f64> {
        if !(iso > 0.0 && iso < 1.0) {
            return Err(FieldError::invalid(format!(
                "iso level must lie in (0, 1), got {iso}"
            )));
        }

        let mut t = 0.5;
        let mut residual = Self::iso_residual(t, iso);
        let mut step = f64::INFINITY;
        for _ in 0..max_iterations {
            if residual.abs() <= tol && step.abs() <= tol {
                return Ok(t.sqrt());
            }
            let slope = Self::kernel_derivative(t);
            if slope == 0.0 {
                break;
            }
            let next = (t - residual / slope).clamp(0.0, 1.0);
            step = next - t;
            t = next;
            residual = Self::iso_residual(t, iso);
        }

        if residual.abs() <= tol && step.abs() <= tol {
            return Ok(t.sqrt());
        }
        Err(FieldError::NoConvergence {
            iterations: max_iterations,
            residual,
        })
    }

    /// `k(t) - iso` in the factored form that stays accurate near whichever
    /// end of `[0, 1]` `t` is closer to
    fn iso_residual(t: f64, iso: f64) -> f64 {
        if t < 0.5 {
            (1.0 - iso) - t * t * (3.0 - 2.0 * t)
        } else {
            let s = 1.0 - t;
            s * s * (1.0 + 2.0 * t) - iso
        }
    }

    /// Exact field along a line whose closest approach to the center has
    /// squared distance `dist_sq`. The parameter runs over the chord cut by
    /// the support sphere, entry at 0 and exit at 1.
    pub fn line_profile(&self, dist_sq: f64) -> LineProfile {
        let a = 1.0 - dist_sq / (self.radius * self.radius);
        if a <= 0.0 {
            return LineProfile::zero();
        }
        let a2 = a * a;
        let a3 = a2 * a;
        // k = 3w² - 2w³ with w = 4a·s(1 - s)
        LineProfile::from_monomial([
            0.0,
            0.0,
            48.0 * a2,
            -96.0 * a2 - 128.0 * a3,
            48.0 * a2 + 384.0 * a3,
            -384.0 * a3,
            128.0 * a3,
        ])
    }

    /// Chord of a unit-direction line through the support sphere as signed
    /// `(entry, exit, dist_sq)`
    pub fn chord(&self, origin: &Point3<f64>, unit_dir: &Vector3<f64>) -> Option<(f64, f64, f64)> {
        let oc = self.position - origin;
        let along = oc.dot(unit_dir);
        let dist_sq = (oc.norm_squared() - along * along).max(0.0);
        let half_sq = self.radius * self.radius - dist_sq;
        if half_sq <= 0.0 {
            return None;
        }
        let half = half_sq.sqrt();
        Some((along - half, along + half, dist_sq))
    }

    /// Summed profile of two primitives along the segment joining their
    /// centers, restricted to where both supports overlap. `None` when the
    /// supports leave a gap on the segment.
    fn connection_profile(a: &Self, b: &Self) -> Option<LineProfile> {
        let d = (b.position - a.position).norm();
        if d == 0.0 {
            return Some(LineProfile::constant(2.0));
        }

        let (ra, rb) = (a.radius, b.radius);
        let lo = (d - rb).max(0.0);
        let hi = ra.min(d);
        if lo >= hi {
            return None;
        }

        // Chord of `a` spans [-ra, ra], chord of `b` spans [d - rb, d + rb]
        let pa = a
            .line_profile(0.0)
            .crop((lo + ra) / (2.0 * ra), (hi + ra) / (2.0 * ra));
        let start_b = d - rb;
        let pb = b
            .line_profile(0.0)
            .crop((lo - start_b) / (2.0 * rb), (hi - start_b) / (2.0 * rb));
        Some(pa + pb)
    }

    /// Whether the field stays above `iso` along the whole segment between the
    /// two centers
    pub fn connected(a: &Self, b: &Self, iso: f64) -> bool {
        match Self::connection_profile(a, b) {
            Some(profile) => {
                profile.eval(0.0) > iso && !profile.if_have_root(iso, CONNECTION_TOLERANCE)
            }
            None => false,
        }
    }

    /// Minimum margin of the field above `iso` on the overlap of the two
    /// supports; negative when the pair is not connected
    pub fn connection_strength(a: &Self, b: &Self, iso: f64) -> f64 {
        match Self::connection_profile(a, b) {
            Some(profile) => profile.min_value(CONNECTION_TOLERANCE) - iso,
            None => -iso,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ball(x: f64, radius: f64) -> PolynomialField {
        PolynomialField::new(Point3::new(x, 0.0, 0.0), radius).unwrap()
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(PolynomialField::new(Point3::origin(), 0.0).is_err());
        assert!(PolynomialField::new(Point3::origin(), -1.0).is_err());
        assert!(PolynomialField::new(Point3::origin(), f64::NAN).is_err());
    }

    #[test]
    fn test_kernel_shape() {
        assert_eq!(PolynomialField::kernel(0.0), 1.0);
        assert_eq!(PolynomialField::kernel(1.0), 0.0);
        assert_eq!(PolynomialField::kernel_derivative(0.0), 0.0);
        assert_eq!(PolynomialField::kernel_derivative(1.0), 0.0);
        assert_relative_eq!(PolynomialField::kernel(0.5), 0.5);
    }

    #[test]
    fn test_eval_and_grad() {
        let b = ball(0.0, 2.0);
        assert_eq!(b.eval(&Point3::origin()), 1.0);
        assert_eq!(b.eval(&Point3::new(2.0, 0.0, 0.0)), 0.0);

        let p = Point3::new(0.7, -0.3, 0.4);
        let h = 1e-6;
        let g = b.grad(&p);
        for axis in 0..3 {
            let mut step = Vector3::zeros();
            step[axis] = h;
            let fd = (b.eval(&(p + step)) - b.eval(&(p - step))) / (2.0 * h);
            assert_relative_eq!(g[axis], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sphere_hits() {
        let b = ball(0.0, 1.0);
        let dir = Vector3::new(-1.0, 0.0, 0.0);

        let hits = b.intersects(&Point3::new(5.0, 0.0, 0.0), &dir);
        assert_eq!(hits, SphereHits::Ahead { entry: 4.0, exit: 6.0 });
        assert_eq!(hits.count(), 2);

        let hits = b.intersects(&Point3::origin(), &dir);
        assert_eq!(hits.count(), 1);
        assert_eq!(hits.distances(), Some((-1.0, 1.0)));

        assert_eq!(b.intersects(&Point3::new(-5.0, 0.0, 0.0), &dir), SphereHits::None);
        assert_eq!(
            b.intersects(&Point3::new(5.0, 2.0, 0.0), &dir),
            SphereHits::None
        );
    }

    #[test]
    fn test_effective_radius_ratio() {
        let k = PolynomialField::effective_radius_ratio(0.5, 1e-12).unwrap();
        assert_relative_eq!(k, 0.5_f64.sqrt(), epsilon = 1e-9);

        let k = PolynomialField::effective_radius_ratio(0.2, 1e-12).unwrap();
        assert_relative_eq!(PolynomialField::kernel(k * k), 0.2, epsilon = 1e-10);

        assert!(matches!(
            PolynomialField::effective_radius_ratio(1.5, 1e-12),
            Err(FieldError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_effective_radius_ratio_near_flat_ends() {
        // k is flat at t = 0, so a small residual alone does not pin t down
        let iso = 1.0 - 1e-12;
        let k = PolynomialField::effective_radius_ratio(iso, 1e-12).unwrap();
        let expected = ((1.0 - iso) / 3.0_f64).sqrt().sqrt();
        assert_relative_eq!(k, expected, max_relative = 1e-5);

        let iso = 1e-12;
        let k = PolynomialField::effective_radius_ratio(iso, 1e-12).unwrap();
        let s = (iso / 3.0_f64).sqrt();
        assert_relative_eq!(k, (1.0 - s).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_effective_radius_ratio_reports_iteration_cap() {
        let result = PolynomialField::solve_effective_radius(0.2, 1e-12, 2);
        let Err(FieldError::NoConvergence { iterations, residual }) = result else {
            panic!("expected the iteration cap to be hit, got {result:?}");
        };
        assert_eq!(iterations, 2);
        assert!(residual.abs() > 1e-12);

        assert!(PolynomialField::solve_effective_radius(0.2, 1e-12, MAX_NEWTON_ITERATIONS).is_ok());
    }

    #[test]
    fn test_line_profile_matches_eval() {
        let b = PolynomialField::new(Point3::new(0.3, -0.2, 0.5), 1.5).unwrap();
        let origin = Point3::new(-4.0, 0.1, 0.2);
        let dir = Vector3::new(1.0, 0.05, 0.1).normalize();

        let (entry, exit, dist_sq) = b.chord(&origin, &dir).unwrap();
        let profile = b.line_profile(dist_sq);
        for i in 0..=16 {
            let s = i as f64 / 16.0;
            let p = origin + dir * (entry + (exit - entry) * s);
            assert_relative_eq!(profile.eval(s), b.eval(&p), epsilon = 1e-10);
        }

        assert_eq!(b.line_profile(4.0), LineProfile::zero());
    }

    #[test]
    fn test_connectivity_scenarios() {
        let a = ball(0.0, 1.0);
        assert!(PolynomialField::connected(&a, &ball(1.5, 1.0), 0.5));
        assert!(!PolynomialField::connected(&a, &ball(3.0, 1.0), 0.5));
        // Supports overlap but the saddle between them dips below iso
        assert!(!PolynomialField::connected(&a, &ball(1.9, 1.0), 0.5));
    }

    #[test]
    fn test_connection_strength() {
        let a = ball(0.0, 1.0);
        let near = PolynomialField::connection_strength(&a, &ball(1.0, 1.0), 0.5);
        let far = PolynomialField::connection_strength(&a, &ball(1.5, 1.0), 0.5);
        assert!(near > far && far > 0.0);

        // The midpoint is a saddle along the segment, so the minimum sits below it
        let midpoint = 2.0 * PolynomialField::kernel(0.5625) - 0.5;
        assert!(far < midpoint);
        let x: f64 = 0.6;
        let sample = PolynomialField::kernel(x * x) + PolynomialField::kernel((1.5 - x).powi(2));
        assert!(far <= sample - 0.5 + 1e-9);

        assert!(PolynomialField::connection_strength(&a, &ball(3.0, 1.0), 0.5) < 0.0);
    }
}
