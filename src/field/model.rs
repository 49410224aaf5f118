// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Summed scalar field over a collection of primitives

use super::PolynomialField;
use crate::config::FieldConfig;
use crate::error::{FieldError, Result};
use crate::geometry::{BoundingBox, Bvh, SpatialIndex};
use crate::polygonizer::ImplicitFunction;
use nalgebra::{Point3, Vector3};
use tracing::{debug, trace};

/// Metaball field: primitives, the iso-level and a spatial index over the
/// primitives' supports.
///
/// The index is a derived view. Mutations mark it stale and queries fall back
/// to a linear scan until [`FieldModel::rebuild`] is called.
#[derive(Debug, Clone)]
pub struct FieldModel {
    pub(super) balls: Vec<PolynomialField>,
    pub(super) config: FieldConfig,
    effective_radius_ratio: f64,
    pub(super) index: SpatialIndex<usize>,
    stale: bool,
}

impl FieldModel {
    /// Empty model with default configuration
    pub fn new() -> Self {
        let config = FieldConfig::default();
        let effective_radius_ratio =
            PolynomialField::effective_radius_ratio(config.iso, config.newton_tolerance)
                .unwrap_or(std::f64::consts::FRAC_1_SQRT_2);
        Self {
            balls: Vec::new(),
            config,
            effective_radius_ratio,
            index: SpatialIndex::new(),
            stale: false,
        }
    }

    /// Empty model with the given configuration
    pub fn with_config(config: FieldConfig) -> Result<Self> {
        config.validate()?;
        let effective_radius_ratio =
            PolynomialField::effective_radius_ratio(config.iso, config.newton_tolerance)?;
        Ok(Self {
            balls: Vec::new(),
            config,
            effective_radius_ratio,
            index: SpatialIndex::new(),
            stale: false,
        })
    }

    /// Model over `balls` with its index already built
    pub fn from_balls(balls: Vec<PolynomialField>, config: FieldConfig) -> Result<Self> {
        let mut model = Self::with_config(config)?;
        model.assign(balls);
        model.rebuild();
        Ok(model)
    }

    pub fn balls(&self) -> &[PolynomialField] {
        &self.balls
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn iso(&self) -> f64 {
        self.config.iso
    }

    /// Change the iso-level; the effective radius ratio is recomputed
    pub fn set_iso(&mut self, iso: f64) -> Result<()> {
        let ratio = PolynomialField::effective_radius_ratio(iso, self.config.newton_tolerance)?;
        self.config.iso = iso;
        self.effective_radius_ratio = ratio;
        Ok(())
    }

    /// Iso-surface radius of an isolated primitive relative to its support
    pub fn effective_radius_ratio(&self) -> f64 {
        self.effective_radius_ratio
    }

    pub fn push(&mut self, ball: PolynomialField) {
        self.balls.push(ball);
        self.stale = true;
    }

    /// Replace every primitive
    pub fn assign(&mut self, balls: Vec<PolynomialField>) {
        self.balls = balls;
        self.stale = true;
    }

    /// Drop primitives matching `pred`, returning how many were removed
    pub fn remove_if<P>(&mut self, mut pred: P) -> usize
    where
        P: FnMut(&PolynomialField) -> bool,
    {
        let before = self.balls.len();
        self.balls.retain(|b| !pred(b));
        let removed = before - self.balls.len();
        if removed > 0 {
            self.stale = true;
        }
        removed
    }

    /// True when the primitives changed since the last rebuild
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn index(&self) -> &SpatialIndex<usize> {
        &self.index
    }

    /// Rebuild the spatial index from the current primitives
    pub fn rebuild(&mut self) {
        let balls = &self.balls;
        self.index = SpatialIndex::build((0..balls.len()).collect(), |&i| balls[i].bounding_box());
        self.stale = false;
        debug!(
            primitives = self.balls.len(),
            nodes = self.index.node_count(),
            depth = self.index.depth(),
            "rebuilt field index"
        );
    }

    /// Union of the primitives' supports
    pub fn bounding_box(&self) -> BoundingBox {
        self.balls
            .iter()
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b.bounding_box()))
    }

    /// Visit every primitive whose support contains `p`
    pub(super) fn for_each_containing<F>(&self, p: &Point3<f64>, mut visit: F)
    where
        F: FnMut(usize, &PolynomialField),
    {
        if self.stale {
            trace!("stale index, scanning primitives linearly");
            for (i, ball) in self.balls.iter().enumerate() {
                if ball.contains(p) {
                    visit(i, ball);
                }
            }
            return;
        }

        let balls = &self.balls;
        for &i in self
            .index
            .find_all_if(|v| v.contains_point(p), |&i| balls[i].contains(p))
        {
            visit(i, &balls[i]);
        }
    }

    /// Indices of primitives whose support box overlaps `bbox`
    pub(super) fn overlapping(&self, bbox: &BoundingBox) -> Vec<usize> {
        if self.stale {
            return (0..self.balls.len())
                .filter(|&i| self.balls[i].bounding_box().intersects(bbox))
                .collect();
        }
        let balls = &self.balls;
        self.index
            .find_all_if(|v| v.intersects(bbox), |&i| balls[i].bounding_box().intersects(bbox))
            .copied()
            .collect()
    }

    /// Field value minus iso; negative outside, `-iso` far away
    pub fn eval(&self, p: &Point3<f64>) -> f64 {
        let mut sum = 0.0;
        self.for_each_containing(p, |_, ball| sum += ball.eval(p));
        sum - self.config.iso
    }

    pub fn grad(&self, p: &Point3<f64>) -> Vector3<f64> {
        let mut sum = Vector3::zeros();
        self.for_each_containing(p, |_, ball| sum += ball.grad(p));
        sum
    }

    /// Value and gradient in a single index traversal
    pub fn eval_grad(&self, p: &Point3<f64>) -> (f64, Vector3<f64>) {
        let mut value = 0.0;
        let mut gradient = Vector3::zeros();
        self.for_each_containing(p, |_, ball| {
            value += ball.eval(p);
            gradient += ball.grad(p);
        });
        (value - self.config.iso, gradient)
    }

    /// Inside the iso-surface
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        self.eval(p) > 0.0
    }

    pub(super) fn check_point(p: &Point3<f64>) -> Result<()> {
        if p.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(FieldError::invalid("point must be finite"))
        }
    }
}

impl Default for FieldModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ImplicitFunction for FieldModel {
    fn eval(&self, p: &Point3<f64>) -> f64 {
        FieldModel::eval(self, p)
    }

    fn grad(&self, p: &Point3<f64>) -> Vector3<f64> {
        FieldModel::grad(self, p)
    }
}
