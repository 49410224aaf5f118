// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact ray/iso-surface intersection
//!
//! Supports crossed by the ray are swept in distance order. Between two
//! consecutive crossings the set of contributing primitives is fixed, so the
//! field along that stretch is a sum of cropped degree-6 line profiles and its
//! first iso crossing can be isolated by Bezier clipping.

use super::{FieldModel, PolynomialField};
use crate::error::{FieldError, Result};
use crate::geometry::{Bvh, LineProfile};
use nalgebra::{Point3, Vector3};
use std::cmp::Ordering;
use tracing::trace;

/// Support of one primitive along the ray
#[derive(Debug, Clone, Copy)]
struct Chord {
    ball: usize,
    entry: f64,
    exit: f64,
    dist_sq: f64,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    distance: f64,
    chord: usize,
    enter: bool,
}

impl FieldModel {
    /// First point along the ray where the field crosses the iso-level, or
    /// `None` if the ray leaves every support without crossing.
    ///
    /// Whenever a point is returned, `|eval(point)| < tol`.
    pub fn ray_intersection(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        tol: f64,
    ) -> Result<Option<Point3<f64>>> {
        Self::check_point(origin)?;
        let length = dir.norm();
        if !(length.is_finite() && length > 0.0) {
            return Err(FieldError::invalid("ray direction must be non-zero and finite"));
        }
        if !(tol.is_finite() && tol > 0.0) {
            return Err(FieldError::invalid(format!("tolerance must be positive, got {tol}")));
        }
        let unit = dir / length;

        let chords = self.ray_chords(origin, &unit);
        if chords.is_empty() {
            return Ok(None);
        }

        let mut events: Vec<Event> = chords
            .iter()
            .enumerate()
            .flat_map(|(i, c)| {
                [
                    Event {
                        distance: c.entry,
                        chord: i,
                        enter: true,
                    },
                    Event {
                        distance: c.exit,
                        chord: i,
                        enter: false,
                    },
                ]
            })
            .collect();
        // Exits sort before entries at equal distance
        events.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.enter.cmp(&b.enter),
            other => other,
        });

        let mut active: Vec<usize> = Vec::new();
        for window in events.windows(2) {
            let (event, next) = (window[0], window[1]);
            if event.enter {
                active.push(event.chord);
            } else {
                active.retain(|&c| c != event.chord);
            }

            let start = event.distance.max(0.0);
            let end = next.distance;
            if end <= start || active.is_empty() {
                continue;
            }

            if let Some(distance) = self.solve_interval(&chords, &active, origin, &unit, start, end, tol)
            {
                trace!(distance, active = active.len(), "ray crossed iso-surface");
                return Ok(Some(origin + unit * distance));
            }
        }

        Ok(None)
    }

    /// Supports crossed ahead of the origin, found through the index
    fn ray_chords(&self, origin: &Point3<f64>, unit: &Vector3<f64>) -> Vec<Chord> {
        let balls = &self.balls;
        let hit = |&i: &usize| balls[i].intersects(origin, unit).count() > 0;
        let candidates: Vec<usize> = if self.is_stale() {
            (0..balls.len()).filter(|i| hit(i)).collect()
        } else {
            self.index
                .find_all_if(|v| v.intersects_ray(origin, unit), hit)
                .copied()
                .collect()
        };

        candidates
            .into_iter()
            .filter_map(|ball| {
                balls[ball]
                    .chord(origin, unit)
                    .map(|(entry, exit, dist_sq)| Chord {
                        ball,
                        entry,
                        exit,
                        dist_sq,
                    })
            })
            .filter(|c| c.exit > 0.0)
            .collect()
    }

    /// First iso crossing within `[start, end)` given the active supports
    #[allow(clippy::too_many_arguments)]
    fn solve_interval(
        &self,
        chords: &[Chord],
        active: &[usize],
        origin: &Point3<f64>,
        unit: &Vector3<f64>,
        start: f64,
        end: f64,
        tol: f64,
    ) -> Option<f64> {
        if let [only] = active {
            let ball = &self.balls[chords[*only].ball];
            return self.solve_single(ball, origin, unit, start, end);
        }

        let total = active.iter().fold(LineProfile::zero(), |acc, &c| {
            let chord = &chords[c];
            let span = chord.exit - chord.entry;
            let profile = self.balls[chord.ball]
                .line_profile(chord.dist_sq)
                .crop((start - chord.entry) / span, (end - chord.entry) / span);
            acc + profile
        });

        let width = end - start;
        let param_tol = (tol * 1e-3 / width).max(1e-15);
        total
            .solve_first_root(self.config.iso, param_tol)
            .map(|s| start + s * width)
    }

    /// Only one primitive contributes: its iso-surface is a sphere
    fn solve_single(
        &self,
        ball: &PolynomialField,
        origin: &Point3<f64>,
        unit: &Vector3<f64>,
        start: f64,
        end: f64,
    ) -> Option<f64> {
        let radius = ball.radius() * self.effective_radius_ratio();
        let oc = origin - ball.position();
        let half_b = unit.dot(&oc);
        let c = oc.norm_squared() - radius * radius;
        let disc = half_b * half_b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        [-half_b - root, -half_b + root]
            .into_iter()
            .find(|&t| t >= start && t < end)
    }
}
