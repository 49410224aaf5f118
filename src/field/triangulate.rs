// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

use super::FieldModel;
use crate::error::{FieldError, Result};
use crate::polygonizer::{EmptyReason, Polygonization, Polygonizer};
use nalgebra::Vector3;
use tracing::debug;

impl FieldModel {
    /// Mesh the surface component around the first primitive.
    ///
    /// The seed is where a ray from the first center along +x leaves the
    /// surface. Cubes are `precision` times the largest extent of the model's
    /// bounding box, and the march may reach across the whole box from there.
    pub fn triangulize(&self, precision: f32) -> Result<Polygonization> {
        let Some(first) = self.balls.first() else {
            return Err(FieldError::EmptyModel);
        };
        if !(precision.is_finite() && precision > 0.0) {
            return Err(FieldError::invalid(format!(
                "precision must be positive, got {precision}"
            )));
        }

        let extent = self.bounding_box().max_extent();
        let cell_size = f64::from(precision) * extent;
        let span = (extent / cell_size).ceil() + 2.0;
        if !(span <= f64::from(i32::MAX)) {
            return Err(FieldError::invalid(format!(
                "precision {precision} is too fine for a model of extent {extent}"
            )));
        }
        let bounds = span as usize;

        let Some(seed) =
            self.ray_intersection(&first.position(), &Vector3::x(), self.config.ray_tolerance)?
        else {
            debug!("probe ray found no surface");
            return Ok(Polygonization::empty(EmptyReason::NoSeed));
        };

        let polygonizer = Polygonizer::new(cell_size, bounds)?.with_max_cubes(self.config.max_cubes);
        let result = polygonizer.march(self, &seed);
        debug!(
            primitives = self.balls.len(),
            cell_size,
            bounds,
            status = ?result.status,
            triangles = result.mesh.triangle_count(),
            "triangulized field"
        );
        Ok(result)
    }
}
