// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Metaform implicit surface kernel
//!
//! Metaball fields built from compact polynomial primitives, with exact ray
//! intersection by Bezier clipping, a flat-array BVH over the primitives,
//! connectivity pruning and continuation polygonization into triangle meshes.

pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod io;
pub mod polygonizer;

pub use config::FieldConfig;
pub use error::{FieldError, Result};
pub use field::{FieldModel, PolynomialField, SphereHits, SurfaceSearch};
pub use geometry::{
    analyze, BezierClipping, BoundingBox, Bvh, GeometryStats, LineProfile, Mesh, SpatialIndex,
    Triangle, Vertex,
};
pub use polygonizer::{EmptyReason, ImplicitFunction, MarchStatus, Polygonization, Polygonizer};

/// Build a model from a scene file and mesh it at the configured precision
pub fn mesh_scene_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Polygonization> {
    let scene = io::SceneDescription::from_file(path)?;
    let model = scene.into_model(FieldConfig::default())?;
    let precision = model.config().precision;
    Ok(model.triangulize(precision)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::io::Write;

    #[test]
    fn test_basic_ball() {
        let ball = PolynomialField::new(Point3::origin(), 1.0).unwrap();
        let model = FieldModel::from_balls(vec![ball], FieldConfig::default()).unwrap();
        let result = model.triangulize(0.1);
        assert!(result.is_ok());
    }

    #[test]
    fn test_mesh_scene_file() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[[balls]]\nposition = [0.0, 0.0, 0.0]\nradius = 1.0")?;
        let result = mesh_scene_file(file.path())?;
        assert!(result.is_complete());
        assert!(!result.mesh.is_empty());
        Ok(())
    }
}
