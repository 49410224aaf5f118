// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene files: a list of primitives plus optional field configuration
//!
//! ```toml
//! [config]
//! iso = 0.5
//!
//! [[balls]]
//! position = [0.0, 0.0, 0.0]
//! radius = 1.0
//! ```

use crate::config::FieldConfig;
use crate::field::{FieldModel, PolynomialField};
use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One primitive as written in a scene file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSpec {
    pub position: [f64; 3],
    pub radius: f64,
}

impl From<&PolynomialField> for BallSpec {
    fn from(ball: &PolynomialField) -> Self {
        let p = ball.position();
        Self {
            position: [p.x, p.y, p.z],
            radius: ball.radius(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FieldConfig>,
    #[serde(default)]
    pub balls: Vec<BallSpec>,
}

impl SceneDescription {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse TOML scene")
    }

    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).context("Failed to parse JSON scene")
    }

    /// Load a `.toml` or `.json` scene
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file: {path:?}"))?;
        let scene = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&source),
            Some("json") => Self::from_json(&source),
            _ => bail!("Unsupported scene format: {path:?}"),
        };
        scene.with_context(|| format!("Invalid scene file: {path:?}"))
    }

    /// Capture a model's primitives and configuration
    pub fn from_model(model: &FieldModel) -> Self {
        Self {
            config: Some(model.config().clone()),
            balls: model.balls().iter().map(BallSpec::from).collect(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }

    /// Build the model, with `fallback` used when the scene carries no
    /// configuration of its own
    pub fn into_model(self, fallback: FieldConfig) -> Result<FieldModel> {
        let balls = self
            .balls
            .iter()
            .enumerate()
            .map(|(i, ball)| {
                let [x, y, z] = ball.position;
                PolynomialField::new(Point3::new(x, y, z), ball.radius)
                    .with_context(|| format!("Invalid primitive #{i}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let config = self.config.unwrap_or(fallback);
        Ok(FieldModel::from_balls(balls, config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCENE: &str = r#"
[config]
iso = 0.4

[[balls]]
position = [0.0, 0.0, 0.0]
radius = 1.0

[[balls]]
position = [1.5, 0.0, 0.0]
radius = 0.5
"#;

    #[test]
    fn test_parse_toml() {
        let scene = SceneDescription::from_toml(SCENE).unwrap();
        assert_eq!(scene.balls.len(), 2);
        assert_eq!(scene.balls[1].radius, 0.5);
        assert_eq!(scene.config.as_ref().map(|c| c.iso), Some(0.4));

        let model = scene.into_model(FieldConfig::default()).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.iso(), 0.4);
        assert!(!model.is_stale());
    }

    #[test]
    fn test_parse_json_without_config() {
        let json = r#"{"balls": [{"position": [1, 2, 3], "radius": 2}]}"#;
        let scene = SceneDescription::from_json(json).unwrap();
        assert!(scene.config.is_none());
        let model = scene.into_model(FieldConfig::default()).unwrap();
        assert_eq!(model.balls()[0].position(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(model.iso(), 0.5);
    }

    #[test]
    fn test_invalid_primitive_is_reported() {
        let json = r#"{"balls": [{"position": [0, 0, 0], "radius": -1}]}"#;
        let err = SceneDescription::from_json(json)
            .unwrap()
            .into_model(FieldConfig::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("#0"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.toml");
        let scene = SceneDescription::from_toml(SCENE).unwrap();
        std::fs::write(&path, scene.to_toml().unwrap()).unwrap();

        let loaded = SceneDescription::from_file(&path).unwrap();
        assert_eq!(loaded, scene);
        assert!(SceneDescription::from_file(dir.path().join("scene.yaml")).is_err());
    }

    #[test]
    fn test_from_model() {
        let scene = SceneDescription::from_toml(SCENE).unwrap();
        let model = scene.clone().into_model(FieldConfig::default()).unwrap();
        assert_eq!(SceneDescription::from_model(&model), scene);
    }
}
