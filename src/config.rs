// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Field configuration
//!
//! Every tunable the kernel reads is carried here and threaded through
//! [`FieldModel`](crate::FieldModel) construction. Files are TOML; any field
//! left out takes its default.

use crate::error::{FieldError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File consulted by [`FieldConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "metaform.toml";

/// Field and meshing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Iso-level of the surface, strictly inside (0, 1)
    pub iso: f64,
    /// Cell size as a fraction of the model's largest bounding-box extent
    pub precision: f32,
    /// Acceptance tolerance of ray intersections
    pub ray_tolerance: f64,
    /// Tolerance of the effective radius Newton solve
    pub newton_tolerance: f64,
    /// Acceptance tolerance of closest-point searches
    pub surface_tolerance: f64,
    /// Step cap of the gradient closest-point search
    pub max_surface_iterations: usize,
    /// Random rays cast by the ray closest-point search
    pub closest_point_attempts: usize,
    /// Cube cap of one polygonizer march
    pub max_cubes: usize,
    /// Seed of the random directions used by closest-point searches
    pub seed: u64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            iso: 0.5,
            precision: 0.05,
            ray_tolerance: 1e-6,
            newton_tolerance: 1e-12,
            surface_tolerance: 1e-6,
            max_surface_iterations: 64,
            closest_point_attempts: 32,
            max_cubes: 1_000_000,
            seed: 0x6d65_7461,
        }
    }
}

impl FieldConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config: FieldConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {path:?}"))?;
        Ok(config)
    }

    /// Load `metaform.toml` from the working directory if present, then apply
    /// `METAFORM_ISO`, `METAFORM_PRECISION` and `METAFORM_MAX_CUBES`
    pub fn load() -> anyhow::Result<Self> {
        let mut config = if PathBuf::from(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(iso) = lookup("METAFORM_ISO") {
            self.iso = iso
                .parse()
                .with_context(|| format!("METAFORM_ISO is not a number: {iso}"))?;
        }
        if let Some(precision) = lookup("METAFORM_PRECISION") {
            self.precision = precision
                .parse()
                .with_context(|| format!("METAFORM_PRECISION is not a number: {precision}"))?;
        }
        if let Some(max_cubes) = lookup("METAFORM_MAX_CUBES") {
            self.max_cubes = max_cubes
                .parse()
                .with_context(|| format!("METAFORM_MAX_CUBES is not a count: {max_cubes}"))?;
        }
        self.validate()?;
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {path:?}"))?;
        Ok(())
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.iso > 0.0 && self.iso < 1.0) {
            return Err(FieldError::invalid(format!(
                "iso must lie in (0, 1), got {}",
                self.iso
            )));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(FieldError::invalid(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }
        let tolerances = [
            ("ray_tolerance", self.ray_tolerance),
            ("newton_tolerance", self.newton_tolerance),
            ("surface_tolerance", self.surface_tolerance),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value > 0.0) {
                return Err(FieldError::invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.max_cubes == 0 {
            return Err(FieldError::invalid("max_cubes must be at least 1"));
        }
        Ok(())
    }
}
