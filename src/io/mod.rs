// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - scene loading and mesh export

mod export;
mod scene;

pub use export::{export, export_json, export_stl, export_stl_ascii};
pub use scene::{BallSpec, SceneDescription};
