// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - bounding volumes, Bezier curves and mesh output

mod analytics;
mod bbox;
mod bezier;
mod bvh;
pub mod convert;
mod mesh;

pub use analytics::{analyze, GeometryStats};
pub use bbox::BoundingBox;
pub use bezier::{BezierClipping, LineProfile, MAX_CLIP_ITERATIONS, MAX_SUBDIVISION_DEPTH};
pub use bvh::{Bvh, FindAllIf, SpatialIndex};
pub use mesh::{Mesh, Triangle, Vertex};
