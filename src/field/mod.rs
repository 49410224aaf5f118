// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Metaball field: primitives, their summed field and the queries on it

mod ball;
mod closest;
mod connectivity;
mod model;
mod ray;
mod triangulate;

pub use ball::{PolynomialField, SphereHits, CONNECTION_TOLERANCE, MAX_NEWTON_ITERATIONS};
pub use closest::SurfaceSearch;
pub use model::FieldModel;
