// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Explicit scalar/vector conversions between the f64 field space and the
//! f32 mesh output.

use nalgebra::{Point3, Vector3};

pub fn point_to_f32(p: &Point3<f64>) -> Point3<f32> {
    Point3::new(p.x as f32, p.y as f32, p.z as f32)
}

pub fn point_to_f64(p: &Point3<f32>) -> Point3<f64> {
    Point3::new(p.x as f64, p.y as f64, p.z as f64)
}

pub fn vector_to_f32(v: &Vector3<f64>) -> Vector3<f32> {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

/// Narrow a vertex index to 16 bits, if it fits
pub fn index_to_u16(index: u32) -> Option<u16> {
    u16::try_from(index).ok()
}
