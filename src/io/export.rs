// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh exporters: binary and ASCII STL, JSON

use crate::geometry::{Mesh, Triangle};
use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export by file extension: `.stl` (binary) or `.json`
pub fn export(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("stl") => export_stl(mesh, path),
        Some(ext) if ext.eq_ignore_ascii_case("json") => export_json(mesh, path),
        _ => bail!("Unsupported export format: {path:?}"),
    }
}

/// Export mesh to binary STL
pub fn export_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create STL file: {path:?}"))?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|tri| {
            let [v0, v1, v2] = tri.indices.map(|i| mesh.vertices[i as usize].position);
            let normal = face_normal(mesh, tri);
            stl_io::Triangle {
                normal: stl_io::Normal::new([normal.x, normal.y, normal.z]),
                vertices: [
                    stl_io::Vertex::new([v0.x, v0.y, v0.z]),
                    stl_io::Vertex::new([v1.x, v1.y, v1.z]),
                    stl_io::Vertex::new([v2.x, v2.y, v2.z]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter())
        .with_context(|| format!("Failed to write STL file: {path:?}"))?;
    writer.flush()?;
    Ok(())
}

/// Export mesh to ASCII STL
pub fn export_stl_ascii(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create STL file: {path:?}"))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "solid metaform")?;
    for tri in &mesh.triangles {
        let n = face_normal(mesh, tri);
        writeln!(out, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(out, "    outer loop")?;
        for &i in &tri.indices {
            let p = mesh.vertices[i as usize].position;
            writeln!(out, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(out, "    endloop")?;
        writeln!(out, "  endfacet")?;
    }
    writeln!(out, "endsolid metaform")?;
    out.flush()?;
    Ok(())
}

/// Export mesh to JSON: vertices with normals, then triangle indices
pub fn export_json(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create JSON file: {path:?}"))?;
    serde_json::to_writer(BufWriter::new(file), mesh)
        .with_context(|| format!("Failed to write JSON file: {path:?}"))?;
    Ok(())
}

/// Geometric normal of a triangle; zero for degenerate triangles
fn face_normal(mesh: &Mesh, tri: &Triangle) -> Vector3<f32> {
    let [a, b, c] = tri.indices.map(|i| mesh.vertices[i as usize].position);
    (b - a)
        .cross(&(c - a))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}
