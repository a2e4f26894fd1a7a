// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ loading
//!
//! Only geometry is read: `v` positions and `f` faces. Every `o`, `g` or
//! `usemtl` statement starts a new shape, and each shape becomes its own
//! [`TriangleMesh`]. Room wall files rely on this: one shape per physical
//! wall fragment.
//!
//! Faces with more than three corners are fan-triangulated. Corner tokens may
//! use the `v`, `v/vt`, `v//vn` and `v/vt/vn` forms and negative (relative)
//! indices.

use std::path::Path;

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;

/// Read an OBJ file into one mesh per shape
pub fn read_obj(path: &Path) -> Result<Vec<TriangleMesh>> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    parse_obj(&bytes)
}

/// Parse OBJ bytes into one mesh per shape, dropping empty shapes
pub fn parse_obj(bytes: &[u8]) -> Result<Vec<TriangleMesh>> {
    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(bytes.len() / 32);
    let mut shapes = Vec::new();
    let mut current = ShapeBuilder::default();

    let mut line_start = 0;
    let mut line_no = 0;
    let line_ends = memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len()));
    for line_end in line_ends {
        line_no += 1;
        let line = trim_ascii(&bytes[line_start..line_end]);
        line_start = line_end + 1;

        let mut pos = 0;
        let Some(keyword) = next_token(line, &mut pos) else {
            continue;
        };

        match keyword {
            b"v" => {
                let mut coords = [0.0f64; 3];
                for c in coords.iter_mut() {
                    let token = next_token(line, &mut pos)
                        .ok_or_else(|| Error::obj(line_no, "vertex needs three coordinates"))?;
                    *c = parse_float(token)
                        .ok_or_else(|| Error::obj(line_no, "invalid vertex coordinate"))?;
                }
                vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            b"f" => {
                let mut corners: SmallVec<[u32; 8]> = SmallVec::new();
                while let Some(token) = next_token(line, &mut pos) {
                    corners.push(resolve_index(token, vertices.len(), line_no)?);
                }
                if corners.len() < 3 {
                    return Err(Error::obj(line_no, "face needs at least three corners"));
                }
                for i in 1..corners.len() - 1 {
                    current.add_triangle([corners[0], corners[i], corners[i + 1]], &vertices);
                }
            }
            b"o" | b"g" | b"usemtl" => {
                if let Some(mesh) = current.finish() {
                    shapes.push(mesh);
                }
            }
            _ => {}
        }
    }

    if let Some(mesh) = current.finish() {
        shapes.push(mesh);
    }

    Ok(shapes)
}

/// Collects triangles of one shape, re-indexing global vertices locally
#[derive(Default)]
struct ShapeBuilder {
    mesh: TriangleMesh,
    remap: FxHashMap<u32, u32>,
}

impl ShapeBuilder {
    fn add_triangle(&mut self, corners: [u32; 3], vertices: &[Point3<f64>]) {
        let mut local = [0u32; 3];
        for (slot, global) in local.iter_mut().zip(corners) {
            *slot = match self.remap.get(&global) {
                Some(&index) => index,
                None => {
                    let index = self.mesh.add_vertex(vertices[global as usize]);
                    self.remap.insert(global, index);
                    index
                }
            };
        }
        self.mesh.add_triangle(local[0], local[1], local[2]);
    }

    fn finish(&mut self) -> Option<TriangleMesh> {
        self.remap.clear();
        let mesh = std::mem::take(&mut self.mesh);
        (!mesh.is_empty()).then_some(mesh)
    }
}

/// Resolve a face corner token to a 0-based vertex index
fn resolve_index(token: &[u8], vertex_count: usize, line_no: usize) -> Result<u32> {
    let position = match memchr::memchr(b'/', token) {
        Some(slash) => &token[..slash],
        None => token,
    };
    let raw: i64 = lexical_core::parse(position)
        .map_err(|_| Error::obj(line_no, "invalid face index"))?;

    let index = match raw {
        0 => return Err(Error::obj(line_no, "face index 0 is not valid")),
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };

    if index < 0 || index as usize >= vertex_count {
        return Err(Error::obj(
            line_no,
            format!("face index {raw} out of range ({vertex_count} vertices)"),
        ));
    }

    Ok(index as u32)
}

#[inline]
fn parse_float(token: &[u8]) -> Option<f64> {
    match fast_float::parse_partial::<f64, _>(token) {
        Ok((value, consumed)) if consumed == token.len() => Some(value),
        _ => None,
    }
}

/// Next whitespace-separated token starting at `pos`
#[inline]
fn next_token<'a>(line: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    while *pos < line.len() && line[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if *pos >= line.len() || line[*pos] == b'#' {
        return None;
    }
    let start = *pos;
    while *pos < line.len() && !line[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    Some(&line[start..*pos])
}

#[inline]
fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}
