//! Flat triangle, polyline and point buffers
//!
//! Positions go through the full accumulated transform, normals only
//! through its linear part (`DMat4::transform_vector3` ignores translation).

use glam::{DMat4, DVec3};
use serde::Serialize;

use crate::error::{Error, Result};

use super::lod::{PointSetLod, PolylineLod, TriStripLod, VertexBasedRep};

pub type Color = [f32; 3];

/// One triangulated shape: xyz triplets, triangle indices into `vertices`,
/// rgb triplets (per face when synthesized) and per-vertex normals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriangleBatch {
    pub vertices: Vec<f64>,
    pub indices: Vec<u32>,
    pub colors: Vec<f64>,
    pub normals: Vec<f64>,
}

impl TriangleBatch {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Apply a transform to an already emitted batch
    pub fn transform(&mut self, matrix: &DMat4) {
        transform_in_place(&mut self.vertices, |v| matrix.transform_point3(v));
        transform_in_place(&mut self.normals, |n| matrix.transform_vector3(n));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Polyline {
    pub vertices: Vec<[f64; 3]>,
    pub colors: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointBatch {
    pub vertices: Vec<f64>,
    pub colors: Vec<f64>,
}

fn transform_in_place(values: &mut [f64], f: impl Fn(DVec3) -> DVec3) {
    for chunk in values.chunks_exact_mut(3) {
        let out = f(DVec3::new(chunk[0], chunk[1], chunk[2]));
        chunk.copy_from_slice(&out.to_array());
    }
}

fn vec3_at(values: &[f32], index: usize, what: &str) -> Result<DVec3> {
    let start = index * 3;
    values
        .get(start..start + 3)
        .map(|v| DVec3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2])))
        .ok_or_else(|| {
            Error::InvalidGeometry(format!(
                "{what} index {index} out of range ({} available)",
                values.len() / 3
            ))
        })
}

fn index_at(indices: &[i32], i: usize) -> Result<usize> {
    match indices.get(i) {
        Some(&v) if v >= 0 => Ok(v as usize),
        Some(&v) => Err(Error::InvalidGeometry(format!("negative index {v}"))),
        None => Err(Error::InvalidGeometry(format!("index list too short for {i}"))),
    }
}

fn repeat_color(color: Color, count: usize) -> Vec<f64> {
    let rgb = color.map(f64::from);
    std::iter::repeat_n(rgb, count).flatten().collect()
}

fn widen(values: &[f32]) -> Vec<f64> {
    values.iter().copied().map(f64::from).collect()
}

/// Pre-v9 triangles: every primitive range `[start, end)` becomes the
/// triangles `(j, j+1, j+2)`, numbered by output vertex
///
/// Returns `None` for a shape without vertices.
pub fn triangles_v8(
    rep: &VertexBasedRep,
    transform: &DMat4,
    fallback: Color,
) -> Result<Option<TriangleBatch>> {
    if rep.positions.is_empty() {
        return Ok(None);
    }
    let has_normals = !rep.normals.is_empty();
    let mut batch = TriangleBatch::default();
    let mut face_count = 0;

    for range in rep.primitive_indices.windows(2) {
        let (start, end) = (range[0], range[1]);
        if start < 0 || end < start {
            return Err(Error::InvalidGeometry(format!("bad primitive range {start}..{end}")));
        }
        let base = batch.vertex_count() as u32;
        for j in start as usize..end as usize {
            let p = transform.transform_point3(vec3_at(&rep.positions, j, "vertex")?);
            batch.vertices.extend_from_slice(&p.to_array());
            if has_normals {
                let n = transform.transform_vector3(vec3_at(&rep.normals, j, "normal")?);
                batch.normals.extend_from_slice(&n.to_array());
            }
        }
        let length = (end - start) as u32;
        for k in 0..length.saturating_sub(2) {
            batch
                .indices
                .extend_from_slice(&[base + k, base + k + 1, base + k + 2]);
            face_count += 1;
        }
    }

    batch.colors = if rep.colors.is_empty() {
        repeat_color(fallback, face_count)
    } else {
        widen(&rep.colors)
    };
    Ok(Some(batch))
}

/// v9+ triangles: one output vertex per referenced corner
///
/// A normal index of −1 reuses the previously resolved normal index; the
/// carry runs across triangles. Returns `None` when there is nothing to
/// emit.
pub fn triangles_v9(lod: &TriStripLod, transform: &DMat4, fallback: Color) -> Result<Option<TriangleBatch>> {
    let Some(vertex_indices) = lod.index_lists.first() else {
        return Ok(None);
    };
    if lod.positions.is_empty() || vertex_indices.is_empty() {
        return Ok(None);
    }
    let normal_indices = lod
        .index_lists
        .get(1)
        .filter(|list| !list.is_empty() && !lod.normals.is_empty());

    let corner_count = vertex_indices.len() / 3 * 3;
    let mut batch = TriangleBatch {
        vertices: Vec::with_capacity(corner_count * 3),
        indices: (0..corner_count as u32).collect(),
        colors: Vec::new(),
        normals: Vec::with_capacity(if normal_indices.is_some() { corner_count * 3 } else { 0 }),
    };

    let mut last_normal: i32 = -1;
    for corner in 0..corner_count {
        let vertex = index_at(vertex_indices, corner)?;
        let p = transform.transform_point3(vec3_at(&lod.positions, vertex, "vertex")?);
        batch.vertices.extend_from_slice(&p.to_array());

        if let Some(normal_indices) = normal_indices {
            let mut normal = *normal_indices.get(corner).ok_or_else(|| {
                Error::InvalidGeometry(format!("normal index list too short for {corner}"))
            })?;
            if normal == -1 {
                normal = last_normal;
            }
            last_normal = normal;
            if normal < 0 {
                return Err(Error::InvalidGeometry(format!("unresolved normal index {normal}")));
            }
            let n = transform.transform_vector3(vec3_at(&lod.normals, normal as usize, "normal")?);
            batch.normals.extend_from_slice(&n.to_array());
        }
    }

    batch.colors = if lod.colors.is_empty() {
        repeat_color(fallback, corner_count / 3)
    } else {
        widen(&lod.colors)
    };
    Ok(Some(batch))
}

/// Transformed positions with stored or per-vertex fallback colors
pub fn points(positions: &[f32], colors: &[f32], transform: &DMat4, fallback: Color) -> PointBatch {
    let mut vertices = widen(positions);
    transform_in_place(&mut vertices, |v| transform.transform_point3(v));
    let colors = if colors.is_empty() {
        repeat_color(fallback, positions.len() / 3)
    } else {
        widen(colors)
    };
    PointBatch { vertices, colors }
}

pub fn points_v9(lod: &PointSetLod, transform: &DMat4, fallback: Color) -> PointBatch {
    points(&lod.positions, &lod.colors, transform, fallback)
}

fn split_polylines(
    primitive_indices: &[i32],
    vertex_index: impl Fn(usize) -> Result<usize>,
    positions: &[f32],
    colors: &[f32],
    transform: &DMat4,
    fallback: Color,
) -> Result<Vec<Polyline>> {
    let fallback = fallback.map(f64::from);
    let mut polylines = Vec::new();
    for range in primitive_indices.windows(2) {
        let (start, end) = (range[0], range[1]);
        if start < 0 || end < start {
            return Err(Error::InvalidGeometry(format!("bad primitive range {start}..{end}")));
        }
        let mut polyline = Polyline::default();
        for j in start as usize..end as usize {
            let vertex = vertex_index(j)?;
            let p = transform.transform_point3(vec3_at(positions, vertex, "vertex")?);
            polyline.vertices.push(p.to_array());
            let color = if colors.is_empty() {
                fallback
            } else {
                vec3_at(colors, vertex, "color")?.to_array()
            };
            polyline.colors.push(color);
        }
        polylines.push(polyline);
    }
    Ok(polylines)
}

/// v9+ polylines, split at primitive boundaries
pub fn polylines_v9(lod: &PolylineLod, transform: &DMat4, fallback: Color) -> Result<Vec<Polyline>> {
    split_polylines(
        &lod.primitive_indices,
        |j| index_at(&lod.vertex_indices, j),
        &lod.positions,
        &lod.colors,
        transform,
        fallback,
    )
}

/// Pre-v9 polylines: primitive ranges address the vertex list directly
pub fn polylines_v8(rep: &VertexBasedRep, transform: &DMat4, fallback: Color) -> Result<Vec<Polyline>> {
    split_polylines(
        &rep.primitive_indices,
        Ok,
        &rep.positions,
        &rep.colors,
        transform,
        fallback,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = [1.0, 1.0, 1.0];

    fn fan_rep(vertex_count: usize) -> VertexBasedRep {
        VertexBasedRep {
            primitive_indices: vec![0, vertex_count as i32],
            positions: (0..vertex_count * 3).map(|v| v as f32).collect(),
            normals: std::iter::repeat_n([0.0, 0.0, 1.0], vertex_count).flatten().collect(),
            ..VertexBasedRep::default()
        }
    }

    #[test]
    fn test_strip_triangulation() {
        let batch = triangles_v8(&fan_rep(5), &DMat4::IDENTITY, WHITE).unwrap().unwrap();
        assert_eq!(batch.indices, vec![0, 1, 2, 1, 2, 3, 2, 3, 4]);
        assert_eq!(batch.vertex_count(), 5);
        assert_eq!(batch.colors, vec![1.0; 9]);
    }

    #[test]
    fn test_v8_ranges_renumbered_per_output() {
        let mut rep = fan_rep(7);
        rep.primitive_indices = vec![0, 3, 7];
        let batch = triangles_v8(&rep, &DMat4::IDENTITY, WHITE).unwrap().unwrap();
        assert_eq!(batch.indices, vec![0, 1, 2, 3, 4, 5, 4, 5, 6]);
        assert!(batch.indices.iter().all(|&i| (i as usize) < batch.vertex_count()));
    }

    #[test]
    fn test_normal_carry_forward() {
        let lod = TriStripLod {
            positions: vec![0.0; 9],
            normals: vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
            colors: Vec::new(),
            index_lists: vec![vec![0, 1, 2], vec![2, -1, -1]],
        };
        let batch = triangles_v9(&lod, &DMat4::IDENTITY, WHITE).unwrap().unwrap();
        assert_eq!(batch.normals, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(batch.indices, vec![0, 1, 2]);
        // One synthesized color per face
        assert_eq!(batch.colors, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_transform_separation() {
        let lod = TriStripLod {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            colors: Vec::new(),
            index_lists: vec![vec![0, 1, 2], vec![0, 1, 1]],
        };
        let rotation = DMat4::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let transform = DMat4::from_translation(DVec3::new(5.0, -3.0, 2.0)) * rotation;
        let batch = triangles_v9(&lod, &transform, WHITE).unwrap().unwrap();

        assert!((batch.vertices[0] - 5.0).abs() < 1e-12);
        assert!((batch.vertices[2] - 2.0).abs() < 1e-12);

        let normals: Vec<DVec3> = batch
            .normals
            .chunks_exact(3)
            .map(|n| DVec3::new(n[0], n[1], n[2]))
            .collect();
        for n in &normals {
            assert!((n.length() - 1.0).abs() < 1e-12);
        }
        assert!(normals[0].dot(normals[1]).abs() < 1e-12);
    }

    #[test]
    fn test_empty_tri_strip() {
        let lod = TriStripLod {
            index_lists: vec![Vec::new()],
            ..TriStripLod::default()
        };
        assert_eq!(triangles_v9(&lod, &DMat4::IDENTITY, WHITE).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_vertex() {
        let lod = TriStripLod {
            positions: vec![0.0; 3],
            normals: Vec::new(),
            colors: Vec::new(),
            index_lists: vec![vec![0, 0, 4]],
        };
        assert!(matches!(
            triangles_v9(&lod, &DMat4::IDENTITY, WHITE),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_polyline_split() {
        let lod = PolylineLod {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
            colors: Vec::new(),
            primitive_indices: vec![0, 2, 4],
            vertex_indices: vec![0, 1, 1, 2],
        };
        let polylines = polylines_v9(&lod, &DMat4::IDENTITY, [0.5, 0.5, 0.5]).unwrap();
        assert_eq!(polylines.len(), 2);
        assert_eq!(polylines[1].vertices, vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        assert_eq!(polylines[0].colors, vec![[0.5, 0.5, 0.5]; 2]);
    }

    #[test]
    fn test_points_fallback_color_per_vertex() {
        let batch = points(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[], &DMat4::IDENTITY, WHITE);
        assert_eq!(batch.colors.len(), 6);
    }
}
