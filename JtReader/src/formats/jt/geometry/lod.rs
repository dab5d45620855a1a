//! Shape LOD element decoding
//!
//! Before JT 9 all three shape kinds share the vertex-based compressed rep
//! data. From JT 9 on, each kind has its own layout built from lossless
//! float blocks and Int32 compressed data packets.

use crate::error::{Error, Result};
use crate::formats::jt::cursor::ByteCursor;
use crate::formats::jt::lsg::ShapeKind;
use crate::formats::jt::toc::LodLocation;

use super::codec::{PacketFormat, Predictor, read_int32_cdp, read_lossless_floats};

/// Pre-v9 vertex-based rep data with de-interleaved attribute arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBasedRep {
    pub normal_binding: u8,
    pub texture_binding: u8,
    pub color_binding: u8,
    pub quantization: [u8; 4],
    /// Offsets into the vertex list where each primitive starts, plus the end
    pub primitive_indices: Vec<i32>,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub texture_coordinates: Vec<f32>,
}

impl VertexBasedRep {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let _version = cursor.read_i16()?;
        let normal_binding = cursor.read_u8()?;
        let texture_binding = cursor.read_u8()?;
        let color_binding = cursor.read_u8()?;
        let mut quantization = [0u8; 4];
        for q in &mut quantization {
            *q = cursor.read_u8()?;
        }
        let primitive_indices = read_int32_cdp(cursor, PacketFormat::V1, Predictor::Stride1)?;

        let mut rep = Self {
            normal_binding,
            texture_binding,
            color_binding,
            quantization,
            primitive_indices,
            ..Self::default()
        };

        if quantization[0] != 0 {
            return Err(Error::UnsupportedCodec(format!(
                "quantized vertex data ({} bits)",
                quantization[0]
            )));
        }

        let interleaved = read_lossless_floats(cursor)?;
        rep.deinterleave(&interleaved)?;
        Ok(rep)
    }

    fn deinterleave(&mut self, interleaved: &[f32]) -> Result<()> {
        let texture = if self.texture_binding != 0 { 2 } else { 0 };
        let color = if self.color_binding != 0 { 3 } else { 0 };
        let normal = if self.normal_binding != 0 { 3 } else { 0 };
        let stride = texture + color + normal + 3;

        if interleaved.len() % stride != 0 {
            return Err(Error::InvalidGeometry(format!(
                "{} interleaved values do not split into records of {stride}",
                interleaved.len()
            )));
        }

        for record in interleaved.chunks_exact(stride) {
            let (tex, rest) = record.split_at(texture);
            let (col, rest) = rest.split_at(color);
            let (nor, pos) = rest.split_at(normal);
            self.texture_coordinates.extend_from_slice(tex);
            self.colors.extend_from_slice(col);
            self.normals.extend_from_slice(nor);
            self.positions.extend_from_slice(pos);
        }
        Ok(())
    }
}

/// v9+ triangle strip set LOD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriStripLod {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    /// Position indices, then normal indices (−1 repeats the previous one)
    pub index_lists: Vec<Vec<i32>>,
}

impl TriStripLod {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let positions = read_lossless_floats(cursor)?;
        let normals = read_lossless_floats(cursor)?;
        let colors = read_lossless_floats(cursor)?;
        let list_count = cursor.read_count(4)?;
        let mut index_lists = Vec::with_capacity(list_count);
        for _ in 0..list_count {
            index_lists.push(read_int32_cdp(cursor, PacketFormat::V2, Predictor::Lag1)?);
        }
        Ok(Self {
            positions,
            normals,
            colors,
            index_lists,
        })
    }
}

/// v9+ polyline set LOD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolylineLod {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub primitive_indices: Vec<i32>,
    pub vertex_indices: Vec<i32>,
}

impl PolylineLod {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            positions: read_lossless_floats(cursor)?,
            colors: read_lossless_floats(cursor)?,
            primitive_indices: read_int32_cdp(cursor, PacketFormat::V2, Predictor::Stride1)?,
            vertex_indices: read_int32_cdp(cursor, PacketFormat::V2, Predictor::Lag1)?,
        })
    }
}

/// v9+ point set LOD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSetLod {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl PointSetLod {
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            positions: read_lossless_floats(cursor)?,
            colors: read_lossless_floats(cursor)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LodData {
    VertexBased(ShapeKind, VertexBasedRep),
    TriStrip(TriStripLod),
    Polyline(PolylineLod),
    PointSet(PointSetLod),
}

/// Decode the LOD element recorded during the TOC scan
///
/// Works on a clone of the recorded cursor, so the same LOD can be decoded
/// again for another instance of its shape.
pub fn read_lod(location: &LodLocation, version: f64) -> Result<LodData> {
    let mut cursor = location.body.clone();

    if version >= 9.0 {
        let _version = cursor.read_local_version(version)?;
        let _vertex_binding = cursor.read_u64()?;
        Ok(match location.kind {
            ShapeKind::TriStripSet => LodData::TriStrip(TriStripLod::read(&mut cursor)?),
            ShapeKind::PolylineSet => LodData::Polyline(PolylineLod::read(&mut cursor)?),
            ShapeKind::PointSet => LodData::PointSet(PointSetLod::read(&mut cursor)?),
        })
    } else {
        let _vertex_binding = cursor.read_u32()?;
        Ok(LodData::VertexBased(
            location.kind,
            VertexBasedRep::read(&mut cursor)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_block(values: &[f32]) -> Vec<u8> {
        let mut buf = ((values.len() * 4) as i32).to_be_bytes().to_vec();
        buf.extend_from_slice(&0i32.to_be_bytes());
        for v in values {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_vertex_based_rep_deinterleave() {
        let mut data = 1i16.to_be_bytes().to_vec();
        data.extend_from_slice(&[1, 0, 1]); // normal, texture, color bindings
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.push(0); // null codec
        data.extend_from_slice(&2i32.to_be_bytes());
        data.extend_from_slice(&0i32.to_be_bytes());
        data.extend_from_slice(&1i32.to_be_bytes());
        // color, normal, position
        data.extend(float_block(&[0.5, 0.5, 0.5, 0.0, 0.0, 1.0, 7.0, 8.0, 9.0]));

        let rep = VertexBasedRep::read(&mut ByteCursor::new(data)).unwrap();
        assert_eq!(rep.primitive_indices, vec![0, 1]);
        assert_eq!(rep.colors, vec![0.5, 0.5, 0.5]);
        assert_eq!(rep.normals, vec![0.0, 0.0, 1.0]);
        assert_eq!(rep.positions, vec![7.0, 8.0, 9.0]);
        assert!(rep.texture_coordinates.is_empty());
    }

    #[test]
    fn test_quantized_rep_is_unsupported() {
        let mut data = 1i16.to_be_bytes().to_vec();
        data.extend_from_slice(&[0, 0, 0]);
        data.extend_from_slice(&[12, 0, 0, 0]);
        data.push(0);
        data.extend_from_slice(&0i32.to_be_bytes());
        assert!(matches!(
            VertexBasedRep::read(&mut ByteCursor::new(data)),
            Err(Error::UnsupportedCodec(_))
        ));
    }
}
