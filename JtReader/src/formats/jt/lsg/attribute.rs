//! Attribute elements attached to LSG nodes

use glam::DMat4;

use crate::error::Result;
use crate::formats::jt::cursor::ByteCursor;

use super::read_element_version;

#[derive(Debug, Clone, PartialEq)]
pub struct BaseAttributeData {
    pub object_id: i32,
    pub state_flags: u8,
    pub field_inhibit_flags: u32,
}

impl BaseAttributeData {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let object_id = cursor.read_i32()?;
        read_element_version(cursor, version)?;
        Ok(Self {
            object_id,
            state_flags: cursor.read_u8()?,
            field_inhibit_flags: cursor.read_u32()?,
        })
    }
}

pub type Rgba = [f32; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialAttribute {
    pub base: BaseAttributeData,
    pub data_flags: u16,
    pub ambient: Rgba,
    pub diffuse: Rgba,
    pub specular: Rgba,
    pub emission: Rgba,
    pub shininess: f32,
    pub reflectivity: Option<f32>,
}

fn read_rgba(cursor: &mut ByteCursor) -> Result<Rgba> {
    Ok([
        cursor.read_f32()?,
        cursor.read_f32()?,
        cursor.read_f32()?,
        cursor.read_f32()?,
    ])
}

impl MaterialAttribute {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BaseAttributeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let data_flags = cursor.read_u16()?;
        let ambient = read_rgba(cursor)?;
        let diffuse = read_rgba(cursor)?;
        let specular = read_rgba(cursor)?;
        let emission = read_rgba(cursor)?;
        let shininess = cursor.read_f32()?;
        let reflectivity = if version >= 9.0 {
            Some(cursor.read_f32()?)
        } else {
            None
        };
        Ok(Self {
            base,
            data_flags,
            ambient,
            diffuse,
            specular,
            emission,
            shininess,
            reflectivity,
        })
    }

    /// Diffuse RGB, the color geometry below this material is drawn with
    pub fn color(&self) -> [f32; 3] {
        [self.diffuse[0], self.diffuse[1], self.diffuse[2]]
    }
}

/// 4x4 transform applied to the node and everything below it
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricTransformAttribute {
    pub base: BaseAttributeData,
    pub stored_values_mask: u16,
    pub matrix: DMat4,
}

impl GeometricTransformAttribute {
    /// Read the sparse matrix
    ///
    /// Bit 15 of the mask stands for the first element in row-major file
    /// order; only elements with their bit set are stored. Values are f64
    /// when the rest of the element has room for them, f32 otherwise.
    pub fn read(cursor: &mut ByteCursor, version: f64, element_end: usize) -> Result<Self> {
        let base = BaseAttributeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let stored_values_mask = cursor.read_u16()?;

        let stored = stored_values_mask.count_ones() as usize;
        let remaining = element_end.saturating_sub(cursor.position());
        let wide = remaining >= stored * 8;

        let mut values = DMat4::IDENTITY.to_cols_array();
        for (i, value) in values.iter_mut().enumerate() {
            if stored_values_mask & (0x8000 >> i) != 0 {
                *value = if wide {
                    cursor.read_f64()?
                } else {
                    f64::from(cursor.read_f32()?)
                };
            }
        }

        // Row-vector convention on disk: elements 12..15 hold the translation,
        // which is exactly glam's w axis when read as columns
        Ok(Self {
            base,
            stored_values_mask,
            matrix: DMat4::from_cols_array(&values),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyleAttribute {
    pub base: BaseAttributeData,
    pub line_type: i32,
    pub line_width: f32,
}

impl LineStyleAttribute {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BaseAttributeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        Ok(Self {
            base,
            line_type: cursor.read_i32()?,
            line_width: cursor.read_f32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn attribute_prefix(object_id: i32) -> Vec<u8> {
        let mut buf = object_id.to_be_bytes().to_vec();
        buf.extend_from_slice(&1i16.to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&1i16.to_be_bytes());
        buf
    }

    #[test]
    fn test_translation_only_transform() {
        let mut data = attribute_prefix(9);
        // m30, m31, m32 are bits 3, 2, 1
        data.extend_from_slice(&0b0000_0000_0000_1110u16.to_be_bytes());
        for v in [10.0f64, 20.0, 30.0] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let end = data.len();
        let attr = GeometricTransformAttribute::read(&mut ByteCursor::new(data), 9.5, end).unwrap();
        let p = attr.matrix.transform_point3(DVec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, DVec3::new(11.0, 21.0, 31.0));
        let n = attr.matrix.transform_vector3(DVec3::Z);
        assert_eq!(n, DVec3::Z);
    }

    #[test]
    fn test_narrow_transform_values() {
        let mut data = attribute_prefix(9);
        data.extend_from_slice(&0x8000u16.to_be_bytes());
        data.extend_from_slice(&2.0f32.to_be_bytes());
        let end = data.len();
        let attr = GeometricTransformAttribute::read(&mut ByteCursor::new(data), 9.5, end).unwrap();
        assert_eq!(attr.matrix.x_axis.x, 2.0);
        assert_eq!(attr.matrix.y_axis.y, 1.0);
    }

    #[test]
    fn test_material_diffuse_color() {
        let mut data = attribute_prefix(2);
        data.extend_from_slice(&0u16.to_be_bytes());
        for rgba in [[0.1f32; 4], [0.5, 0.25, 1.0, 1.0], [0.0; 4], [0.0; 4]] {
            for v in rgba {
                data.extend_from_slice(&v.to_be_bytes());
            }
        }
        data.extend_from_slice(&8.0f32.to_be_bytes());
        data.extend_from_slice(&0.0f32.to_be_bytes());
        let material = MaterialAttribute::read(&mut ByteCursor::new(data), 9.5).unwrap();
        assert_eq!(material.color(), [0.5, 0.25, 1.0]);
        assert_eq!(material.reflectivity, Some(0.0));
    }
}
