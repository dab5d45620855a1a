//! Logical scene graph node elements

use crate::error::Result;
use crate::formats::jt::cursor::ByteCursor;

use super::{check_version, read_element_version};

pub type BoundingBox = [[f32; 3]; 2];

/// Fields shared by every LSG node
#[derive(Debug, Clone, PartialEq)]
pub struct BaseNodeData {
    pub object_id: i32,
    pub node_flags: u32,
    pub attribute_ids: Vec<i32>,
}

impl BaseNodeData {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let object_id = cursor.read_i32()?;
        read_element_version(cursor, version)?;
        let node_flags = cursor.read_u32()?;
        let attribute_ids = cursor.read_vec_i32()?;
        Ok(Self {
            object_id,
            node_flags,
            attribute_ids,
        })
    }
}

/// Base node data plus an ordered child list
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNodeData {
    pub base: BaseNodeData,
    pub child_ids: Vec<i32>,
}

impl GroupNodeData {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BaseNodeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let child_ids = cursor.read_vec_i32()?;
        Ok(Self { base, child_ids })
    }
}

/// Vertex, node and polygon count ranges of a partition or shape
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CountRanges {
    pub vertex: [i32; 2],
    pub node: [i32; 2],
    pub polygon: [i32; 2],
}

impl CountRanges {
    fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            vertex: cursor.read_range_i32()?,
            node: cursor.read_range_i32()?,
            polygon: cursor.read_range_i32()?,
        })
    }
}

/// Root of a document or a reference to another JT file
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionNode {
    pub group: GroupNodeData,
    pub partition_flags: i32,
    pub file_name: Option<String>,
    pub bounding_box: BoundingBox,
    pub area: f32,
    pub counts: CountRanges,
    pub untransformed_bounding_box: Option<BoundingBox>,
}

impl PartitionNode {
    const HAS_UNTRANSFORMED_BBOX: i32 = 0x1;

    /// Read a partition; `element_end` bounds the optional trailing box
    pub fn read(cursor: &mut ByteCursor, version: f64, element_end: usize) -> Result<Self> {
        let group = GroupNodeData::read(cursor, version)?;

        if version >= 10.0 {
            let local = i32::from(cursor.read_u8()?);
            check_version("Partition", local, 10)?;
        }

        let partition_flags = cursor.read_i32()?;
        let file_name = cursor.read_mb_string()?;
        let bounding_box = cursor.read_bbox_f32()?;
        let area = cursor.read_f32()?;
        let counts = CountRanges::read(cursor)?;

        let remaining = element_end.saturating_sub(cursor.position());
        let untransformed_bounding_box =
            if partition_flags & Self::HAS_UNTRANSFORMED_BBOX != 0 && remaining >= 24 {
                let bbox = cursor.read_bbox_f32()?;
                // Inverted boxes occur in the wild and are dropped
                let ordered = (0..3).all(|axis| bbox[1][axis] >= bbox[0][axis]);
                ordered.then_some(bbox)
            } else {
                None
            };

        Ok(Self {
            group,
            partition_flags,
            file_name,
            bounding_box,
            area,
            counts,
            untransformed_bounding_box,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaDataNode {
    pub group: GroupNodeData,
}

impl MetaDataNode {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let group = GroupNodeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        Ok(Self { group })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartNode {
    pub meta: MetaDataNode,
    pub reserved: i32,
}

impl PartNode {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let meta = MetaDataNode::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let reserved = cursor.read_i32()?;
        Ok(Self { meta, reserved })
    }
}

/// Reference to exactly one child node
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceNode {
    pub base: BaseNodeData,
    pub child_id: i32,
}

impl InstanceNode {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let base = BaseNodeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let child_id = cursor.read_i32()?;
        Ok(Self { base, child_id })
    }
}

/// Level-of-detail switch; children are ordered from the finest LOD
#[derive(Debug, Clone, PartialEq)]
pub struct RangeLodNode {
    pub group: GroupNodeData,
    pub range_limits: Vec<f32>,
    pub center: [f32; 3],
}

impl RangeLodNode {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let group = GroupNodeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let _reserved_vector = cursor.read_vec_f32()?;
        let _reserved = cursor.read_i32()?;
        read_element_version(cursor, version)?;
        let range_limits = cursor.read_vec_f32()?;
        let center = [cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?];
        Ok(Self {
            group,
            range_limits,
            center,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    TriStripSet,
    PolylineSet,
    PointSet,
}

impl ShapeKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ShapeKind::TriStripSet => "TriStripSetShape",
            ShapeKind::PolylineSet => "PolylineSetShape",
            ShapeKind::PointSet => "PointSetShape",
        }
    }
}

/// Leaf node whose geometry lives in a late-loaded shape LOD segment
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    pub kind: ShapeKind,
    pub base: BaseNodeData,
    pub untransformed_bounding_box: BoundingBox,
    pub area: f32,
    pub counts: CountRanges,
    pub size: i32,
    pub compression_level: f32,
    /// Polyline and point sets only
    pub area_factor: Option<f32>,
}

impl ShapeNode {
    pub fn read(cursor: &mut ByteCursor, version: f64, kind: ShapeKind) -> Result<Self> {
        let base = BaseNodeData::read(cursor, version)?;
        read_element_version(cursor, version)?;
        let _reserved_bbox = cursor.read_bbox_f32()?;
        let untransformed_bounding_box = cursor.read_bbox_f32()?;
        let area = cursor.read_f32()?;
        let counts = CountRanges::read(cursor)?;
        let size = cursor.read_i32()?;
        let compression_level = cursor.read_f32()?;
        let area_factor = match kind {
            ShapeKind::TriStripSet => None,
            ShapeKind::PolylineSet | ShapeKind::PointSet => Some(cursor.read_f32()?),
        };
        Ok(Self {
            kind,
            base,
            untransformed_bounding_box,
            area,
            counts,
            size,
            compression_level,
            area_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn push_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn push_f32(buf: &mut Vec<u8>, v: f32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn group_bytes(object_id: i32, children: &[i32]) -> Vec<u8> {
        let mut buf = Vec::new();
        push_i32(&mut buf, object_id);
        buf.extend_from_slice(&1i16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        push_i32(&mut buf, 0);
        buf.extend_from_slice(&1i16.to_be_bytes());
        push_i32(&mut buf, children.len() as i32);
        for &c in children {
            push_i32(&mut buf, c);
        }
        buf
    }

    #[test]
    fn test_group_node_v9() {
        let mut cursor = ByteCursor::new(group_bytes(3, &[4, 5]));
        let group = GroupNodeData::read(&mut cursor, 9.5).unwrap();
        assert_eq!(group.base.object_id, 3);
        assert_eq!(group.child_ids, vec![4, 5]);
        assert_eq!(cursor.remaining(), 0);
    }

    fn partition_bytes(flags: i32, trailing_box: Option<[f32; 6]>) -> Vec<u8> {
        let mut buf = group_bytes(1, &[]);
        push_i32(&mut buf, flags);
        push_i32(&mut buf, 0);
        for _ in 0..7 {
            push_f32(&mut buf, 0.0);
        }
        for _ in 0..6 {
            push_i32(&mut buf, 0);
        }
        if let Some(values) = trailing_box {
            for v in values {
                push_f32(&mut buf, v);
            }
        }
        buf
    }

    #[test]
    fn test_partition_untransformed_box() {
        let data = partition_bytes(1, Some([0.0, 0.0, 0.0, 1.0, 2.0, 3.0]));
        let end = data.len();
        let partition = PartitionNode::read(&mut ByteCursor::new(data), 9.5, end).unwrap();
        assert_eq!(
            partition.untransformed_bounding_box,
            Some([[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]])
        );
        assert_eq!(partition.file_name, None);
    }

    #[test]
    fn test_partition_inverted_box_dropped() {
        let data = partition_bytes(1, Some([1.0, 0.0, 0.0, 0.0, 2.0, 3.0]));
        let end = data.len();
        let partition = PartitionNode::read(&mut ByteCursor::new(data), 9.5, end).unwrap();
        assert_eq!(partition.untransformed_bounding_box, None);
    }

    #[test]
    fn test_partition_box_needs_room() {
        let data = partition_bytes(1, None);
        let end = data.len();
        let partition = PartitionNode::read(&mut ByteCursor::new(data), 9.5, end).unwrap();
        assert_eq!(partition.untransformed_bounding_box, None);
    }

    #[test]
    fn test_partition_version_gate_v10() {
        let mut data = Vec::new();
        push_i32(&mut data, 1);
        data.push(1); // base version
        data.extend_from_slice(&0u32.to_be_bytes());
        push_i32(&mut data, 0);
        data.push(1); // group version
        push_i32(&mut data, 0);
        data.push(11); // partition version
        let end = data.len();
        assert!(matches!(
            PartitionNode::read(&mut ByteCursor::new(data), 10.0, end),
            Err(Error::InvalidVersionNumber { version: 11, .. })
        ));
    }
}
