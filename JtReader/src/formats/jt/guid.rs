//! JT object type identifiers
//!
//! Every element is tagged with a 128-bit GUID. The canonical string form
//! used for reporting is lower-case hex without zero padding, e.g.
//! `10dd103e-2ac8-11d1-9b-6b-0-80-c7-bb-59-97`.

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::formats::jt::cursor::ByteCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

// Family prefixes shared by most LSG element ids
const fn lsg(data1: u32) -> Guid {
    Guid::new(data1, 0x2ac8, 0x11d1, [0x9b, 0x6b, 0x00, 0x80, 0xc7, 0xbb, 0x59, 0x97])
}

const fn prop(data1: u32) -> Guid {
    Guid::new(data1, 0x38fb, 0x11d1, [0xa5, 0x06, 0x00, 0x60, 0x97, 0xbd, 0xc6, 0xe1])
}

impl Guid {
    pub const END_OF_ELEMENTS: Guid = Guid::new(0xffff_ffff, 0xffff, 0xffff, [0xff; 8]);

    // Logical scene graph nodes
    pub const PARTITION_NODE: Guid = lsg(0x10dd103e);
    pub const GROUP_NODE: Guid = lsg(0x10dd101b);
    pub const INSTANCE_NODE: Guid = lsg(0x10dd102a);
    pub const RANGE_LOD_NODE: Guid = lsg(0x10dd104c);
    pub const PART_NODE: Guid = prop(0xce357244);
    pub const META_DATA_NODE: Guid = prop(0xce357245);
    pub const TRI_STRIP_SET_SHAPE_NODE: Guid = lsg(0x10dd1077);
    pub const POLYLINE_SET_SHAPE_NODE: Guid = lsg(0x10dd1046);
    pub const POINT_SET_SHAPE_NODE: Guid =
        Guid::new(0x98134716, 0x0010, 0x0818, [0x19, 0x98, 0x08, 0x00, 0x09, 0x83, 0x5d, 0x5a]);

    // Attributes
    pub const MATERIAL_ATTRIBUTE: Guid = lsg(0x10dd1030);
    pub const GEOMETRIC_TRANSFORM_ATTRIBUTE: Guid = lsg(0x10dd1083);
    pub const LINE_STYLE_ATTRIBUTE: Guid = lsg(0x10dd10c4);

    // Property atoms
    pub const STRING_PROPERTY_ATOM: Guid = lsg(0x10dd106e);
    pub const INTEGER_PROPERTY_ATOM: Guid = lsg(0x10dd10b8);
    pub const FLOAT_PROPERTY_ATOM: Guid = lsg(0x10dd1019);
    pub const DATE_PROPERTY_ATOM: Guid = prop(0xce357246);
    pub const LATE_LOADED_PROPERTY_ATOM: Guid =
        Guid::new(0xe0b05be5, 0xfbbd, 0x11d1, [0xa3, 0xa7, 0x00, 0xaa, 0x00, 0xd1, 0x09, 0x46]);

    // Shape LOD elements
    pub const TRI_STRIP_SET_SHAPE_LOD: Guid = lsg(0x10dd10ab);
    pub const POLYLINE_SET_SHAPE_LOD: Guid = lsg(0x10dd10a1);
    pub const POINT_SET_SHAPE_LOD: Guid =
        Guid::new(0x98134716, 0x0011, 0x0818, [0x19, 0x98, 0x08, 0x00, 0x09, 0x83, 0x5d, 0x5a]);

    // Segment root elements
    pub const PROPERTY_META_DATA: Guid = prop(0xce357247);
    pub const PMI_META_DATA: Guid = prop(0xce357249);

    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Read a GUID using the cursor's byte order
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let data1 = cursor.read_u32()?;
        let data2 = cursor.read_u16()?;
        let data3 = cursor.read_u16()?;
        let mut data4 = [0u8; 8];
        for byte in &mut data4 {
            *byte = cursor.read_u8()?;
        }
        Ok(Self::new(data1, data2, data3, data4))
    }

    pub fn is_end_of_elements(&self) -> bool {
        *self == Self::END_OF_ELEMENTS
    }

    /// Human-readable name of a known but unsupported element type
    pub fn label(&self) -> Option<&'static str> {
        UNSUPPORTED_LABELS.get(self).copied()
    }

    /// Canonical string, annotated with the known label when there is one
    pub fn describe(&self) -> String {
        match self.label() {
            Some(label) => format!("{self} ({label})"),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}-{:x}-{:x}", self.data1, self.data2, self.data3)?;
        for byte in self.data4 {
            write!(f, "-{byte:x}")?;
        }
        Ok(())
    }
}

lazy_static::lazy_static! {
    static ref UNSUPPORTED_LABELS: HashMap<Guid, &'static str> = {
        let mut m = HashMap::new();
        m.insert(Guid::new(0x873a70c0, 0x2ac8, 0x11d1, [0x9b, 0x6b, 0x00, 0x80, 0xc7, 0xbb, 0x59, 0x97]), "JT B-Rep Element");
        m.insert(Guid::new(0x873a70e0, 0x2ac9, 0x11d1, [0x9b, 0x6b, 0x00, 0x80, 0xc7, 0xbb, 0x59, 0x97]), "XT B-Rep Element");
        m.insert(Guid::new(0x873a70d0, 0x2ac8, 0x11d1, [0x9b, 0x6b, 0x00, 0x80, 0xc7, 0xbb, 0x59, 0x97]), "Wireframe Rep Element");
        m.insert(lsg(0x10dd1073), "Texture Image Attribute Element");
        m.insert(lsg(0x10dd1014), "Draw Style Attribute Element");
        m.insert(lsg(0x10dd1028), "Light Set Attribute Element");
        m.insert(lsg(0x10dd10e5), "Switch Node Element");
        m.insert(prop(0xce357248), "PMI Manager Meta Data (legacy)");
        m.insert(Guid::new(0x00000073, 0x7802, 0x0b01, [0x67, 0x60, 0x60, 0xc8, 0x13, 0xb8, 0x2b, 0x70]), "v9.5 extension");
        m
    };
}

/// Every element kind the reader dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    PartitionNode,
    GroupNode,
    InstanceNode,
    RangeLodNode,
    PartNode,
    MetaDataNode,
    TriStripSetShapeNode,
    PolylineSetShapeNode,
    PointSetShapeNode,
    MaterialAttribute,
    GeometricTransformAttribute,
    LineStyleAttribute,
    StringPropertyAtom,
    IntegerPropertyAtom,
    FloatPropertyAtom,
    DatePropertyAtom,
    LateLoadedPropertyAtom,
    TriStripSetShapeLod,
    PolylineSetShapeLod,
    PointSetShapeLod,
    PropertyMetaData,
    PmiMetaData,
    EndOfElements,
    Unsupported(Guid),
}

impl ElementKind {
    pub fn from_guid(guid: Guid) -> Self {
        match guid {
            Guid::PARTITION_NODE => Self::PartitionNode,
            Guid::GROUP_NODE => Self::GroupNode,
            Guid::INSTANCE_NODE => Self::InstanceNode,
            Guid::RANGE_LOD_NODE => Self::RangeLodNode,
            Guid::PART_NODE => Self::PartNode,
            Guid::META_DATA_NODE => Self::MetaDataNode,
            Guid::TRI_STRIP_SET_SHAPE_NODE => Self::TriStripSetShapeNode,
            Guid::POLYLINE_SET_SHAPE_NODE => Self::PolylineSetShapeNode,
            Guid::POINT_SET_SHAPE_NODE => Self::PointSetShapeNode,
            Guid::MATERIAL_ATTRIBUTE => Self::MaterialAttribute,
            Guid::GEOMETRIC_TRANSFORM_ATTRIBUTE => Self::GeometricTransformAttribute,
            Guid::LINE_STYLE_ATTRIBUTE => Self::LineStyleAttribute,
            Guid::STRING_PROPERTY_ATOM => Self::StringPropertyAtom,
            Guid::INTEGER_PROPERTY_ATOM => Self::IntegerPropertyAtom,
            Guid::FLOAT_PROPERTY_ATOM => Self::FloatPropertyAtom,
            Guid::DATE_PROPERTY_ATOM => Self::DatePropertyAtom,
            Guid::LATE_LOADED_PROPERTY_ATOM => Self::LateLoadedPropertyAtom,
            Guid::TRI_STRIP_SET_SHAPE_LOD => Self::TriStripSetShapeLod,
            Guid::POLYLINE_SET_SHAPE_LOD => Self::PolylineSetShapeLod,
            Guid::POINT_SET_SHAPE_LOD => Self::PointSetShapeLod,
            Guid::PROPERTY_META_DATA => Self::PropertyMetaData,
            Guid::PMI_META_DATA => Self::PmiMetaData,
            Guid::END_OF_ELEMENTS => Self::EndOfElements,
            other => Self::Unsupported(other),
        }
    }
}
