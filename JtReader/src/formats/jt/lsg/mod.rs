//! Logical scene graph element readers
//!
//! Every element read from a partition's element stream becomes one
//! [`JtElement`], keyed by its object id in the load's flat object table.

mod attribute;
mod node;
mod property;

pub use attribute::{
    BaseAttributeData, GeometricTransformAttribute, LineStyleAttribute, MaterialAttribute, Rgba,
};
pub use node::{
    BaseNodeData, BoundingBox, CountRanges, GroupNodeData, InstanceNode, MetaDataNode, PartNode,
    PartitionNode, RangeLodNode, ShapeKind, ShapeNode,
};
pub use property::{
    BasePropertyAtomData, DatePropertyAtom, FloatPropertyAtom, IntegerPropertyAtom,
    LateLoadedPropertyAtom, MetaValue, PmiMetaData, PropertyMetaData, PropertyTable,
    StringPropertyAtom,
};

use crate::error::{Error, Result};
use crate::formats::jt::cursor::ByteCursor;
use crate::formats::jt::guid::ElementKind;

/// Read the element-local version number present from JT 9 on
pub(crate) fn read_element_version(cursor: &mut ByteCursor, version: f64) -> Result<Option<i32>> {
    if version >= 9.0 {
        cursor.read_local_version(version).map(Some)
    } else {
        Ok(None)
    }
}

pub(crate) fn check_version(element: &'static str, version: i32, max: i32) -> Result<i32> {
    if (0..=max).contains(&version) {
        Ok(version)
    } else {
        Err(Error::InvalidVersionNumber { element, version })
    }
}

/// A decoded LSG element
#[derive(Debug, Clone, PartialEq)]
pub enum JtElement {
    Partition(PartitionNode),
    Group(GroupNodeData),
    Part(PartNode),
    MetaData(MetaDataNode),
    Instance(InstanceNode),
    RangeLod(RangeLodNode),
    Shape(ShapeNode),
    Material(MaterialAttribute),
    GeometricTransform(GeometricTransformAttribute),
    LineStyle(LineStyleAttribute),
    StringProperty(StringPropertyAtom),
    IntegerProperty(IntegerPropertyAtom),
    FloatProperty(FloatPropertyAtom),
    DateProperty(DatePropertyAtom),
    LateLoadedProperty(LateLoadedPropertyAtom),
}

impl JtElement {
    /// Decode a graph element, or `None` when `kind` is not one
    pub fn read_graph_element(
        kind: ElementKind,
        cursor: &mut ByteCursor,
        version: f64,
        element_end: usize,
    ) -> Result<Option<Self>> {
        let element = match kind {
            ElementKind::PartitionNode => {
                Self::Partition(PartitionNode::read(cursor, version, element_end)?)
            }
            ElementKind::GroupNode => Self::Group(GroupNodeData::read(cursor, version)?),
            ElementKind::PartNode => Self::Part(PartNode::read(cursor, version)?),
            ElementKind::MetaDataNode => Self::MetaData(MetaDataNode::read(cursor, version)?),
            ElementKind::InstanceNode => Self::Instance(InstanceNode::read(cursor, version)?),
            ElementKind::RangeLodNode => Self::RangeLod(RangeLodNode::read(cursor, version)?),
            ElementKind::TriStripSetShapeNode => {
                Self::Shape(ShapeNode::read(cursor, version, ShapeKind::TriStripSet)?)
            }
            ElementKind::PolylineSetShapeNode => {
                Self::Shape(ShapeNode::read(cursor, version, ShapeKind::PolylineSet)?)
            }
            ElementKind::PointSetShapeNode => {
                Self::Shape(ShapeNode::read(cursor, version, ShapeKind::PointSet)?)
            }
            ElementKind::MaterialAttribute => {
                Self::Material(MaterialAttribute::read(cursor, version)?)
            }
            ElementKind::GeometricTransformAttribute => Self::GeometricTransform(
                GeometricTransformAttribute::read(cursor, version, element_end)?,
            ),
            ElementKind::LineStyleAttribute => {
                Self::LineStyle(LineStyleAttribute::read(cursor, version)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(element))
    }

    /// Decode a property atom, or `None` when `kind` is not one
    pub fn read_property_atom(
        kind: ElementKind,
        cursor: &mut ByteCursor,
        version: f64,
    ) -> Result<Option<Self>> {
        let element = match kind {
            ElementKind::StringPropertyAtom => {
                Self::StringProperty(StringPropertyAtom::read(cursor, version)?)
            }
            ElementKind::IntegerPropertyAtom => {
                Self::IntegerProperty(IntegerPropertyAtom::read(cursor, version)?)
            }
            ElementKind::FloatPropertyAtom => {
                Self::FloatProperty(FloatPropertyAtom::read(cursor, version)?)
            }
            ElementKind::DatePropertyAtom => {
                Self::DateProperty(DatePropertyAtom::read(cursor, version)?)
            }
            ElementKind::LateLoadedPropertyAtom => {
                Self::LateLoadedProperty(LateLoadedPropertyAtom::read(cursor, version)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(element))
    }

    pub fn object_id(&self) -> i32 {
        match self {
            Self::Partition(n) => n.group.base.object_id,
            Self::Group(n) => n.base.object_id,
            Self::Part(n) => n.meta.group.base.object_id,
            Self::MetaData(n) => n.group.base.object_id,
            Self::Instance(n) => n.base.object_id,
            Self::RangeLod(n) => n.group.base.object_id,
            Self::Shape(n) => n.base.object_id,
            Self::Material(a) => a.base.object_id,
            Self::GeometricTransform(a) => a.base.object_id,
            Self::LineStyle(a) => a.base.object_id,
            Self::StringProperty(p) => p.base.object_id,
            Self::IntegerProperty(p) => p.base.object_id,
            Self::FloatProperty(p) => p.base.object_id,
            Self::DateProperty(p) => p.base.object_id,
            Self::LateLoadedProperty(p) => p.base.object_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Partition(_) => "Partition",
            Self::Group(_) => "Group",
            Self::Part(_) => "Part",
            Self::MetaData(_) => "MetaData",
            Self::Instance(_) => "Instance",
            Self::RangeLod(_) => "RangeLOD",
            Self::Shape(s) => s.kind.type_name(),
            Self::Material(_) => "Material",
            Self::GeometricTransform(_) => "GeometricTransform",
            Self::LineStyle(_) => "LineStyle",
            Self::StringProperty(_) => "StringProperty",
            Self::IntegerProperty(_) => "IntegerProperty",
            Self::FloatProperty(_) => "FloatProperty",
            Self::DateProperty(_) => "DateProperty",
            Self::LateLoadedProperty(_) => "LateLoadedProperty",
        }
    }

    fn base_node(&self) -> Option<&BaseNodeData> {
        match self {
            Self::Partition(n) => Some(&n.group.base),
            Self::Group(n) => Some(&n.base),
            Self::Part(n) => Some(&n.meta.group.base),
            Self::MetaData(n) => Some(&n.group.base),
            Self::Instance(n) => Some(&n.base),
            Self::RangeLod(n) => Some(&n.group.base),
            Self::Shape(n) => Some(&n.base),
            _ => None,
        }
    }

    /// Whether this element can take part in the tree
    pub fn is_lsg_node(&self) -> bool {
        self.base_node().is_some()
    }

    pub fn is_attribute(&self) -> bool {
        matches!(
            self,
            Self::Material(_) | Self::GeometricTransform(_) | Self::LineStyle(_)
        )
    }

    pub fn attribute_ids(&self) -> &[i32] {
        self.base_node().map_or(&[], |base| base.attribute_ids.as_slice())
    }

    pub fn child_ids(&self) -> &[i32] {
        match self {
            Self::Partition(n) => &n.group.child_ids,
            Self::Group(n) => &n.child_ids,
            Self::Part(n) => &n.meta.group.child_ids,
            Self::MetaData(n) => &n.group.child_ids,
            Self::RangeLod(n) => &n.group.child_ids,
            Self::Instance(n) => std::slice::from_ref(&n.child_id),
            _ => &[],
        }
    }

    /// Nodes whose names make up a layer name
    pub fn contributes_to_layer(&self) -> bool {
        matches!(
            self,
            Self::MetaData(_) | Self::Instance(_) | Self::Part(_) | Self::Partition(_)
        )
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::StringProperty(p) => Some(&p.value),
            _ => None,
        }
    }

    pub fn as_late_loaded(&self) -> Option<&LateLoadedPropertyAtom> {
        match self {
            Self::LateLoadedProperty(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeNode> {
        match self {
            Self::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_partition(&self) -> Option<&PartitionNode> {
        match self {
            Self::Partition(p) => Some(p),
            _ => None,
        }
    }

    /// Display form of a property value atom
    pub fn property_display(&self) -> Option<String> {
        match self {
            Self::StringProperty(p) => Some(p.value.clone()),
            Self::IntegerProperty(p) => Some(p.value.to_string()),
            Self::FloatProperty(p) => Some(p.value.to_string()),
            Self::DateProperty(p) => Some(p.value.to_rfc3339()),
            Self::LateLoadedProperty(p) => Some(format!("<segment {}>", p.segment_id)),
            _ => None,
        }
    }
}
