//! Table of contents, segment dispatch and partition element streams

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::formats::jt::context::LoadContext;
use crate::formats::jt::cursor::ByteCursor;
use crate::formats::jt::guid::{ElementKind, Guid};
use crate::formats::jt::header::{ElementHeader, FileHeader, SegmentHeader};
use crate::formats::jt::lsg::{
    JtElement, PmiMetaData, PropertyMetaData, PropertyTable, ShapeKind,
};

/// One directory entry
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub segment_id: Guid,
    pub segment_offset: u64,
    pub segment_length: i32,
    pub segment_attributes: u32,
}

impl TocEntry {
    pub fn read(cursor: &mut ByteCursor, version: f64) -> Result<Self> {
        let segment_id = Guid::read(cursor)?;
        let segment_offset = if version >= 10.0 {
            cursor.read_u64()?
        } else {
            u64::from(cursor.read_i32()? as u32)
        };
        Ok(Self {
            segment_id,
            segment_offset,
            segment_length: cursor.read_i32()?,
            segment_attributes: cursor.read_u32()?,
        })
    }
}

/// Read the entry count and all entries at the cursor position
pub fn read_toc(cursor: &mut ByteCursor, version: f64) -> Result<Vec<TocEntry>> {
    let entry_size = if version >= 10.0 { 32 } else { 28 };
    let count = cursor.read_count(entry_size)?;
    (0..count).map(|_| TocEntry::read(cursor, version)).collect()
}

/// Body position of a shape LOD element, decoded on demand
#[derive(Debug, Clone)]
pub struct LodLocation {
    pub kind: ShapeKind,
    pub body: ByteCursor,
}

/// Root element of a meta data segment
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentObject {
    PropertyMetaData(PropertyMetaData),
    PmiMetaData(PmiMetaData),
}

/// Everything a TOC scan collects for the assembler
#[derive(Debug, Default)]
pub struct TocScan {
    pub elements: IndexMap<i32, JtElement>,
    pub root_id: Option<i32>,
    pub property_table: PropertyTable,
    pub segment_objects: IndexMap<Guid, SegmentObject>,
    pub lod_locations: HashMap<Guid, LodLocation>,
}

pub struct TocReader<'h> {
    header: &'h FileHeader,
    version: f64,
    scan: TocScan,
}

impl<'h> TocReader<'h> {
    pub fn new(header: &'h FileHeader) -> Self {
        Self {
            header,
            version: header.version.as_f64(),
            scan: TocScan::default(),
        }
    }

    /// Visit every TOC entry in order and dispatch its root element
    ///
    /// # Errors
    /// Fails on framing or decoding errors; unsupported segments are only
    /// recorded in the context.
    pub fn scan(mut self, file: &ByteCursor, ctx: &mut LoadContext<'_>) -> Result<TocScan> {
        let mut cursor = file.clone();
        cursor.set_position(self.header.toc_offset)?;
        let entries = read_toc(&mut cursor, self.version)?;
        tracing::debug!("{}: {} TOC entries", ctx.source(), entries.len());

        for entry in &entries {
            cursor.set_position(entry.segment_offset as usize)?;
            let segment = SegmentHeader::read(&mut cursor)?;
            let element = ElementHeader::read_root(&mut cursor, segment.segment_type, ctx)?;
            self.dispatch(&segment, element, ctx)?;
        }

        if self.scan.root_id.is_none() {
            return Err(Error::MissingRoot);
        }
        Ok(self.scan)
    }

    fn dispatch(
        &mut self,
        segment: &SegmentHeader,
        element: ElementHeader,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        let segment_id = segment.segment_id;
        let body_end = element.body_end();
        let mut body = element.body;

        match ElementKind::from_guid(element.object_type) {
            ElementKind::TriStripSetShapeLod => self.record_lod(segment_id, ShapeKind::TriStripSet, body),
            ElementKind::PolylineSetShapeLod => self.record_lod(segment_id, ShapeKind::PolylineSet, body),
            ElementKind::PointSetShapeLod => self.record_lod(segment_id, ShapeKind::PointSet, body),
            ElementKind::PartitionNode => {
                let is_root_segment = self.header.root_segment == Some(segment_id);
                if is_root_segment && self.scan.root_id.is_some() {
                    // Some writers list the LSG segment twice
                    tracing::debug!("Skipping duplicate root segment {}", segment_id);
                    return Ok(());
                }

                let partition = JtElement::read_graph_element(
                    ElementKind::PartitionNode,
                    &mut body,
                    self.version,
                    body_end,
                )?;
                if let Some(partition) = partition {
                    let object_id = partition.object_id();
                    self.scan.elements.insert(object_id, partition);
                    let becomes_root = is_root_segment
                        || (self.header.root_segment.is_none() && self.scan.root_id.is_none());
                    if becomes_root {
                        self.scan.root_id = Some(object_id);
                    }
                }
                self.read_partition_stream(&mut body, ctx)?;
            }
            ElementKind::PropertyMetaData => {
                let meta = PropertyMetaData::read(&mut body, self.version, ctx)?;
                self.scan
                    .segment_objects
                    .insert(segment_id, SegmentObject::PropertyMetaData(meta));
            }
            ElementKind::PmiMetaData => {
                let pmi = PmiMetaData::read(&mut body)?;
                self.scan
                    .segment_objects
                    .insert(segment_id, SegmentObject::PmiMetaData(pmi));
            }
            _ => ctx.add_unsupported(element.object_type),
        }
        Ok(())
    }

    fn record_lod(&mut self, segment_id: Guid, kind: ShapeKind, body: ByteCursor) {
        self.scan
            .lod_locations
            .insert(segment_id, LodLocation { kind, body });
    }

    fn register(&mut self, element: JtElement) -> Result<()> {
        let object_id = element.object_id();
        if object_id < 0 {
            return Ok(());
        }
        if self.scan.elements.contains_key(&object_id) {
            return Err(Error::DuplicateObjectId(object_id));
        }
        self.scan.elements.insert(object_id, element);
        Ok(())
    }

    /// Skip the length of the next element and peek its type; the cursor
    /// ends up behind the GUID when the run is over
    fn at_end_of_run(cursor: &mut ByteCursor, boundary: usize) -> Result<bool> {
        cursor.set_position(boundary)?;
        cursor.skip(4)?;
        if Guid::read(cursor)?.is_end_of_elements() {
            return Ok(true);
        }
        cursor.set_position(boundary)?;
        Ok(false)
    }

    /// Read the graph element run, the property atom run and the property table
    pub fn read_partition_stream(
        &mut self,
        cursor: &mut ByteCursor,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        // Graph elements
        loop {
            let before_header = cursor.position();
            let header = ElementHeader::read_lsg_element(cursor, ctx)?;
            let element_end = before_header + header.length as usize + 4;

            let kind = ElementKind::from_guid(header.object_type);
            match JtElement::read_graph_element(kind, cursor, self.version, element_end)? {
                Some(element) => self.register(element)?,
                None => ctx.add_unsupported(header.object_type),
            }

            if Self::at_end_of_run(cursor, element_end)? {
                break;
            }
        }

        // Property atoms
        loop {
            let before_header = cursor.position();
            let header = ElementHeader::read_lsg_element(cursor, ctx)?;
            let header_size = cursor.position() - before_header;
            let element_end = before_header + header.length as usize + 4;

            let kind = ElementKind::from_guid(header.object_type);
            match JtElement::read_property_atom(kind, cursor, self.version) {
                Ok(Some(element)) => self.register(element)?,
                Ok(None) => {
                    ctx.add_unsupported(header.object_type);
                    cursor.skip(header.length as usize + 4 - header_size)?;
                }
                Err(Error::MalformedDate { .. }) => {
                    ctx.warn(format!(
                        "At least 1 date property on file {} is invalid",
                        ctx.source()
                    ));
                }
                Err(err) => return Err(err),
            }

            let overrun = cursor.position() as i64 - element_end as i64;
            if overrun > 0 {
                return Err(Error::InvalidSegmentSize(-overrun));
            }
            if Self::at_end_of_run(cursor, element_end)? {
                break;
            }
        }

        let table = PropertyTable::read(cursor, self.version)?;
        self.scan.property_table.merge(table);
        Ok(())
    }
}
