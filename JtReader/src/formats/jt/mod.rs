//! JT file decoding
//!
//! A load runs in three passes: the file header and TOC scan collect every
//! element into a flat object table, the assembler wires that table into a
//! [`SceneGraph`], and shape LODs are decoded on demand while the importer
//! walks the graph.

pub mod context;
pub mod cursor;
pub mod geometry;
pub mod guid;
pub mod header;
pub mod lsg;
pub mod scene;
pub mod toc;

pub use context::{LoadContext, LoadInformation, LoadProgress, ProgressCallback, Severity};
pub use cursor::{ByteCursor, Endian};
pub use guid::{ElementKind, Guid};
pub use header::{ElementHeader, FileHeader, JtVersion, SegmentHeader, SegmentType};
pub use lsg::{JtElement, MetaValue, PropertyMetaData, PropertyTable, ShapeKind};
pub use scene::{NodeId, SceneGraph, SceneNode};
pub use toc::{LodLocation, SegmentObject, TocEntry, TocReader, TocScan};
