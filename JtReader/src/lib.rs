//! # JtReader
//!
//! A pure-Rust reader for JT (Jupiter Tessellation) CAD interchange files.
//!
//! ## Supported Content
//!
//! - **Versions 8.x - 10.x** - big and little endian, ZLIB and LZMA compressed segments
//! - **Logical scene graph** - partitions, groups, instances, parts, range LODs and shapes
//! - **Properties** - string, integer, float, date and late-loaded atoms, meta data segments
//! - **Tessellated geometry** - triangle strips, polylines and point sets
//! - **External references** - partitions pointing at other JT files
//!
//! ## Limitations
//!
//! Int32 packets packed with the Huffman or arithmetic codec and quantized
//! pre-v9 vertex data are not decoded. A shape LOD using either is skipped
//! and reported as an `UnsupportedCodec` warning on the document; the rest
//! of the file still loads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use jtreader::import::{ImportOptions, JtImporter};
//!
//! let document = JtImporter::new(ImportOptions::default()).import_file("assembly.jt")?;
//! println!("JT {} with {} triangles", document.version, document.model.triangle_count());
//! for (layer, batches) in document.model.triangles() {
//!     println!("{layer}: {} batches", batches.len());
//! }
//! # Ok::<(), jtreader::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use jtreader::prelude::*;
//!
//! let options = ImportOptions::structure_only();
//! let importer = JtImporter::new(options);
//! # let _ = importer;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `jtreader` command-line binary

pub mod compression;
pub mod error;
pub mod formats;
pub mod import;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::jt::geometry::{PointBatch, Polyline, TriangleBatch};
    pub use crate::formats::jt::{JtElement, JtVersion, NodeId, SceneGraph, SceneNode};
    pub use crate::import::{
        ImportOptions, JtDocument, JtImporter, JtModel, LoadInformation, LoadProgress,
        ReferenceResolver, Severity,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
