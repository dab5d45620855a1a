//! JT import: options, importer, resulting model and document
//!
//! # Example
//!
//! ```no_run
//! use jtreader::import::{ImportOptions, JtImporter};
//!
//! let importer = JtImporter::new(ImportOptions::new().with_skip_sub_partitions(true));
//! let document = importer.import_file("engine.jt")?;
//! for info in &document.load_information {
//!     println!("{info}");
//! }
//! print!("{}", document.describe_lsg());
//! # Ok::<(), jtreader::Error>(())
//! ```

mod document;
mod importer;
mod model;
mod options;
pub mod resolver;

pub use crate::formats::jt::context::{
    LoadContext, LoadInformation, LoadProgress, ProgressCallback, Severity,
};
pub use document::{DocumentSummary, JtDocument};
pub use importer::{DEFAULT_LAYER, JtImporter, layer_name};
pub use model::{ExternalReference, ExtremeValues, JtModel, ModelSummary};
pub use options::{DEFAULT_MAX_REFERENCE_DEPTH, ImportOptions};
pub use resolver::{FileSystemResolver, ReferenceResolver};
