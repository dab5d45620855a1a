//! Error types for `JtReader`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `JtReader` operations.
///
/// Variants in the first groups are fatal and abort a load. The
/// "recoverable" group is produced for a single unit (one shape, one date
/// property, one external reference) and is downgraded to a warning by the
/// importer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input file does not exist or is empty.
    #[error("file '{path}' doesn't exist or is empty")]
    EmptyInput {
        /// The path that was requested.
        path: PathBuf,
    },

    /// Unexpected end of the byte buffer.
    #[error("unexpected end of data: wanted {wanted} bytes at offset {offset}, {available} available")]
    UnexpectedEof {
        /// Offset of the failed read.
        offset: usize,
        /// Number of bytes requested.
        wanted: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    // ==================== JT Header Errors ====================
    /// The first 80 bytes do not contain a recognizable JT signature.
    #[error("invalid JT signature: {0:?}")]
    InvalidSignature(String),

    /// The JT major version is outside the supported range.
    #[error("unsupported JT version: {version} (supported: 8.0 - 10.x)")]
    UnsupportedVersion {
        /// The version string found in the signature.
        version: String,
    },

    /// No partition node could be established as the LSG root.
    #[error("no logical scene graph root found")]
    MissingRoot,

    // ==================== Framing Errors ====================
    /// Two elements of one file claim the same object id.
    #[error("found duplicate object id: {0}")]
    DuplicateObjectId(i32),

    /// A property atom element consumed more bytes than it declared.
    #[error("invalid segment size: {0}")]
    InvalidSegmentSize(i64),

    /// An element header declares a length that cannot be right.
    #[error("invalid element length {length} at offset {offset}")]
    InvalidElementLength {
        /// Offset of the element header.
        offset: usize,
        /// Declared element length.
        length: i32,
    },

    /// An element carries a version number newer than the reader knows.
    #[error("found invalid version number {version} in {element}")]
    InvalidVersionNumber {
        /// Element type name.
        element: &'static str,
        /// The version number read.
        version: i32,
    },

    /// A meta data value type byte is not one of the known types.
    #[error("unexpected value type: {0}")]
    UnexpectedValueType(u8),

    /// Zlib or LZMA inflate failed; byte alignment of the file is lost.
    #[error("{algorithm} decompression failed: {message}")]
    CodecError {
        /// Name of the compression algorithm.
        algorithm: &'static str,
        /// The error message.
        message: String,
    },

    /// The scene graph nests deeper than the assembler allows.
    #[error("scene graph exceeds maximum depth of {depth}")]
    GraphTooDeep {
        /// The depth limit that was hit.
        depth: usize,
    },

    /// Multi-instance copies would grow the scene graph past its node budget.
    #[error("scene graph exceeds maximum size of {nodes} nodes")]
    GraphTooLarge {
        /// The node limit that was hit.
        nodes: usize,
    },

    // ==================== Recoverable Errors ====================
    /// A date value is out of range.
    #[error("malformed date: {year}-{month}-{day} {hour}:{minute}:{second}")]
    MalformedDate {
        /// Year component.
        year: i16,
        /// Month component.
        month: i16,
        /// Day component.
        day: i16,
        /// Hour component.
        hour: i16,
        /// Minute component.
        minute: i16,
        /// Second component.
        second: i16,
    },

    /// A geometry packet uses a codec this reader does not decode.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A shape references a LOD segment that was not found in the TOC.
    #[error("missing LOD element for segment {0}")]
    MissingLod(String),

    /// Decoded geometry is internally inconsistent.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An external reference could not be resolved or loaded.
    #[error("external reference error: {0}")]
    ExternalReference(String),
}

impl Error {
    /// Whether this error only invalidates one unit of the load.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedDate { .. }
                | Error::UnsupportedCodec(_)
                | Error::MissingLod(_)
                | Error::InvalidGeometry(_)
                | Error::ExternalReference(_)
        )
    }
}

/// A specialized Result type for `JtReader` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(Error::UnsupportedCodec("huffman".into()).is_recoverable());
        assert!(Error::MissingLod("x".into()).is_recoverable());
        assert!(!Error::DuplicateObjectId(4).is_recoverable());
        assert!(!Error::UnsupportedVersion { version: "12.0".into() }.is_recoverable());
    }
}
