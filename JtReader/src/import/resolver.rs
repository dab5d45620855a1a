//! External reference resolution
//!
//! Partitions below the root may name another JT file. The importer asks a
//! [`ReferenceResolver`] whether that file exists and for its bytes, so
//! callers can serve references from somewhere other than the local disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub trait ReferenceResolver: Send + Sync {
    /// Whether `path` names a readable, non-empty document
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole document at `path`
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Resolves references against the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemResolver;

impl ReferenceResolver for FileSystemResolver {
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }
}

/// Path of a referenced file, relative to the directory of `base_document`
///
/// Absolute reference names are used as they are.
pub fn reference_path(base_document: &str, file_name: &str) -> PathBuf {
    let reference = Path::new(file_name);
    if reference.is_absolute() {
        return reference.to_path_buf();
    }
    Path::new(base_document)
        .parent()
        .map_or_else(|| reference.to_path_buf(), |dir| dir.join(reference))
}

/// Read a document that must exist and be non-empty
pub(crate) fn read_document(resolver: &dyn ReferenceResolver, path: &Path) -> Result<Vec<u8>> {
    if !resolver.exists(path) {
        return Err(Error::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    resolver.read(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_path_is_relative_to_base() {
        assert_eq!(
            reference_path("/data/asm/top.jt", "parts/bolt.jt"),
            PathBuf::from("/data/asm/parts/bolt.jt")
        );
        assert_eq!(reference_path("top.jt", "bolt.jt"), PathBuf::from("bolt.jt"));
        assert_eq!(reference_path("/data/top.jt", "/abs/bolt.jt"), PathBuf::from("/abs/bolt.jt"));
    }

    #[test]
    fn test_file_system_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.jt");
        let full = dir.path().join("full.jt");
        fs::write(&empty, b"").unwrap();
        fs::write(&full, b"abc").unwrap();

        let resolver = FileSystemResolver;
        assert!(!resolver.exists(&empty));
        assert!(!resolver.exists(&dir.path().join("missing.jt")));
        assert!(resolver.exists(&full));
        assert_eq!(resolver.read(&full).unwrap(), b"abc");
        assert!(matches!(
            read_document(&resolver, &empty),
            Err(Error::EmptyInput { .. })
        ));
    }
}
