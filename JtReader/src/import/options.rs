//! Import options
//!
//! Controls which parts of a JT document are decoded and how deep external
//! references are followed.

use crate::formats::jt::geometry::Color;

/// Default limit for nested external reference loads
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 16;

/// Options for a JT import.
///
/// # Example
///
/// ```
/// use jtreader::import::ImportOptions;
///
/// let options = ImportOptions::new()
///     .with_skip_geometry(true)
///     .with_max_reference_depth(4);
/// assert!(options.skip_geometry);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Build the scene graph only, decode no shape LODs
    pub skip_geometry: bool,

    /// Do not follow partitions that reference other JT files
    pub skip_sub_partitions: bool,

    /// Stop wiring a parent's children after its first multi-instance clone.
    /// Reproduces the node lists of older readers; off by default.
    pub stop_after_clone: bool,

    /// Nesting limit for external reference loads
    pub max_reference_depth: usize,

    /// Color used for shapes without any material in their ancestry
    pub default_color: Color,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_geometry: false,
            skip_sub_partitions: false,
            stop_after_clone: false,
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            default_color: [1.0, 1.0, 1.0],
        }
    }
}

impl ImportOptions {
    /// Create options that decode everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a scene-graph-only load (no geometry, no references).
    #[must_use]
    pub fn structure_only() -> Self {
        Self {
            skip_geometry: true,
            skip_sub_partitions: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_skip_geometry(mut self, skip: bool) -> Self {
        self.skip_geometry = skip;
        self
    }

    #[must_use]
    pub fn with_skip_sub_partitions(mut self, skip: bool) -> Self {
        self.skip_sub_partitions = skip;
        self
    }

    #[must_use]
    pub fn with_stop_after_clone(mut self, stop: bool) -> Self {
        self.stop_after_clone = stop;
        self
    }

    #[must_use]
    pub fn with_max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }

    #[must_use]
    pub fn with_default_color(mut self, color: Color) -> Self {
        self.default_color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ImportOptions::default();
        assert!(!options.skip_geometry);
        assert!(!options.stop_after_clone);
        assert_eq!(options.max_reference_depth, 16);
        assert_eq!(options.default_color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_structure_only() {
        let options = ImportOptions::structure_only().with_stop_after_clone(true);
        assert!(options.skip_geometry);
        assert!(options.skip_sub_partitions);
        assert!(options.stop_after_clone);
    }
}
