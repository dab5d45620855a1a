//! Per-load accumulators
//!
//! Every top-level load and every recursive external-reference load owns its
//! own [`LoadContext`]; nothing here is global, so independent loads can run
//! on different threads.

use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;

use crate::formats::jt::guid::Guid;

/// Progress callback type
pub type ProgressCallback<'a> = &'a (dyn Fn(&LoadProgress) + Sync);

/// Cumulative progress of one in-flight load
#[derive(Debug, Clone)]
pub struct LoadProgress {
    /// Name of the document being read
    pub source: String,
    /// Bytes consumed so far (element lengths, compressed sizes for zipped elements)
    pub bytes_read: usize,
    /// Size of the document in bytes
    pub total_bytes: usize,
}

impl LoadProgress {
    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total_bytes == 0 {
            1.0
        } else {
            (self.bytes_read as f32 / self.total_bytes as f32).min(1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// One entry of the load-information log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LoadInformation {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LoadInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.as_str(), self.message)
    }
}

pub struct LoadContext<'a> {
    source: String,
    total_bytes: usize,
    bytes_read: usize,
    progress: Option<ProgressCallback<'a>>,
    load_information: IndexSet<LoadInformation>,
    unsupported_entities: IndexSet<String>,
}

impl<'a> LoadContext<'a> {
    pub fn new(source: impl Into<String>, total_bytes: usize) -> Self {
        Self {
            source: source.into(),
            total_bytes,
            bytes_read: 0,
            progress: None,
            load_information: IndexSet::new(),
            unsupported_entities: IndexSet::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressCallback<'a>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn progress_callback(&self) -> Option<ProgressCallback<'a>> {
        self.progress
    }

    /// Record an entry; exact duplicates are dropped
    pub fn add_information(&mut self, severity: Severity, message: impl Into<String>) {
        self.load_information.insert(LoadInformation {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add_information(Severity::Info, message);
    }

    /// Record a recoverable problem and log it
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}: {}", self.source, message);
        self.add_information(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}: {}", self.source, message);
        self.add_information(Severity::Error, message);
    }

    /// Record an element type the reader skips
    pub fn add_unsupported(&mut self, guid: Guid) {
        let entry = guid.describe();
        if !self.unsupported_entities.contains(&entry) {
            tracing::debug!("Skipping unsupported element {}", entry);
            self.unsupported_entities.insert(entry);
        }
    }

    /// Add the log of a nested load to this one
    pub fn absorb(&mut self, information: &[LoadInformation], unsupported: &[String]) {
        for entry in information {
            self.load_information.insert(entry.clone());
        }
        for entry in unsupported {
            self.unsupported_entities.insert(entry.clone());
        }
    }

    /// Account for consumed bytes and notify the progress sink
    pub fn report_bytes(&mut self, bytes: usize) {
        self.bytes_read = self.bytes_read.saturating_add(bytes);
        if let Some(callback) = self.progress {
            callback(&LoadProgress {
                source: self.source.clone(),
                bytes_read: self.bytes_read,
                total_bytes: self.total_bytes,
            });
        }
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn load_information(&self) -> impl Iterator<Item = &LoadInformation> {
        self.load_information.iter()
    }

    pub fn has_warning(&self, needle: &str) -> bool {
        self.load_information
            .iter()
            .any(|entry| entry.severity == Severity::Warning && entry.message.contains(needle))
    }

    /// Hand the accumulated logs to the caller
    pub fn finish(self) -> (Vec<LoadInformation>, Vec<String>) {
        (
            self.load_information.into_iter().collect(),
            self.unsupported_entities.into_iter().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_information_is_deduplicated() {
        let mut ctx = LoadContext::new("a.jt", 0);
        ctx.warn("missing child 7");
        ctx.warn("missing child 7");
        ctx.info("missing child 7");
        let (info, _) = ctx.finish();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].to_string(), "WARNING: missing child 7");
    }

    #[test]
    fn test_unsupported_is_deduplicated_and_labelled() {
        let mut ctx = LoadContext::new("a.jt", 0);
        let brep = Guid::new(0x873a70c0, 0x2ac8, 0x11d1, [0x9b, 0x6b, 0x00, 0x80, 0xc7, 0xbb, 0x59, 0x97]);
        ctx.add_unsupported(brep);
        ctx.add_unsupported(brep);
        let (_, unsupported) = ctx.finish();
        assert_eq!(unsupported, vec![brep.describe()]);
    }

    #[test]
    fn test_progress_is_cumulative() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: &LoadProgress| seen.lock().unwrap().push(p.bytes_read);
        let mut ctx = LoadContext::new("a.jt", 100).with_progress(Some(&callback));
        ctx.report_bytes(10);
        ctx.report_bytes(30);
        assert_eq!(*seen.lock().unwrap(), vec![10, 40]);
        assert_eq!(ctx.bytes_read(), 40);
    }
}
