//! File format handlers

pub mod jt;

// Re-export the types most callers need
pub use jt::{FileHeader, JtElement, JtVersion, LoadContext, SceneGraph};
