//! Error types for import resolution.
//!
//! Copyright (c) 2026 stylebuild contributors

use thiserror::Error;

/// Errors produced by the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No candidate (direct file, partial, or directory index) exists.
    ///
    /// Carries the specifier exactly as the stylesheet wrote it, never one of
    /// the transformed candidates.
    #[error("Can't find stylesheet to import: '{specifier}'")]
    NotFound { specifier: String },
}
