//! Error types for Sass compilation.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::PathBuf;

use stylebuild_runtime::RuntimeError;
use thiserror::Error;

/// Errors that can occur while compiling one stylesheet.
#[derive(Debug, Error)]
pub enum SassError {
    /// No Dart Sass executable could be found
    #[error(
        "Dart Sass executable not found (set STYLEBUILD_DART_SASS, configure `sass`, or put `sass` on PATH)"
    )]
    BinaryNotFound,

    /// The compiler process could not be started
    #[error("Failed to start Dart Sass at {}: {source}", .path.display())]
    Start {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry file (or another input) could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The compiler broke the embedded protocol or went away
    #[error("Sass protocol error: {0}")]
    Protocol(String),

    /// Reading from or writing to the compiler failed
    #[error("Sass session I/O failed: {0}")]
    Transport(#[from] std::io::Error),

    /// The stylesheet itself failed to compile
    #[error("Sass compilation failed: {message}")]
    Compilation {
        message: String,
        /// The compiler's rendering of the error with source context
        formatted: Option<String>,
    },
}

impl SassError {
    /// Text to show a user: the compiler's formatted diagnostic when there is
    /// one, otherwise the error message.
    pub fn diagnostic(&self) -> String {
        match self {
            SassError::Compilation {
                formatted: Some(formatted),
                ..
            } => formatted.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_formatted() {
        let err = SassError::Compilation {
            message: "Undefined variable.".to_string(),
            formatted: Some("Error: Undefined variable.\n  ╷\n1 │ a { b: $c }".to_string()),
        };
        assert!(err.diagnostic().starts_with("Error: Undefined variable."));
        assert_eq!(
            err.to_string(),
            "Sass compilation failed: Undefined variable."
        );

        let err = SassError::Protocol("unexpected EOF".to_string());
        assert_eq!(err.diagnostic(), "Sass protocol error: unexpected EOF");
    }
}
