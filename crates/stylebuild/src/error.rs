//! Error types for the build hooks and the bundler driver.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::PathBuf;

use stylebuild_runtime::RuntimeError;
use stylebuild_sass::SassError;
use thiserror::Error;

/// Errors reported by a hook or by the bundler for one entry point.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to compile Sass file '{}': {source}", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: SassError,
    },

    /// The utility-class tool ran and exited non-zero
    #[error("failed to run {command} on '{}' (exit code {code}):\n{output}", .path.display())]
    PostProcess {
        command: String,
        path: PathBuf,
        code: i32,
        /// Captured stdout followed by stderr
        output: String,
    },

    /// An external program could not be started at all
    #[error("failed to run {command}: {source}")]
    Command {
        command: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("could not resolve \"{specifier}\"")]
    Unresolved { specifier: String },

    #[error("no loader is configured for '{}'", .path.display())]
    NoLoader { path: PathBuf },

    #[error("invalid hook filter /{pattern}/: {source}")]
    Filter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration in '{}': {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("--outfile cannot be used with {count} entry points (use --outdir)")]
    OutfileWithMultipleEntries { count: usize },

    #[error("file watcher error: {0}")]
    Watch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Text to show a user. Compiler failures keep their source excerpt.
    pub fn diagnostic(&self) -> String {
        match self {
            PluginError::Compile { path, source } => format!(
                "failed to compile Sass file '{}':\n{}",
                path.display(),
                source.diagnostic()
            ),
            other => other.to_string(),
        }
    }
}

impl From<notify::Error> for PluginError {
    fn from(err: notify::Error) -> Self {
        PluginError::Watch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
