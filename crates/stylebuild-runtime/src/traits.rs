/*
 * traits.rs
 * Copyright (c) 2026 stylebuild contributors
 *
 * Defines the SystemRuntime trait and supporting types for the runtime
 * abstraction layer.
 */

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// A subprocess could not be started
    Spawn {
        /// Program that failed to launch
        command: String,
        /// Underlying OS error
        source: io::Error,
    },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::Spawn { command, source } => {
                write!(f, "failed to start '{}': {}", command, source)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            RuntimeError::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Output from a command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal)
    pub code: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout followed by stderr, the way a terminal would have shown them.
    pub fn combined_string(&self) -> String {
        let mut combined = self.stdout_string();
        combined.push_str(&self.stderr_string());
        combined
    }
}

/// Trait defining the low-level system operations stylebuild needs.
///
/// Resolution only ever asks "does this file exist" and "what is in it";
/// compilation and post-processing additionally launch programs. Keeping all
/// of that behind one trait lets the resolver be driven from tests and from
/// the compiler session's callback thread alike, so implementations must be
/// `Send + Sync`.
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid UTF-8 in file {}: {}", path.display(), e),
            ))
        })
    }

    /// Write bytes to file (creates or overwrites).
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// Check if path exists, optionally filtering by type.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Check if path exists and is a file.
    ///
    /// Convenience method that calls `path_exists` with `PathKind::File`.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Check if path exists and is a directory.
    ///
    /// Convenience method that calls `path_exists` with `PathKind::Directory`.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DIRECTORY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Create directory (optionally with parents).
    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Get current working directory.
    fn cwd(&self) -> RuntimeResult<PathBuf>;

    /// Path of the running executable.
    fn current_exe(&self) -> RuntimeResult<PathBuf>;

    // ═══════════════════════════════════════════════════════════════════════
    // PROCESS EXECUTION
    // ═══════════════════════════════════════════════════════════════════════

    /// Execute command with full output capture.
    ///
    /// Returns exit code and both stdout/stderr. A non-zero exit is not an
    /// error at this level; callers decide what it means.
    fn exec_command(
        &self,
        command: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> RuntimeResult<CommandOutput>;

    // ═══════════════════════════════════════════════════════════════════════
    // ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Get single environment variable.
    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>>;

    // ═══════════════════════════════════════════════════════════════════════
    // BINARY DISCOVERY
    // ═══════════════════════════════════════════════════════════════════════

    /// Find a binary by checking an environment variable first, then PATH.
    ///
    /// The `env_var` parameter names an environment variable that may contain
    /// the path to the binary (e.g. `STYLEBUILD_DART_SASS`).
    ///
    /// Default implementation checks the environment variable but does not
    /// search PATH. `NativeRuntime` overrides this to use `which`.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        self.find_binary_with_dirs(name, env_var, &[])
    }

    /// Like [`SystemRuntime::find_binary`], but `extra_dirs` are appended to
    /// the search path before looking the binary up.
    fn find_binary_with_dirs(
        &self,
        name: &str,
        env_var: &str,
        extra_dirs: &[PathBuf],
    ) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if self.is_file(&path).unwrap_or(false) {
                return Some(path);
            }
        }
        let _ = (name, extra_dirs);
        None
    }
}

/// Join the current `PATH` with extra directories appended at the end.
pub(crate) fn search_path_with(current: Option<OsString>, extra_dirs: &[PathBuf]) -> OsString {
    let mut dirs: Vec<PathBuf> = current
        .as_deref()
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();
    dirs.extend(extra_dirs.iter().cloned());
    std::env::join_paths(dirs).unwrap_or_default()
}
