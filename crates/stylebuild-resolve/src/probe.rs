//! Filesystem existence oracle.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::{Path, PathBuf};

use stylebuild_runtime::SystemRuntime;
use tracing::trace;

use crate::paths::absolutize;

/// Outcome of testing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The candidate exists; carries its absolute, normalized path.
    Found(PathBuf),
    NotFound,
}

impl Probe {
    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Tests candidate paths for existence through a [`SystemRuntime`].
///
/// I/O errors other than "not found" (permissions, broken mounts) are treated
/// as absence: a path the compiler could not read is not a resolution.
#[derive(Clone, Copy)]
pub struct PathProber<'a> {
    runtime: &'a dyn SystemRuntime,
}

impl<'a> PathProber<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime) -> Self {
        Self { runtime }
    }

    /// Join `candidate` onto `dir` and check that the result is a file.
    pub fn probe(&self, dir: &Path, candidate: &str) -> Probe {
        self.probe_path(&absolutize(Path::new(candidate), dir))
    }

    /// Check that `path` (already absolute) is a file.
    pub fn probe_path(&self, path: &Path) -> Probe {
        let exists = self.runtime.is_file(path).unwrap_or(false);
        trace!(path = %path.display(), exists, "Probed candidate");
        if exists {
            Probe::Found(path.to_path_buf())
        } else {
            Probe::NotFound
        }
    }
}

impl std::fmt::Debug for PathProber<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathProber")
            .field("runtime", &"<SystemRuntime>")
            .finish()
    }
}
