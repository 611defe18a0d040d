//! The import resolution engine.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Candidate order for a specifier `s`, first existing file wins:
//!
//! 1. `file://` URLs are rebased onto the importer directory first, so the
//!    rules below always see a relative path.
//! 2. Direct file: `s` itself when it already carries a stylesheet
//!    extension, otherwise `s.scss`.
//! 3. Partial: `dir/_name` (plus `.scss` when needed).
//! 4. Steps 2 and 3 again with `s/index`.
//!
//! Each candidate is offered to the [`ModuleLocator`] before being joined
//! onto the importer directory.

use std::path::{Path, PathBuf};

use stylebuild_runtime::SystemRuntime;
use tracing::{debug, trace};

use crate::canonical::{CanonicalReference, file_url_to_path};
use crate::error::ResolveError;
use crate::include::IncludeSet;
use crate::locator::ModuleLocator;
use crate::paths::{absolutize, relative_specifier};
use crate::probe::{PathProber, Probe};

/// Extension appended to specifiers that carry none.
pub const DEFAULT_EXTENSION: &str = ".scss";

/// Extensions that mark a specifier as already naming a stylesheet file.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[".scss", ".sass", ".css"];

/// Resolves import specifiers to files for one compile.
///
/// Holds no per-compile state of its own: the [`IncludeSet`] is passed in by
/// the caller, and nothing is cached between calls.
pub struct ImportResolver<'a> {
    locator: &'a dyn ModuleLocator,
    prober: PathProber<'a>,
    module_root: PathBuf,
}

impl<'a> ImportResolver<'a> {
    /// Create a resolver.
    ///
    /// `module_root` is where module lookups start (the bundler's working
    /// directory).
    pub fn new(
        locator: &'a dyn ModuleLocator,
        runtime: &'a dyn SystemRuntime,
        module_root: PathBuf,
    ) -> Self {
        Self {
            locator,
            prober: PathProber::new(runtime),
            module_root,
        }
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    /// Resolve `specifier` as written in a stylesheet living in `importer_dir`.
    ///
    /// A relative `importer_dir` is taken from the module root. On success the chosen path is added to `includes` (once, however many
    /// times it is resolved) and returned as a canonical reference.
    pub fn resolve(
        &self,
        specifier: &str,
        importer_dir: &Path,
        includes: &mut IncludeSet,
    ) -> Result<CanonicalReference, ResolveError> {
        let importer_dir = absolutize(importer_dir, &self.module_root);
        let importer_dir = importer_dir.as_path();
        let base = match file_url_to_path(specifier) {
            Some(absolute) => rebase(&absolute, importer_dir),
            None => specifier.to_string(),
        };
        trace!(specifier, base = %base, importer_dir = %importer_dir.display(), "Resolving import");

        let probe = match self.resolve_variations(&base, importer_dir) {
            Probe::NotFound => {
                let index = format!("{}/index", base.trim_end_matches('/'));
                self.resolve_variations(&index, importer_dir)
            }
            found => found,
        };

        match probe {
            Probe::Found(path) => {
                debug!(specifier, path = %path.display(), "Resolved import");
                includes.insert(path.clone());
                Ok(CanonicalReference::new(path))
            }
            Probe::NotFound => {
                debug!(specifier, "Import not found");
                Err(ResolveError::NotFound {
                    specifier: specifier.to_string(),
                })
            }
        }
    }

    /// Direct file, then partial.
    fn resolve_variations(&self, base: &str, importer_dir: &Path) -> Probe {
        let direct = with_stylesheet_extension(base);
        if let found @ Probe::Found(_) = self.try_candidate(&direct, importer_dir) {
            return found;
        }
        match partial_candidate(base) {
            Some(partial) => self.try_candidate(&partial, importer_dir),
            None => Probe::NotFound,
        }
    }

    /// Module lookup first, then a plain join onto the importer directory.
    fn try_candidate(&self, candidate: &str, importer_dir: &Path) -> Probe {
        if let Some(located) = self.locator.locate(candidate, &self.module_root) {
            // Re-probe: the invariant is that every answer was seen on disk
            // immediately before being returned, whoever located it.
            let path = absolutize(&located, &self.module_root);
            if let found @ Probe::Found(_) = self.prober.probe_path(&path) {
                trace!(candidate, path = %path.display(), "Located as module");
                return found;
            }
        }
        self.prober.probe(importer_dir, candidate)
    }
}

impl std::fmt::Debug for ImportResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportResolver")
            .field("module_root", &self.module_root)
            .finish_non_exhaustive()
    }
}

/// Re-express an absolute path relative to the (absolute) importer directory.
fn rebase(absolute: &Path, importer_dir: &Path) -> String {
    relative_specifier(absolute, importer_dir)
        .unwrap_or_else(|| absolute.to_string_lossy().into_owned())
}

fn has_stylesheet_extension(name: &str) -> bool {
    RECOGNIZED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn with_stylesheet_extension(specifier: &str) -> String {
    if has_stylesheet_extension(specifier) {
        specifier.to_string()
    } else {
        format!("{specifier}{DEFAULT_EXTENSION}")
    }
}

/// `dir/name` -> `dir/_name.scss` (or `dir/_name.ext` when `name` already has
/// a stylesheet extension).
///
/// The underscore is always prepended, so `_name` becomes `__name.scss`.
fn partial_candidate(specifier: &str) -> Option<String> {
    let (dir, name) = match specifier.rfind('/') {
        Some(i) => specifier.split_at(i + 1),
        None => ("", specifier),
    };
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(format!("{dir}_{}", with_stylesheet_extension(name)))
}
