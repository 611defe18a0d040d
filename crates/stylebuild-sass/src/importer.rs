//! The resolver/loader capability handed to a compiler session.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::{Path, PathBuf};

use stylebuild_resolve::{CanonicalReference, ImportResolver, IncludeSet, ResolveError};
use stylebuild_runtime::SystemRuntime;
use tracing::debug;

use crate::protocol::Syntax;
use crate::syntax::syntax_for_path;

/// Contents of a loaded stylesheet plus its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedStylesheet {
    pub contents: String,
    pub syntax: Syntax,
}

/// Callbacks a compiler session makes while compiling one stylesheet.
///
/// Errors are plain messages: they are sent back over the wire and the
/// compiler turns them into its own diagnostic.
pub trait Importer {
    /// Map `url` to a canonical URL, or `Ok(None)` when this importer does not
    /// recognize it.
    fn canonicalize(
        &mut self,
        url: &str,
        containing_url: Option<&str>,
    ) -> Result<Option<String>, String>;

    /// Load a URL previously returned from [`Importer::canonicalize`].
    fn load(&mut self, canonical_url: &str) -> Result<ImportedStylesheet, String>;
}

/// [`Importer`] backed by the import resolution engine.
///
/// Owns the compile's [`IncludeSet`]; every canonicalization that succeeds
/// appends to it.
pub struct ResolvingImporter<'a> {
    resolver: ImportResolver<'a>,
    runtime: &'a dyn SystemRuntime,
    entry_dir: PathBuf,
    includes: IncludeSet,
}

impl<'a> ResolvingImporter<'a> {
    pub fn new(
        resolver: ImportResolver<'a>,
        runtime: &'a dyn SystemRuntime,
        entry_dir: PathBuf,
    ) -> Self {
        Self {
            resolver,
            runtime,
            entry_dir,
            includes: IncludeSet::new(),
        }
    }

    pub fn includes(&self) -> &IncludeSet {
        &self.includes
    }

    pub fn into_includes(self) -> IncludeSet {
        self.includes
    }

    /// Directory nested imports are resolved against: the directory of the
    /// stylesheet containing the import, or the entry's directory when the
    /// compiler does not say.
    fn importer_dir(&self, containing_url: Option<&str>) -> PathBuf {
        containing_url
            .and_then(CanonicalReference::from_url)
            .and_then(|reference| reference.path().parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.entry_dir.clone())
    }
}

impl Importer for ResolvingImporter<'_> {
    fn canonicalize(
        &mut self,
        url: &str,
        containing_url: Option<&str>,
    ) -> Result<Option<String>, String> {
        let importer_dir = self.importer_dir(containing_url);
        match self.resolver.resolve(url, &importer_dir, &mut self.includes) {
            Ok(reference) => Ok(Some(reference.to_url())),
            // Not ours: the compiler moves on to its load paths and reports
            // the missing stylesheet itself.
            Err(ResolveError::NotFound { .. }) => Ok(None),
        }
    }

    fn load(&mut self, canonical_url: &str) -> Result<ImportedStylesheet, String> {
        let reference = CanonicalReference::from_url(canonical_url)
            .ok_or_else(|| format!("Not a file URL: {canonical_url}"))?;
        let path = reference.path();
        debug!(path = %path.display(), "Loading stylesheet");

        let contents = self
            .runtime
            .file_read_string(path)
            .map_err(|e| e.to_string())?;
        Ok(ImportedStylesheet {
            contents,
            syntax: syntax_for_path(path),
        })
    }
}

impl std::fmt::Debug for ResolvingImporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvingImporter")
            .field("resolver", &self.resolver)
            .field("entry_dir", &self.entry_dir)
            .field("includes", &self.includes)
            .finish_non_exhaustive()
    }
}
