//! Canonical references: the absolute identity of a resolved stylesheet.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Absolute reference to exactly one file on disk.
///
/// Rendered as a `file://` URL when handed to the compiler; the compiler uses
/// it both to dedupe loads and to ask for the file's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalReference {
    path: PathBuf,
}

impl CanonicalReference {
    /// Wrap an absolute path. Callers are expected to have just confirmed the
    /// file exists.
    pub fn new(path: PathBuf) -> Self {
        debug_assert!(path.is_absolute(), "canonical reference must be absolute");
        Self { path }
    }

    /// Parse a `file://` URL previously produced by [`CanonicalReference::to_url`].
    pub fn from_url(url: &str) -> Option<Self> {
        file_url_to_path(url).map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// The `file://` URL form, percent-encoded.
    pub fn to_url(&self) -> String {
        Url::from_file_path(&self.path)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{}", self.path.display()))
    }
}

impl fmt::Display for CanonicalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// If `specifier` is an absolute `file:` URL, return the path it names.
///
/// Anything else (plain paths, other schemes, unparsable strings) yields
/// `None`. URLs whose host makes them unrepresentable as a local path fall
/// back to the decoded URL path.
pub fn file_url_to_path(specifier: &str) -> Option<PathBuf> {
    let url = Url::parse(specifier).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    match url.to_file_path() {
        Ok(path) => Some(path),
        Err(()) => Some(PathBuf::from(url.path())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_url_round_trip_with_spaces() {
        let reference = CanonicalReference::new(PathBuf::from("/proj/my styles/_a.scss"));
        let url = reference.to_url();
        assert_eq!(url, "file:///proj/my%20styles/_a.scss");
        assert_eq!(CanonicalReference::from_url(&url), Some(reference));
    }

    #[test]
    fn test_non_file_specifiers_are_not_urls() {
        assert_eq!(file_url_to_path("foo"), None);
        assert_eq!(file_url_to_path("./partials/button"), None);
        assert_eq!(file_url_to_path("sass:math"), None);
        assert_eq!(file_url_to_path("https://example.com/a.scss"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_to_path() {
        assert_eq!(
            file_url_to_path("file:///abs/path.scss"),
            Some(PathBuf::from("/abs/path.scss"))
        );
    }
}
