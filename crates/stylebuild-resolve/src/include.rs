//! The per-compile record of resolved files.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

/// Duplicate-free set of absolute paths resolved during one compile.
///
/// Only paths chosen as the final answer for a specifier are recorded.
/// Insertion order is kept so watch lists are stable between rebuilds, but
/// nothing depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSet {
    paths: IndexSet<PathBuf>,
}

impl IncludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved path. Returns `false` if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.paths.into_iter().collect()
    }
}

impl IntoIterator for IncludeSet {
    type Item = PathBuf;
    type IntoIter = indexmap::set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedupes() {
        let mut set = IncludeSet::new();
        assert!(set.insert(PathBuf::from("/a/_x.scss")));
        assert!(set.insert(PathBuf::from("/a/y.scss")));
        assert!(!set.insert(PathBuf::from("/a/_x.scss")));

        assert_eq!(set.len(), 2);
        assert!(set.contains(Path::new("/a/y.scss")));
        assert_eq!(
            set.into_vec(),
            vec![PathBuf::from("/a/_x.scss"), PathBuf::from("/a/y.scss")]
        );
    }
}
