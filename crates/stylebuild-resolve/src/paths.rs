//! Lexical path helpers.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Resolution never follows symlinks: the path a stylesheet was found at is
//! the path reported to the bundler's watcher, so these helpers only clean up
//! `.` and `..` components.

use std::path::{Component, Path, PathBuf};

/// Normalize path components (remove `.` and resolve `..`).
///
/// `..` at the start of a relative path is preserved; `..` above the root of
/// an absolute path is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = normalized.components().next_back();
                match last {
                    Some(Component::Normal(_)) => {
                        normalized.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => normalized.push(".."),
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Make `path` absolute against `base` (if needed) and normalize it.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Express `path` relative to the directory `base`, using `/` separators.
///
/// Both paths are normalized first. Returns `None` when no relative form
/// exists (one side is relative, or they live under different prefixes such
/// as two Windows drives).
pub fn relative_specifier(path: &Path, base: &Path) -> Option<String> {
    if !path.is_absolute() || !base.is_absolute() {
        return None;
    }
    let path = normalize(path);
    let base = normalize(base);

    let path_components: Vec<Component<'_>> = path.components().collect();
    let base_components: Vec<Component<'_>> = base.components().collect();

    if path_components.first() != base_components.first() {
        return None;
    }

    let common = path_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_components.len() {
        parts.push("..".to_string());
    }
    for component in &path_components[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_dots() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c/d.scss")),
            PathBuf::from("/a/c/d.scss")
        );
        assert_eq!(normalize(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("styles/_a.scss"), Path::new("/proj")),
            PathBuf::from("/proj/styles/_a.scss")
        );
        assert_eq!(
            absolutize(Path::new("/elsewhere/../b.scss"), Path::new("/proj")),
            PathBuf::from("/b.scss")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_specifier() {
        assert_eq!(
            relative_specifier(Path::new("/proj/src/_a.scss"), Path::new("/proj/src")),
            Some("_a.scss".to_string())
        );
        assert_eq!(
            relative_specifier(Path::new("/proj/lib/x"), Path::new("/proj/src/deep")),
            Some("../../lib/x".to_string())
        );
        assert_eq!(
            relative_specifier(Path::new("/proj"), Path::new("/proj")),
            Some(".".to_string())
        );
        assert_eq!(relative_specifier(Path::new("rel"), Path::new("/proj")), None);
    }
}
