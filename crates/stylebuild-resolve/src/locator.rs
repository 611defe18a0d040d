//! Package-style module lookup.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! The bundler hosting the plugin owns a module resolution service; the
//! engine asks it first for every candidate because a package and a project
//! file can share a name and the module graph is authoritative.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use stylebuild_runtime::SystemRuntime;
use tracing::{debug, trace};

use crate::paths::normalize;

/// Host module resolution service.
pub trait ModuleLocator: Send + Sync {
    /// Locate `specifier` as a module, starting from `root`.
    ///
    /// Returns the path of an existing file, or `None`.
    fn locate(&self, specifier: &str, root: &Path) -> Option<PathBuf>;
}

/// `node_modules` lookup, the way JavaScript package managers lay packages out.
///
/// - absolute specifiers name the file itself
/// - `./x` and `../x` are relative to the root
/// - anything else is a bare package path searched for in `node_modules`
///   directories from the root up through every ancestor
///
/// A bare specifier naming a package directory resolves through the
/// `sass`, `style`, then `main` field of its `package.json`.
pub struct NodeModulesLocator {
    runtime: Arc<dyn SystemRuntime>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    sass: Option<String>,
    style: Option<String>,
    main: Option<String>,
}

impl NodeModulesLocator {
    pub fn new(runtime: Arc<dyn SystemRuntime>) -> Self {
        Self { runtime }
    }

    fn file(&self, path: &Path) -> Option<PathBuf> {
        let path = normalize(path);
        if self.runtime.is_file(&path).unwrap_or(false) {
            Some(path)
        } else {
            None
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.runtime.is_dir(path).unwrap_or(false)
    }

    fn locate_bare(&self, specifier: &str, root: &Path) -> Option<PathBuf> {
        let (package, subpath) = split_package(specifier);

        for dir in root.ancestors() {
            let node_modules = dir.join("node_modules");
            if !self.is_dir(&node_modules) {
                continue;
            }
            let package_dir = node_modules.join(package);
            trace!(package_dir = %package_dir.display(), "Looking for package");

            let found = match subpath {
                Some(subpath) => self.file(&package_dir.join(subpath)),
                None => self
                    .file(&package_dir)
                    .or_else(|| self.package_entry(&package_dir)),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Resolve a package directory through its manifest.
    fn package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        if !self.is_dir(package_dir) {
            return None;
        }
        let manifest_path = package_dir.join("package.json");
        let content = self.runtime.file_read_string(&manifest_path).ok()?;
        let manifest: PackageJson = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!(path = %manifest_path.display(), error = %e, "Ignoring unreadable package.json");
                return None;
            }
        };

        [manifest.sass, manifest.style, manifest.main]
            .into_iter()
            .flatten()
            .find_map(|entry| self.file(&package_dir.join(entry)))
    }
}

impl ModuleLocator for NodeModulesLocator {
    fn locate(&self, specifier: &str, root: &Path) -> Option<PathBuf> {
        if specifier.is_empty() {
            return None;
        }
        let path = Path::new(specifier);
        if path.is_absolute() {
            return self.file(path);
        }
        if is_relative_specifier(specifier) {
            return self.file(&root.join(specifier));
        }
        self.locate_bare(specifier, root)
    }
}

impl std::fmt::Debug for NodeModulesLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeModulesLocator")
            .field("runtime", &"<SystemRuntime>")
            .finish()
    }
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Split a bare specifier into package name and subpath.
///
/// `"bootstrap/scss/_mixins.scss"` -> `("bootstrap", Some("scss/_mixins.scss"))`,
/// `"@scope/pkg/x"` -> `("@scope/pkg", Some("x"))`.
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(i, _)| i)
    } else {
        specifier.find('/')
    };
    match name_end {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}
