//! Locating the Dart Sass executable.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::{Path, PathBuf};

use stylebuild_runtime::SystemRuntime;
use tracing::{debug, trace};

use crate::error::SassError;

/// Environment variable naming an explicit Dart Sass executable.
pub const DART_SASS_ENV: &str = "STYLEBUILD_DART_SASS";

/// Directory the standalone Dart Sass release unpacks into.
const BUNDLED_DIR: &str = "dart-sass";

/// Executable names inside a standalone release, in preference order.
fn bundled_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["sass.bat", "sass.exe"]
    } else {
        &["sass"]
    }
}

/// Directories a bundled compiler may live in, relative to our executable.
///
/// - `<exe>/../../../dart-sass` for installs that ship it beside a `bin/<platform>/`
///   tree
/// - `<exe dir>/dart-sass` for a flat layout
pub fn bundled_dirs(exe: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(root) = exe.parent().and_then(Path::parent).and_then(Path::parent) {
        dirs.push(root.join(BUNDLED_DIR));
    }
    if let Some(exe_dir) = exe.parent() {
        dirs.push(exe_dir.join(BUNDLED_DIR));
    }
    dirs
}

/// Find Dart Sass.
///
/// Search order, first hit wins:
/// 1. the `STYLEBUILD_DART_SASS` environment variable
/// 2. `configured` (from config file or command line)
/// 3. the bundled layouts from [`bundled_dirs`]
/// 4. `sass` on `PATH`, with the bundled directories appended to it
pub fn find_dart_sass(
    runtime: &dyn SystemRuntime,
    configured: Option<&Path>,
) -> Result<PathBuf, SassError> {
    if let Ok(Some(value)) = runtime.env_get(DART_SASS_ENV) {
        let path = PathBuf::from(value);
        if runtime.is_file(&path).unwrap_or(false) {
            debug!(path = %path.display(), "Dart Sass from {DART_SASS_ENV}");
            return Ok(path);
        }
        debug!(path = %path.display(), "Ignoring {DART_SASS_ENV}: not a file");
    }

    if let Some(path) = configured {
        if runtime.is_file(path).unwrap_or(false) {
            return Ok(path.to_path_buf());
        }
        debug!(path = %path.display(), "Configured Dart Sass is not a file");
    }

    let dirs = runtime
        .current_exe()
        .map(|exe| bundled_dirs(&exe))
        .unwrap_or_default();
    for dir in &dirs {
        for name in bundled_names() {
            let candidate = dir.join(name);
            trace!(path = %candidate.display(), "Checking bundled Dart Sass");
            if runtime.is_file(&candidate).unwrap_or(false) {
                return Ok(candidate);
            }
        }
    }

    runtime
        .find_binary_with_dirs("sass", DART_SASS_ENV, &dirs)
        .ok_or(SassError::BinaryNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebuild_runtime::NativeRuntime;

    #[test]
    fn test_bundled_dirs() {
        let dirs = bundled_dirs(Path::new("/opt/tool/bin/x86_64/stylebuild"));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/opt/tool/dart-sass"),
                PathBuf::from("/opt/tool/bin/x86_64/dart-sass"),
            ]
        );
    }

    #[test]
    fn test_configured_path_is_used() {
        let temp = tempfile::tempdir().unwrap();
        let sass = temp.path().join("my-sass");
        std::fs::write(&sass, "").unwrap();

        let found = find_dart_sass(&NativeRuntime::new(), Some(&sass)).unwrap();
        // The environment variable wins when set; otherwise the configured path.
        if std::env::var_os(DART_SASS_ENV).is_none() {
            assert_eq!(found, sass);
        }
    }
}
