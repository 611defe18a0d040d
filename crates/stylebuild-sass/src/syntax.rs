//! Dialect selection by file extension.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::path::Path;

use crate::protocol::Syntax;

/// `.sass` is the indented syntax, `.css` is plain CSS, everything else SCSS.
///
/// Purely extension based; contents are never sniffed.
pub fn syntax_for_path(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("sass") => Syntax::Indented,
        Some(ext) if ext.eq_ignore_ascii_case("css") => Syntax::Css,
        _ => Syntax::Scss,
    }
}
