//! Version reporting.
//!
//! Copyright (c) 2026 stylebuild contributors

/// Version printed by `stylebuild --version`.
pub fn cli_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
