//! Import resolution for Sass stylesheets.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Turns the specifier written after `@import` / `@use` / `@forward` into
//! exactly one file on disk, following the Sass load conventions:
//! - extension inference (`foo` -> `foo.scss`)
//! - partials (`foo` -> `_foo.scss`)
//! - directory index files (`foo` -> `foo/index.scss`, `foo/_index.scss`)
//! - package lookup through a [`ModuleLocator`] (`node_modules` by default)
//! - `file://` URLs handed back by the compiler, rebased onto the importer
//!
//! Every successful resolution is recorded in an [`IncludeSet`] so the caller
//! can tell the bundler which files to watch.

mod canonical;
mod engine;
mod error;
mod include;
mod locator;
mod paths;
mod probe;

pub use canonical::{CanonicalReference, file_url_to_path};
pub use engine::{DEFAULT_EXTENSION, ImportResolver, RECOGNIZED_EXTENSIONS};
pub use error::ResolveError;
pub use include::IncludeSet;
pub use locator::{ModuleLocator, NodeModulesLocator};
pub use paths::{absolutize, normalize, relative_specifier};
pub use probe::{PathProber, Probe};
