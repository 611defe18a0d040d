//! Sass and utility-class CSS build hooks.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! - [`SassPlugin`] compiles `.scss` / `.sass` through `stylebuild-sass`,
//!   inline or into sibling `.css` files
//! - [`UtilityClassPlugin`] runs marked `.css` files through the
//!   utility-class CLI
//! - [`Bundler`] is the small host that drives them from the command line,
//!   once or in watch mode

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod postprocess;
pub mod sass_plugin;
pub mod stdin;
pub mod version;
pub mod watch;

pub use bundler::{BuildOptions, BuildResult, Bundler, EntryError, OutputFile};
pub use config::{CONFIG_FILE_NAME, Config, OutputMode, Style, TailwindConfig};
pub use error::{PluginError, Result};
pub use host::{
    FILE_NAMESPACE, Loader, OnLoadArgs, OnLoadOptions, OnLoadResult, OnResolveArgs,
    OnResolveOptions, OnResolveResult, Plugin, PluginBuild,
};
pub use postprocess::{PostProcessed, UtilityClassPlugin, UtilityClassProcessor};
pub use sass_plugin::{SASS_NAMESPACE, SassPlugin};
pub use version::cli_version;
