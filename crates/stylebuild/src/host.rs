//! Plugin surface offered to build hooks.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Mirrors the callback model JavaScript bundlers expose: a plugin's `setup`
//! registers resolve and load callbacks, each guarded by a path regex and an
//! optional namespace. The [`crate::bundler::Bundler`] runs them for every
//! entry point, first match wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use stylebuild_resolve::ModuleLocator;
use tracing::trace;

use crate::error::{PluginError, Result};

/// Namespace of ordinary files on disk.
pub const FILE_NAMESPACE: &str = "file";

/// How the bundler should interpret loaded contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    Css,
    /// The hook produced its output itself; emit nothing
    Empty,
}

fn compile_filter(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| PluginError::Filter {
        pattern: pattern.to_string(),
        source,
    })
}

fn namespace_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|ns| ns == actual)
}

/// Which paths a resolve callback wants to see.
#[derive(Debug, Clone)]
pub struct OnResolveOptions {
    pub filter: Regex,
    /// `None` matches every namespace
    pub namespace: Option<String>,
}

impl OnResolveOptions {
    pub fn new(filter: &str) -> Result<Self> {
        Ok(Self {
            filter: compile_filter(filter)?,
            namespace: None,
        })
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    fn matches(&self, args: &OnResolveArgs) -> bool {
        namespace_matches(self.namespace.as_deref(), &args.namespace)
            && self.filter.is_match(&args.path)
    }
}

/// Which modules a load callback wants to see.
#[derive(Debug, Clone)]
pub struct OnLoadOptions {
    pub filter: Regex,
    /// `None` matches every namespace
    pub namespace: Option<String>,
}

impl OnLoadOptions {
    pub fn new(filter: &str) -> Result<Self> {
        Ok(Self {
            filter: compile_filter(filter)?,
            namespace: None,
        })
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    fn matches(&self, args: &OnLoadArgs) -> bool {
        namespace_matches(self.namespace.as_deref(), &args.namespace)
            && self.filter.is_match(&args.path.to_string_lossy())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnResolveArgs {
    /// The path as written by the user
    pub path: String,
    pub importer: Option<PathBuf>,
    /// Namespace of the importing module
    pub namespace: String,
    /// Directory relative paths are resolved against
    pub resolve_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnResolveResult {
    pub path: PathBuf,
    pub namespace: String,
    /// Leave the module out of the build
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnLoadArgs {
    pub path: PathBuf,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnLoadResult {
    pub contents: String,
    pub loader: Loader,
    /// Extra files whose change should trigger a rebuild
    pub watch_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl OnLoadResult {
    pub fn css(contents: String) -> Self {
        Self {
            contents,
            loader: Loader::Css,
            watch_files: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

type ResolveCallback = Box<dyn Fn(&OnResolveArgs) -> Result<Option<OnResolveResult>> + Send + Sync>;
type LoadCallback = Box<dyn Fn(&OnLoadArgs) -> Result<Option<OnLoadResult>> + Send + Sync>;

struct ResolveHook {
    plugin: String,
    options: OnResolveOptions,
    callback: ResolveCallback,
}

struct LoadHook {
    plugin: String,
    options: OnLoadOptions,
    callback: LoadCallback,
}

/// A build extension.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register callbacks. Runs once, before the first build.
    fn setup(&self, build: &mut PluginBuild) -> Result<()>;
}

/// Registration handle passed to [`Plugin::setup`], and afterwards the
/// bundler's table of hooks.
pub struct PluginBuild {
    locator: Arc<dyn ModuleLocator>,
    current_plugin: String,
    resolve_hooks: Vec<ResolveHook>,
    load_hooks: Vec<LoadHook>,
}

impl PluginBuild {
    pub fn new(locator: Arc<dyn ModuleLocator>) -> Self {
        Self {
            locator,
            current_plugin: String::new(),
            resolve_hooks: Vec::new(),
            load_hooks: Vec::new(),
        }
    }

    /// Run `plugin.setup`, attributing its hooks to the plugin's name.
    pub fn register(&mut self, plugin: &dyn Plugin) -> Result<()> {
        self.current_plugin = plugin.name().to_string();
        let result = plugin.setup(self);
        self.current_plugin.clear();
        result
    }

    pub fn on_resolve<F>(&mut self, options: OnResolveOptions, callback: F)
    where
        F: Fn(&OnResolveArgs) -> Result<Option<OnResolveResult>> + Send + Sync + 'static,
    {
        self.resolve_hooks.push(ResolveHook {
            plugin: self.current_plugin.clone(),
            options,
            callback: Box::new(callback),
        });
    }

    pub fn on_load<F>(&mut self, options: OnLoadOptions, callback: F)
    where
        F: Fn(&OnLoadArgs) -> Result<Option<OnLoadResult>> + Send + Sync + 'static,
    {
        self.load_hooks.push(LoadHook {
            plugin: self.current_plugin.clone(),
            options,
            callback: Box::new(callback),
        });
    }

    /// The host's module resolution service. Entry points that are not
    /// files under the working directory are looked up here.
    pub fn resolve(&self, specifier: &str, resolve_dir: &Path) -> Option<PathBuf> {
        self.locator.locate(specifier, resolve_dir)
    }

    /// Run matching resolve callbacks in registration order until one answers.
    pub fn run_resolve(&self, args: &OnResolveArgs) -> Result<Option<OnResolveResult>> {
        for hook in self.resolve_hooks.iter().filter(|h| h.options.matches(args)) {
            if let Some(result) = (hook.callback)(args)? {
                trace!(plugin = %hook.plugin, path = %args.path, "Resolved by plugin");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Run matching load callbacks in registration order until one answers.
    pub fn run_load(&self, args: &OnLoadArgs) -> Result<Option<OnLoadResult>> {
        for hook in self.load_hooks.iter().filter(|h| h.options.matches(args)) {
            if let Some(result) = (hook.callback)(args)? {
                trace!(plugin = %hook.plugin, path = %args.path.display(), "Loaded by plugin");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for PluginBuild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginBuild")
            .field("resolve_hooks", &self.resolve_hooks.len())
            .field("load_hooks", &self.load_hooks.len())
            .finish_non_exhaustive()
    }
}
