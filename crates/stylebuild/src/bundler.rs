//! A minimal host that drives the build hooks.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Each entry point goes through resolve, then load, then emit:
//!
//! 1. resolve callbacks may rename the path, move it to another namespace or
//!    mark it external; otherwise the path is taken relative to the working
//!    directory, falling back to a module lookup (`node_modules`)
//! 2. load callbacks produce the contents; otherwise `.css` files in the
//!    `file` namespace are read as-is
//! 3. the contents go to `--outfile`, `--outdir/<stem>.css` or stdout
//!
//! Entries build concurrently. A failing entry does not stop the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use indexmap::IndexSet;
use stylebuild_resolve::{ModuleLocator, absolutize};
use stylebuild_runtime::SystemRuntime;
use tracing::{debug, info};

use crate::error::{PluginError, Result};
use crate::host::{
    FILE_NAMESPACE, Loader, OnLoadArgs, OnLoadResult, OnResolveArgs, OnResolveResult, Plugin,
    PluginBuild,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub entry_points: Vec<PathBuf>,
    /// Single output file; only valid with one entry point
    pub outfile: Option<PathBuf>,
    /// Output directory, one `<stem>.css` per entry point
    pub outdir: Option<PathBuf>,
    pub working_dir: PathBuf,
}

/// CSS produced for one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub entry: PathBuf,
    /// Where it was written; `None` means the caller prints it
    pub path: Option<PathBuf>,
    pub contents: String,
}

#[derive(Debug)]
pub struct EntryError {
    pub entry: PathBuf,
    pub error: PluginError,
}

#[derive(Debug, Default)]
pub struct BuildResult {
    pub outputs: Vec<OutputFile>,
    pub errors: Vec<EntryError>,
    pub warnings: Vec<String>,
    /// Every file whose change should trigger a rebuild
    pub watch_files: IndexSet<PathBuf>,
}

impl BuildResult {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

enum EntryOutcome {
    External,
    Loaded {
        path: PathBuf,
        result: OnLoadResult,
    },
}

pub struct Bundler {
    options: BuildOptions,
    runtime: Arc<dyn SystemRuntime>,
    hooks: PluginBuild,
}

impl Bundler {
    /// Validate `options` and run every plugin's setup.
    pub fn new(
        options: BuildOptions,
        runtime: Arc<dyn SystemRuntime>,
        locator: Arc<dyn ModuleLocator>,
        plugins: &[Box<dyn Plugin>],
    ) -> Result<Self> {
        if options.outfile.is_some() && options.entry_points.len() > 1 {
            return Err(PluginError::OutfileWithMultipleEntries {
                count: options.entry_points.len(),
            });
        }

        let mut hooks = PluginBuild::new(locator);
        for plugin in plugins {
            hooks.register(plugin.as_ref())?;
            debug!(plugin = plugin.name(), "Registered plugin");
        }

        Ok(Self {
            options,
            runtime,
            hooks,
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build every entry point once.
    pub fn build(&self) -> BuildResult {
        let outcomes: Vec<(PathBuf, Result<EntryOutcome>)> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .options
                .entry_points
                .iter()
                .map(|entry| (entry, scope.spawn(move || self.build_entry(entry))))
                .collect();
            handles
                .into_iter()
                .map(|(entry, handle)| {
                    let outcome = handle.join().unwrap_or_else(|_| {
                        Err(PluginError::Io(std::io::Error::other(
                            "build thread panicked",
                        )))
                    });
                    (entry.clone(), outcome)
                })
                .collect()
        });

        let mut result = BuildResult::default();
        for (entry, outcome) in outcomes {
            result
                .watch_files
                .insert(absolutize(&entry, &self.options.working_dir));
            if let Err(error) = outcome.and_then(|outcome| self.emit(&entry, outcome, &mut result)) {
                debug!(entry = %entry.display(), error = %error, "Entry failed");
                result.errors.push(EntryError { entry, error });
            }
        }

        info!(
            entries = self.options.entry_points.len(),
            errors = result.errors.len(),
            "Build finished"
        );
        result
    }

    fn build_entry(&self, entry: &Path) -> Result<EntryOutcome> {
        let args = OnResolveArgs {
            path: entry.to_string_lossy().into_owned(),
            importer: None,
            namespace: FILE_NAMESPACE.to_string(),
            resolve_dir: self.options.working_dir.clone(),
        };
        let resolved = match self.hooks.run_resolve(&args)? {
            Some(resolved) => resolved,
            None => self.default_resolve(&args)?,
        };
        if resolved.external {
            debug!(path = %resolved.path.display(), "Entry is external");
            return Ok(EntryOutcome::External);
        }

        let args = OnLoadArgs {
            path: resolved.path,
            namespace: resolved.namespace,
        };
        let result = match self.hooks.run_load(&args)? {
            Some(result) => result,
            None => self.default_load(&args)?,
        };
        Ok(EntryOutcome::Loaded {
            path: args.path,
            result,
        })
    }

    fn default_resolve(&self, args: &OnResolveArgs) -> Result<OnResolveResult> {
        let joined = absolutize(Path::new(&args.path), &args.resolve_dir);
        let path = if self.runtime.is_file(&joined).unwrap_or(false) {
            joined
        } else {
            let located = self
                .hooks
                .resolve(&args.path, &args.resolve_dir)
                .ok_or_else(|| PluginError::Unresolved {
                    specifier: args.path.clone(),
                })?;
            debug!(entry = %args.path, path = %located.display(), "Entry located as module");
            located
        };
        Ok(OnResolveResult {
            path,
            namespace: FILE_NAMESPACE.to_string(),
            external: false,
        })
    }

    fn default_load(&self, args: &OnLoadArgs) -> Result<OnLoadResult> {
        let is_css = args.path.extension().is_some_and(|ext| ext == "css");
        if args.namespace != FILE_NAMESPACE || !is_css {
            return Err(PluginError::NoLoader {
                path: args.path.clone(),
            });
        }
        let css = self
            .runtime
            .file_read_string(&args.path)
            .map_err(|source| PluginError::Read {
                path: args.path.clone(),
                source,
            })?;
        Ok(OnLoadResult::css(css))
    }

    fn emit(&self, entry: &Path, outcome: EntryOutcome, result: &mut BuildResult) -> Result<()> {
        let EntryOutcome::Loaded { path, result: loaded } = outcome else {
            return Ok(());
        };

        result.watch_files.insert(path.clone());
        result.watch_files.extend(
            loaded
                .watch_files
                .iter()
                .map(|file| absolutize(file, &self.options.working_dir)),
        );
        result.warnings.extend(loaded.warnings);

        if loaded.loader == Loader::Empty {
            return Ok(());
        }

        let output_path = self.output_path(&path);
        if let Some(output_path) = &output_path {
            if let Some(parent) = output_path.parent() {
                self.runtime
                    .dir_create(parent, true)
                    .map_err(|source| PluginError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            self.runtime
                .file_write(output_path, loaded.contents.as_bytes())
                .map_err(|source| PluginError::Write {
                    path: output_path.clone(),
                    source,
                })?;
            info!(path = %output_path.display(), bytes = loaded.contents.len(), "Wrote output");
        }

        result.outputs.push(OutputFile {
            entry: entry.to_path_buf(),
            path: output_path,
            contents: loaded.contents,
        });
        Ok(())
    }

    fn output_path(&self, source: &Path) -> Option<PathBuf> {
        let working_dir = &self.options.working_dir;
        if let Some(outfile) = &self.options.outfile {
            return Some(absolutize(outfile, working_dir));
        }
        let outdir = self.options.outdir.as_ref()?;
        let stem = source.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".css");
        Some(absolutize(outdir, working_dir).join(name))
    }
}

impl std::fmt::Debug for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
