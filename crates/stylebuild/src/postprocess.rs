//! Utility-class post-processing.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Stylesheets that mention the marker (`tailwind` by default) are run
//! through the utility-class CLI, which expands directives such as
//! `@tailwind utilities` into plain CSS:
//!
//! ```text
//! tailwindcss -i <input> -o <output> --minify
//! ```
//!
//! Everything else passes through untouched.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stylebuild_runtime::SystemRuntime;
use tracing::{debug, info};

use crate::config::TailwindConfig;
use crate::error::{PluginError, Result};
use crate::host::{FILE_NAMESPACE, OnLoadOptions, OnLoadResult, Plugin, PluginBuild};

pub const DEFAULT_MARKER: &str = "tailwind";
pub const DEFAULT_COMMAND: &str = "tailwindcss";
pub const DEFAULT_CONFIG_FILE: &str = "tailwind.config.js";

/// Outcome of [`UtilityClassProcessor::process_file`] and
/// [`UtilityClassProcessor::process_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessed {
    /// No marker; use the input as it was
    Unchanged,
    Rewritten {
        css: String,
        watch_files: Vec<PathBuf>,
    },
}

/// Runs the utility-class tool on marked stylesheets.
pub struct UtilityClassProcessor {
    runtime: Arc<dyn SystemRuntime>,
    marker: String,
    command: String,
    config_file: PathBuf,
}

impl UtilityClassProcessor {
    pub fn new(runtime: Arc<dyn SystemRuntime>) -> Self {
        Self::from_config(runtime, &TailwindConfig::default())
    }

    pub fn from_config(runtime: Arc<dyn SystemRuntime>, config: &TailwindConfig) -> Self {
        Self {
            runtime,
            marker: config.marker.clone(),
            command: config.command.clone(),
            config_file: config.config_file.clone(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_marked(&self, css: &str) -> bool {
        css.contains(&self.marker)
    }

    /// Process a CSS file already on disk; `css` is its contents.
    pub fn process_file(&self, path: &Path, css: &str) -> Result<PostProcessed> {
        if !self.is_marked(css) {
            return Ok(PostProcessed::Unchanged);
        }
        self.run(path, path)
    }

    /// Process CSS that only exists in memory, such as compiler output.
    /// `origin` names it in diagnostics.
    pub fn process_source(&self, css: &str, origin: &Path) -> Result<PostProcessed> {
        if !self.is_marked(css) {
            return Ok(PostProcessed::Unchanged);
        }
        let mut input = tempfile::Builder::new()
            .prefix("stylebuild-input-")
            .suffix(".css")
            .tempfile()?;
        input.write_all(css.as_bytes())?;
        input.flush()?;
        self.run(input.path(), origin)
    }

    fn run(&self, input: &Path, origin: &Path) -> Result<PostProcessed> {
        // Removed when dropped, on every path out of this function.
        let output = tempfile::Builder::new()
            .prefix("stylebuild-output-")
            .suffix(".css")
            .tempfile()?;
        let input_arg = input.to_string_lossy();
        let output_arg = output.path().to_string_lossy();

        debug!(command = %self.command, input = %origin.display(), "Running utility-class tool");
        let result = self
            .runtime
            .exec_command(
                &self.command,
                &["-i", &input_arg, "-o", &output_arg, "--minify"],
                None,
            )
            .map_err(|source| PluginError::Command {
                command: self.command.clone(),
                source,
            })?;

        if !result.success() {
            return Err(PluginError::PostProcess {
                command: self.command.clone(),
                path: origin.to_path_buf(),
                code: result.code,
                output: result.combined_string(),
            });
        }

        let css = self
            .runtime
            .file_read_string(output.path())
            .map_err(|source| PluginError::Read {
                path: output.path().to_path_buf(),
                source,
            })?;
        info!(path = %origin.display(), bytes = css.len(), "Expanded utility classes");
        Ok(PostProcessed::Rewritten {
            css,
            watch_files: vec![self.config_file.clone()],
        })
    }
}

impl std::fmt::Debug for UtilityClassProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilityClassProcessor")
            .field("marker", &self.marker)
            .field("command", &self.command)
            .field("config_file", &self.config_file)
            .finish_non_exhaustive()
    }
}

/// Load hook for plain `.css` files.
#[derive(Debug)]
pub struct UtilityClassPlugin {
    processor: Arc<UtilityClassProcessor>,
}

impl UtilityClassPlugin {
    pub fn new(processor: Arc<UtilityClassProcessor>) -> Self {
        Self { processor }
    }
}

impl Plugin for UtilityClassPlugin {
    fn name(&self) -> &str {
        "utility-classes"
    }

    fn setup(&self, build: &mut PluginBuild) -> Result<()> {
        let processor = self.processor.clone();
        let runtime = processor.runtime.clone();
        build.on_load(
            OnLoadOptions::new(r"\.css$")?.with_namespace(FILE_NAMESPACE),
            move |args| {
                let css = runtime
                    .file_read_string(&args.path)
                    .map_err(|source| PluginError::Read {
                        path: args.path.clone(),
                        source,
                    })?;
                let result = match processor.process_file(&args.path, &css)? {
                    PostProcessed::Unchanged => OnLoadResult::css(css),
                    PostProcessed::Rewritten { css, watch_files } => OnLoadResult {
                        watch_files,
                        ..OnLoadResult::css(css)
                    },
                };
                Ok(Some(result))
            },
        );
        Ok(())
    }
}
