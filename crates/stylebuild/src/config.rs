//! `stylebuild.json` configuration.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Every field is optional. Command-line flags are applied on top of the
//! loaded values (see [`crate::cli::Cli::apply`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stylebuild_resolve::absolutize;
use stylebuild_runtime::SystemRuntime;
use stylebuild_sass::{CompileOptions, OutputStyle};
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::postprocess::{DEFAULT_COMMAND, DEFAULT_CONFIG_FILE, DEFAULT_MARKER};

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "stylebuild.json";

const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Where compiled Sass goes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Hand the CSS to the bundler as the module's contents
    #[default]
    Inline,
    /// Write `<stem>.css` beside the source and hand the bundler nothing
    Sibling,
}

/// CSS output style.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Compressed,
    Expanded,
}

impl From<Style> for OutputStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Compressed => OutputStyle::Compressed,
            Style::Expanded => OutputStyle::Expanded,
        }
    }
}

/// Utility-class post-processor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TailwindConfig {
    pub enabled: bool,
    /// Substring that makes a stylesheet eligible
    pub marker: String,
    pub command: String,
    /// Reported as a watch file after every rewrite
    pub config_file: PathBuf,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker: DEFAULT_MARKER.to_string(),
            command: DEFAULT_COMMAND.to_string(),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WatchSettings {
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub mode: OutputMode,
    pub style: Style,
    pub source_map: bool,
    /// Explicit Dart Sass executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sass: Option<PathBuf>,
    /// Root for package lookups, relative to the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_paths: Vec<PathBuf>,
    pub tailwind: TailwindConfig,
    pub watch: WatchSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            style: Style::default(),
            source_map: true,
            sass: None,
            module_root: None,
            load_paths: Vec::new(),
            tailwind: TailwindConfig::default(),
            watch: WatchSettings::default(),
        }
    }
}

impl Config {
    /// Parse configuration text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PluginError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `explicit` if given (it must exist), otherwise
    /// `<working_dir>/stylebuild.json` when present, otherwise defaults.
    pub fn load(
        runtime: &dyn SystemRuntime,
        working_dir: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self> {
        let path = match explicit {
            Some(path) => absolutize(path, working_dir),
            None => {
                let path = working_dir.join(CONFIG_FILE_NAME);
                if !runtime.is_file(&path).unwrap_or(false) {
                    debug!("No {CONFIG_FILE_NAME}, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        let text = runtime
            .file_read_string(&path)
            .map_err(|source| PluginError::Read {
                path: path.clone(),
                source,
            })?;
        let config = Self::parse(&text, &path)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Module root resolved against the working directory.
    pub fn module_root(&self, working_dir: &Path) -> PathBuf {
        match &self.module_root {
            Some(root) => absolutize(root, working_dir),
            None => working_dir.to_path_buf(),
        }
    }

    pub fn compile_options(&self, working_dir: &Path) -> CompileOptions {
        CompileOptions {
            style: self.style.into(),
            source_map: self.source_map,
            load_paths: self
                .load_paths
                .iter()
                .map(|dir| absolutize(dir, working_dir))
                .collect(),
        }
    }
}
