//! Build hook that compiles `.scss` and `.sass` files.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use stylebuild_resolve::absolutize;
use stylebuild_runtime::SystemRuntime;
use stylebuild_sass::Compiler;
use tracing::{info, warn};

use crate::config::OutputMode;
use crate::error::{PluginError, Result};
use crate::host::{
    FILE_NAMESPACE, Loader, OnLoadOptions, OnLoadResult, OnResolveOptions, OnResolveResult, Plugin,
    PluginBuild,
};
use crate::postprocess::{PostProcessed, UtilityClassProcessor};

/// Namespace sibling mode moves Sass modules into.
pub const SASS_NAMESPACE: &str = "scss";

/// Paths the inline load hook claims.
pub const SASS_LOAD_FILTER: &str = r"^.*(scss|sass)$";

const SASS_RESOLVE_FILTER: &str = r"\.(scss|sass)$";

/// Compiles Sass through a [`Compiler`] and hands the CSS to the bundler.
pub struct SassPlugin {
    compiler: Arc<dyn Compiler>,
    runtime: Arc<dyn SystemRuntime>,
    mode: OutputMode,
    post_processor: Option<Arc<UtilityClassProcessor>>,
}

impl SassPlugin {
    pub fn new(compiler: Arc<dyn Compiler>, runtime: Arc<dyn SystemRuntime>) -> Self {
        Self {
            compiler,
            runtime,
            mode: OutputMode::Inline,
            post_processor: None,
        }
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run compiled CSS through the utility-class tool when it carries the
    /// marker.
    pub fn with_post_processor(mut self, processor: Option<Arc<UtilityClassProcessor>>) -> Self {
        self.post_processor = processor;
        self
    }

    fn setup_inline(&self, build: &mut PluginBuild) -> Result<()> {
        let compiler = self.compiler.clone();
        let post = self.post_processor.clone();
        build.on_load(OnLoadOptions::new(SASS_LOAD_FILTER)?, move |args| {
            compile_to_css(compiler.as_ref(), post.as_deref(), &args.path).map(Some)
        });
        Ok(())
    }

    fn setup_sibling(&self, build: &mut PluginBuild) -> Result<()> {
        let generated: Arc<Mutex<HashSet<PathBuf>>> = Arc::default();

        build.on_resolve(OnResolveOptions::new(SASS_RESOLVE_FILTER)?, |args| {
            Ok(Some(OnResolveResult {
                path: absolutize(Path::new(&args.path), &args.resolve_dir),
                namespace: SASS_NAMESPACE.to_string(),
                external: false,
            }))
        });

        let seen = generated.clone();
        build.on_resolve(
            OnResolveOptions::new(r"\.css$")?.with_namespace(FILE_NAMESPACE),
            move |args| {
                let path = absolutize(Path::new(&args.path), &args.resolve_dir);
                let is_generated = seen.lock().is_ok_and(|set| set.contains(&path));
                Ok(is_generated.then(|| OnResolveResult {
                    path,
                    namespace: FILE_NAMESPACE.to_string(),
                    external: true,
                }))
            },
        );

        let compiler = self.compiler.clone();
        let post = self.post_processor.clone();
        let runtime = self.runtime.clone();
        build.on_load(
            OnLoadOptions::new(".*")?.with_namespace(SASS_NAMESPACE),
            move |args| {
                let mut result = compile_to_css(compiler.as_ref(), post.as_deref(), &args.path)?;
                let output = sibling_output_path(&args.path);
                runtime
                    .file_write(&output, result.contents.as_bytes())
                    .map_err(|source| PluginError::Write {
                        path: output.clone(),
                        source,
                    })?;
                info!(path = %output.display(), bytes = result.contents.len(), "Wrote CSS");
                match generated.lock() {
                    Ok(mut set) => {
                        set.insert(output);
                    }
                    Err(_) => warn!("Generated-file table is poisoned"),
                }
                result.contents.clear();
                result.loader = Loader::Empty;
                Ok(Some(result))
            },
        );
        Ok(())
    }
}

impl Plugin for SassPlugin {
    fn name(&self) -> &str {
        "sass"
    }

    fn setup(&self, build: &mut PluginBuild) -> Result<()> {
        match self.mode {
            OutputMode::Inline => self.setup_inline(build),
            OutputMode::Sibling => self.setup_sibling(build),
        }
    }
}

impl std::fmt::Debug for SassPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SassPlugin")
            .field("mode", &self.mode)
            .field("post_processor", &self.post_processor)
            .finish_non_exhaustive()
    }
}

/// `<dir>/<stem>.css` for a Sass source.
pub fn sibling_output_path(source: &Path) -> PathBuf {
    source.with_extension("css")
}

fn compile_to_css(
    compiler: &dyn Compiler,
    post: Option<&UtilityClassProcessor>,
    path: &Path,
) -> Result<OnLoadResult> {
    let compiled = compiler
        .compile(path)
        .map_err(|source| PluginError::Compile {
            path: path.to_path_buf(),
            source,
        })?;

    let mut css = compiled.css;
    let mut watch_files = compiled.includes.into_vec();
    if let Some(post) = post {
        if let PostProcessed::Rewritten {
            css: rewritten,
            watch_files: extra,
        } = post.process_source(&css, path)?
        {
            css = rewritten;
            watch_files.extend(extra);
        }
    }

    Ok(OnLoadResult {
        watch_files,
        warnings: compiled.warnings,
        ..OnLoadResult::css(css)
    })
}
