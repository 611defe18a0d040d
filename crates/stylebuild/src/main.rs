//! stylebuild CLI - Main entry point
//!
//! Copyright (c) 2026 stylebuild contributors

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use stylebuild::cli::{Cli, Preprocessed, preprocess_args};
use stylebuild::stdin::spawn_stdin_drain;
use stylebuild::watch::{self, WatchConfig};
use stylebuild::{
    BuildOptions, BuildResult, Bundler, Config, Plugin, SassPlugin, UtilityClassPlugin,
    UtilityClassProcessor, cli_version,
};
use stylebuild_resolve::{ModuleLocator, NodeModulesLocator};
use stylebuild_runtime::{NativeRuntime, SystemRuntime};
use stylebuild_sass::{Compiler, DartSassBackend, StylesheetCompiler};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode> {
    let (args, watch) = match preprocess_args(std::env::args().skip(1)) {
        Preprocessed::Version => {
            println!("{}", cli_version());
            return Ok(ExitCode::SUCCESS);
        }
        Preprocessed::Run { args, watch } => (args, watch),
    };
    let cli = Cli::parse_from(std::iter::once("stylebuild".to_string()).chain(args));

    init_tracing(cli.log_level.as_deref());

    if watch {
        spawn_stdin_drain().context("failed to start stdin reader")?;
    }

    run(&cli)
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) if level.contains('=') => level.into(),
        Some(level) => tracing_subscriber::EnvFilter::new(format!("stylebuild={level}")),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "stylebuild=info".into()),
    };

    // Logs go to stderr; stdout carries CSS when no output path is given.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let runtime: Arc<dyn SystemRuntime> = Arc::new(NativeRuntime::new());
    let working_dir = runtime
        .cwd()
        .context("failed to determine the working directory")?;

    let mut config = Config::load(runtime.as_ref(), &working_dir, cli.config.as_deref())?;
    cli.apply(&mut config);

    let locator: Arc<dyn ModuleLocator> = Arc::new(NodeModulesLocator::new(runtime.clone()));
    let plugins = build_plugins(cli, &config, &working_dir, &runtime, &locator)?;

    let options = BuildOptions {
        entry_points: cli.entry_points.clone(),
        outfile: cli.outfile.clone(),
        outdir: cli.outdir.clone(),
        working_dir,
    };
    let bundler = Bundler::new(options, runtime, locator, &plugins)?;

    if cli.watch {
        let watch_config = WatchConfig {
            debounce_ms: config.watch.debounce_ms,
        };
        watch::run(&bundler, &watch_config, |result| {
            if let Err(e) = report(result) {
                error!(error = %e, "Failed to write output");
            }
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    let result = bundler.build();
    report(&result)?;
    if result.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn build_plugins(
    cli: &Cli,
    config: &Config,
    working_dir: &Path,
    runtime: &Arc<dyn SystemRuntime>,
    locator: &Arc<dyn ModuleLocator>,
) -> Result<Vec<Box<dyn Plugin>>> {
    let post_processor = config
        .tailwind
        .enabled
        .then(|| Arc::new(UtilityClassProcessor::from_config(runtime.clone(), &config.tailwind)));

    let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
    match DartSassBackend::discover(runtime.as_ref(), config.sass.as_deref()) {
        Ok(backend) => {
            let compiler: Arc<dyn Compiler> = Arc::new(
                StylesheetCompiler::new(
                    backend,
                    runtime.clone(),
                    locator.clone(),
                    config.module_root(working_dir),
                )
                .with_options(config.compile_options(working_dir)),
            );
            plugins.push(Box::new(
                SassPlugin::new(compiler, runtime.clone())
                    .with_mode(config.mode)
                    .with_post_processor(post_processor.clone()),
            ));
        }
        Err(e) if cli.entry_points.iter().any(|entry| is_sass_path(entry)) => {
            bail!("cannot compile Sass entry points: {e}");
        }
        Err(e) => warn!("Sass compilation unavailable: {e}"),
    }

    if let Some(processor) = post_processor {
        plugins.push(Box::new(UtilityClassPlugin::new(processor)));
    }
    Ok(plugins)
}

fn is_sass_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "scss" || ext == "sass")
}

fn report(result: &BuildResult) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for output in result.outputs.iter().filter(|output| output.path.is_none()) {
        stdout.write_all(output.contents.as_bytes())?;
        if !output.contents.ends_with('\n') {
            writeln!(stdout)?;
        }
    }
    stdout.flush()?;

    for entry_error in &result.errors {
        error!(
            entry = %entry_error.entry.display(),
            "{}",
            entry_error.error.diagnostic()
        );
    }
    if result.succeeded() {
        info!(outputs = result.outputs.len(), "Build succeeded");
    }
    Ok(())
}
