//! Compile one stylesheet with the resolution engine as its importer.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! # Architecture
//!
//! 1. Read the entry file and pick its dialect by extension
//! 2. Start a compiler session ([`CompilerBackend::start`])
//! 3. Send a string-input compile request whose importer is the
//!    [`ResolvingImporter`], with the entry directory as a load path
//! 4. Answer canonicalize/import callbacks until the compiler responds
//! 5. Drop the session (the guard stops the compiler on every exit path)
//!
//! The backend is a trait so the orchestration runs unchanged against the
//! real Dart Sass process or an in-process session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stylebuild_resolve::{
    CanonicalReference, ImportResolver, IncludeSet, ModuleLocator, absolutize,
};
use stylebuild_runtime::SystemRuntime;
use tracing::{debug, info};

use crate::discover::find_dart_sass;
use crate::error::SassError;
use crate::importer::{Importer, ResolvingImporter};
use crate::protocol::OutputStyle;
use crate::protocol::inbound_message::CompileRequest;
use crate::protocol::inbound_message::compile_request::{self, importer as importer_kind};
use crate::protocol::outbound_message::{CompileResponse, compile_response};
use crate::session::EmbeddedCompiler;
use crate::syntax::syntax_for_path;

/// Importer id the compile request registers the resolver under.
pub const RESOLVER_IMPORTER_ID: u32 = 1;

/// What a session hands back for one compile.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub response: CompileResponse,
    /// Warning and deprecation messages, formatted when the compiler
    /// provided a rendering
    pub warnings: Vec<String>,
}

/// A live compiler that can run compiles.
pub trait CompilerSession {
    fn compile(
        &mut self,
        request: CompileRequest,
        importer: &mut dyn Importer,
    ) -> Result<SessionResult, SassError>;
}

/// Starts compiler sessions. The returned session is torn down when dropped.
pub trait CompilerBackend: Send + Sync {
    type Session: CompilerSession;

    fn start(&self) -> Result<Self::Session, SassError>;
}

/// Backend that runs a Dart Sass executable in embedded mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DartSassBackend {
    binary: PathBuf,
}

impl DartSassBackend {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Locate the executable (see [`find_dart_sass`]).
    pub fn discover(
        runtime: &dyn SystemRuntime,
        configured: Option<&Path>,
    ) -> Result<Self, SassError> {
        let binary = find_dart_sass(runtime, configured)?;
        info!(path = %binary.display(), "Using Dart Sass");
        Ok(Self::new(binary))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl CompilerBackend for DartSassBackend {
    type Session = EmbeddedCompiler;

    fn start(&self) -> Result<EmbeddedCompiler, SassError> {
        EmbeddedCompiler::start(&self.binary)
    }
}

/// Output and source-map settings for a compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub style: OutputStyle,
    pub source_map: bool,
    /// Extra load paths searched after the resolver and the entry directory
    pub load_paths: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            style: OutputStyle::Compressed,
            source_map: true,
            load_paths: Vec::new(),
        }
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStylesheet {
    pub css: String,
    /// Source map JSON, when requested
    pub source_map: Option<String>,
    /// Files the resolver chose during this compile
    pub includes: IncludeSet,
    /// Every URL the compiler loaded, as reported by the compiler
    pub loaded_urls: Vec<String>,
    pub warnings: Vec<String>,
}

/// Something that turns a stylesheet path into CSS.
pub trait Compiler: Send + Sync {
    fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, SassError>;
}

/// Orchestrates one compile per call: fresh session, fresh include set.
pub struct StylesheetCompiler<B> {
    backend: B,
    runtime: Arc<dyn SystemRuntime>,
    locator: Arc<dyn ModuleLocator>,
    module_root: PathBuf,
    options: CompileOptions,
}

impl<B: CompilerBackend> StylesheetCompiler<B> {
    /// `module_root` anchors module lookups and relative entry paths.
    pub fn new(
        backend: B,
        runtime: Arc<dyn SystemRuntime>,
        locator: Arc<dyn ModuleLocator>,
        module_root: PathBuf,
    ) -> Self {
        Self {
            backend,
            runtime,
            locator,
            module_root,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compile `entry` to CSS.
    ///
    /// # Errors
    ///
    /// - [`SassError::Io`] when the entry cannot be read
    /// - [`SassError::BinaryNotFound`] / [`SassError::Start`] when no session
    ///   can be started
    /// - [`SassError::Compilation`] for errors in the stylesheet
    /// - [`SassError::Protocol`] / [`SassError::Transport`] when the session
    ///   breaks
    pub fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, SassError> {
        let entry = absolutize(entry, &self.module_root);
        let source = self
            .runtime
            .file_read_string(&entry)
            .map_err(|source| SassError::Io {
                path: entry.clone(),
                source,
            })?;
        let entry_dir = entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.module_root.clone());
        let request = self.build_request(&entry, &entry_dir, source);

        debug!(entry = %entry.display(), "Compiling stylesheet");
        let mut session = self.backend.start()?;

        let resolver = ImportResolver::new(
            self.locator.as_ref(),
            self.runtime.as_ref(),
            self.module_root.clone(),
        );
        let mut importer = ResolvingImporter::new(resolver, self.runtime.as_ref(), entry_dir);
        let SessionResult { response, warnings } = session.compile(request, &mut importer)?;
        drop(session);

        match response.result {
            Some(compile_response::Result::Success(success)) => {
                let includes = importer.into_includes();
                debug!(
                    entry = %entry.display(),
                    bytes = success.css.len(),
                    includes = includes.len(),
                    "Compiled stylesheet"
                );
                Ok(CompiledStylesheet {
                    css: success.css,
                    source_map: Some(success.source_map).filter(|map| !map.is_empty()),
                    includes,
                    loaded_urls: response.loaded_urls,
                    warnings,
                })
            }
            Some(compile_response::Result::Failure(failure)) => Err(SassError::Compilation {
                message: failure.message,
                formatted: Some(failure.formatted).filter(|text| !text.is_empty()),
            }),
            None => Err(SassError::Protocol(
                "compile response carried no result".to_string(),
            )),
        }
    }

    fn build_request(&self, entry: &Path, entry_dir: &Path, source: String) -> CompileRequest {
        let resolver_importer = compile_request::Importer {
            importer: Some(importer_kind::Importer::ImporterId(RESOLVER_IMPORTER_ID)),
            ..Default::default()
        };
        let load_path = |dir: &Path| compile_request::Importer {
            importer: Some(importer_kind::Importer::Path(dir.to_string_lossy().into_owned())),
            ..Default::default()
        };

        let mut importers = vec![resolver_importer.clone(), load_path(entry_dir)];
        importers.extend(
            self.options
                .load_paths
                .iter()
                .map(|dir| load_path(&absolutize(dir, &self.module_root))),
        );

        CompileRequest {
            input: Some(compile_request::Input::String(compile_request::StringInput {
                source,
                url: CanonicalReference::new(entry.to_path_buf()).to_url(),
                syntax: syntax_for_path(entry) as i32,
                importer: Some(resolver_importer),
            })),
            style: self.options.style as i32,
            source_map: self.options.source_map,
            importers,
            ..Default::default()
        }
    }
}

impl<B: CompilerBackend> Compiler for StylesheetCompiler<B> {
    fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, SassError> {
        StylesheetCompiler::compile(self, entry)
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for StylesheetCompiler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylesheetCompiler")
            .field("backend", &self.backend)
            .field("module_root", &self.module_root)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
