//! Sass compilation for stylebuild.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Drives Dart Sass through its embedded protocol (length-delimited protobuf
//! over the child's stdio) so that every `@use`/`@import` the compiler meets
//! is resolved by [`stylebuild_resolve`] rather than by the compiler's own
//! filesystem logic.
//!
//! This crate provides:
//! - [`StylesheetCompiler`]: one compile per call, session torn down after
//! - [`CompilerBackend`] / [`CompilerSession`]: the session seam
//! - [`Session`] / [`EmbeddedCompiler`]: the protocol loop and process guard
//! - [`ResolvingImporter`]: the resolver/loader capability
//! - [`find_dart_sass`]: executable discovery

mod codec;
mod compile;
mod discover;
mod error;
mod importer;
pub mod protocol;
mod session;
mod syntax;
mod transport;

pub use codec::{read_packet, write_packet};
pub use compile::{
    CompileOptions, CompiledStylesheet, Compiler, CompilerBackend, CompilerSession,
    DartSassBackend, RESOLVER_IMPORTER_ID, SessionResult, StylesheetCompiler,
};
pub use discover::{DART_SASS_ENV, bundled_dirs, find_dart_sass};
pub use error::SassError;
pub use importer::{ImportedStylesheet, Importer, ResolvingImporter};
pub use protocol::{OutputStyle, Syntax};
pub use session::{CompilerVersion, EmbeddedCompiler, Session};
pub use syntax::syntax_for_path;
pub use transport::{PacketTransport, Transport};
