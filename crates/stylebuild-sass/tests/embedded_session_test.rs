//! End-to-end compiles against an in-process compiler.
//!
//! The fake compiler runs on its own thread and speaks the real packet format
//! over byte channels. It understands just enough of the language to exercise
//! the host: `@import`/`@use` lines are canonicalized (URL joined onto the
//! containing stylesheet first, then the raw specifier) and loaded
//! recursively, `@warn` becomes a log event, `@error` fails the compile, and
//! every other non-empty line is copied to the output.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use stylebuild_resolve::{ModuleLocator, NodeModulesLocator};
use stylebuild_runtime::{NativeRuntime, SystemRuntime};
use stylebuild_sass::protocol::inbound_message::{self, CompileRequest, compile_request};
use stylebuild_sass::protocol::outbound_message::{
    self, CanonicalizeRequest, CompileResponse, ImportRequest, LogEvent, VersionResponse,
    compile_response,
};
use stylebuild_sass::protocol::{InboundMessage, LogEventType, OutboundMessage};
use stylebuild_sass::{
    CompilerBackend, CompilerSession, Importer, PacketTransport, SassError, Session,
    SessionResult, StylesheetCompiler, read_packet, write_packet,
};
use url::Url;

// -- byte channels --------------------------------------------------------

struct ChannelWriter(mpsc::Sender<Vec<u8>>);

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .send(buf.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending.extend(chunk),
                // Sender dropped: end of stream.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

fn channel() -> (ChannelWriter, ChannelReader) {
    let (tx, rx) = mpsc::channel();
    (
        ChannelWriter(tx),
        ChannelReader {
            rx,
            pending: VecDeque::new(),
        },
    )
}

// -- fake compiler --------------------------------------------------------

struct FakeCompiler {
    reader: ChannelReader,
    writer: ChannelWriter,
    next_request_id: u32,
}

impl FakeCompiler {
    fn serve(mut self) {
        while let Ok(Some((compilation_id, inbound))) =
            read_packet::<_, InboundMessage>(&mut self.reader)
        {
            match inbound.message {
                Some(inbound_message::Message::VersionRequest(request)) => {
                    let version = VersionResponse {
                        id: request.id,
                        protocol_version: "3.1.0".to_string(),
                        compiler_version: "0.0.0".to_string(),
                        implementation_version: "0.0.0".to_string(),
                        implementation_name: "fake-sass".to_string(),
                    };
                    if !self.send(0, outbound_message::Message::VersionResponse(version)) {
                        return;
                    }
                }
                Some(inbound_message::Message::CompileRequest(request)) => {
                    let response = self.compile(compilation_id, request);
                    if !self.send(
                        compilation_id,
                        outbound_message::Message::CompileResponse(response),
                    ) {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn send(&mut self, compilation_id: u32, message: outbound_message::Message) -> bool {
        let message = OutboundMessage {
            message: Some(message),
        };
        write_packet(&mut self.writer, compilation_id, &message).is_ok()
    }

    fn receive_reply(&mut self) -> Result<inbound_message::Message, String> {
        match read_packet::<_, InboundMessage>(&mut self.reader) {
            Ok(Some((_, InboundMessage { message: Some(m) }))) => Ok(m),
            _ => Err("host went away".to_string()),
        }
    }

    fn compile(&mut self, compilation_id: u32, request: CompileRequest) -> CompileResponse {
        let Some(compile_request::Input::String(input)) = request.input else {
            return failure("only string input is supported".to_string(), vec![]);
        };
        let importer_id = match input.importer.and_then(|i| i.importer) {
            Some(compile_request::importer::Importer::ImporterId(id)) => id,
            _ => return failure("entry has no custom importer".to_string(), vec![]),
        };

        let mut loaded = vec![input.url.clone()];
        match self.render(compilation_id, importer_id, &input.source, &input.url, &mut loaded) {
            Ok(css) => CompileResponse {
                loaded_urls: loaded,
                result: Some(compile_response::Result::Success(
                    compile_response::CompileSuccess {
                        css,
                        source_map: "{\"version\":3}".to_string(),
                    },
                )),
            },
            Err(message) => failure(message, loaded),
        }
    }

    fn render(
        &mut self,
        compilation_id: u32,
        importer_id: u32,
        source: &str,
        base_url: &str,
        loaded: &mut Vec<String>,
    ) -> Result<String, String> {
        let mut css = String::new();
        for line in source.lines().map(str::trim) {
            if let Some(specifier) = import_target(line) {
                let canonical = self
                    .canonicalize(compilation_id, importer_id, specifier, base_url)?
                    .ok_or_else(|| format!("Can't find stylesheet to import: {specifier}"))?;
                if loaded.contains(&canonical) {
                    continue;
                }
                loaded.push(canonical.clone());
                let contents = self.import(compilation_id, importer_id, &canonical)?;
                css.push_str(&self.render(
                    compilation_id,
                    importer_id,
                    &contents,
                    &canonical,
                    loaded,
                )?);
            } else if let Some(message) = directive(line, "@warn") {
                let event = LogEvent {
                    r#type: LogEventType::Warning as i32,
                    message: message.to_string(),
                    formatted: format!("WARNING: {message}"),
                    ..Default::default()
                };
                self.send(compilation_id, outbound_message::Message::LogEvent(event));
            } else if let Some(message) = directive(line, "@error") {
                return Err(message.to_string());
            } else if !line.is_empty() {
                css.push_str(line);
            }
        }
        Ok(css)
    }

    fn canonicalize(
        &mut self,
        compilation_id: u32,
        importer_id: u32,
        specifier: &str,
        base_url: &str,
    ) -> Result<Option<String>, String> {
        if let Ok(joined) = Url::parse(base_url).and_then(|base| base.join(specifier)) {
            let found = self.canonicalize_request(compilation_id, importer_id, joined.as_str(), None)?;
            if found.is_some() {
                return Ok(found);
            }
        }
        self.canonicalize_request(compilation_id, importer_id, specifier, Some(base_url))
    }

    fn canonicalize_request(
        &mut self,
        compilation_id: u32,
        importer_id: u32,
        url: &str,
        containing_url: Option<&str>,
    ) -> Result<Option<String>, String> {
        self.next_request_id += 1;
        let id = self.next_request_id;
        let request = CanonicalizeRequest {
            id,
            importer_id,
            url: url.to_string(),
            from_import: true,
            containing_url: containing_url.map(str::to_string),
        };
        self.send(
            compilation_id,
            outbound_message::Message::CanonicalizeRequest(request),
        );
        match self.receive_reply()? {
            inbound_message::Message::CanonicalizeResponse(response) if response.id == id => {
                match response.result {
                    Some(inbound_message::canonicalize_response::Result::Url(url)) => Ok(Some(url)),
                    Some(inbound_message::canonicalize_response::Result::Error(e)) => Err(e),
                    None => Ok(None),
                }
            }
            other => Err(format!("unexpected reply: {other:?}")),
        }
    }

    fn import(
        &mut self,
        compilation_id: u32,
        importer_id: u32,
        url: &str,
    ) -> Result<String, String> {
        self.next_request_id += 1;
        let id = self.next_request_id;
        let request = ImportRequest {
            id,
            importer_id,
            url: url.to_string(),
        };
        self.send(compilation_id, outbound_message::Message::ImportRequest(request));
        match self.receive_reply()? {
            inbound_message::Message::ImportResponse(response) if response.id == id => {
                match response.result {
                    Some(inbound_message::import_response::Result::Success(success)) => {
                        Ok(success.contents)
                    }
                    Some(inbound_message::import_response::Result::Error(e)) => Err(e),
                    None => Err("empty import response".to_string()),
                }
            }
            other => Err(format!("unexpected reply: {other:?}")),
        }
    }
}

fn import_target(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("@import ")
        .or_else(|| line.strip_prefix("@use "))?;
    let rest = rest.trim().trim_end_matches(';');
    Some(rest.trim_matches(|c| c == '"' || c == '\''))
}

fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.trim().trim_end_matches(';');
    Some(rest.trim_matches('"'))
}

fn failure(message: String, loaded_urls: Vec<String>) -> CompileResponse {
    CompileResponse {
        loaded_urls,
        result: Some(compile_response::Result::Failure(
            compile_response::CompileFailure {
                formatted: format!("Error: {message}"),
                message,
                ..Default::default()
            },
        )),
    }
}

// -- backend --------------------------------------------------------------

#[derive(Default, Clone)]
struct FakeBackend {
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

struct FakeSession {
    session: Option<Session<PacketTransport<ChannelReader, ChannelWriter>>>,
    handle: Option<JoinHandle<()>>,
    stopped: Arc<AtomicUsize>,
}

impl CompilerBackend for FakeBackend {
    type Session = FakeSession;

    fn start(&self) -> Result<FakeSession, SassError> {
        let (host_writer, compiler_reader) = channel();
        let (compiler_writer, host_reader) = channel();
        let handle = thread::spawn(move || {
            FakeCompiler {
                reader: compiler_reader,
                writer: compiler_writer,
                next_request_id: 0,
            }
            .serve()
        });

        let mut session = Session::new(PacketTransport::new(host_reader, host_writer));
        let version = session.handshake()?;
        assert_eq!(version.implementation_name, "fake-sass");
        self.started.fetch_add(1, Ordering::SeqCst);

        Ok(FakeSession {
            session: Some(session),
            handle: Some(handle),
            stopped: self.stopped.clone(),
        })
    }
}

impl CompilerSession for FakeSession {
    fn compile(
        &mut self,
        request: CompileRequest,
        importer: &mut dyn Importer,
    ) -> Result<SessionResult, SassError> {
        self.session
            .as_mut()
            .expect("session is open until drop")
            .run(request, importer)
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        // Closing the host side ends the compiler thread's read loop.
        drop(self.session.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

// -- fixtures -------------------------------------------------------------

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn compiler(root: &Path, backend: FakeBackend) -> StylesheetCompiler<FakeBackend> {
    let runtime: Arc<dyn SystemRuntime> = Arc::new(NativeRuntime::new());
    let locator: Arc<dyn ModuleLocator> = Arc::new(NodeModulesLocator::new(runtime.clone()));
    StylesheetCompiler::new(backend, runtime, locator, root.to_path_buf())
}

// -- tests ----------------------------------------------------------------

#[test]
fn test_partial_importing_package_file() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let entry = root.join("src/main.scss");
    let partial = root.join("src/partials/_button.scss");
    let package_file = root.join("node_modules/theme/_colors.scss");
    write(&entry, "@import \"partials/button\";\n.main { color: red; }\n");
    write(&partial, "@import \"theme/colors\";\n.btn { color: blue; }\n");
    write(&package_file, ".theme { color: green; }\n");

    let backend = FakeBackend::default();
    let compiled = compiler(root, backend.clone()).compile(&entry).unwrap();

    assert!(compiled.css.contains(".theme { color: green; }"));
    assert!(compiled.css.contains(".btn { color: blue; }"));
    assert!(compiled.css.contains(".main { color: red; }"));

    let mut includes = compiled.includes.into_vec();
    includes.sort();
    let mut expected = vec![partial, package_file];
    expected.sort();
    assert_eq!(includes, expected);

    assert_eq!(compiled.source_map.as_deref(), Some("{\"version\":3}"));
    assert_eq!(compiled.loaded_urls.len(), 3);
    assert_eq!(backend.started.load(Ordering::SeqCst), 1);
    assert_eq!(backend.stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_partial_recorded_once() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let entry = root.join("main.scss");
    write(&entry, "@use 'a';\n@use 'b';\n");
    write(&root.join("_a.scss"), "@use 'shared';\n.a{}\n");
    write(&root.join("_b.scss"), "@use 'shared';\n.b{}\n");
    write(&root.join("_shared.scss"), ".shared{}\n");

    let compiled = compiler(root, FakeBackend::default())
        .compile(&entry)
        .unwrap();

    assert_eq!(compiled.css, ".shared{}.a{}.b{}");
    assert_eq!(compiled.includes.len(), 3);
    assert!(compiled.includes.contains(&root.join("_shared.scss")));
}

#[test]
fn test_missing_import_is_compilation_error() {
    let temp = tempfile::tempdir().unwrap();
    let entry = temp.path().join("main.scss");
    write(&entry, "@import 'nope';\n");

    let backend = FakeBackend::default();
    let err = compiler(temp.path(), backend.clone())
        .compile(&entry)
        .unwrap_err();

    match &err {
        SassError::Compilation { message, formatted } => {
            assert!(message.contains("nope"));
            assert_eq!(formatted.as_deref(), Some("Error: Can't find stylesheet to import: nope"));
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
    // The session is torn down on the error path too.
    assert_eq!(backend.stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_directive_fails_compile() {
    let temp = tempfile::tempdir().unwrap();
    let entry = temp.path().join("main.scss");
    write(&entry, ".a{}\n@error \"unsupported theme\";\n");

    let err = compiler(temp.path(), FakeBackend::default())
        .compile(&entry)
        .unwrap_err();
    assert!(err.diagnostic().contains("unsupported theme"));
}

#[test]
fn test_warnings_are_collected() {
    let temp = tempfile::tempdir().unwrap();
    let entry = temp.path().join("main.scss");
    write(&entry, "@warn \"old mixin\";\n.a{}\n");

    let compiled = compiler(temp.path(), FakeBackend::default())
        .compile(&entry)
        .unwrap();
    assert_eq!(compiled.css, ".a{}");
    assert_eq!(compiled.warnings, vec!["WARNING: old mixin".to_string()]);
    assert!(compiled.includes.is_empty());
}

#[test]
fn test_unreadable_entry_never_starts_session() {
    let temp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();

    let err = compiler(temp.path(), backend.clone())
        .compile(Path::new("missing.scss"))
        .unwrap_err();

    assert!(matches!(err, SassError::Io { .. }));
    assert!(err.to_string().contains("missing.scss"));
    assert_eq!(backend.started.load(Ordering::SeqCst), 0);
}

#[test]
fn test_each_compile_gets_fresh_session_and_includes() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    let first = root.join("first.scss");
    let second = root.join("second.scss");
    write(&first, "@import 'vars';\n");
    write(&second, ".plain{}\n");
    write(&root.join("_vars.scss"), ".vars{}\n");

    let backend = FakeBackend::default();
    let compiler = compiler(root, backend.clone());
    assert_eq!(compiler.compile(&first).unwrap().includes.len(), 1);
    assert!(compiler.compile(&second).unwrap().includes.is_empty());
    assert_eq!(backend.started.load(Ordering::SeqCst), 2);
    assert_eq!(backend.stopped.load(Ordering::SeqCst), 2);
}
