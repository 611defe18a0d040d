//! One compiler session: handshake, the request/callback loop, and the
//! process guard around `sass --embedded`.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::compile::{CompilerSession, SessionResult};
use crate::error::SassError;
use crate::importer::Importer;
use crate::protocol::inbound_message::{
    self, CanonicalizeResponse, CompileRequest, FileImportResponse, FunctionCallResponse,
    ImportResponse, VersionRequest, canonicalize_response, file_import_response,
    function_call_response, import_response,
};
use crate::protocol::outbound_message::{self, LogEvent, VersionResponse};
use crate::protocol::{InboundMessage, LogEventType, ProtocolError};
use crate::transport::{PacketTransport, Transport};

/// Compilation id reserved for the version handshake.
const HANDSHAKE_COMPILATION_ID: u32 = 0;

/// Request id used for the handshake's `VersionRequest`.
const VERSION_REQUEST_ID: u32 = 1;

const SHUTDOWN_POLLS: u32 = 20;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What the compiler reported about itself during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerVersion {
    pub protocol_version: String,
    pub compiler_version: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl From<VersionResponse> for CompilerVersion {
    fn from(response: VersionResponse) -> Self {
        Self {
            protocol_version: response.protocol_version,
            compiler_version: response.compiler_version,
            implementation_name: response.implementation_name,
            implementation_version: response.implementation_version,
        }
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (protocol {})",
            self.implementation_name, self.implementation_version, self.protocol_version
        )
    }
}

/// Speaks the embedded protocol over a [`Transport`].
///
/// Compiles run one at a time; callbacks are answered on the calling thread,
/// so the importer sees strictly sequential calls.
pub struct Session<T> {
    transport: T,
    next_compilation_id: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_compilation_id: 1,
        }
    }

    /// Exchange version messages. Blocks until the compiler answers.
    pub fn handshake(&mut self) -> Result<CompilerVersion, SassError> {
        let request = InboundMessage {
            message: Some(inbound_message::Message::VersionRequest(VersionRequest {
                id: VERSION_REQUEST_ID,
            })),
        };
        self.transport.send(HANDSHAKE_COMPILATION_ID, &request)?;

        let (compilation_id, response) = self.transport.receive()?;
        match response.message {
            Some(outbound_message::Message::VersionResponse(version))
                if compilation_id == HANDSHAKE_COMPILATION_ID =>
            {
                if version.id != VERSION_REQUEST_ID {
                    return Err(SassError::Protocol(format!(
                        "version response answers request {} instead of {VERSION_REQUEST_ID}",
                        version.id
                    )));
                }
                Ok(version.into())
            }
            Some(outbound_message::Message::Error(error)) => Err(protocol_error(&error)),
            other => Err(SassError::Protocol(format!(
                "expected a version response, got {} on compilation {compilation_id}",
                describe(other.as_ref())
            ))),
        }
    }

    /// Run one compile to completion, answering callbacks through `importer`.
    pub fn run(
        &mut self,
        request: CompileRequest,
        importer: &mut dyn Importer,
    ) -> Result<SessionResult, SassError> {
        let compilation_id = self.next_compilation_id;
        self.next_compilation_id = self.next_compilation_id.checked_add(1).unwrap_or(1);

        self.transport.send(
            compilation_id,
            &InboundMessage {
                message: Some(inbound_message::Message::CompileRequest(request)),
            },
        )?;

        let mut warnings = Vec::new();
        loop {
            let (id, outbound) = self.transport.receive()?;
            let Some(message) = outbound.message else {
                return Err(SassError::Protocol("empty message from compiler".to_string()));
            };
            if id != compilation_id && !matches!(message, outbound_message::Message::Error(_)) {
                return Err(SassError::Protocol(format!(
                    "{} for compilation {id} while running compilation {compilation_id}",
                    describe(Some(&message))
                )));
            }

            let reply = match message {
                outbound_message::Message::Error(error) => return Err(protocol_error(&error)),
                outbound_message::Message::CompileResponse(response) => {
                    return Ok(SessionResult { response, warnings });
                }
                outbound_message::Message::LogEvent(event) => {
                    if let Some(warning) = log_event(&event) {
                        warnings.push(warning);
                    }
                    continue;
                }
                outbound_message::Message::CanonicalizeRequest(request) => {
                    trace!(url = %request.url, containing_url = ?request.containing_url, "Canonicalize request");
                    let result =
                        match importer.canonicalize(&request.url, request.containing_url.as_deref())
                        {
                            Ok(Some(url)) => Some(canonicalize_response::Result::Url(url)),
                            Ok(None) => None,
                            Err(message) => Some(canonicalize_response::Result::Error(message)),
                        };
                    inbound_message::Message::CanonicalizeResponse(CanonicalizeResponse {
                        id: request.id,
                        containing_url_unused: false,
                        result,
                    })
                }
                outbound_message::Message::ImportRequest(request) => {
                    trace!(url = %request.url, "Import request");
                    let result = match importer.load(&request.url) {
                        Ok(loaded) => import_response::Result::Success(import_response::ImportSuccess {
                            contents: loaded.contents,
                            syntax: loaded.syntax as i32,
                            source_map_url: None,
                        }),
                        Err(message) => import_response::Result::Error(message),
                    };
                    inbound_message::Message::ImportResponse(ImportResponse {
                        id: request.id,
                        result: Some(result),
                    })
                }
                outbound_message::Message::FileImportRequest(request) => {
                    inbound_message::Message::FileImportResponse(FileImportResponse {
                        id: request.id,
                        containing_url_unused: false,
                        result: Some(file_import_response::Result::Error(
                            "no file importer is registered".to_string(),
                        )),
                    })
                }
                outbound_message::Message::FunctionCallRequest(request) => {
                    inbound_message::Message::FunctionCallResponse(FunctionCallResponse {
                        id: request.id,
                        result: Some(function_call_response::Result::Error(
                            "no host functions are registered".to_string(),
                        )),
                    })
                }
                outbound_message::Message::VersionResponse(_) => {
                    return Err(SassError::Protocol(
                        "unexpected version response during compilation".to_string(),
                    ));
                }
            };

            self.transport.send(
                compilation_id,
                &InboundMessage {
                    message: Some(reply),
                },
            )?;
        }
    }
}

impl<T: Transport> CompilerSession for Session<T> {
    fn compile(
        &mut self,
        request: CompileRequest,
        importer: &mut dyn Importer,
    ) -> Result<SessionResult, SassError> {
        self.run(request, importer)
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("next_compilation_id", &self.next_compilation_id)
            .finish_non_exhaustive()
    }
}

/// A running `sass --embedded` child with its session.
///
/// Dropping it closes the compiler's stdin, gives the process a moment to
/// exit, then kills and reaps it.
pub struct EmbeddedCompiler {
    session: Option<Session<PacketTransport<ChildStdout, ChildStdin>>>,
    child: Child,
    binary: PathBuf,
    version: CompilerVersion,
}

impl EmbeddedCompiler {
    /// Spawn `binary --embedded` and complete the handshake.
    pub fn start(binary: &Path) -> Result<Self, SassError> {
        debug!(path = %binary.display(), "Starting Dart Sass");
        let mut child = Command::new(binary)
            .arg("--embedded")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SassError::Start {
                path: binary.to_path_buf(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SassError::Protocol(
                "compiler stdio was not captured".to_string(),
            ));
        };

        let mut compiler = Self {
            session: Some(Session::new(PacketTransport::new(stdout, stdin))),
            child,
            binary: binary.to_path_buf(),
            version: CompilerVersion::default(),
        };
        // A failed handshake drops `compiler`, which reaps the child.
        compiler.version = compiler.session_mut()?.handshake()?;
        debug!(version = %compiler.version, "Dart Sass ready");
        Ok(compiler)
    }

    pub fn version(&self) -> &CompilerVersion {
        &self.version
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn session_mut(
        &mut self,
    ) -> Result<&mut Session<PacketTransport<ChildStdout, ChildStdin>>, SassError> {
        self.session
            .as_mut()
            .ok_or_else(|| SassError::Protocol("compiler session already closed".to_string()))
    }
}

impl CompilerSession for EmbeddedCompiler {
    fn compile(
        &mut self,
        request: CompileRequest,
        importer: &mut dyn Importer,
    ) -> Result<SessionResult, SassError> {
        self.session_mut()?.run(request, importer)
    }
}

impl Drop for EmbeddedCompiler {
    fn drop(&mut self) {
        // Closing stdin is the protocol's shutdown signal.
        drop(self.session.take());

        for _ in 0..SHUTDOWN_POLLS {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    trace!(?status, "Dart Sass exited");
                    return;
                }
                Ok(None) => std::thread::sleep(SHUTDOWN_POLL_INTERVAL),
                Err(_) => break,
            }
        }
        debug!(pid = self.child.id(), "Killing Dart Sass");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl fmt::Debug for EmbeddedCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedCompiler")
            .field("binary", &self.binary)
            .field("pid", &self.child.id())
            .field("version", &self.version)
            .finish()
    }
}

fn protocol_error(error: &ProtocolError) -> SassError {
    SassError::Protocol(format!(
        "{:?} error (request {}): {}",
        error.r#type(),
        error.id,
        error.message
    ))
}

/// Log a compiler message; warnings are also returned for the caller.
fn log_event(event: &LogEvent) -> Option<String> {
    let text = if event.formatted.is_empty() {
        event.message.clone()
    } else {
        event.formatted.clone()
    };
    match event.r#type() {
        LogEventType::Warning => {
            warn!(message = %event.message, "Sass warning");
            Some(text)
        }
        LogEventType::DeprecationWarning => {
            warn!(
                message = %event.message,
                deprecation = event.deprecation_type.as_deref().unwrap_or("unknown"),
                "Sass deprecation warning"
            );
            Some(text)
        }
        LogEventType::Debug => {
            debug!(message = %event.message, "Sass @debug");
            None
        }
    }
}

fn describe(message: Option<&outbound_message::Message>) -> &'static str {
    match message {
        None => "an empty message",
        Some(outbound_message::Message::Error(_)) => "a protocol error",
        Some(outbound_message::Message::CompileResponse(_)) => "a compile response",
        Some(outbound_message::Message::LogEvent(_)) => "a log event",
        Some(outbound_message::Message::CanonicalizeRequest(_)) => "a canonicalize request",
        Some(outbound_message::Message::ImportRequest(_)) => "an import request",
        Some(outbound_message::Message::FileImportRequest(_)) => "a file import request",
        Some(outbound_message::Message::FunctionCallRequest(_)) => "a function call request",
        Some(outbound_message::Message::VersionResponse(_)) => "a version response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OutboundMessage;
    use crate::protocol::outbound_message::compile_response;
    use std::collections::VecDeque;

    /// Scripted transport: replays canned compiler messages and records what
    /// the host sent.
    #[derive(Default)]
    struct ScriptedTransport {
        incoming: VecDeque<(u32, OutboundMessage)>,
        sent: Vec<(u32, InboundMessage)>,
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, compilation_id: u32, message: &InboundMessage) -> Result<(), SassError> {
            self.sent.push((compilation_id, message.clone()));
            Ok(())
        }

        fn receive(&mut self) -> Result<(u32, OutboundMessage), SassError> {
            self.incoming.pop_front().ok_or_else(|| {
                SassError::Protocol("compiler closed the connection unexpectedly".to_string())
            })
        }
    }

    struct NullImporter;

    impl Importer for NullImporter {
        fn canonicalize(&mut self, _: &str, _: Option<&str>) -> Result<Option<String>, String> {
            Ok(None)
        }

        fn load(&mut self, url: &str) -> Result<crate::ImportedStylesheet, String> {
            Err(format!("cannot load {url}"))
        }
    }

    fn outbound(message: outbound_message::Message) -> OutboundMessage {
        OutboundMessage {
            message: Some(message),
        }
    }

    fn success(css: &str) -> outbound_message::Message {
        outbound_message::Message::CompileResponse(outbound_message::CompileResponse {
            loaded_urls: vec![],
            result: Some(compile_response::Result::Success(
                compile_response::CompileSuccess {
                    css: css.to_string(),
                    source_map: String::new(),
                },
            )),
        })
    }

    #[test]
    fn test_handshake() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((
            0,
            outbound(outbound_message::Message::VersionResponse(VersionResponse {
                id: VERSION_REQUEST_ID,
                protocol_version: "3.1.0".to_string(),
                compiler_version: "1.83.0".to_string(),
                implementation_version: "1.83.0".to_string(),
                implementation_name: "dart-sass".to_string(),
            })),
        ));
        let mut session = Session::new(transport);
        let version = session.handshake().unwrap();
        assert_eq!(version.to_string(), "dart-sass 1.83.0 (protocol 3.1.0)");
        assert_eq!(session.transport.sent[0].0, HANDSHAKE_COMPILATION_ID);
    }

    #[test]
    fn test_unrecognized_url_gets_empty_canonicalize_response() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((
            1,
            outbound(outbound_message::Message::CanonicalizeRequest(
                outbound_message::CanonicalizeRequest {
                    id: 7,
                    importer_id: 1,
                    url: "missing".to_string(),
                    from_import: true,
                    containing_url: None,
                },
            )),
        ));
        transport.incoming.push_back((1, outbound(success("a{}"))));

        let mut session = Session::new(transport);
        let result = session
            .run(CompileRequest::default(), &mut NullImporter)
            .unwrap();
        assert!(result.warnings.is_empty());

        let (id, reply) = &session.transport.sent[1];
        assert_eq!(*id, 1);
        match &reply.message {
            Some(inbound_message::Message::CanonicalizeResponse(response)) => {
                assert_eq!(response.id, 7);
                assert_eq!(response.result, None);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_log_events_become_warnings() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((
            1,
            outbound(outbound_message::Message::LogEvent(LogEvent {
                r#type: LogEventType::Warning as i32,
                message: "careful".to_string(),
                formatted: "WARNING: careful".to_string(),
                ..Default::default()
            })),
        ));
        transport.incoming.push_back((
            1,
            outbound(outbound_message::Message::LogEvent(LogEvent {
                r#type: LogEventType::Debug as i32,
                message: "noise".to_string(),
                ..Default::default()
            })),
        ));
        transport.incoming.push_back((1, outbound(success(""))));

        let mut session = Session::new(transport);
        let result = session
            .run(CompileRequest::default(), &mut NullImporter)
            .unwrap();
        assert_eq!(result.warnings, vec!["WARNING: careful".to_string()]);
    }

    #[test]
    fn test_protocol_error_ends_compile() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((
            0,
            outbound(outbound_message::Message::Error(ProtocolError {
                r#type: crate::protocol::ProtocolErrorType::Params as i32,
                id: 4,
                message: "missing importer".to_string(),
            })),
        ));

        let mut session = Session::new(transport);
        let err = session
            .run(CompileRequest::default(), &mut NullImporter)
            .unwrap_err();
        assert!(matches!(err, SassError::Protocol(_)));
        assert!(err.to_string().contains("missing importer"));
    }

    #[test]
    fn test_eof_mid_compile_is_protocol_error() {
        let mut session = Session::new(ScriptedTransport::default());
        let err = session
            .run(CompileRequest::default(), &mut NullImporter)
            .unwrap_err();
        assert!(err.to_string().contains("closed the connection"));
    }

    #[test]
    fn test_compilation_ids_increase() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((1, outbound(success("a{}"))));
        transport.incoming.push_back((2, outbound(success("b{}"))));

        let mut session = Session::new(transport);
        session.run(CompileRequest::default(), &mut NullImporter).unwrap();
        session.run(CompileRequest::default(), &mut NullImporter).unwrap();
        let ids: Vec<u32> = session.transport.sent.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_mismatched_compilation_id() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back((5, outbound(success(""))));

        let mut session = Session::new(transport);
        let err = session
            .run(CompileRequest::default(), &mut NullImporter)
            .unwrap_err();
        assert!(err.to_string().contains("compilation 5"));
    }
}
