//! Messages of the Dart Sass embedded protocol.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! Hand-maintained subset of `embedded_sass.proto` (protocol 3.x), written
//! the way `prost-build` would emit it. Only the fields this host reads or
//! writes are declared; prost skips unknown fields on decode.

/// Host -> compiler.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InboundMessage {
    #[prost(oneof = "inbound_message::Message", tags = "2, 3, 4, 5, 6, 7")]
    pub message: ::core::option::Option<inbound_message::Message>,
}

pub mod inbound_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct VersionRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CompileRequest {
        #[prost(oneof = "compile_request::Input", tags = "2, 3")]
        pub input: ::core::option::Option<compile_request::Input>,
        #[prost(enumeration = "super::OutputStyle", tag = "4")]
        pub style: i32,
        #[prost(bool, tag = "5")]
        pub source_map: bool,
        #[prost(message, repeated, tag = "6")]
        pub importers: ::prost::alloc::vec::Vec<compile_request::Importer>,
        #[prost(bool, tag = "8")]
        pub alert_color: bool,
        #[prost(bool, tag = "9")]
        pub alert_ascii: bool,
        #[prost(bool, tag = "10")]
        pub verbose: bool,
        #[prost(bool, tag = "11")]
        pub quiet_deps: bool,
    }

    pub mod compile_request {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct StringInput {
            #[prost(string, tag = "1")]
            pub source: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub url: ::prost::alloc::string::String,
            #[prost(enumeration = "super::super::Syntax", tag = "3")]
            pub syntax: i32,
            #[prost(message, optional, tag = "4")]
            pub importer: ::core::option::Option<Importer>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Importer {
            #[prost(string, repeated, tag = "4")]
            pub non_canonical_scheme: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
            #[prost(oneof = "importer::Importer", tags = "1, 2, 3")]
            pub importer: ::core::option::Option<importer::Importer>,
        }

        pub mod importer {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Importer {
                #[prost(string, tag = "1")]
                Path(::prost::alloc::string::String),
                #[prost(uint32, tag = "2")]
                ImporterId(u32),
                #[prost(uint32, tag = "3")]
                FileImporterId(u32),
            }
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Input {
            #[prost(message, tag = "2")]
            String(StringInput),
            #[prost(string, tag = "3")]
            Path(::prost::alloc::string::String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CanonicalizeResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(bool, tag = "4")]
        pub containing_url_unused: bool,
        #[prost(oneof = "canonicalize_response::Result", tags = "2, 3")]
        pub result: ::core::option::Option<canonicalize_response::Result>,
    }

    pub mod canonicalize_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(string, tag = "2")]
            Url(::prost::alloc::string::String),
            #[prost(string, tag = "3")]
            Error(::prost::alloc::string::String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ImportResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "import_response::Result", tags = "2, 3")]
        pub result: ::core::option::Option<import_response::Result>,
    }

    pub mod import_response {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ImportSuccess {
            #[prost(string, tag = "1")]
            pub contents: ::prost::alloc::string::String,
            #[prost(enumeration = "super::super::Syntax", tag = "2")]
            pub syntax: i32,
            #[prost(string, optional, tag = "3")]
            pub source_map_url: ::core::option::Option<::prost::alloc::string::String>,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(message, tag = "2")]
            Success(ImportSuccess),
            #[prost(string, tag = "3")]
            Error(::prost::alloc::string::String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileImportResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(bool, tag = "4")]
        pub containing_url_unused: bool,
        #[prost(oneof = "file_import_response::Result", tags = "2, 3")]
        pub result: ::core::option::Option<file_import_response::Result>,
    }

    pub mod file_import_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(string, tag = "2")]
            FileUrl(::prost::alloc::string::String),
            #[prost(string, tag = "3")]
            Error(::prost::alloc::string::String),
        }
    }

    /// Only the error arm is ever sent: no host functions are registered.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FunctionCallResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "function_call_response::Result", tags = "3")]
        pub result: ::core::option::Option<function_call_response::Result>,
    }

    pub mod function_call_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(string, tag = "3")]
            Error(::prost::alloc::string::String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "2")]
        CompileRequest(CompileRequest),
        #[prost(message, tag = "3")]
        CanonicalizeResponse(CanonicalizeResponse),
        #[prost(message, tag = "4")]
        ImportResponse(ImportResponse),
        #[prost(message, tag = "5")]
        FileImportResponse(FileImportResponse),
        #[prost(message, tag = "6")]
        FunctionCallResponse(FunctionCallResponse),
        #[prost(message, tag = "7")]
        VersionRequest(VersionRequest),
    }
}

/// Compiler -> host.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutboundMessage {
    #[prost(oneof = "outbound_message::Message", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub message: ::core::option::Option<outbound_message::Message>,
}

pub mod outbound_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct VersionResponse {
        #[prost(uint32, tag = "5")]
        pub id: u32,
        #[prost(string, tag = "1")]
        pub protocol_version: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub compiler_version: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub implementation_version: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub implementation_name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CompileResponse {
        #[prost(string, repeated, tag = "4")]
        pub loaded_urls: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(oneof = "compile_response::Result", tags = "2, 3")]
        pub result: ::core::option::Option<compile_response::Result>,
    }

    pub mod compile_response {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CompileSuccess {
            #[prost(string, tag = "1")]
            pub css: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub source_map: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CompileFailure {
            #[prost(string, tag = "1")]
            pub message: ::prost::alloc::string::String,
            #[prost(message, optional, tag = "2")]
            pub span: ::core::option::Option<super::super::SourceSpan>,
            #[prost(string, tag = "3")]
            pub stack_trace: ::prost::alloc::string::String,
            #[prost(string, tag = "4")]
            pub formatted: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(message, tag = "2")]
            Success(CompileSuccess),
            #[prost(message, tag = "3")]
            Failure(CompileFailure),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LogEvent {
        #[prost(enumeration = "super::LogEventType", tag = "2")]
        pub r#type: i32,
        #[prost(string, tag = "3")]
        pub message: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "4")]
        pub span: ::core::option::Option<super::SourceSpan>,
        #[prost(string, tag = "5")]
        pub stack_trace: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub formatted: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "7")]
        pub deprecation_type: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CanonicalizeRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "3")]
        pub importer_id: u32,
        #[prost(string, tag = "4")]
        pub url: ::prost::alloc::string::String,
        #[prost(bool, tag = "5")]
        pub from_import: bool,
        #[prost(string, optional, tag = "6")]
        pub containing_url: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ImportRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "3")]
        pub importer_id: u32,
        #[prost(string, tag = "4")]
        pub url: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileImportRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "3")]
        pub importer_id: u32,
        #[prost(string, tag = "4")]
        pub url: ::prost::alloc::string::String,
        #[prost(bool, tag = "5")]
        pub from_import: bool,
        #[prost(string, optional, tag = "6")]
        pub containing_url: ::core::option::Option<::prost::alloc::string::String>,
    }

    /// Arguments are not decoded; the host registers no functions.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FunctionCallRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "function_call_request::Identifier", tags = "2, 3")]
        pub identifier: ::core::option::Option<function_call_request::Identifier>,
    }

    pub mod function_call_request {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Identifier {
            #[prost(string, tag = "2")]
            Name(::prost::alloc::string::String),
            #[prost(uint32, tag = "3")]
            FunctionId(u32),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        Error(super::ProtocolError),
        #[prost(message, tag = "2")]
        CompileResponse(CompileResponse),
        #[prost(message, tag = "3")]
        LogEvent(LogEvent),
        #[prost(message, tag = "4")]
        CanonicalizeRequest(CanonicalizeRequest),
        #[prost(message, tag = "5")]
        ImportRequest(ImportRequest),
        #[prost(message, tag = "6")]
        FileImportRequest(FileImportRequest),
        #[prost(message, tag = "7")]
        FunctionCallRequest(FunctionCallRequest),
        #[prost(message, tag = "8")]
        VersionResponse(VersionResponse),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtocolError {
    #[prost(enumeration = "ProtocolErrorType", tag = "1")]
    pub r#type: i32,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(string, tag = "3")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SourceSpan {
    #[prost(string, tag = "1")]
    pub text: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub start: ::core::option::Option<source_span::SourceLocation>,
    #[prost(message, optional, tag = "3")]
    pub end: ::core::option::Option<source_span::SourceLocation>,
    #[prost(string, tag = "4")]
    pub url: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub context: ::prost::alloc::string::String,
}

pub mod source_span {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SourceLocation {
        #[prost(uint32, tag = "1")]
        pub offset: u32,
        #[prost(uint32, tag = "2")]
        pub line: u32,
        #[prost(uint32, tag = "3")]
        pub column: u32,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OutputStyle {
    Expanded = 0,
    Compressed = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Syntax {
    Scss = 0,
    Indented = 1,
    Css = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum LogEventType {
    Warning = 0,
    DeprecationWarning = 1,
    Debug = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtocolErrorType {
    Parse = 0,
    Params = 1,
    Internal = 2,
}
