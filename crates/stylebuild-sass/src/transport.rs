//! Host side of the packet stream.
//!
//! Copyright (c) 2026 stylebuild contributors

use std::io::{BufReader, Read, Write};

use crate::codec::{read_packet, write_packet};
use crate::error::SassError;
use crate::protocol::{InboundMessage, OutboundMessage};

/// A bidirectional message channel to one compiler.
pub trait Transport: Send {
    fn send(&mut self, compilation_id: u32, message: &InboundMessage) -> Result<(), SassError>;

    /// Block until the next message arrives. The compiler hanging up is an
    /// error here: the host only reads while it expects an answer.
    fn receive(&mut self) -> Result<(u32, OutboundMessage), SassError>;
}

/// [`Transport`] over any reader/writer pair, typically a child's stdout and
/// stdin.
pub struct PacketTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R: Read, W: Write> PacketTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }
}

impl<R: Read + Send, W: Write + Send> Transport for PacketTransport<R, W> {
    fn send(&mut self, compilation_id: u32, message: &InboundMessage) -> Result<(), SassError> {
        write_packet(&mut self.writer, compilation_id, message)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<(u32, OutboundMessage), SassError> {
        read_packet(&mut self.reader)?.ok_or_else(|| {
            SassError::Protocol("compiler closed the connection unexpectedly".to_string())
        })
    }
}

impl<R, W> std::fmt::Debug for PacketTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketTransport").finish_non_exhaustive()
    }
}
