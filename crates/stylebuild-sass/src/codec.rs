//! Packet framing for the embedded protocol.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! ```text
//! varint(length of the rest) · varint(compilation id) · protobuf message
//! ```
//!
//! Generic over the message type so the same functions serve both ends of
//! the connection.

use std::io::{self, Read, Write};

use prost::Message;
use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};

use crate::error::SassError;

/// Longest varint a `u64` can take.
const MAX_VARINT_LEN: usize = 10;

/// Refuse packets above this size instead of allocating for a corrupt header.
const MAX_PACKET_LEN: u64 = 1 << 30;

/// Frame and write one message, then flush.
pub fn write_packet<W: Write, M: Message>(
    writer: &mut W,
    compilation_id: u32,
    message: &M,
) -> io::Result<()> {
    let id = u64::from(compilation_id);
    let body_len = encoded_len_varint(id) + message.encoded_len();

    let mut buf = Vec::with_capacity(encoded_len_varint(body_len as u64) + body_len);
    encode_varint(body_len as u64, &mut buf);
    encode_varint(id, &mut buf);
    message.encode_raw(&mut buf);

    writer.write_all(&buf)?;
    writer.flush()
}

/// Read one framed message.
///
/// Returns `Ok(None)` on a clean end of stream between packets; EOF inside a
/// packet is a protocol error.
pub fn read_packet<R: Read, M: Message + Default>(
    reader: &mut R,
) -> Result<Option<(u32, M)>, SassError> {
    let Some(len) = read_varint(reader)? else {
        return Ok(None);
    };
    if len > MAX_PACKET_LEN {
        return Err(SassError::Protocol(format!(
            "packet of {len} bytes exceeds the {MAX_PACKET_LEN} byte limit"
        )));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SassError::Protocol("connection closed in the middle of a packet".to_string())
        } else {
            SassError::Transport(e)
        }
    })?;

    let mut rest = body.as_slice();
    let compilation_id = decode_varint(&mut rest)
        .map_err(|e| SassError::Protocol(format!("bad compilation id: {e}")))?;
    let compilation_id = u32::try_from(compilation_id).map_err(|_| {
        SassError::Protocol(format!("compilation id {compilation_id} out of range"))
    })?;
    let message =
        M::decode(rest).map_err(|e| SassError::Protocol(format!("undecodable message: {e}")))?;

    Ok(Some((compilation_id, message)))
}

/// Read a varint one byte at a time. `None` when the stream ends before the
/// first byte.
fn read_varint<R: Read>(reader: &mut R) -> Result<Option<u64>, SassError> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) if i == 0 => return Ok(None),
                Ok(0) => {
                    return Err(SassError::Protocol(
                        "connection closed in the middle of a length prefix".to_string(),
                    ));
                }
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(SassError::Transport(e)),
            }
        }
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(SassError::Protocol("length prefix is too long".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::inbound_message::{self, VersionRequest};
    use crate::protocol::outbound_message::{self, LogEvent};
    use crate::protocol::{InboundMessage, OutboundMessage};

    #[test]
    fn test_packet_layout() {
        let message = InboundMessage {
            message: Some(inbound_message::Message::VersionRequest(VersionRequest {
                id: 1,
            })),
        };
        let mut buf = Vec::new();
        write_packet(&mut buf, 0, &message).unwrap();

        // length, compilation id 0, then the protobuf body
        let body_len = message.encoded_len();
        assert_eq!(buf[0] as usize, 1 + body_len);
        assert_eq!(buf[1], 0);
        assert_eq!(&buf[2..], message.encode_to_vec().as_slice());
    }

    #[test]
    fn test_multibyte_length_and_id() {
        let message = OutboundMessage {
            message: Some(outbound_message::Message::LogEvent(LogEvent {
                message: "x".repeat(300),
                ..Default::default()
            })),
        };
        let mut buf = Vec::new();
        write_packet(&mut buf, 70_000, &message).unwrap();
        write_packet(&mut buf, 2, &message).unwrap();

        let mut reader = buf.as_slice();
        let (id, decoded): (u32, OutboundMessage) = read_packet(&mut reader).unwrap().unwrap();
        assert_eq!(id, 70_000);
        assert_eq!(decoded, message);
        let (id, _): (u32, OutboundMessage) = read_packet(&mut reader).unwrap().unwrap();
        assert_eq!(id, 2);
        assert!(read_packet::<_, OutboundMessage>(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_truncated_packet_is_protocol_error() {
        let message = InboundMessage {
            message: Some(inbound_message::Message::VersionRequest(VersionRequest {
                id: 9,
            })),
        };
        let mut buf = Vec::new();
        write_packet(&mut buf, 0, &message).unwrap();
        buf.truncate(buf.len() - 1);

        let err = read_packet::<_, InboundMessage>(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, SassError::Protocol(_)), "{err}");
    }

    #[test]
    fn test_unterminated_length_prefix() {
        let buf = [0xffu8; 11];
        let err = read_packet::<_, InboundMessage>(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }
}
