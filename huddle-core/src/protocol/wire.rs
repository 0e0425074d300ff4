//! Binary frame codec.
//!
//! Layout on the wire:
//!
//! ```text
//! u8   version        (PROTOCOL_VERSION)
//! u8   kind           (RequestKind tag)
//! u8   payload flag   (0 = absent, 1 = present)
//! u32  payload length (big endian, only when flag = 1)
//! [payload bytes]
//! ```
//!
//! The frame is self-delimiting, so requests can be read back-to-back
//! off a byte stream. All header fields are validated before the payload
//! allocation happens, and the payload length is capped at
//! [`MAX_PAYLOAD_SIZE`] so a hostile peer cannot make us allocate
//! arbitrary memory.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::errors::{WireError, WireResult};
use crate::protocol::request::{Request, RequestKind};

/// Current frame format version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Upper bound on a single frame's payload.
///
/// The largest legitimate payload is an encrypted all-topics listing
/// (100 messages of at most ~500 rendered bytes), far below this.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Encode a request into a standalone frame.
pub fn encode_request(request: &Request) -> WireResult<Vec<u8>> {
    let payload_len = request.payload().map_or(0, |p| p.len());
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(WireError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(3 + 4 + payload_len);
    frame.push(PROTOCOL_VERSION);
    frame.push(request.kind().as_byte());
    match request.payload() {
        None => frame.push(0),
        Some(payload) => {
            frame.push(1);
            frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            frame.extend_from_slice(payload);
        }
    }
    Ok(frame)
}

/// Write one framed request to the transport.
pub async fn write_request<W>(writer: &mut W, request: &Request) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_request(request)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed request from the transport.
///
/// Blocks until a complete frame arrives or the peer closes the stream
/// (surfaced as an unexpected-EOF [`WireError::Io`]).
pub async fn read_request<R>(reader: &mut R) -> WireResult<Request>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 3];
    reader.read_exact(&mut header).await?;

    let [version, kind_byte, flag] = header;
    if version != PROTOCOL_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let kind = RequestKind::from_byte(kind_byte).ok_or(WireError::UnknownKind(kind_byte))?;

    match flag {
        0 => Ok(Request::control(kind)),
        1 => {
            let mut len_bytes = [0u8; 4];
            reader.read_exact(&mut len_bytes).await?;
            let len = u32::from_be_bytes(len_bytes) as usize;
            if len > MAX_PAYLOAD_SIZE {
                return Err(WireError::PayloadTooLarge {
                    size: len,
                    max: MAX_PAYLOAD_SIZE,
                });
            }
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload).await?;
            Ok(Request::with_payload(kind, payload))
        }
        other => Err(WireError::InvalidPayloadFlag(other)),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn roundtrip(request: &Request) -> WireResult<Request> {
        futures::executor::block_on(async {
            let (mut tx, mut rx) = tokio::io::duplex(MAX_PAYLOAD_SIZE + 16);
            write_request(&mut tx, request).await?;
            read_request(&mut rx).await
        })
    }

    #[test]
    fn test_control_roundtrip() {
        let request = Request::control(RequestKind::Handshake);
        assert_eq!(roundtrip(&request).unwrap(), request);
    }

    #[test]
    fn test_payload_roundtrip() {
        let request = Request::with_payload(RequestKind::SendMessage, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(roundtrip(&request).unwrap(), request);
    }

    #[test]
    fn test_empty_payload_distinct_from_absent() {
        let request = Request::with_payload(RequestKind::ClientKey, vec![]);
        let parsed = roundtrip(&request).unwrap();
        assert_eq!(parsed.payload(), Some(&[][..]));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result = futures::executor::block_on(async {
            let mut frame: &[u8] = &[PROTOCOL_VERSION, 0xff, 0];
            read_request(&mut frame).await
        });
        assert!(matches!(result, Err(WireError::UnknownKind(0xff))));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let result = futures::executor::block_on(async {
            let mut frame: &[u8] = &[9, 0, 0];
            read_request(&mut frame).await
        });
        assert!(matches!(result, Err(WireError::UnsupportedVersion(9))));
    }

    #[test]
    fn test_rejects_bad_flag() {
        let result = futures::executor::block_on(async {
            let mut frame: &[u8] = &[PROTOCOL_VERSION, 0, 7];
            read_request(&mut frame).await
        });
        assert!(matches!(result, Err(WireError::InvalidPayloadFlag(7))));
    }

    #[test]
    fn test_rejects_oversized_length() {
        let mut frame = vec![PROTOCOL_VERSION, 13, 1];
        frame.extend_from_slice(&(MAX_PAYLOAD_SIZE as u32 + 1).to_be_bytes());
        let result = futures::executor::block_on(async {
            let mut cursor: &[u8] = &frame;
            read_request(&mut cursor).await
        });
        assert!(matches!(result, Err(WireError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_truncated_frame_is_io_error() {
        let result = futures::executor::block_on(async {
            // Header claims 8 payload bytes, stream ends after 2.
            let mut frame: &[u8] = &[PROTOCOL_VERSION, 13, 1, 0, 0, 0, 8, 0xaa, 0xbb];
            read_request(&mut frame).await
        });
        assert!(matches!(result, Err(WireError::Io(_))));
    }

    proptest! {
        #[test]
        fn frame_round_trip(
            tag in 0u8..29,
            payload in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..512)),
        ) {
            let kind = RequestKind::from_byte(tag).expect("tag in range");
            let request = match payload {
                Some(bytes) => Request::with_payload(kind, bytes),
                None => Request::control(kind),
            };
            let parsed = roundtrip(&request).expect("should round-trip");
            prop_assert_eq!(parsed, request);
        }
    }
}
