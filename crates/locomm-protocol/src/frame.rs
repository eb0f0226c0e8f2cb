//! Frame encoding and decoding.
//!
//! Every message on the serial link travels inside a fixed envelope. All
//! multi-byte integers are big-endian:
//!
//! ```text
//! offset  size  field
//! 0       2     start marker = 0x1234
//! 2       2     size (total frame length)
//! 4       4     message type (ASCII, 4 chars)
//! 8       4     tag (u32)
//! 12      N     payload (N = size - 16)
//! 12+N    2     crc16
//! 14+N    2     end marker = 0x5678
//! ```
//!
//! The crc16 field is a CRC-16/XMODEM checksum over the size, message type,
//! tag, and payload bytes. A frame failing any structural check is malformed
//! and reported with a typed error naming the failed check.

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::crc::crc16;
use crate::error::FrameError;
use crate::types::MessageType;

// ============================================================================
// Frame
// ============================================================================

/// One complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Operation this frame carries.
    pub message_type: MessageType,
    /// Correlation tag chosen by the requester and echoed by the responder.
    pub tag: u32,
    /// Payload bytes; semantics depend on the message type.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    pub fn new(message_type: MessageType, tag: u32, payload: Vec<u8>) -> Self {
        Frame {
            message_type,
            tag,
            payload,
        }
    }

    /// Total serialized length of this frame.
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Serialize the frame, computing the size and checksum fields.
    pub fn encode(&self) -> Vec<u8> {
        let size = self.encoded_len() as u16;
        let mut buf = Vec::with_capacity(size as usize);

        buf.extend_from_slice(&START_MARKER.to_be_bytes());
        buf.extend_from_slice(&size.to_be_bytes());
        buf.extend_from_slice(&self.message_type.tag());
        buf.extend_from_slice(&self.tag.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        // Checksum domain: size, type, tag, payload.
        let crc = crc16(&buf[2..]);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf.extend_from_slice(&END_MARKER.to_be_bytes());

        buf
    }

    /// Parse and validate a serialized frame.
    ///
    /// Checks run in wire order: start marker, size, message type, checksum,
    /// end marker. The first failure is reported; tag correlation is the
    /// caller's concern.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(FrameError::TooShort {
                expected: FRAME_OVERHEAD,
                actual: bytes.len(),
            });
        }

        let start = u16::from_be_bytes([bytes[0], bytes[1]]);
        if start != START_MARKER {
            return Err(FrameError::StartMarker { found: start });
        }

        let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if declared != bytes.len() {
            return Err(FrameError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let mut tag_bytes = [0u8; MESSAGE_TYPE_LEN];
        tag_bytes.copy_from_slice(&bytes[4..8]);
        let message_type = MessageType::from_tag(&tag_bytes)
            .ok_or(FrameError::UnknownMessageType(tag_bytes))?;

        let tag = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let payload_end = bytes.len() - TRAILER_LEN;
        let payload = bytes[HEADER_LEN..payload_end].to_vec();

        let carried = u16::from_be_bytes([bytes[payload_end], bytes[payload_end + 1]]);
        let computed = crc16(&bytes[2..payload_end]);
        if carried != computed {
            return Err(FrameError::ChecksumMismatch { carried, computed });
        }

        let end = u16::from_be_bytes([bytes[payload_end + 2], bytes[payload_end + 3]]);
        if end != END_MARKER {
            return Err(FrameError::EndMarker { found: end });
        }

        Ok(Frame {
            message_type,
            tag,
            payload,
        })
    }
}

// ============================================================================
// Frame Buffer
// ============================================================================

/// Accumulator that reassembles complete frames from a byte stream.
///
/// The serial link delivers bytes in arbitrary pieces; reads may split a
/// frame or coalesce several. `push` received bytes in, then drain complete
/// frames with `next_frame`. Bytes preceding a start marker are discarded,
/// which resynchronizes the stream after line noise.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        FrameBuffer {
            buffer: BytesMut::with_capacity(FRAME_OVERHEAD + MAX_CHUNK_TEXT),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete frame.
    ///
    /// Returns the raw frame bytes (still to be validated by
    /// [`Frame::decode`]) or `None` if more data is needed.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            self.resync();

            if self.buffer.len() < FRAME_PREFIX_LEN {
                return None;
            }

            let size = u16::from_be_bytes([self.buffer[2], self.buffer[3]]) as usize;
            if size < FRAME_OVERHEAD {
                // A size that cannot hold the envelope means we latched onto
                // marker-like bytes inside other data. Skip this marker and
                // scan again.
                self.buffer.advance(2);
                continue;
            }

            if self.buffer.len() < size {
                return None;
            }

            return Some(self.buffer.split_to(size).to_vec());
        }
    }

    /// Discard bytes until the buffer begins with a start marker (or is too
    /// short to tell).
    fn resync(&mut self) {
        let mut discarded = 0usize;
        while !self.buffer.is_empty() {
            if self.buffer[0] == 0x12 {
                if self.buffer.len() < 2 || self.buffer[1] == 0x34 {
                    break;
                }
            }
            self.buffer.advance(1);
            discarded += 1;
        }
        if discarded > 0 {
            log::trace!("discarded {discarded} bytes before start marker");
        }
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(MessageType::EnterPassword, 0xAABBCCDD, b"hunter2".to_vec());
        let bytes = frame.encode();

        assert_eq!(bytes.len(), 23);
        assert_eq!(&bytes[0..2], &[0x12, 0x34]);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 23);
        assert_eq!(&bytes[4..8], b"PASS");
        assert_eq!(&bytes[8..12], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&bytes[12..19], b"hunter2");
        assert_eq!(&bytes[21..23], &[0x56, 0x78]);
    }

    #[test]
    fn test_round_trip() {
        let frame = Frame::new(MessageType::ChatMessage, 0x01020304, vec![1, 2, 3, 4, 5]);
        let decoded = Frame::decode(&frame.encode()).expect("round trip");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let frame = Frame::new(MessageType::Scan, 42, Vec::new());
        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_OVERHEAD);
        assert_eq!(Frame::decode(&bytes).expect("round trip"), frame);
    }

    #[test]
    fn test_corrupt_payload_byte_fails_checksum() {
        let frame = Frame::new(MessageType::EnterPassword, 7, b"secret".to_vec());
        let bytes = frame.encode();
        for i in HEADER_LEN..bytes.len() - TRAILER_LEN {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= 0x01;
            assert!(matches!(
                Frame::decode(&corrupted),
                Err(FrameError::ChecksumMismatch { .. })
            ));
        }
        // The uncorrupted frame still decodes.
        assert!(Frame::decode(&bytes).is_ok());
    }

    #[test]
    fn test_password_scenario() {
        // Encode, corrupt one payload byte, observe a checksum failure, then
        // decode the clean bytes and get the original fields back.
        let frame = Frame::new(MessageType::EnterPassword, 0xAABBCCDD, b"hunter2".to_vec());
        let clean = frame.encode();

        let mut corrupted = clean.clone();
        corrupted[14] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&corrupted),
            Err(FrameError::ChecksumMismatch { .. })
        ));

        let decoded = Frame::decode(&clean).expect("clean frame decodes");
        assert_eq!(decoded.tag, 0xAABBCCDD);
        assert_eq!(decoded.payload, b"hunter2");
        assert_eq!(decoded.message_type, MessageType::EnterPassword);
    }

    #[test]
    fn test_bad_start_marker() {
        let mut bytes = Frame::new(MessageType::Scan, 1, Vec::new()).encode();
        bytes[0] = 0xFF;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::StartMarker { found: 0xFF34 })
        ));
    }

    #[test]
    fn test_bad_end_marker() {
        let mut bytes = Frame::new(MessageType::Scan, 1, Vec::new()).encode();
        let last = bytes.len() - 1;
        bytes[last] = 0x00;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::EndMarker { .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let mut bytes = Frame::new(MessageType::Scan, 1, Vec::new()).encode();
        bytes[3] += 1;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_message_type() {
        let frame = Frame::new(MessageType::Scan, 1, Vec::new());
        let mut bytes = frame.encode();
        bytes[4..8].copy_from_slice(b"ZZZZ");
        // Recompute the checksum so the type check is what fails.
        let crc = crc16(&bytes[2..bytes.len() - TRAILER_LEN]);
        let crc_at = bytes.len() - TRAILER_LEN;
        bytes[crc_at..crc_at + 2].copy_from_slice(&crc.to_be_bytes());
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::UnknownMessageType(tag)) if &tag == b"ZZZZ"
        ));
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            Frame::decode(&[0x12, 0x34, 0x00]),
            Err(FrameError::TooShort { .. })
        ));
    }

    #[test]
    fn test_frame_buffer_split_reads() {
        let frame = Frame::new(MessageType::PasswordAck, 9, b"OKAY".to_vec());
        let bytes = frame.encode();

        let mut buffer = FrameBuffer::new();
        for piece in bytes.chunks(3) {
            buffer.push(piece);
        }
        let raw = buffer.next_frame().expect("complete frame");
        assert_eq!(raw, bytes);
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn test_frame_buffer_multiple_frames() {
        let first = Frame::new(MessageType::PasswordAck, 1, b"OKAY".to_vec()).encode();
        let second = Frame::new(MessageType::StoreNameAck, 2, Vec::new()).encode();

        let mut buffer = FrameBuffer::new();
        let mut combined = first.clone();
        combined.extend_from_slice(&second);
        buffer.push(&combined);

        assert_eq!(buffer.next_frame().expect("first"), first);
        assert_eq!(buffer.next_frame().expect("second"), second);
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn test_frame_buffer_discards_leading_garbage() {
        let frame = Frame::new(MessageType::ScanAck, 3, vec![0u8; 32]).encode();

        let mut buffer = FrameBuffer::new();
        buffer.push(&[0x00, 0x7F, 0x12, 0x99, 0xFF]);
        buffer.push(&frame);

        assert_eq!(buffer.next_frame().expect("frame after garbage"), frame);
    }

    #[test]
    fn test_frame_buffer_incomplete_frame_waits() {
        let frame = Frame::new(MessageType::GetPairingKeyAck, 4, vec![1u8; 21]).encode();

        let mut buffer = FrameBuffer::new();
        buffer.push(&frame[..frame.len() - 1]);
        assert!(buffer.next_frame().is_none());

        buffer.push(&frame[frame.len() - 1..]);
        assert_eq!(buffer.next_frame().expect("completed"), frame);
    }
}
