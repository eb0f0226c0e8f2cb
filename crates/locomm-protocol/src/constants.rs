//! Protocol constants
//!
//! These constants define the frame envelope markers, field widths, and other
//! protocol-specific values used on the LoComm serial link.

// ============================================================================
// Frame Envelope
// ============================================================================

/// Sentinel value opening every frame.
pub const START_MARKER: u16 = 0x1234;
/// Sentinel value closing every frame.
pub const END_MARKER: u16 = 0x5678;

/// Bytes of envelope and trailer around the payload:
/// start marker (2) + size (2) + message type (4) + tag (4) + crc (2) + end marker (2).
pub const FRAME_OVERHEAD: usize = 16;
/// Offset of the payload within a frame.
pub const HEADER_LEN: usize = 12;
/// Bytes after the payload: crc (2) + end marker (2).
pub const TRAILER_LEN: usize = 4;
/// Bytes needed before the total frame length is known: start marker + size.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Width of the message type tag in bytes.
pub const MESSAGE_TYPE_LEN: usize = 4;

// ============================================================================
// Payload Literals and Field Widths
// ============================================================================

/// Literal payload carried by fixed-content acknowledgements.
pub const ACK_OKAY: &[u8; 4] = b"OKAY";

/// Width of the device name field (null-padded).
pub const DEVICE_NAME_LEN: usize = 32;

/// Width of the pairing key field (null-padded).
pub const PAIRING_KEY_LEN: usize = 20;

/// Alphabet pairing keys are drawn from.
pub const PAIRING_KEY_ALPHABET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// Width of the device bitmap in a scan acknowledgement.
pub const SCAN_BITMAP_LEN: usize = 32;

/// Byte length of the pairing-key presence flag in a `GPAK` payload.
pub const KEY_PRESENT_LEN: usize = 1;

// ============================================================================
// Chunked Transfer
// ============================================================================

/// Maximum text bytes carried by one message chunk.
pub const MAX_CHUNK_TEXT: usize = 1000;

/// Fixed bytes of a chunk payload before the variable name and text fields:
/// total (2) + sequence (2) + name length (1) + text length (2).
pub const CHUNK_FIXED_LEN: usize = 7;

/// Maximum sender name length in a chunk (bounded by its u8 length field).
pub const MAX_SENDER_LEN: usize = 255;
