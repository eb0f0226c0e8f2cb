//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding frames and payloads.
///
/// Each variant names the specific check that failed so callers can decide
/// whether a retry is worthwhile and report a readable reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is too short to hold the envelope and trailer.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Start marker fail.
    #[error("start marker fail: expected 0x1234, got 0x{found:04X}")]
    StartMarker {
        /// Value found in the start marker position.
        found: u16,
    },

    /// End marker fail.
    #[error("end marker fail: expected 0x5678, got 0x{found:04X}")]
    EndMarker {
        /// Value found in the end marker position.
        found: u16,
    },

    /// The declared size does not match the serialized length.
    #[error("size fail: frame declares {declared} bytes but is {actual}")]
    SizeMismatch {
        /// Size field value.
        declared: usize,
        /// Actual serialized length.
        actual: usize,
    },

    /// Crc fail.
    #[error("crc fail: frame carries 0x{carried:04X}, computed 0x{computed:04X}")]
    ChecksumMismatch {
        /// Checksum carried by the frame.
        carried: u16,
        /// Checksum recomputed over the frame contents.
        computed: u16,
    },

    /// Message type tag is not one the protocol defines.
    #[error("unrecognized message type {}", format_tag(.0))]
    UnknownMessageType([u8; 4]),

    /// Payload is shorter than its type requires.
    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    PayloadTruncated {
        /// Expected payload length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// A fixed-content acknowledgement did not carry the expected literal.
    #[error("ack payload fail: expected OKAY")]
    BadAck,

    /// A declared length field disagrees with the bytes that follow it.
    #[error("{field} length fail: declares {declared} bytes, {remaining} remain")]
    LengthMismatch {
        /// Field whose length prefix is wrong.
        field: &'static str,
        /// Declared length.
        declared: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },

    /// A fixed-width field was given a value that does not fit.
    #[error("{field} too long: at most {max} bytes, got {actual}")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Maximum width.
        max: usize,
        /// Offered length.
        actual: usize,
    },

    /// A pairing key contained a character outside the protocol alphabet.
    #[error("invalid pairing key character {ch:?}")]
    InvalidKeyChar {
        /// Offending character.
        ch: char,
    },

    /// A string field did not decode as UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

fn format_tag(tag: &[u8; 4]) -> String {
    tag.iter()
        .flat_map(|b| (*b as char).escape_default())
        .collect()
}
