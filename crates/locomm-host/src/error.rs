//! Host-side error types.

use locomm_protocol::{FrameError, MessageType};
use thiserror::Error;

/// Errors surfaced by the protocol engine.
///
/// Structural frame problems and response mismatches are recovered locally by
/// retrying the transaction; only attempt exhaustion, transport failure, and
/// invalid arguments reach callers.
#[derive(Error, Debug)]
pub enum HostError {
    /// The received frame failed a structural check.
    #[error("malformed frame: {0}")]
    Malformed(#[from] FrameError),

    /// No frame arrived within the attempt window.
    #[error("response timeout")]
    ResponseTimeout,

    /// The response carried a different type than the request expects.
    #[error("response type fail: expected {expected}, got {got}")]
    TypeMismatch {
        /// Type the transaction was waiting for.
        expected: MessageType,
        /// Type actually received.
        got: MessageType,
    },

    /// The response echoed a different correlation tag.
    #[error("tag fail: expected 0x{expected:08X}, got 0x{got:08X}")]
    TagMismatch {
        /// Tag sent with the request.
        expected: u32,
        /// Tag carried by the response.
        got: u32,
    },

    /// A chunk acknowledgement named the wrong sequence number.
    #[error("ack sequence fail: expected {expected}, got {got}")]
    SequenceMismatch {
        /// Sequence number of the chunk that was sent.
        expected: u16,
        /// Sequence number the device acknowledged.
        got: u16,
    },

    /// The retry bound was reached without a valid response.
    #[error("attempts exhausted after {attempts} tries: {last}")]
    AttemptsExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Reason the final attempt failed.
        last: String,
    },

    /// I/O failure on the transport port. The connection is presumed dead.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A request argument cannot be represented on the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine is no longer connected (dispatcher stopped).
    #[error("not connected")]
    Disconnected,

    /// The device answered with a response the operation cannot use.
    #[error("unexpected response for {operation}")]
    UnexpectedResponse {
        /// Operation that received the response.
        operation: &'static str,
    },
}
