//! LoComm Serial Protocol
//!
//! This crate provides types and utilities for the framed binary protocol a
//! host uses to talk to a LoComm LoRa device over a serial link.
//!
//! # Protocol Overview
//!
//! Every message travels inside a fixed envelope with a start marker, size,
//! a 4-character ASCII message type, a correlation tag, a CRC-16 checksum,
//! and an end marker. Messages are either:
//!
//! - **Requests** (host → device): `DCON`, `PASS`, `STPW`, `RSPW`, `SNOD`,
//!   `SCAN`, `EPAR`, `GPKY`, `SEND`, plus the fire-and-forget `CONN`
//!   announcement
//! - **Responses** (device → host): the matching `*AK`/`*ACK` types, echoing
//!   the request's tag
//! - **Unsolicited messages** (device → host): `SEND` chat chunks relayed
//!   from peer devices
//!
//! # Example
//!
//! ```rust,ignore
//! use locomm_protocol::{Frame, Request, Response};
//!
//! // Build a request frame
//! let request = Request::EnterPassword { password: "hunter2".into() };
//! let bytes = request.encode(tag);
//!
//! // Parse a received frame
//! let frame = Frame::decode(&received)?;
//! let response = Response::decode(&frame)?;
//! ```

mod constants;
mod crc;
mod error;
mod frame;
mod requests;
mod responses;
mod types;

pub use constants::*;
pub use crc::*;
pub use error::*;
pub use frame::*;
pub use requests::*;
pub use responses::*;
pub use types::*;
