//! Host-side engine for LoComm LoRa devices.
//!
//! This crate turns the raw byte stream of a serial port into reliable,
//! correlated request/response transactions against a LoComm device, plus an
//! inbound queue for chat messages relayed from peers.
//!
//! The caller supplies the open port as a [`TransportPort`]; everything
//! about discovering and opening the physical link stays outside this crate.
//! One background thread reads frames and routes them; transactions retry on
//! malformed or mismatched responses up to a bound before failing.
//!
//! # Example
//!
//! ```rust,ignore
//! use locomm_host::{EngineConfig, ProtocolEngine};
//!
//! let engine = ProtocolEngine::connect(port, EngineConfig::default())?;
//! engine.enter_password("hunter2")?;
//! engine.send_message("alice", "hello over LoRa")?;
//! let (sender, text) = engine.receive_message()?;
//! engine.disconnect()?;
//! ```

mod config;
mod dispatcher;
mod engine;
mod error;
mod mailbox;
mod transport;

pub use config::EngineConfig;
pub use engine::ProtocolEngine;
pub use error::HostError;
pub use transport::{MemoryPort, TransportPort};

// Protocol types that appear in the public API surface.
pub use locomm_protocol::{DiscoveredDevice, PairingKey};
