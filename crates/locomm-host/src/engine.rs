//! Protocol engine.
//!
//! The engine owns one connection to a device: it runs the inbound
//! dispatcher, executes request/response transactions with bounded retries,
//! splits large chat messages into acknowledged chunks, and reassembles
//! inbound chat transfers.

use crossbeam_channel::Receiver;
use locomm_protocol::{
    DeviceName, DiscoveredDevice, Frame, MessageChunk, MessageType, PairingKey, Request, Response,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::dispatcher;
use crate::error::HostError;
use crate::mailbox::MailboxSet;
use crate::transport::TransportPort;

/// Maximum password length, bounded by the length prefix in a password
/// change payload.
const MAX_PASSWORD_LEN: usize = u8::MAX as usize;

/// One live connection to a LoComm device.
///
/// All methods take `&self`; the engine serializes transactions internally
/// so at most one request is in flight at a time. Dropping the engine stops
/// the dispatcher thread.
pub struct ProtocolEngine {
    port: Arc<dyn TransportPort>,
    config: EngineConfig,
    mailboxes: Arc<MailboxSet>,
    inbound: Receiver<Vec<u8>>,
    /// Held for the full span of one transaction: write request, then
    /// consume the response. Keeps two transactions from interleaving
    /// frames on the wire.
    transaction_lock: Mutex<()>,
    /// Serializes raw port writes, so a chunk acknowledgement emitted by the
    /// receive path cannot split a request frame.
    write_lock: Mutex<()>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl ProtocolEngine {
    /// Start an engine on an open port.
    ///
    /// Spawns the dispatcher thread and emits the `CONN` announcement. The
    /// device defines no response for the announcement, so this returns as
    /// soon as it is written.
    pub fn connect(port: Arc<dyn TransportPort>, config: EngineConfig) -> Result<Self, HostError> {
        let mailboxes = Arc::new(MailboxSet::new());
        let (inbound_tx, inbound) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let reader = dispatcher::spawn(
            port.clone(),
            mailboxes.clone(),
            inbound_tx,
            running.clone(),
            config.poll_interval,
        );

        let engine = ProtocolEngine {
            port,
            config,
            mailboxes,
            inbound,
            transaction_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            running,
            reader: Some(reader),
        };

        let announce = Frame::new(MessageType::Connect, rand::random(), Vec::new()).encode();
        engine.write_bytes(&announce)?;
        debug!("connection announced");
        Ok(engine)
    }

    /// Ask the device to release the session, then stop the dispatcher.
    ///
    /// The dispatcher is stopped even when the device never acknowledges.
    pub fn disconnect(mut self) -> Result<(), HostError> {
        let result = match self.execute(&Request::Disconnect) {
            Ok(Response::DisconnectAck) => Ok(()),
            Ok(_) => Err(HostError::UnexpectedResponse {
                operation: "disconnect",
            }),
            Err(err) => Err(err),
        };
        self.shutdown();
        result
    }

    /// Present the device password.
    pub fn enter_password(&self, password: &str) -> Result<(), HostError> {
        let request = Request::EnterPassword {
            password: password.to_string(),
        };
        match self.execute(&request)? {
            Response::PasswordAck => Ok(()),
            _ => Err(HostError::UnexpectedResponse {
                operation: "enter password",
            }),
        }
    }

    /// Change the device password.
    pub fn set_password(&self, old: &str, new: &str) -> Result<(), HostError> {
        for (label, value) in [("current password", old), ("new password", new)] {
            if value.len() > MAX_PASSWORD_LEN {
                return Err(HostError::InvalidRequest(format!(
                    "{label} exceeds {MAX_PASSWORD_LEN} bytes"
                )));
            }
        }
        let request = Request::SetPassword {
            old: old.to_string(),
            new: new.to_string(),
        };
        match self.execute(&request)? {
            Response::SetPasswordAck => Ok(()),
            _ => Err(HostError::UnexpectedResponse {
                operation: "set password",
            }),
        }
    }

    /// Reset the device password. The device wipes its stored pairing keys,
    /// so this is only for when the current password is lost.
    pub fn reset_password(&self, password: &str) -> Result<(), HostError> {
        let request = Request::ResetPassword {
            password: password.to_string(),
        };
        match self.execute(&request)? {
            Response::ResetPasswordAck => Ok(()),
            _ => Err(HostError::UnexpectedResponse {
                operation: "reset password",
            }),
        }
    }

    /// Store the host's display name on the device.
    pub fn store_name(&self, name: &str) -> Result<(), HostError> {
        let name = DeviceName::new(name).map_err(|err| HostError::InvalidRequest(err.to_string()))?;
        match self.execute(&Request::StoreName { name })? {
            Response::StoreNameAck => Ok(()),
            _ => Err(HostError::UnexpectedResponse {
                operation: "store name",
            }),
        }
    }

    /// Scan for reachable devices.
    pub fn scan(&self) -> Result<Vec<DiscoveredDevice>, HostError> {
        match self.execute(&Request::Scan)? {
            Response::ScanAck { devices } => Ok(devices),
            _ => Err(HostError::UnexpectedResponse { operation: "scan" }),
        }
    }

    /// Fetch the pairing key stored on the device, if any.
    pub fn get_pairing_key(&self) -> Result<Option<PairingKey>, HostError> {
        match self.execute(&Request::GetPairingKey)? {
            Response::PairingKey { key } => Ok(key),
            _ => Err(HostError::UnexpectedResponse {
                operation: "get pairing key",
            }),
        }
    }

    /// Enter a pairing key obtained from another device.
    pub fn enter_pairing_key(&self, key: &str) -> Result<(), HostError> {
        let key = PairingKey::new(key).map_err(|err| HostError::InvalidRequest(err.to_string()))?;
        match self.execute(&Request::EnterPairingKey { key })? {
            Response::EnterPairingKeyAck => Ok(()),
            _ => Err(HostError::UnexpectedResponse {
                operation: "enter pairing key",
            }),
        }
    }

    /// Send a chat message, splitting it into acknowledged chunks.
    ///
    /// Every chunk shares one tag and is sent as its own transaction, in
    /// order. The first chunk whose transaction fails aborts the transfer;
    /// there is no resume, so the caller retries from the start with a fresh
    /// tag.
    pub fn send_message(&self, sender: &str, text: &str) -> Result<(), HostError> {
        let chunks = MessageChunk::split(sender, text)
            .map_err(|err| HostError::InvalidRequest(err.to_string()))?;
        let tag: u32 = rand::random();
        let total = chunks.len();

        for chunk in chunks {
            let seq = chunk.seq;
            match self.execute_with_tag(&Request::MessageChunk(chunk), tag)? {
                Response::MessageAck { .. } => {
                    trace!(seq, total, "chat chunk acknowledged");
                }
                _ => {
                    return Err(HostError::UnexpectedResponse {
                        operation: "send message",
                    })
                }
            }
        }
        Ok(())
    }

    /// Block until a complete chat message arrives, returning the sender
    /// name and text.
    ///
    /// Chunks are validated structurally and reassembled in order; each
    /// accepted chunk is acknowledged back to the device with its sequence
    /// number. A chunk that fails validation or breaks the transfer order
    /// drops the partial message, and this call keeps waiting for the next
    /// transfer.
    pub fn receive_message(&self) -> Result<(String, String), HostError> {
        let mut sender = String::new();
        let mut text: Vec<u8> = Vec::new();
        // Tag, chunk count, and next expected sequence of the transfer in
        // progress.
        let mut state: Option<(u32, u16, u16)> = None;

        loop {
            let raw = self.inbound.recv().map_err(|_| HostError::Disconnected)?;

            let frame = match Frame::decode(&raw) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(%err, "discarding malformed chat frame");
                    state = None;
                    continue;
                }
            };
            let chunk = match Response::decode(&frame) {
                Ok(Response::Message(chunk)) => chunk,
                Ok(_) => {
                    warn!(ty = %frame.message_type, "unexpected frame in chat queue");
                    state = None;
                    continue;
                }
                Err(err) => {
                    warn!(%err, "discarding malformed chat chunk");
                    state = None;
                    continue;
                }
            };
            if chunk.total == 0 {
                warn!("discarding chat chunk declaring zero total chunks");
                state = None;
                continue;
            }

            // A chunk from a different transfer or out of order abandons the
            // partial message.
            if let Some((tag, total, next)) = state {
                if frame.tag != tag || chunk.total != total || chunk.seq != next {
                    warn!(
                        seq = chunk.seq,
                        expected = next,
                        "chat transfer broke sequence; dropping partial message"
                    );
                    state = None;
                    sender.clear();
                    text.clear();
                }
            }

            if state.is_none() {
                if chunk.seq != 0 {
                    warn!(seq = chunk.seq, "chat chunk arrived without a transfer start");
                    continue;
                }
                state = Some((frame.tag, chunk.total, 0));
            }

            if sender.is_empty() && !chunk.sender.is_empty() {
                sender = chunk.sender.clone();
            }
            text.extend_from_slice(&chunk.text);
            self.acknowledge_chunk(frame.tag, chunk.seq)?;

            if chunk.seq + 1 == chunk.total {
                match String::from_utf8(std::mem::take(&mut text)) {
                    Ok(text) => return Ok((std::mem::take(&mut sender), text)),
                    Err(_) => {
                        warn!("reassembled chat message is not valid UTF-8; dropping it");
                        sender.clear();
                        state = None;
                        continue;
                    }
                }
            }
            state = Some((frame.tag, chunk.total, chunk.seq + 1));
        }
    }

    /// Run one transaction under a fresh random tag.
    fn execute(&self, request: &Request) -> Result<Response, HostError> {
        self.execute_with_tag(request, rand::random())
    }

    /// Run one transaction: encode once, then send and wait, re-sending the
    /// same bytes under the same tag on every validation failure until the
    /// attempt bound is reached.
    fn execute_with_tag(&self, request: &Request, tag: u32) -> Result<Response, HostError> {
        let _transaction = self.transaction_lock.lock();
        self.ensure_running()?;

        let response_type = request.response_type();
        let bytes = request.encode(tag);

        // Drop any stale frame a previously timed-out call left behind.
        self.mailboxes.clear(response_type);

        let mut last_failure = String::new();
        for attempt in 1..=self.config.max_attempts {
            self.write_bytes(&bytes)?;
            match self.await_response(request, response_type, tag) {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(attempt, %response_type, "transaction succeeded after retries");
                    }
                    return Ok(response);
                }
                Err(err @ (HostError::Transport(_) | HostError::Disconnected)) => return Err(err),
                Err(err) => {
                    debug!(%err, attempt, %response_type, "transaction attempt failed");
                    self.mailboxes.clear(response_type);
                    last_failure = err.to_string();
                }
            }
        }

        Err(HostError::AttemptsExhausted {
            attempts: self.config.max_attempts,
            last: last_failure,
        })
    }

    /// Wait for and validate one response frame.
    fn await_response(
        &self,
        request: &Request,
        response_type: MessageType,
        tag: u32,
    ) -> Result<Response, HostError> {
        let raw = match self
            .mailboxes
            .take_timeout(response_type, self.config.response_timeout)
        {
            Some(raw) => raw,
            None if self.running.load(Ordering::Relaxed) => return Err(HostError::ResponseTimeout),
            None => return Err(HostError::Disconnected),
        };

        let frame = Frame::decode(&raw)?;
        if frame.message_type != response_type {
            return Err(HostError::TypeMismatch {
                expected: response_type,
                got: frame.message_type,
            });
        }
        if frame.tag != tag {
            return Err(HostError::TagMismatch {
                expected: tag,
                got: frame.tag,
            });
        }

        let response = Response::decode(&frame)?;
        if let (Request::MessageChunk(chunk), Response::MessageAck { seq }) = (request, &response) {
            if *seq != chunk.seq {
                return Err(HostError::SequenceMismatch {
                    expected: chunk.seq,
                    got: *seq,
                });
            }
        }
        Ok(response)
    }

    /// Acknowledge one received chat chunk under the sender's tag.
    fn acknowledge_chunk(&self, tag: u32, seq: u16) -> Result<(), HostError> {
        let ack = Frame::new(MessageType::ChatAck, tag, seq.to_be_bytes().to_vec()).encode();
        self.write_bytes(&ack)?;
        trace!(seq, "chat chunk acknowledged to peer");
        Ok(())
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), HostError> {
        let _write = self.write_lock.lock();
        self.port.write(bytes)?;
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), HostError> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(HostError::Disconnected);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for ProtocolEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
