//! Background inbound dispatcher.
//!
//! A single long-lived thread exclusively owns the read side of the
//! transport port. It polls availability, reassembles complete frames, and
//! routes each by message type: responses go to their mailbox, unsolicited
//! chat frames go to the inbound queue, and anything else is logged and
//! dropped. The loop sleeps between polls instead of spinning.

use crossbeam_channel::Sender;
use locomm_protocol::{FrameBuffer, MessageType, MESSAGE_TYPE_LEN};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{trace, warn};

use crate::mailbox::MailboxSet;
use crate::transport::TransportPort;

/// Spawn the dispatcher thread.
///
/// The thread exits when `running` is cleared or the port fails; either way
/// it clears `running` and drops the inbound sender on the way out, waking
/// any blocked receive call.
pub(crate) fn spawn(
    port: Arc<dyn TransportPort>,
    mailboxes: Arc<MailboxSet>,
    inbound: Sender<Vec<u8>>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        run(port.as_ref(), &mailboxes, &inbound, &running, poll_interval);
        running.store(false, Ordering::Relaxed);
    })
}

fn run(
    port: &dyn TransportPort,
    mailboxes: &MailboxSet,
    inbound: &Sender<Vec<u8>>,
    running: &AtomicBool,
    poll_interval: Duration,
) {
    let mut buffer = FrameBuffer::new();

    while running.load(Ordering::Relaxed) {
        let available = match port.bytes_available() {
            Ok(n) => n,
            Err(err) => {
                warn!(%err, "transport failed; stopping dispatcher");
                return;
            }
        };

        if available == 0 {
            thread::sleep(poll_interval);
            continue;
        }

        let data = match port.read(available) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "transport read failed; stopping dispatcher");
                return;
            }
        };
        if data.is_empty() {
            thread::sleep(poll_interval);
            continue;
        }

        buffer.push(&data);
        while let Some(raw) = buffer.next_frame() {
            dispatch(raw, mailboxes, inbound);
        }
    }
}

/// Route one reassembled frame by its message type tag. Structural
/// validation is left to the consumer so a malformed response still reaches
/// the transaction that must decide to retry.
fn dispatch(raw: Vec<u8>, mailboxes: &MailboxSet, inbound: &Sender<Vec<u8>>) {
    let mut tag = [0u8; MESSAGE_TYPE_LEN];
    tag.copy_from_slice(&raw[4..4 + MESSAGE_TYPE_LEN]);

    match MessageType::from_tag(&tag) {
        Some(ty) if ty.is_response() => {
            trace!(%ty, len = raw.len(), "routing response frame to mailbox");
            mailboxes.store(ty, raw);
        }
        Some(MessageType::ChatMessage) => {
            trace!(len = raw.len(), "queueing inbound chat frame");
            let _ = inbound.send(raw);
        }
        Some(other) => {
            warn!(%other, "discarding unexpected frame type");
        }
        None => {
            warn!(
                tag = %String::from_utf8_lossy(&tag),
                "discarding frame with unrecognized message type"
            );
        }
    }
}
