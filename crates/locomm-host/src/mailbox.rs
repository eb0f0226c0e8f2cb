//! Per-response-type mailboxes.
//!
//! The dispatcher owns the write side: when a response frame arrives it is
//! stored in the slot for its message type and the waiting transaction is
//! woken. The transaction engine owns the read side: exactly one caller
//! blocks on a given type at a time and consumes the frame with a
//! read-and-clear. A second frame of the same type arriving before the first
//! is consumed overwrites the slot.

use locomm_protocol::MessageType;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct Slot {
    frame: Mutex<Option<Vec<u8>>>,
    ready: Condvar,
}

/// One single-frame slot per response message type.
pub(crate) struct MailboxSet {
    slots: HashMap<MessageType, Slot>,
}

impl MailboxSet {
    /// Create slots for every response type.
    pub fn new() -> Self {
        let slots = MessageType::RESPONSE_TYPES
            .iter()
            .map(|&ty| {
                (
                    ty,
                    Slot {
                        frame: Mutex::new(None),
                        ready: Condvar::new(),
                    },
                )
            })
            .collect();
        MailboxSet { slots }
    }

    /// Store a frame and wake the waiting transaction. Overwrites an
    /// unconsumed frame of the same type.
    pub fn store(&self, ty: MessageType, frame: Vec<u8>) {
        if let Some(slot) = self.slots.get(&ty) {
            let mut guard = slot.frame.lock();
            if guard.replace(frame).is_some() {
                debug!(%ty, "mailbox overwritten before previous frame was consumed");
            }
            slot.ready.notify_one();
        }
    }

    /// Block until a frame of the given type arrives, consuming it. Returns
    /// `None` on timeout.
    pub fn take_timeout(&self, ty: MessageType, timeout: Duration) -> Option<Vec<u8>> {
        let slot = self.slots.get(&ty)?;
        let deadline = Instant::now() + timeout;
        let mut guard = slot.frame.lock();
        while guard.is_none() {
            if slot.ready.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        guard.take()
    }

    /// Drop a stale frame of the given type, if any.
    pub fn clear(&self, ty: MessageType) {
        if let Some(slot) = self.slots.get(&ty) {
            slot.frame.lock().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_store_then_take() {
        let mailboxes = MailboxSet::new();
        mailboxes.store(MessageType::PasswordAck, vec![1, 2, 3]);
        let frame = mailboxes.take_timeout(MessageType::PasswordAck, Duration::from_millis(10));
        assert_eq!(frame, Some(vec![1, 2, 3]));
        // The slot is cleared by the take.
        assert!(mailboxes
            .take_timeout(MessageType::PasswordAck, Duration::from_millis(10))
            .is_none());
    }

    #[test]
    fn test_timeout_without_frame() {
        let mailboxes = MailboxSet::new();
        let start = Instant::now();
        let frame = mailboxes.take_timeout(MessageType::ScanAck, Duration::from_millis(50));
        assert!(frame.is_none());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let mailboxes = MailboxSet::new();
        mailboxes.store(MessageType::ChatAck, vec![1]);
        mailboxes.store(MessageType::ChatAck, vec![2]);
        let frame = mailboxes.take_timeout(MessageType::ChatAck, Duration::from_millis(10));
        assert_eq!(frame, Some(vec![2]));
    }

    #[test]
    fn test_types_are_independent() {
        let mailboxes = MailboxSet::new();
        mailboxes.store(MessageType::PasswordAck, vec![1]);
        assert!(mailboxes
            .take_timeout(MessageType::SetPasswordAck, Duration::from_millis(10))
            .is_none());
        assert!(mailboxes
            .take_timeout(MessageType::PasswordAck, Duration::from_millis(10))
            .is_some());
    }

    #[test]
    fn test_store_wakes_blocked_taker() {
        let mailboxes = Arc::new(MailboxSet::new());
        let producer = mailboxes.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.store(MessageType::StoreNameAck, vec![7]);
        });

        let frame = mailboxes.take_timeout(MessageType::StoreNameAck, Duration::from_secs(5));
        assert_eq!(frame, Some(vec![7]));
        handle.join().expect("producer thread");
    }

    #[test]
    fn test_clear_drops_stale_frame() {
        let mailboxes = MailboxSet::new();
        mailboxes.store(MessageType::ScanAck, vec![9]);
        mailboxes.clear(MessageType::ScanAck);
        assert!(mailboxes
            .take_timeout(MessageType::ScanAck, Duration::from_millis(10))
            .is_none());
    }
}
