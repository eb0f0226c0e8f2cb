//! Transport port abstraction.
//!
//! The physical link (port discovery, baud rate, open/close) lives outside
//! this crate. Whatever owns it hands the engine an object implementing
//! [`TransportPort`]: raw byte write, polled byte read, and an availability
//! check. The [`MemoryPort`] pair backs tests and mock devices.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raw byte access to the serial link.
///
/// Implementations must tolerate concurrent use: the dispatcher thread reads
/// while caller threads write. A single `write` call must put its bytes on
/// the wire contiguously.
pub trait TransportPort: Send + Sync {
    /// Write a complete buffer to the link.
    fn write(&self, data: &[u8]) -> io::Result<()>;

    /// Read up to `max` bytes. May return fewer, including none, when the
    /// link has less data ready.
    fn read(&self, max: usize) -> io::Result<Vec<u8>>;

    /// Number of bytes ready to read without blocking.
    fn bytes_available(&self) -> io::Result<usize>;
}

/// One end of an in-memory transport pair.
///
/// Bytes written on one end become readable on the other, in order. Closing
/// either end makes every subsequent operation on both ends fail, which is
/// how tests simulate a dead link.
#[derive(Debug, Clone)]
pub struct MemoryPort {
    rx: Arc<Mutex<VecDeque<u8>>>,
    tx: Arc<Mutex<VecDeque<u8>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryPort {
    /// Create a connected pair of ports.
    pub fn pair() -> (MemoryPort, MemoryPort) {
        let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let a = MemoryPort {
            rx: b_to_a.clone(),
            tx: a_to_b.clone(),
            closed: closed.clone(),
        };
        let b = MemoryPort {
            rx: a_to_b,
            tx: b_to_a,
            closed,
        };
        (a, b)
    }

    /// Close the link. Both ends start failing with `BrokenPipe`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "port closed"));
        }
        Ok(())
    }
}

impl TransportPort for MemoryPort {
    fn write(&self, data: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        self.tx.lock().extend(data.iter().copied());
        Ok(())
    }

    fn read(&self, max: usize) -> io::Result<Vec<u8>> {
        self.ensure_open()?;
        let mut queue = self.rx.lock();
        let count = max.min(queue.len());
        Ok(queue.drain(..count).collect())
    }

    fn bytes_available(&self) -> io::Result<usize> {
        self.ensure_open()?;
        Ok(self.rx.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_carries_bytes_both_ways() {
        let (a, b) = MemoryPort::pair();

        a.write(&[1, 2, 3]).expect("write");
        assert_eq!(b.bytes_available().expect("available"), 3);
        assert_eq!(b.read(10).expect("read"), vec![1, 2, 3]);

        b.write(&[4, 5]).expect("write");
        assert_eq!(a.read(1).expect("short read"), vec![4]);
        assert_eq!(a.read(1).expect("short read"), vec![5]);
    }

    #[test]
    fn test_read_empty_returns_nothing() {
        let (a, _b) = MemoryPort::pair();
        assert_eq!(a.bytes_available().expect("available"), 0);
        assert!(a.read(16).expect("read").is_empty());
    }

    #[test]
    fn test_close_fails_both_ends() {
        let (a, b) = MemoryPort::pair();
        a.close();
        assert!(a.write(&[0]).is_err());
        assert!(b.read(1).is_err());
        assert!(b.bytes_available().is_err());
    }
}
