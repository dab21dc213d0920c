//! The byte-level transport abstraction (§6.1). The core never looks past
//! this trait: no flow control, no modem-specific framing, just bytes.

use std::time::Duration;

/// Platform-neutral outcome of a comm-interface operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommStatus {
    #[error("comm interface succeeded")]
    Success,
    #[error("comm interface timed out")]
    Timeout,
    #[error("comm interface failed")]
    Failure,
    #[error("comm handle already closed")]
    Closed,
}

pub type CommResult<T> = Result<T, CommStatus>;

/// Caller-supplied transport. Implementors own a physical or virtual UART
/// (or a loopback fake, for tests) and must call the receive callback handed
/// to [`CommInterface::open`] whenever new bytes are ready, from whatever
/// thread observes that readiness — the callback only sets an event bit and
/// is safe to invoke from any thread, analogous to an ISR in the embedded
/// original.
pub trait CommInterface: Send {
    /// Begin reading. `on_readable` must be invoked (possibly many times,
    /// possibly spuriously) whenever unread bytes become available.
    fn open(&mut self, on_readable: Box<dyn Fn() + Send + Sync>) -> CommResult<()>;

    /// Write the entirety of `buf`, retrying short writes until `timeout`
    /// elapses. Returns the number of bytes actually written.
    fn send(&mut self, buf: &[u8], timeout: Duration) -> CommResult<usize>;

    /// Read whatever is available, up to `buf.len()` bytes, waiting at most
    /// `timeout` for at least one byte. Returns the number of bytes read (0
    /// on timeout, which is not an error).
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> CommResult<usize>;

    /// Release the underlying handle. Idempotent.
    fn close(&mut self) -> CommResult<()>;
}
