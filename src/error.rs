//! The two status taxonomies of the driver (see module docs on [`PacketStatus`]
//! and [`LibraryStatus`]) and the translation between them.

use thiserror::Error;

/// Status used internally by [`crate::pktio`] and [`crate::pkthandler`].
///
/// This is the taxonomy the receiver thread and the transaction state
/// machine speak; callers only ever see a [`LibraryStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketStatus {
    #[error("operation completed successfully")]
    Ok,
    #[error("no terminator observed within the timeout")]
    TimedOut,
    #[error("internal failure")]
    Failure,
    #[error("send to the comm interface failed")]
    BadRequest,
    #[error("parse callback rejected the response")]
    BadResponse,
    #[error("invalid parameter")]
    BadParam,
    #[error("context is not initialized or is shutting down")]
    InvalidHandle,
    #[error("a mutex, channel or thread could not be created")]
    CreationFail,
    #[error("data-prefix callback needs more bytes")]
    SizeMismatch,
    #[error("input-buffer callback did not recognize the bytes")]
    PrefixMismatch,
    #[error("response contained invalid data")]
    InvalidData,
}

/// Status surfaced to callers of the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LibraryStatus {
    #[error("success")]
    Success,
    #[error("timed out waiting for a response")]
    Timeout,
    #[error("internal failure")]
    InternalFailure,
    #[error("bad parameter")]
    BadParameter,
    #[error("invalid handle")]
    InvalidHandle,
    #[error("library is not open")]
    LibraryNotOpen,
    #[error("out of memory")]
    NoMemory,
    #[error("unsupported operation")]
    Unsupported,
    #[error("unknown error")]
    Unknown,
}

impl PacketStatus {
    /// Translate a packet-level status into the status surfaced to callers.
    ///
    /// `OK -> Success` and `TimedOut -> Timeout` are exact; everything else
    /// collapses to `InternalFailure` unless the caller already pinned down a
    /// more specific cause (pre-send validation, allocation failure, a
    /// context that is no longer open) via [`PacketStatus::to_library_hint`].
    pub fn to_library(self) -> LibraryStatus {
        match self {
            PacketStatus::Ok => LibraryStatus::Success,
            PacketStatus::TimedOut => LibraryStatus::Timeout,
            _ => LibraryStatus::InternalFailure,
        }
    }

    /// Translate with an explicit override for causes the caller already
    /// knows are more specific than `InternalFailure`.
    pub fn to_library_hint(self, hint: Option<LibraryStatus>) -> LibraryStatus {
        match self {
            PacketStatus::Ok => LibraryStatus::Success,
            PacketStatus::TimedOut => LibraryStatus::Timeout,
            _ => hint.unwrap_or(LibraryStatus::InternalFailure),
        }
    }
}

pub type PktResult<T> = Result<T, PacketStatus>;
pub type LibResult<T> = Result<T, LibraryStatus>;
