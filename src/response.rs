//! Shapes shared between [`crate::pktio`] and [`crate::pkthandler`]: the
//! response accumulator, the eight AT command types of §4.2, and the
//! pluggable hooks a vendor module installs on the input stream.

use std::time::Duration;

/// One piece of an accumulated response: either a framed text line or an
/// opaque binary payload captured via a data-prefix callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseItem {
    Line(String),
    Data(Vec<u8>),
}

/// Everything collected for one transaction, handed to the parse callback
/// once a terminator (or, for the no-result-code types, the single content
/// line) has been observed.
#[derive(Debug, Clone, Default)]
pub struct AtResponse {
    pub items: Vec<ResponseItem>,
    pub success: bool,
}

impl AtResponse {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| match i {
            ResponseItem::Line(l) => Some(l.as_str()),
            ResponseItem::Data(_) => None,
        })
    }

    /// The payload of the first [`ResponseItem::Data`] item, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.items.iter().find_map(|i| match i {
            ResponseItem::Data(d) => Some(d.as_slice()),
            ResponseItem::Line(_) => None,
        })
    }
}

/// The eight AT command shapes of §4.2, governing how pktio terminates and
/// filters a transaction's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommandType {
    /// No content expected; only a terminator line.
    NoResult,
    /// Any number of content lines, no prefix filter, terminated normally.
    WoPrefix,
    /// Content lines must match the registered prefix, terminated normally.
    WithPrefix,
    /// Like `WoPrefix`, but more than one content line is expected.
    MultiWoPrefix,
    /// Like `WithPrefix`, but more than one content line is expected.
    MultiWithPrefix,
    /// Content is a single textual "size" line recognized by a data-prefix
    /// callback, followed by that many raw bytes (§4.1.3).
    MultiDataWoPrefix,
    /// A single content line *is* the terminator: success is implied by
    /// receiving it, no separate `OK` is sent by the modem.
    WoPrefixNoResultCode,
    /// Same as `WoPrefixNoResultCode`, but the line must match the prefix.
    WithPrefixNoResultCode,
}

impl AtCommandType {
    pub fn requires_prefix(self) -> bool {
        matches!(
            self,
            AtCommandType::WithPrefix
                | AtCommandType::MultiWithPrefix
                | AtCommandType::WithPrefixNoResultCode
        )
    }

    /// True for the two types where the first content line itself finalizes
    /// the transaction, without waiting for a separate terminator.
    pub fn finalizes_on_content(self) -> bool {
        matches!(
            self,
            AtCommandType::WoPrefixNoResultCode | AtCommandType::WithPrefixNoResultCode
        )
    }
}

/// Outcome of running a data-prefix callback against a just-framed content
/// line, per §4.1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPrefixOutcome {
    /// This line is not a data-prefix trigger; dispatch it normally.
    NotMatched,
    /// This line looked like a data-prefix trigger but its payload length
    /// could not be parsed. Callers discard the whole receive buffer.
    Malformed,
    /// This line triggers binary capture of exactly this many raw bytes.
    Found(usize),
    /// Not enough has been buffered yet to decide; the engine leaves the
    /// line in place and retries once more bytes arrive.
    SizeMismatch,
}

pub type DataPrefixFn = fn(line: &str) -> DataPrefixOutcome;

/// Rewrites the raw command bytes immediately before they are written to the
/// comm interface — the hook a vendor module uses to append a send-data
/// prefix or splice in payload bytes (§4.1.3).
pub type SendDataPrefixFn = Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Outcome of the optional whole-buffer preprocessing hook run before line
/// framing (§4.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputHookOutcome {
    /// The hook does not recognize this buffer; frame it as plain text.
    PrefixMismatch,
    /// The hook recognizes the start of a match but needs more bytes before
    /// it can decide; stop processing and wait for more data.
    SizeMismatch,
    /// The hook consumed this many bytes itself; resume framing right after.
    Consumed(usize),
    /// The hook rejected the buffer outright; discard everything buffered.
    Error,
}

pub type InputBufferHook = Box<dyn Fn(&[u8]) -> InputHookOutcome + Send + Sync>;

/// Invoked with any line that classifies as [`crate::at::LineClass::Undefined`].
pub type UndefinedResponseCallback = Box<dyn FnMut(&str) + Send>;

/// The default per-transaction timeout pktio waits on the response channel.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_millis(5000);
