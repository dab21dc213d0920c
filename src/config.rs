//! Build-time configuration constants (§6.3 of the design) and the
//! prefix-character predicates the tokenizer and classifier are
//! parameterized over.

/// Max length, in bytes, of an AT command string (excluding the trailing `\r`).
pub const AT_CMD_MAX_SIZE: usize = 200;
/// Max length, in bytes, of a generic AT string value (e.g. an APN).
pub const AT_MAX_STRING_SIZE: usize = 256;
/// Max length, in bytes, of a response prefix such as `+CGPADDR`.
pub const MAX_PREFIX_STRING_LENGTH: usize = 32;
/// Max number of concurrently tracked socket slots.
pub const NUM_SOCKET_MAX: usize = 12;
/// Minimum valid PDN context id.
pub const PDN_CONTEXT_ID_MIN: u8 = 1;
/// Maximum valid PDN context id.
pub const PDN_CONTEXT_ID_MAX: u8 = 16;
/// Max bytes accepted in a single outbound socket write.
pub const MAX_SEND_DATA_LEN: usize = 1460;
/// Max bytes accepted in a single inbound socket read / data-prefix frame.
pub const MAX_RECV_DATA_LEN: usize = 1500;
/// Default timeout, in milliseconds, for a standard AT transaction.
pub const COMMON_AT_COMMAND_TIMEOUT_MS: u64 = 5000;
/// Default timeout, in milliseconds, for a raw/data-bearing AT transaction.
pub const AT_COMMAND_RAW_TIMEOUT_MS: u64 = 5000;

/// Capacity of the receiver's line buffer: one max-size line plus one max-size
/// prefix, so a full line and its prefix can always coexist during framing.
pub const LINE_BUFFER_CAPACITY: usize = AT_MAX_STRING_SIZE + MAX_PREFIX_STRING_LENGTH;

/// Pluggable policy for which characters introduce and compose a response
/// prefix. Defaults match 3GPP AT syntax (`+CGPADDR:` and friends), but a
/// vendor module may register its own table built around a different
/// leading character (some vendor URCs use `^` or `*`).
#[derive(Clone, Copy)]
pub struct PrefixPolicy {
    /// True for the byte that introduces a prefix (default `b'+'`).
    pub is_leading_char: fn(u8) -> bool,
    /// True for bytes that may appear inside a prefix, including the leading
    /// character itself (default alphanumeric, `_`, or the leading char).
    pub is_prefix_char: fn(u8) -> bool,
}

fn default_is_leading_char(b: u8) -> bool {
    b == b'+'
}

fn default_is_prefix_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || default_is_leading_char(b)
}

impl Default for PrefixPolicy {
    fn default() -> Self {
        Self {
            is_leading_char: default_is_leading_char,
            is_prefix_char: default_is_prefix_char,
        }
    }
}

/// Aggregate configuration handed to [`crate::context::CellularContext::new`].
///
/// Generalizes the teacher crate's `CellularConfig` trait (associated
/// constants plus pluggable pin behavior) into a plain struct of the
/// core's tunables, since the core has no GPIO surface of its own.
#[derive(Clone, Copy)]
pub struct Config {
    pub prefix: PrefixPolicy,
    pub command_timeout_ms: u64,
    pub raw_command_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: PrefixPolicy::default(),
            command_timeout_ms: COMMON_AT_COMMAND_TIMEOUT_MS,
            raw_command_timeout_ms: AT_COMMAND_RAW_TIMEOUT_MS,
        }
    }
}
