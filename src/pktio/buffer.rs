//! The receiver's line buffer. Touched only from the receiver thread — no
//! locking, no sharing (§5: "the receiver task owns the line buffer").

use crate::config::LINE_BUFFER_CAPACITY;

/// State of an in-progress binary capture triggered by a data-prefix
/// callback (§4.1.3).
pub struct BinaryCapture {
    pub remaining: usize,
    pub collected: Vec<u8>,
}

impl BinaryCapture {
    pub fn new(len: usize) -> Self {
        Self {
            remaining: len,
            collected: Vec::with_capacity(len),
        }
    }
}

/// A growable byte buffer capped at [`LINE_BUFFER_CAPACITY`], with helpers
/// for line framing (§4.1.1: any run of `\r`/`\n` terminates a line and is
/// itself discarded) and raw byte consumption during binary mode.
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::with_capacity(LINE_BUFFER_CAPACITY) }
    }

    pub fn spare_capacity(&self) -> usize {
        LINE_BUFFER_CAPACITY.saturating_sub(self.bytes.len())
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn unconsumed(&self) -> &[u8] {
        &self.bytes
    }

    pub fn skip(&mut self, n: usize) -> bool {
        if n > self.bytes.len() {
            return false;
        }
        self.bytes.drain(0..n);
        true
    }

    /// Takes as many bytes as are available (up to `capture.remaining`) off
    /// the front of the buffer into `capture`. Returns `true` once the
    /// capture is complete.
    pub fn consume_into(&mut self, capture: &mut BinaryCapture) -> bool {
        let take = capture.remaining.min(self.bytes.len());
        capture.collected.extend_from_slice(&self.bytes[..take]);
        self.bytes.drain(0..take);
        capture.remaining -= take;
        capture.remaining == 0
    }

    /// Finds the next complete line without consuming it, returning its text
    /// and the total byte length (line plus its run of terminators) it
    /// occupies. Returns `None` if no terminator has been seen yet. Letting
    /// callers peek before committing is what lets a data-prefix callback's
    /// `SizeMismatch` leave the line in place for a later retry.
    pub fn peek_line(&self) -> Option<(String, usize)> {
        let end = self.bytes.iter().position(|&b| b == b'\r' || b == b'\n')?;
        let line = String::from_utf8_lossy(&self.bytes[..end]).into_owned();
        let mut skip_to = end;
        while skip_to < self.bytes.len()
            && (self.bytes[skip_to] == b'\r' || self.bytes[skip_to] == b'\n')
        {
            skip_to += 1;
        }
        Some((line, skip_to))
    }

}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
