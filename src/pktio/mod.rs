//! Module C: the packet-I/O engine. Owns the single receiver thread (§5),
//! the line buffer, and the send path. Everything here is plumbing around
//! [`crate::at::classify`] — the classifier stays pure, this module is where
//! its verdicts turn into buffer mutation, binary-mode transitions and
//! response delivery.

mod buffer;

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::at::{self, LineClass, TokenTable};
use crate::comm::CommInterface;
use crate::config::Config;
use crate::error::{PacketStatus, PktResult};
use crate::fmt::{debug, error, trace, warn};
use crate::platform::{EventGroup, ABORT, ABORTED, RX_DATA, STARTED};
use crate::response::{
    AtCommandType, AtResponse, DataPrefixFn, DataPrefixOutcome, InputBufferHook, ResponseItem,
    SendDataPrefixFn, UndefinedResponseCallback,
};

use buffer::{BinaryCapture, LineBuffer};

/// Everything the receiver thread needs to finalize a transaction, installed
/// by [`PktioEngine::submit`] and consumed by exactly one of: a terminator
/// line, a finalizing content line, or the caller's own timeout.
struct PendingTransaction {
    cmd_type: AtCommandType,
    prefix: Option<String>,
    data_prefix_callback: Option<DataPrefixFn>,
    response: AtResponse,
    reply_tx: SyncSender<AtResponse>,
}

struct Shared {
    comm: Mutex<Box<dyn CommInterface>>,
    events: Arc<EventGroup>,
    pending: Mutex<Option<PendingTransaction>>,
    table: TokenTable,
    input_hook: Option<InputBufferHook>,
    undefined_cb: Mutex<Option<UndefinedResponseCallback>>,
    recv_timeout: Duration,
}

impl Shared {
    fn invoke_undefined(&self, line: &str) {
        if let Some(cb) = self.undefined_cb.lock().unwrap().as_mut() {
            cb(line);
        } else {
            trace!("dropping undefined line: {}", line);
        }
    }

    fn finalize_locked(guard: &mut Option<PendingTransaction>, success: bool) {
        if let Some(mut p) = guard.take() {
            p.response.success = success;
            let _ = p.reply_tx.send(p.response);
        }
    }
}

/// A request to transmit one AT command and collect its response, handed
/// from [`crate::pkthandler`] to [`PktioEngine::submit`].
pub struct OutgoingCommand {
    pub command: Vec<u8>,
    pub cmd_type: AtCommandType,
    pub response_prefix: Option<String>,
    pub data_prefix_callback: Option<DataPrefixFn>,
    pub send_data_prefix_callback: Option<SendDataPrefixFn>,
    pub send_timeout: Duration,
}

/// Module C's public handle. One `PktioEngine` owns one receiver thread and
/// one comm interface for the lifetime of a [`crate::context::CellularContext`].
pub struct PktioEngine {
    shared: Arc<Shared>,
    receiver: Option<JoinHandle<()>>,
}

impl PktioEngine {
    /// Opens `comm` and spawns the receiver thread. The thread is parked on
    /// `RX_DATA | ABORT` until `comm`'s readable callback or [`PktioEngine::shutdown`]
    /// wakes it.
    pub fn start(
        mut comm: Box<dyn CommInterface>,
        table: TokenTable,
        config: &Config,
        input_hook: Option<InputBufferHook>,
    ) -> PktResult<Self> {
        if !table.validate() {
            return Err(PacketStatus::BadParam);
        }

        let events = Arc::new(EventGroup::new());
        comm.open({
            let events = Arc::clone(&events);
            Box::new(move || events.set_bits(RX_DATA))
        })
        .map_err(|_| PacketStatus::CreationFail)?;

        let shared = Arc::new(Shared {
            comm: Mutex::new(comm),
            events,
            pending: Mutex::new(None),
            table,
            input_hook,
            undefined_cb: Mutex::new(None),
            recv_timeout: Duration::from_millis(config.command_timeout_ms.min(200)),
        });

        let receiver = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("pktio-rx".into())
                .spawn(move || receiver_loop(shared))
                .map_err(|_| PacketStatus::CreationFail)?
        };

        shared.events.wait_any(STARTED, false);
        Ok(Self {
            shared,
            receiver: Some(receiver),
        })
    }

    /// Registers the callback invoked for every line that classifies as
    /// undefined (§4.1.4).
    pub fn set_undefined_response_callback(&self, cb: UndefinedResponseCallback) {
        *self.shared.undefined_cb.lock().unwrap() = Some(cb);
    }

    /// Installs `cmd` as the single pending transaction and writes it to the
    /// comm interface. Returns the receiving half of the one-shot channel the
    /// caller blocks on for the result.
    ///
    /// Only one transaction may be pending at a time; the single-outstanding
    /// invariant is enforced by [`crate::pkthandler`]'s response mutex, not
    /// here — `submit` trusts its caller and will panic on reentrant misuse,
    /// since that would indicate an internal bug rather than a bad command.
    pub fn submit(&self, cmd: OutgoingCommand) -> PktResult<Receiver<AtResponse>> {
        if cmd.command.is_empty() || cmd.command.len() > crate::config::AT_CMD_MAX_SIZE {
            return Err(PacketStatus::BadParam);
        }
        if cmd.cmd_type.requires_prefix() && cmd.response_prefix.is_none() {
            return Err(PacketStatus::BadParam);
        }
        if let Some(prefix) = &cmd.response_prefix {
            if prefix.len() > crate::config::MAX_PREFIX_STRING_LENGTH {
                return Err(PacketStatus::BadParam);
            }
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        {
            let mut guard = self.shared.pending.lock().unwrap();
            assert!(guard.is_none(), "pktio::submit called while a transaction is already pending");
            *guard = Some(PendingTransaction {
                cmd_type: cmd.cmd_type,
                prefix: cmd.response_prefix,
                data_prefix_callback: cmd.data_prefix_callback,
                response: AtResponse::default(),
                reply_tx,
            });
        }

        let mut framed = cmd.command;
        framed.push(b'\r');

        let bytes = match &cmd.send_data_prefix_callback {
            Some(rewrite) => rewrite(&framed),
            None => framed,
        };

        if let Err(e) = self.write_all(&bytes, cmd.send_timeout) {
            self.shared.pending.lock().unwrap().take();
            return Err(e);
        }

        Ok(reply_rx)
    }

    /// Writes raw, already-framed bytes (e.g. binary socket payload following
    /// a `>` prompt) directly to the comm interface, bypassing the response
    /// machinery entirely.
    pub fn send_raw(&self, buf: &[u8], timeout: Duration) -> PktResult<()> {
        if buf.len() > crate::config::MAX_SEND_DATA_LEN {
            return Err(PacketStatus::BadParam);
        }
        self.write_all(buf, timeout)
    }

    /// Writes all of `buf`, retrying short writes. `timeout` bounds the
    /// whole call, not each retry: a partial write still consumes its share
    /// of the budget, so a slow link can't hold the comm lock (and the
    /// response mutex behind it) for an unbounded multiple of `timeout`.
    fn write_all(&self, buf: &[u8], timeout: Duration) -> PktResult<()> {
        let deadline = std::time::Instant::now() + timeout;
        let mut comm = self.shared.comm.lock().unwrap();
        let mut sent = 0;
        while sent < buf.len() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(PacketStatus::TimedOut);
            }
            match comm.send(&buf[sent..], remaining) {
                Ok(n) if n > 0 => sent += n,
                Ok(_) => return Err(PacketStatus::BadRequest),
                Err(_) => return Err(PacketStatus::BadRequest),
            }
        }
        Ok(())
    }

    /// Clears a pending transaction without waiting for a terminator —
    /// called by [`crate::pkthandler`] when its own timeout elapses, so a
    /// late terminator doesn't get delivered to the next transaction.
    pub fn cancel_pending(&self) {
        self.shared.pending.lock().unwrap().take();
    }

    /// Signals the receiver thread to stop and joins it. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.events.set_bits(ABORT);
        self.shared.events.wait_any_timeout(ABORTED, true, Duration::from_secs(2));
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PktioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receiver_loop(shared: Arc<Shared>) {
    let mut buf = LineBuffer::new();
    let mut binary: Option<BinaryCapture> = None;

    shared.events.set_bits(STARTED);
    debug!("pktio receiver started");

    loop {
        let woke = shared.events.wait_any(RX_DATA | ABORT, false);
        if woke & ABORT != 0 {
            shared.events.clear_bits(ABORT);
            let _ = shared.comm.lock().unwrap().close();
            shared.events.set_bits(ABORTED);
            debug!("pktio receiver stopped");
            return;
        }
        shared.events.clear_bits(RX_DATA);

        drain(&shared, &mut buf, &mut binary);

        let space = buf.spare_capacity();
        if space == 0 {
            warn!("line buffer full with no progress; discarding");
            buf.clear();
            binary = None;
            continue;
        }

        let mut tmp = vec![0u8; space];
        let read = {
            let mut comm = shared.comm.lock().unwrap();
            comm.recv(&mut tmp, shared.recv_timeout)
        };
        match read {
            Ok(0) => {}
            Ok(n) => {
                buf.extend(&tmp[..n]);
                shared.events.set_bits(RX_DATA);
            }
            Err(_) => error!("comm recv failed"),
        }
    }
}

/// Drains as many complete lines (and, mid-transaction, binary payloads) out
/// of `buf` as are currently available, per §4.1.2-§4.1.4.
fn drain(shared: &Shared, buf: &mut LineBuffer, binary: &mut Option<BinaryCapture>) {
    loop {
        if let Some(capture) = binary {
            if !buf.consume_into(capture) {
                return;
            }
            let finished = binary.take().unwrap();
            let mut guard = shared.pending.lock().unwrap();
            if let Some(p) = guard.as_mut() {
                p.response.items.push(ResponseItem::Data(finished.collected));
            }
            continue;
        }

        if let Some(hook) = &shared.input_hook {
            match hook(buf.unconsumed()) {
                crate::response::InputHookOutcome::Consumed(n) => {
                    if !buf.skip(n) {
                        warn!("input-buffer hook consumed more than available; discarding");
                        buf.clear();
                    }
                    continue;
                }
                crate::response::InputHookOutcome::SizeMismatch => return,
                crate::response::InputHookOutcome::PrefixMismatch => {}
                crate::response::InputHookOutcome::Error => {
                    warn!("input-buffer hook rejected buffer; discarding");
                    buf.clear();
                    return;
                }
            }
        }

        match buf.peek_line() {
            None => return,
            Some((line, consumed)) => {
                if line.trim().is_empty() {
                    buf.skip(consumed);
                    continue;
                }

                match data_prefix_precheck(shared, &line) {
                    Some(DataPrefixOutcome::Found(len)) => {
                        if len > crate::config::MAX_RECV_DATA_LEN {
                            warn!(
                                "data-prefix callback declared an oversized payload ({} bytes); discarding",
                                len
                            );
                            buf.clear();
                            return;
                        }
                        buf.skip(consumed);
                        *binary = Some(BinaryCapture::new(len));
                        continue;
                    }
                    Some(DataPrefixOutcome::Malformed) => {
                        buf.clear();
                        return;
                    }
                    Some(DataPrefixOutcome::SizeMismatch) => {
                        // Leave the line buffered; wait for more bytes and
                        // re-evaluate the same line next time RX_DATA fires.
                        return;
                    }
                    Some(DataPrefixOutcome::NotMatched) | None => {
                        buf.skip(consumed);
                        dispatch_line(shared, &line);
                    }
                }
            }
        }
    }
}

/// Runs the pending command's `data_prefix_callback` against a just-peeked
/// (not yet consumed) line, if the pending command is `MultiDataWoPrefix`
/// and has one registered. `None` means "not applicable; dispatch normally".
fn data_prefix_precheck(shared: &Shared, line: &str) -> Option<DataPrefixOutcome> {
    let guard = shared.pending.lock().unwrap();
    let p = guard.as_ref()?;
    if p.cmd_type != AtCommandType::MultiDataWoPrefix {
        return None;
    }
    let cb = p.data_prefix_callback?;
    drop(guard);
    Some(cb(line))
}

fn dispatch_line(shared: &Shared, line: &str) {
    let (pending_present, prefix_snapshot) = {
        let guard = shared.pending.lock().unwrap();
        match guard.as_ref() {
            Some(p) => (true, p.prefix.clone()),
            None => (false, None),
        }
    };

    let class = at::classify(&shared.table, line, pending_present, prefix_snapshot.as_deref());
    trace!("line {:?} classified as {:?}", line, class);

    match class {
        LineClass::SuccessTerminator => {
            let mut guard = shared.pending.lock().unwrap();
            Shared::finalize_locked(&mut guard, true);
        }
        LineClass::ErrorTerminator => {
            let mut guard = shared.pending.lock().unwrap();
            Shared::finalize_locked(&mut guard, false);
        }
        LineClass::UrcWithPrefix(_) | LineClass::BareUrc => {
            at::dispatch_urc(&shared.table, class, line);
        }
        LineClass::Intermediate => handle_intermediate(shared, line),
        LineClass::Undefined => {
            shared.invoke_undefined(line);
        }
    }
}

fn handle_intermediate(shared: &Shared, line: &str) {
    let mut guard = shared.pending.lock().unwrap();
    let Some(p) = guard.as_mut() else {
        // The transaction finished between classify() and now (only possible
        // if a terminator on a different line raced us, which can't happen
        // on a single receiver thread); treat defensively as undefined.
        drop(guard);
        shared.invoke_undefined(line);
        return;
    };

    // NoResult expects no content at all; a spurious line before the
    // terminator is discarded rather than accumulated (§8).
    if p.cmd_type != AtCommandType::NoResult {
        p.response.items.push(ResponseItem::Line(line.to_string()));
    }

    if p.cmd_type.finalizes_on_content() {
        Shared::finalize_locked(&mut guard, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at::{TokenTable, UrcMapEntry};
    use crate::comm::CommResult;

    struct NullComm;

    impl CommInterface for NullComm {
        fn open(&mut self, _on_readable: Box<dyn Fn() + Send + Sync>) -> CommResult<()> {
            Ok(())
        }
        fn send(&mut self, buf: &[u8], _timeout: Duration) -> CommResult<usize> {
            Ok(buf.len())
        }
        fn recv(&mut self, _buf: &mut [u8], timeout: Duration) -> CommResult<usize> {
            std::thread::sleep(timeout.min(Duration::from_millis(5)));
            Ok(0)
        }
        fn close(&mut self) -> CommResult<()> {
            Ok(())
        }
    }

    fn table() -> TokenTable {
        TokenTable {
            urc_handler_map: vec![UrcMapEntry { prefix: "+CREG", handler: None }],
            success_tokens: &["OK"],
            error_tokens: &["ERROR"],
            urc_tokens_without_prefix: &["RDY"],
            extra_success_tokens: &[],
            prefix: Default::default(),
        }
    }

    #[test]
    fn send_raw_rejects_payload_over_max_send_data_len() {
        let mut engine =
            PktioEngine::start(Box::new(NullComm), table(), &Config::default(), None).unwrap();
        let oversized = vec![0u8; crate::config::MAX_SEND_DATA_LEN + 1];
        let result = engine.send_raw(&oversized, Duration::from_millis(50));
        assert_eq!(result, Err(PacketStatus::BadParam));
        engine.shutdown();
    }
}
