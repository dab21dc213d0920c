//! Module D: the pkthandler transaction protocol (§4.2). Every caller
//! thread funnels through [`PktHandler::send_with_callback`], which enforces
//! the single-outstanding-command invariant and translates pktio's internal
//! [`PacketStatus`] into the [`LibraryStatus`] callers actually see.

use std::sync::Mutex;
use std::time::Duration;

use crate::error::{LibraryStatus, LibResult, PacketStatus};
use crate::fmt::warn;
use crate::pktio::{OutgoingCommand, PktioEngine};
use crate::response::{AtCommandType, AtResponse, DataPrefixFn, SendDataPrefixFn, UndefinedResponseCallback};

/// One AT transaction: the bytes to send and everything pktio needs to
/// frame and terminate its response.
pub struct AtRequest {
    pub command: Vec<u8>,
    pub cmd_type: AtCommandType,
    pub response_prefix: Option<String>,
    pub data_prefix_callback: Option<DataPrefixFn>,
    pub send_data_prefix_callback: Option<SendDataPrefixFn>,
    pub timeout: Duration,
    /// If true, the parse callback runs even when the modem terminated the
    /// transaction with an error token — some commands want to inspect the
    /// error body rather than just seeing it collapse to a status code.
    pub handle_errors: bool,
}

impl AtRequest {
    /// A request for `command`, using the crate's default command timeout.
    pub fn new(command: impl Into<Vec<u8>>, cmd_type: AtCommandType) -> Self {
        Self {
            command: command.into(),
            cmd_type,
            response_prefix: None,
            data_prefix_callback: None,
            send_data_prefix_callback: None,
            timeout: crate::response::DEFAULT_TRANSACTION_TIMEOUT,
            handle_errors: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.response_prefix = Some(prefix.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Module D's public handle. Owns the [`PktioEngine`] and the response mutex
/// that serializes callers down to one outstanding command at a time.
pub struct PktHandler {
    engine: PktioEngine,
    response_mutex: Mutex<()>,
}

impl PktHandler {
    pub fn new(engine: PktioEngine) -> Self {
        Self {
            engine,
            response_mutex: Mutex::new(()),
        }
    }

    pub fn set_undefined_response_callback(&self, cb: UndefinedResponseCallback) {
        self.engine.set_undefined_response_callback(cb);
    }

    /// Sends `request` and, on a successful (or `handle_errors`-opted-in)
    /// termination, runs `parse` against the accumulated response. Blocks
    /// the calling thread for up to `request.timeout`.
    ///
    /// This is the one place the response mutex is held: acquiring it is
    /// what makes "exactly one outstanding command" true across caller
    /// threads, matching §4.2.1.
    pub fn send_with_callback<T>(
        &self,
        request: AtRequest,
        parse: impl FnOnce(&AtResponse) -> Result<T, PacketStatus>,
    ) -> LibResult<T> {
        let _guard = self.response_mutex.lock().unwrap();

        let timeout = request.timeout;
        let handle_errors = request.handle_errors;
        let outgoing = OutgoingCommand {
            command: request.command,
            cmd_type: request.cmd_type,
            response_prefix: request.response_prefix,
            data_prefix_callback: request.data_prefix_callback,
            send_data_prefix_callback: request.send_data_prefix_callback,
            send_timeout: timeout,
        };

        let rx = self.engine.submit(outgoing).map_err(|e| {
            let hint = match e {
                PacketStatus::BadParam => Some(LibraryStatus::BadParameter),
                _ => None,
            };
            e.to_library_hint(hint)
        })?;

        match rx.recv_timeout(timeout) {
            Ok(response) => {
                if response.success || handle_errors {
                    parse(&response).map_err(|e| e.to_library())
                } else {
                    Err(PacketStatus::Failure.to_library())
                }
            }
            Err(_) => {
                warn!("transaction timed out waiting for a terminator");
                self.engine.cancel_pending();
                Err(LibraryStatus::Timeout)
            }
        }
    }

    /// A transaction whose only interesting outcome is success/failure —
    /// the common case for `NoResult` commands.
    pub fn send(&self, request: AtRequest) -> LibResult<()> {
        self.send_with_callback(request, |_| Ok(()))
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}
