//! Module E: the common runtime context (§4.4) and the small numeric
//! helpers vendor modules build signal-quality reporting on top of.

use std::sync::Mutex;

use crate::at::TokenTable;
use crate::comm::CommInterface;
use crate::config::Config;
use crate::error::{LibResult, LibraryStatus, PacketStatus};
use crate::pkthandler::{AtRequest, PktHandler};
use crate::pktio::PktioEngine;
use crate::response::{AtResponse, InputBufferHook, UndefinedResponseCallback};
use crate::socket::SocketTable;

/// The lifecycle flags §3 documents as guarded by the library-status mutex.
struct Flags {
    opened: bool,
    shutdown: bool,
    closing: bool,
    pktio_up: bool,
}

/// Owns every piece of per-modem state: the transaction handler, the socket
/// slot table, and the configuration it was built with. Dropping a context
/// tears down the receiver thread and closes the comm interface.
pub struct CellularContext {
    pub handler: PktHandler,
    pub sockets: SocketTable,
    config: Config,
    flags: Mutex<Flags>,
}

impl CellularContext {
    /// Opens `comm`, spawns the receiver thread and validates `table`.
    /// Fails with [`LibraryStatus::BadParameter`] (and spawns no thread) if
    /// `table` is missing any required token list (§6.2).
    pub fn new(
        comm: Box<dyn CommInterface>,
        table: TokenTable,
        config: Config,
        input_hook: Option<InputBufferHook>,
    ) -> LibResult<Self> {
        let engine = PktioEngine::start(comm, table, &config, input_hook).map_err(|e| {
            let hint = match e {
                PacketStatus::BadParam => Some(LibraryStatus::BadParameter),
                PacketStatus::CreationFail => Some(LibraryStatus::InternalFailure),
                _ => None,
            };
            e.to_library_hint(hint)
        })?;
        Ok(Self {
            handler: PktHandler::new(engine),
            sockets: SocketTable::new(),
            config,
            flags: Mutex::new(Flags {
                opened: true,
                shutdown: false,
                closing: false,
                pktio_up: true,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.flags.lock().unwrap().opened
    }

    pub fn set_undefined_response_callback(&self, cb: UndefinedResponseCallback) {
        self.handler.set_undefined_response_callback(cb);
    }

    /// Runs an AT transaction with this context's default command timeout.
    pub fn send_with_callback<T>(
        &self,
        request: AtRequest,
        parse: impl FnOnce(&AtResponse) -> Result<T, crate::error::PacketStatus>,
    ) -> LibResult<T> {
        self.handler.send_with_callback(request, parse)
    }

    /// Tears down pktio and marks the context closed. Safe to call more than
    /// once: once `pktio_up` is false, later calls are a no-op (§4.4).
    pub fn shutdown(&mut self) {
        {
            let mut flags = self.flags.lock().unwrap();
            if !flags.pktio_up {
                return;
            }
            flags.closing = true;
        }

        self.handler.shutdown();

        let mut flags = self.flags.lock().unwrap();
        flags.pktio_up = false;
        flags.opened = false;
        flags.closing = false;
        flags.shutdown = true;
    }
}

/// Converts a raw `+CSQ` RSSI value (0-31, 99 for unknown) into dBm per
/// 3GPP TS 27.007. Returns `None` for 99 and any other out-of-range raw
/// value.
pub fn convert_csq_rssi(raw: i32) -> Option<i32> {
    match raw {
        0 => Some(-113),
        1 => Some(-111),
        2..=30 => Some(-109 + 2 * (raw - 2)),
        31 => Some(-51),
        _ => None,
    }
}

/// `rxqualValueToBerTable`: raw BER class 0-7 to bit-error-rate in parts per
/// mille.
const BER_TABLE_PARTS_PER_MILLE: [u16; 8] = [14, 28, 57, 113, 226, 453, 905, 1810];

/// Converts a raw `+CSQ` BER class (0-7, 99 for unknown) into its
/// bit-error-rate in parts per mille, via the lookup table.
pub fn convert_csq_ber(raw: i32) -> Option<u16> {
    usize::try_from(raw).ok().and_then(|i| BER_TABLE_PARTS_PER_MILLE.get(i)).copied()
}

/// Radio access technology a signal reading was taken under; determines
/// which table and which raw reading (RSSI vs RSRP) `compute_signal_bars`
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rat {
    Gsm,
    Edge,
    Lte,
    Catm1,
    NbIot,
    /// Any RAT this driver has no signal-bars table for (e.g. WCDMA).
    Other,
}

/// `(upper_threshold_dbm, bars)`, ascending by threshold; the last entry's
/// `0` threshold catches every remaining (negative) dBm value.
type SignalBarsTable = [(i32, u8); 5];

const GSM_EDGE_RSSI_BARS: SignalBarsTable = [(-104, 1), (-98, 2), (-89, 3), (-80, 4), (0, 5)];
const LTE_RSRP_BARS: SignalBarsTable = [(-115, 1), (-105, 2), (-95, 3), (-85, 4), (0, 5)];

/// Buckets a signal reading into a 1-5 bar count per §4.4's RAT-specific
/// tables (GSM/EDGE against RSSI, LTE/CAT-M1/NB-IoT against RSRP). Returns
/// `None` for an unknown/unsupported RAT, a missing reading, or a reading
/// above every table entry's threshold.
pub fn compute_signal_bars(rat: Rat, dbm: Option<i32>) -> Option<u8> {
    let dbm = dbm?;
    let table = match rat {
        Rat::Gsm | Rat::Edge => GSM_EDGE_RSSI_BARS,
        Rat::Lte | Rat::Catm1 | Rat::NbIot => LTE_RSRP_BARS,
        Rat::Other => return None,
    };
    table.iter().find(|(threshold, _)| dbm <= *threshold).map(|(_, bars)| *bars)
}
