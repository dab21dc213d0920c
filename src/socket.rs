//! The socket slot table (§3 "Socket context", §4.4). A fixed-size array of
//! slots mirrors the original's static allocation: no slot is ever heap
//! grown past [`NUM_SOCKET_MAX`], and an id is only ever `Some` once a
//! caller has created it.

use std::time::Duration;

use crate::config::{NUM_SOCKET_MAX, PDN_CONTEXT_ID_MAX, PDN_CONTEXT_ID_MIN};
use crate::error::LibraryStatus;

/// Default per-socket send/recv timeout until `set_sock_opt` overrides it.
const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-socket lifecycle state. A socket is created `Allocated`, moves
/// through `Connecting` while the modem negotiates the link, reaches
/// `Connected` once it confirms, and `Disconnected` once the modem reports
/// the link gone (distinct from `remove`, which frees the slot outright).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Allocated,
    Connecting,
    Connected,
    Disconnected,
}

/// The per-socket event categories of §6.4, fanned out to whatever callback
/// a caller registered on a slot (typically from inside a URC handler
/// registered on the token table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketEvent {
    DataReady,
    OpenResult(bool),
    Closed,
}

/// Invoked with a socket's id and the event that occurred on it.
pub type SocketEventCallback = Box<dyn FnMut(u8, SocketEvent) + Send>;

/// A `set_sock_opt` option value (§4.4). `LocalPort` and `PdnContextId` are
/// rejected once the socket has left `Allocated`; the two timeouts may be
/// changed at any point in the socket's life.
#[derive(Debug, Clone, Copy)]
pub enum SocketOption {
    LocalPort(u16),
    PdnContextId(u8),
    SendTimeout(Duration),
    RecvTimeout(Duration),
}

struct SocketSlot {
    pdn_context_id: u8,
    state: SocketState,
    local_port: Option<u16>,
    send_timeout: Duration,
    recv_timeout: Duration,
    event_callback: Option<SocketEventCallback>,
}

/// Fixed-size table of up to [`NUM_SOCKET_MAX`] sockets, each bound to a PDN
/// context id.
pub struct SocketTable {
    slots: Vec<Option<SocketSlot>>,
}

impl SocketTable {
    pub fn new() -> Self {
        Self {
            slots: (0..NUM_SOCKET_MAX).map(|_| None).collect(),
        }
    }

    fn validate_pdn(pdn_context_id: u8) -> Result<(), LibraryStatus> {
        if (PDN_CONTEXT_ID_MIN..=PDN_CONTEXT_ID_MAX).contains(&pdn_context_id) {
            Ok(())
        } else {
            Err(LibraryStatus::BadParameter)
        }
    }

    /// Allocates the first free slot for `pdn_context_id`, returning its id.
    pub fn create(&mut self, pdn_context_id: u8) -> Result<u8, LibraryStatus> {
        Self::validate_pdn(pdn_context_id)?;
        let index = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(LibraryStatus::NoMemory)?;
        self.slots[index] = Some(SocketSlot {
            pdn_context_id,
            state: SocketState::Allocated,
            local_port: None,
            send_timeout: DEFAULT_SOCKET_TIMEOUT,
            recv_timeout: DEFAULT_SOCKET_TIMEOUT,
            event_callback: None,
        });
        Ok(index as u8)
    }

    pub fn is_valid(&self, id: u8) -> bool {
        self.slots
            .get(id as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    pub fn remove(&mut self, id: u8) -> Result<(), LibraryStatus> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(LibraryStatus::BadParameter)?;
        if slot.take().is_none() {
            return Err(LibraryStatus::BadParameter);
        }
        Ok(())
    }

    pub fn mark_connecting(&mut self, id: u8) -> Result<(), LibraryStatus> {
        self.set_state(id, SocketState::Connecting)
    }

    pub fn mark_connected(&mut self, id: u8) -> Result<(), LibraryStatus> {
        self.set_state(id, SocketState::Connected)
    }

    pub fn mark_disconnected(&mut self, id: u8) -> Result<(), LibraryStatus> {
        self.set_state(id, SocketState::Disconnected)
    }

    fn set_state(&mut self, id: u8, state: SocketState) -> Result<(), LibraryStatus> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(LibraryStatus::BadParameter)?;
        slot.state = state;
        Ok(())
    }

    pub fn state(&self, id: u8) -> Option<SocketState> {
        self.slots.get(id as usize)?.as_ref().map(|s| s.state)
    }

    pub fn pdn_context_id(&self, id: u8) -> Option<u8> {
        self.slots.get(id as usize)?.as_ref().map(|s| s.pdn_context_id)
    }

    pub fn local_port(&self, id: u8) -> Option<Option<u16>> {
        self.slots.get(id as usize)?.as_ref().map(|s| s.local_port)
    }

    /// Applies one `set_sock_opt` option to `id`. `LocalPort` and
    /// `PdnContextId` are rejected with [`LibraryStatus::BadParameter`]
    /// once the socket has left `Allocated` (§4.4).
    pub fn set_sock_opt(&mut self, id: u8, option: SocketOption) -> Result<(), LibraryStatus> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(LibraryStatus::BadParameter)?;

        match option {
            SocketOption::LocalPort(port) => {
                if slot.state != SocketState::Allocated {
                    return Err(LibraryStatus::BadParameter);
                }
                slot.local_port = Some(port);
            }
            SocketOption::PdnContextId(pdn_context_id) => {
                if slot.state != SocketState::Allocated {
                    return Err(LibraryStatus::BadParameter);
                }
                Self::validate_pdn(pdn_context_id)?;
                slot.pdn_context_id = pdn_context_id;
            }
            SocketOption::SendTimeout(timeout) => slot.send_timeout = timeout,
            SocketOption::RecvTimeout(timeout) => slot.recv_timeout = timeout,
        }
        Ok(())
    }

    pub fn set_event_callback(&mut self, id: u8, cb: SocketEventCallback) -> Result<(), LibraryStatus> {
        let slot = self
            .slots
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(LibraryStatus::BadParameter)?;
        slot.event_callback = Some(cb);
        Ok(())
    }

    /// Invokes the registered event callback for `id`, if any. No-op if the
    /// slot is free or has no callback registered. `Closed` also frees the
    /// slot, matching `remove`'s effect.
    pub fn notify(&mut self, id: u8, event: SocketEvent) {
        if let Some(Some(slot)) = self.slots.get_mut(id as usize) {
            if let Some(cb) = &mut slot.event_callback {
                cb(id, event);
            }
        }
        if event == SocketEvent::Closed {
            let _ = self.remove(id);
        }
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}
