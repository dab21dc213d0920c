//! A loopback comm interface shared by the end-to-end tests: an in-memory
//! wire with one side driven by the driver thread (pushing "modem" bytes)
//! and the other read by whatever holds the [`WireComm`] handle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cellular_at_core::comm::{CommInterface, CommResult};

pub struct Wire {
    to_modem: Mutex<Vec<u8>>,
    from_modem: Mutex<VecDeque<u8>>,
    on_readable: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl Wire {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            to_modem: Mutex::new(Vec::new()),
            from_modem: Mutex::new(VecDeque::new()),
            on_readable: Mutex::new(None),
        })
    }

    /// Queues bytes as if the modem had just transmitted them, and wakes the
    /// receiver thread the same way a real transport's interrupt would.
    pub fn push_from_modem(self: &Arc<Self>, data: &[u8]) {
        self.from_modem.lock().unwrap().extend(data.iter().copied());
        if let Some(cb) = self.on_readable.lock().unwrap().as_ref() {
            cb();
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.to_modem.lock().unwrap().clone()
    }
}

pub struct WireComm(pub Arc<Wire>);

impl CommInterface for WireComm {
    fn open(&mut self, on_readable: Box<dyn Fn() + Send + Sync>) -> CommResult<()> {
        *self.0.on_readable.lock().unwrap() = Some(Arc::from(on_readable));
        Ok(())
    }

    fn send(&mut self, buf: &[u8], _timeout: Duration) -> CommResult<usize> {
        self.0.to_modem.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> CommResult<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut q = self.0.from_modem.lock().unwrap();
                if !q.is_empty() {
                    let n = q.len().min(buf.len());
                    for slot in buf.iter_mut().take(n) {
                        *slot = q.pop_front().unwrap();
                    }
                    return Ok(n);
                }
            }
            if Instant::now() >= deadline {
                return Ok(0);
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn close(&mut self) -> CommResult<()> {
        Ok(())
    }
}
