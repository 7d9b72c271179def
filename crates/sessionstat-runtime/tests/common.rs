//! Shared helpers for runtime integration tests.
#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender, bounded};
use sessionstat_runtime::Clock;
use std::time::{Duration, Instant};

/// Clock that parks the first caller until `open` is called, then behaves
/// like a fixed clock. Lets a test hold the registrar worker mid-insert.
pub struct GateClock {
    now: i64,
    entered_tx: Sender<()>,
    entered_rx: Receiver<()>,
    release_rx: Receiver<()>,
    release_tx: std::sync::Mutex<Option<Sender<()>>>,
}

impl GateClock {
    pub fn new(now: i64) -> Self {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(0);
        Self {
            now,
            entered_tx,
            entered_rx,
            release_rx,
            release_tx: std::sync::Mutex::new(Some(release_tx)),
        }
    }

    /// Blocks until some thread is parked inside `now_millis`.
    pub fn wait_entered(&self) {
        self.entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker never reached the clock");
    }

    /// Lets every current and future caller through.
    pub fn open(&self) {
        self.release_tx.lock().unwrap().take();
    }
}

impl Clock for GateClock {
    fn now_millis(&self) -> i64 {
        let _ = self.entered_tx.try_send(());
        // Returns once the sender is dropped by `open`.
        let _ = self.release_rx.recv();
        self.now
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
