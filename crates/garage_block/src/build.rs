//! Background prefab unpacking.
//!
//! Decoding a large prefab's bodies can take long enough to hitch a frame,
//! so it runs on a worker thread behind a cancel flag. At most one build
//! per block is live; starting a new one cancels the old, and a cancelled
//! build never publishes its result.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use garage_core::prefab::decode_body;
use garage_core::{BodySpec, Prefab};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Handle to one in-flight unpack.
pub struct PreviewBuild {
    cancel: Arc<AtomicBool>,
    rx: Receiver<Vec<BodySpec>>,
}

impl PreviewBuild {
    /// Kick off unpacking on a worker thread.
    pub fn start(source: Prefab) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded(1);
        let flag = Arc::clone(&cancel);
        thread::spawn(move || run_build(&source, &flag, &tx));
        Self { cancel, rx }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Non-blocking poll for the finished body list. A cancelled or failed
    /// build leaves the channel empty forever.
    pub fn poll(&self) -> Option<Vec<BodySpec>> {
        match self.rx.try_recv() {
            Ok(bodies) => Some(bodies),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for PreviewBuild {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_build(source: &Prefab, cancel: &AtomicBool, tx: &Sender<Vec<BodySpec>>) {
    let mut bodies = Vec::with_capacity(source.body_count());
    for payload in &source.bodies {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        match decode_body(payload) {
            Ok(mut spec) => {
                spec.normalize_for_spawn();
                bodies.push(spec);
            }
            Err(e) => {
                tracing::error!(prefab = %source.name, "undecodable stored body: {}", e);
                return;
            }
        }
    }
    // last gate before publishing
    if cancel.load(Ordering::Relaxed) {
        return;
    }
    let _ = tx.send(bodies);
}
