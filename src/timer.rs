//! Rearmable idle timer.
//!
//! Each arming spawns a sleeper task tagged with a generation number.
//! Cancelling or rearming bumps the generation, so a stale sleeper that
//! fires after being superseded is ignored at delivery time.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) struct IdleTimer {
    generation: u64,
    armed: bool,
    sleeper: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<u64>,
    rx: mpsc::UnboundedReceiver<u64>,
}

impl IdleTimer {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generation: 0,
            armed: false,
            sleeper: None,
            tx,
            rx,
        }
    }

    /// Arm the timer, superseding any previous arming.
    pub(crate) fn arm(&mut self, delay: Duration) {
        self.cancel();
        self.generation += 1;
        self.armed = true;

        let generation = self.generation;
        let tx = self.tx.clone();
        tracing::trace!(generation, ?delay, "idle timer armed");
        self.sleeper = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(generation);
        }));
    }

    /// Revoke the armed deadline, if any.
    pub(crate) fn cancel(&mut self) {
        if self.armed {
            tracing::trace!(generation = self.generation, "idle timer cancelled");
        }
        self.armed = false;
        self.generation += 1;
        if let Some(sleeper) = self.sleeper.take() {
            sleeper.abort();
        }
    }

    /// Whether a delivered fire is the one currently armed.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.armed && generation == self.generation
    }

    /// Mark the current arming as consumed (after a current fire).
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
        self.sleeper = None;
    }

    /// Next fire notification. Pends forever while nothing is armed.
    pub(crate) async fn fired(&mut self) -> u64 {
        loop {
            if let Some(generation) = self.rx.recv().await {
                return generation;
            }
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        if let Some(sleeper) = self.sleeper.take() {
            sleeper.abort();
        }
    }
}
