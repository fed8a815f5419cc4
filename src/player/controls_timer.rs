//! Auto-hide timer for the on-screen controls
//!
//! Each arm spawns one sleeping task tagged with a generation number.
//! Re-arming cancels the previous task, and a late message from a cancelled
//! generation is ignored by the receiver, so at most one timer is ever live.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

pub struct AutoHideTimer {
    delay: Duration,
    generation: u64,
    cancel: Option<CancellationToken>,
    tx: mpsc::UnboundedSender<u64>,
}

impl AutoHideTimer {
    /// Create a timer that reports idle generations on the returned receiver
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                generation: 0,
                cancel: None,
                tx,
            },
            rx,
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` is the one currently armed
    pub fn is_current(&self, generation: u64) -> bool {
        self.cancel.is_some() && generation == self.generation
    }

    /// Restart the countdown
    pub fn arm(&mut self) {
        self.cancel();
        self.generation += 1;

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; controls will not auto-hide");
            return;
        };

        let token = CancellationToken::new();
        let generation = self.generation;
        let delay = self.delay;
        let tx = self.tx.clone();
        let task_token = token.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    trace!("Controls timer {} cancelled", generation);
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(generation);
                }
            }
        });
        self.cancel = Some(token);
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

impl Drop for AutoHideTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
