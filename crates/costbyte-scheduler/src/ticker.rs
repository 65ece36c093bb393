//! Cancellable fixed-period loop shared by the three background loops.
//!
//! A cycle runs, then the loop sleeps for the period. Shutdown is checked
//! before every cycle and interrupts the sleep. A cycle already running is
//! never interrupted.

use std::future::Future;
use std::time::Duration;

use costbyte_core::error::Result;
use tokio::sync::watch;

/// Owner side of the shutdown signal.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A receiver for one loop.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Ask every loop to stop.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Loop side of the shutdown signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested or the owner is gone.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Drive `cycle` every `period` until shutdown.
///
/// Non-fatal cycle errors are logged and the loop waits for the next tick.
/// A `LoopFatal` error ends the loop and is returned to the caller.
pub async fn run_periodic<F, Fut>(
    name: &str,
    period: Duration,
    mut shutdown: ShutdownSignal,
    mut cycle: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    tracing::info!("⏰ {name} loop started (every {}s)", period.as_secs());

    loop {
        if shutdown.is_triggered() {
            break;
        }

        match cycle().await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                tracing::error!("❌ {name} loop stopped: {e}");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("⚠️ {name} cycle aborted, retrying next tick: {e}");
            }
        }

        tokio::select! {
            _ = shutdown.wait() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }

    tracing::info!("🛑 {name} loop stopped");
    Ok(())
}
