// Trailing-edge debounce on top of a tokio task

use crate::utils::{IceError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

/// Collapses bursts of `trigger` calls into one run of the action,
/// `delay` after the last call of the burst.
///
/// Handles are cheap to clone; the worker stops once every handle is dropped.
/// A burst still pending at that moment is flushed.
#[derive(Clone)]
pub struct Debouncer {
    sender: mpsc::UnboundedSender<()>,
    delay: Duration,
}

impl Debouncer {
    /// Spawn the debounce worker on the current tokio runtime.
    pub fn new<F, Fut>(delay: Duration, action: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| IceError::Watch(format!("Debouncer needs a tokio runtime: {}", e)))?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<()>();

        handle.spawn(async move {
            while receiver.recv().await.is_some() {
                let mut closed = false;
                loop {
                    match tokio::time::timeout(delay, receiver.recv()).await {
                        // Another trigger inside the window restarts the wait.
                        Ok(Some(())) => continue,
                        Ok(None) => {
                            closed = true;
                            break;
                        }
                        Err(_) => break,
                    }
                }

                action().await;

                if closed {
                    return;
                }
            }
        });

        Ok(Self { sender, delay })
    }

    pub fn trigger(&self) {
        // The worker only goes away when all senders are gone.
        let _ = self.sender.send(());
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
