//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts one shutdown signal to every long-running task: the HTTP
/// server, the health monitor, and the retry workers.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe before spawning the task that will listen.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Sending with no live receivers is not an error;
    /// tasks may have already exited.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Tasks still holding a live receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
