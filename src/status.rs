use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};

pub const LOADING_MESSAGES: &[&str] = &[
    "Analyzing your model photo...",
    "Studying the product details...",
    "Setting up the lighting...",
    "Composing the scene...",
    "Placing the product...",
    "Adding the finishing touches...",
];

/// Message shown on the `tick`-th rotation.
pub fn message_at(tick: usize) -> &'static str {
    LOADING_MESSAGES[tick % LOADING_MESSAGES.len()]
}

/// Cycles [`LOADING_MESSAGES`] on a fixed interval while a generation runs.
/// Purely cosmetic; nothing reads it except the renderer.
pub struct StatusTicker {
    rx: watch::Receiver<&'static str>,
    handle: JoinHandle<()>,
}

impl StatusTicker {
    pub fn start(interval: Duration) -> Self {
        let (tx, rx) = watch::channel(message_at(0));
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            // the first tick completes immediately
            ticks.tick().await;
            let mut tick = 0usize;
            loop {
                ticks.tick().await;
                tick += 1;
                if tx.send(message_at(tick)).is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    pub fn current(&self) -> &'static str {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<&'static str> {
        self.rx.clone()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
