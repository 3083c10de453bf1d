use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Installs a ctrl-c handler and hands out a token the main loop can await.
pub struct ShutdownHandler {
    notify: Arc<Notify>,
    triggered: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct ShutdownToken {
    notify: Arc<Notify>,
    triggered: Arc<AtomicBool>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn install(self) -> ShutdownToken {
        let notify = Arc::clone(&self.notify);
        let triggered = Arc::clone(&self.triggered);
        tokio::spawn({
            let notify = Arc::clone(&notify);
            let triggered = Arc::clone(&triggered);
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Ctrl-C received, requesting shutdown");
                    triggered.store(true, Ordering::SeqCst);
                    notify.notify_waiters();
                }
            }
        });
        ShutdownToken { notify, triggered }
    }
}

impl ShutdownToken {
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Request shutdown from inside the process (key handler, fatal error).
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let token = ShutdownHandler::new().install().await;
        assert!(!token.is_triggered());
        token.trigger();
        token.wait().await;
        assert!(token.is_triggered());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_triggered() {
        let token = ShutdownHandler::new().install().await;
        token.trigger();
        // Must not hang even though the notification already fired.
        tokio::time::timeout(std::time::Duration::from_secs(1), token.wait())
            .await
            .expect("wait() should return for an already-triggered token");
    }
}
