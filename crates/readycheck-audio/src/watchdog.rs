use parking_lot::RwLock;
use readycheck_foundation::SharedClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Flags a stalled capture stream: if the callback stops feeding for longer
/// than the timeout, the probe reports the device as dead instead of sitting
/// on a silent meter forever.
#[derive(Clone)]
pub struct WatchdogTimer {
    timeout: Duration,
    clock: SharedClock,
    last_feed: Arc<RwLock<Option<std::time::Instant>>>,
    triggered: Arc<AtomicBool>,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl WatchdogTimer {
    pub fn new(timeout: Duration, clock: SharedClock) -> Self {
        Self {
            timeout,
            clock,
            last_feed: Arc::new(RwLock::new(None)),
            triggered: Arc::new(AtomicBool::new(false)),
            handle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn start(&mut self, running: Arc<AtomicBool>) {
        *self.last_feed.write() = Some(self.clock.now());

        let watchdog = self.clone();
        let handle = thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(500));
                if watchdog.expired() && !watchdog.triggered.load(Ordering::SeqCst) {
                    tracing::error!(
                        "Watchdog timeout! No audio data for over {:?}",
                        watchdog.timeout
                    );
                    watchdog.triggered.store(true, Ordering::SeqCst);
                }
            }
        });

        *self.handle.write() = Some(handle);
    }

    /// True when the last feed is older than the timeout.
    pub fn expired(&self) -> bool {
        let guard = self.last_feed.read();
        match *guard {
            Some(last) => self.clock.now().duration_since(last) > self.timeout,
            None => false,
        }
    }

    pub fn feed(&self) {
        *self.last_feed.write() = Some(self.clock.now());
        self.triggered.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.write().take() {
            let _ = handle.join();
        }
        self.triggered.store(false, Ordering::SeqCst);
        *self.last_feed.write() = None;
    }
}
