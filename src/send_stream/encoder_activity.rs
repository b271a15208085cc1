use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use waitgroup::Worker;

use super::VideoSendStreamInternal;

/// How long the encoder may stay silent before the stream stops consuming
/// bitrate allocation.
pub(crate) const ENCODER_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchdogState {
    Active,
    TimedOut,
}

/// EncoderActivityMonitor tracks when the encoder last produced a frame.
/// The encoder callback, possibly several hardware encoder threads in
/// parallel, sets a single activity bit; a periodic task inspects and clears
/// it every [`ENCODER_TIMEOUT`].
pub(crate) struct EncoderActivityMonitor {
    saw_activity: AtomicBool,
    valid: AtomicBool,
    close_tx: SyncMutex<Option<mpsc::Sender<()>>>,
}

impl EncoderActivityMonitor {
    /// on_frame marks the encoder as alive. Lock-free; called from any
    /// encoder thread.
    pub(crate) fn on_frame(&self) {
        self.saw_activity.store(true, Ordering::Release);
    }

    fn take_activity(&self) -> bool {
        self.saw_activity.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// stop invalidates the monitor and lets its task exit. The validity bit
    /// is cleared while the caller holds the structural state, so a tick that
    /// is already in flight observes it there and no-ops instead of touching
    /// a stream that moved on.
    pub(crate) fn stop(&self) {
        self.valid.store(false, Ordering::Release);
        let mut close_tx = self.close_tx.lock().unwrap();
        close_tx.take();
    }
}

/// spawn starts the periodic liveness check and returns the monitor the
/// frame path should feed.
pub(crate) fn spawn(
    stream: Weak<VideoSendStreamInternal>,
    worker: Option<Worker>,
) -> Arc<EncoderActivityMonitor> {
    let (close_tx, close_rx) = mpsc::channel(1);
    let monitor = Arc::new(EncoderActivityMonitor {
        saw_activity: AtomicBool::new(false),
        valid: AtomicBool::new(true),
        close_tx: SyncMutex::new(Some(close_tx)),
    });

    let monitor2 = Arc::clone(&monitor);
    tokio::spawn(async move {
        let _worker = worker;
        run(stream, monitor2, close_rx).await;
    });

    monitor
}

async fn run(
    stream: Weak<VideoSendStreamInternal>,
    monitor: Arc<EncoderActivityMonitor>,
    mut close_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(ENCODER_TIMEOUT);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    let mut state = WatchdogState::Active;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stream = match stream.upgrade() {
                    Some(stream) => stream,
                    None => return,
                };
                if !monitor.take_activity() {
                    if state == WatchdogState::Active {
                        stream.on_encoder_timed_out(&monitor).await;
                    }
                    state = WatchdogState::TimedOut;
                } else if state == WatchdogState::TimedOut {
                    stream.on_encoder_active(&monitor).await;
                    state = WatchdogState::Active;
                }
            }
            _ = close_rx.recv() => {
                return;
            }
        }
    }
}
