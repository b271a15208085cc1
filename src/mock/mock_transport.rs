use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{PacketFeedbackObserver, TransportController};

/// MockTransportController records pacing configuration and packet feedback
/// observer registrations.
#[derive(Default)]
pub struct MockTransportController {
    alr_probing: Mutex<Vec<bool>>,
    pacing_factor: Mutex<Option<f64>>,
    queue_time_limit_ms: Mutex<Option<i64>>,
    feedback_observer: Mutex<Option<Arc<dyn PacketFeedbackObserver + Send + Sync>>>,
    deregister_calls: AtomicUsize,
}

impl MockTransportController {
    pub fn new() -> Self {
        MockTransportController::default()
    }

    /// Every enable_periodic_alr_probing argument, in call order.
    pub fn alr_probing_calls(&self) -> Vec<bool> {
        self.alr_probing.lock().unwrap().clone()
    }

    pub fn pacing_factor(&self) -> Option<f64> {
        *self.pacing_factor.lock().unwrap()
    }

    pub fn queue_time_limit_ms(&self) -> Option<i64> {
        *self.queue_time_limit_ms.lock().unwrap()
    }

    pub fn feedback_observer(&self) -> Option<Arc<dyn PacketFeedbackObserver + Send + Sync>> {
        self.feedback_observer.lock().unwrap().clone()
    }

    pub fn deregister_calls(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportController for MockTransportController {
    async fn enable_periodic_alr_probing(&self, enable: bool) {
        self.alr_probing.lock().unwrap().push(enable);
    }

    async fn set_pacing_factor(&self, factor: f64) {
        *self.pacing_factor.lock().unwrap() = Some(factor);
    }

    async fn set_queue_time_limit(&self, limit_ms: i64) {
        *self.queue_time_limit_ms.lock().unwrap() = Some(limit_ms);
    }

    async fn register_packet_feedback_observer(
        &self,
        observer: Arc<dyn PacketFeedbackObserver + Send + Sync>,
    ) {
        *self.feedback_observer.lock().unwrap() = Some(observer);
    }

    async fn deregister_packet_feedback_observer(
        &self,
        _observer: Arc<dyn PacketFeedbackObserver + Send + Sync>,
    ) {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);
        *self.feedback_observer.lock().unwrap() = None;
    }
}
