use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::VideoStreamEncoder;

/// MockVideoStreamEncoder records every rate update and keyframe request.
#[derive(Default)]
pub struct MockVideoStreamEncoder {
    rate_updates: Mutex<Vec<(u32, u8, i64)>>,
    key_frame_requests: AtomicUsize,
    start_bitrate_bps: AtomicU32,
}

impl MockVideoStreamEncoder {
    pub fn new() -> Self {
        MockVideoStreamEncoder::default()
    }

    /// (target_bitrate_bps, fraction_lost, rtt_ms) tuples, in call order.
    pub fn rate_updates(&self) -> Vec<(u32, u8, i64)> {
        self.rate_updates.lock().unwrap().clone()
    }

    pub fn last_rate_update(&self) -> Option<(u32, u8, i64)> {
        self.rate_updates.lock().unwrap().last().copied()
    }

    pub fn key_frame_requests(&self) -> usize {
        self.key_frame_requests.load(Ordering::SeqCst)
    }

    pub fn start_bitrate_bps(&self) -> u32 {
        self.start_bitrate_bps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoStreamEncoder for MockVideoStreamEncoder {
    async fn on_bitrate_updated(&self, target_bitrate_bps: u32, fraction_lost: u8, rtt_ms: i64) {
        self.rate_updates
            .lock()
            .unwrap()
            .push((target_bitrate_bps, fraction_lost, rtt_ms));
    }

    async fn send_key_frame(&self) {
        self.key_frame_requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn set_start_bitrate(&self, start_bitrate_bps: u32) {
        self.start_bitrate_bps
            .store(start_bitrate_bps, Ordering::SeqCst);
    }
}
