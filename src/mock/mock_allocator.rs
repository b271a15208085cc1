use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{AllocationConfig, BitrateAllocator, BitrateAllocatorObserver};

/// MockBitrateAllocator records observer registrations and hands out a fixed
/// start bitrate. The most recently registered observer is kept so tests can
/// drive rate samples through it.
#[derive(Default)]
pub struct MockBitrateAllocator {
    start_bitrate_bps: u32,
    configs: Mutex<Vec<AllocationConfig>>,
    remove_calls: AtomicUsize,
    observer: Mutex<Option<Arc<dyn BitrateAllocatorObserver + Send + Sync>>>,
}

impl MockBitrateAllocator {
    pub fn new(start_bitrate_bps: u32) -> Self {
        MockBitrateAllocator {
            start_bitrate_bps,
            ..Default::default()
        }
    }

    /// Every config passed to add_observer, in call order.
    pub fn configs(&self) -> Vec<AllocationConfig> {
        self.configs.lock().unwrap().clone()
    }

    pub fn add_calls(&self) -> usize {
        self.configs.lock().unwrap().len()
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self) -> bool {
        self.observer.lock().unwrap().is_some()
    }

    pub fn observer(&self) -> Option<Arc<dyn BitrateAllocatorObserver + Send + Sync>> {
        self.observer.lock().unwrap().clone()
    }
}

#[async_trait]
impl BitrateAllocator for MockBitrateAllocator {
    async fn add_observer(
        &self,
        observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>,
        config: AllocationConfig,
    ) {
        self.configs.lock().unwrap().push(config);
        *self.observer.lock().unwrap() = Some(observer);
    }

    async fn remove_observer(&self, _observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>) {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        *self.observer.lock().unwrap() = None;
    }

    async fn start_bitrate(
        &self,
        _observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>,
    ) -> u32 {
        self.start_bitrate_bps
    }
}
