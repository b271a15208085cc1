use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::frame::FrameType;
use crate::{FecController, ProtectionCallback};

/// One recorded update_fec_rates call.
#[derive(Debug, Clone, PartialEq)]
pub struct FecRateUpdate {
    pub estimated_bitrate_bps: u32,
    pub actual_framerate: u32,
    pub fraction_lost: u8,
    pub loss_mask: Vec<bool>,
    pub rtt_ms: i64,
}

/// MockFecController records protection configuration and rate updates. By
/// default update_fec_rates echoes the estimate back; tests can pin a fixed
/// response to simulate protection overhead.
#[derive(Default)]
pub struct MockFecController {
    use_loss_vector_mask: bool,
    rate_response_bps: Mutex<Option<u32>>,
    protection_method: Mutex<Option<(bool, bool)>>,
    encoding_data: Mutex<Option<(u32, u32, usize, usize)>>,
    rate_updates: Mutex<Vec<FecRateUpdate>>,
    encoded_data: Mutex<Vec<(usize, FrameType)>>,
    callback: Mutex<Option<Arc<dyn ProtectionCallback + Send + Sync>>>,
}

impl MockFecController {
    pub fn new(use_loss_vector_mask: bool) -> Self {
        MockFecController {
            use_loss_vector_mask,
            ..Default::default()
        }
    }

    /// Pin the encoder rate returned by update_fec_rates.
    pub fn set_rate_response_bps(&self, bitrate_bps: u32) {
        *self.rate_response_bps.lock().unwrap() = Some(bitrate_bps);
    }

    /// The last (fec_enabled, nack_enabled) pair applied, if any.
    pub fn protection_method(&self) -> Option<(bool, bool)> {
        *self.protection_method.lock().unwrap()
    }

    /// The last (width, height, num_temporal_layers, max_packet_size)
    /// applied, if any.
    pub fn encoding_data(&self) -> Option<(u32, u32, usize, usize)> {
        *self.encoding_data.lock().unwrap()
    }

    pub fn rate_updates(&self) -> Vec<FecRateUpdate> {
        self.rate_updates.lock().unwrap().clone()
    }

    pub fn encoded_data(&self) -> Vec<(usize, FrameType)> {
        self.encoded_data.lock().unwrap().clone()
    }

    pub fn callback(&self) -> Option<Arc<dyn ProtectionCallback + Send + Sync>> {
        self.callback.lock().unwrap().clone()
    }
}

#[async_trait]
impl FecController for MockFecController {
    async fn set_protection_callback(&self, callback: Arc<dyn ProtectionCallback + Send + Sync>) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    async fn set_protection_method(&self, fec_enabled: bool, nack_enabled: bool) {
        *self.protection_method.lock().unwrap() = Some((fec_enabled, nack_enabled));
    }

    async fn set_encoding_data(
        &self,
        width: u32,
        height: u32,
        num_temporal_layers: usize,
        max_packet_size: usize,
    ) {
        *self.encoding_data.lock().unwrap() =
            Some((width, height, num_temporal_layers, max_packet_size));
    }

    async fn update_fec_rates(
        &self,
        estimated_bitrate_bps: u32,
        actual_framerate: u32,
        fraction_lost: u8,
        loss_mask: Vec<bool>,
        rtt_ms: i64,
    ) -> u32 {
        self.rate_updates.lock().unwrap().push(FecRateUpdate {
            estimated_bitrate_bps,
            actual_framerate,
            fraction_lost,
            loss_mask,
            rtt_ms,
        });
        self.rate_response_bps
            .lock()
            .unwrap()
            .unwrap_or(estimated_bitrate_bps)
    }

    async fn update_with_encoded_data(&self, payload_size: usize, frame_type: FrameType) {
        self.encoded_data
            .lock()
            .unwrap()
            .push((payload_size, frame_type));
    }

    fn use_loss_vector_mask(&self) -> bool {
        self.use_loss_vector_mask
    }
}
