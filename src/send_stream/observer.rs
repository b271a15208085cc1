//! The stream presents several independent callback contracts to unrelated
//! collaborators. Each is a separate small object holding only a non-owning
//! reference back to the stream, registered individually with the
//! collaborator that needs it; a callback arriving after the stream is gone
//! silently no-ops.

use std::sync::Weak;

use async_trait::async_trait;

use super::VideoSendStreamInternal;
use crate::error::Result;
use crate::{
    BitrateAllocatorObserver, FecProtectionParams, OverheadObserver, PacketFeedback,
    PacketFeedbackObserver, ProtectionCallback, ProtectionRates, RateSample,
};

/// RateUpdateObserver is registered with the bitrate allocator and drives
/// the rate-split tick.
pub(crate) struct RateUpdateObserver {
    pub(crate) stream: Weak<VideoSendStreamInternal>,
}

#[async_trait]
impl BitrateAllocatorObserver for RateUpdateObserver {
    async fn on_bitrate_updated(&self, sample: RateSample) -> u32 {
        match self.stream.upgrade() {
            Some(stream) => stream.on_bitrate_updated(sample).await,
            None => 0,
        }
    }
}

/// OverheadListener is handed to the RTP send modules so they can report the
/// current per-packet header overhead.
pub(crate) struct OverheadListener {
    pub(crate) stream: Weak<VideoSendStreamInternal>,
}

#[async_trait]
impl OverheadObserver for OverheadListener {
    async fn on_overhead_changed(&self, overhead_bytes_per_packet: usize) {
        if let Some(stream) = self.stream.upgrade() {
            stream.on_overhead_changed(overhead_bytes_per_packet);
        }
    }
}

/// PacketFeedbackListener is registered with the transport controller when
/// the FEC controller consumes a loss vector mask.
pub(crate) struct PacketFeedbackListener {
    pub(crate) stream: Weak<VideoSendStreamInternal>,
}

#[async_trait]
impl PacketFeedbackObserver for PacketFeedbackListener {
    async fn on_packet_added(&self, ssrc: u32, seq_num: u16) {
        if let Some(stream) = self.stream.upgrade() {
            stream.on_packet_added(ssrc, seq_num).await;
        }
    }

    async fn on_packet_feedback(&self, feedback: Vec<PacketFeedback>) {
        if let Some(stream) = self.stream.upgrade() {
            stream.on_packet_feedback(feedback).await;
        }
    }
}

/// ProtectionRequestHandler applies FEC parameters computed by the FEC
/// controller to every RTP send module and reports back the sent rates.
pub(crate) struct ProtectionRequestHandler {
    pub(crate) stream: Weak<VideoSendStreamInternal>,
}

#[async_trait]
impl ProtectionCallback for ProtectionRequestHandler {
    async fn on_protection_request(
        &self,
        delta: FecProtectionParams,
        key: FecProtectionParams,
    ) -> Result<ProtectionRates> {
        match self.stream.upgrade() {
            Some(stream) => stream.on_protection_request(delta, key).await,
            None => Ok(ProtectionRates::default()),
        }
    }
}
