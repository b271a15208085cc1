#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Send-side coordination of one outgoing video stream: splits the
//! congestion controller's bitrate estimate between encoder payload and
//! FEC/retransmission protection, resolves which protection schemes are
//! active, watches encoder liveness, and drives registration with the
//! bitrate allocator. Wire-level packetization, the encoder itself, and
//! bandwidth estimation live behind the collaborator traits defined here.

use std::sync::Arc;

use async_trait::async_trait;

pub mod config;
mod error;
pub mod frame;
mod loss_feedback;
pub mod mock;
pub mod protection;
mod rate;
pub mod send_stream;

pub use config::{
    AlrSettings, EncoderSettings, ExperimentSettings, FlexfecConfig, NackConfig, NetworkState,
    RtcpMode, RtpConfig, RtpHeaderExtension, RtpState, RtxConfig, UlpfecConfig, VideoContentType,
    VideoSendConfig, VideoStream,
};
pub use error::{Error, Result};
pub use frame::{CodecSpecificInfo, EncodedFrame, FrameType, VideoCodecType};
pub use send_stream::{ActivationState, VideoSendStream, MAX_SIMULCAST_STREAMS};

/// RateSample is one bitrate/loss/RTT estimate from the bitrate allocator.
#[derive(Default, Debug, Clone, Copy)]
pub struct RateSample {
    pub bitrate_bps: u32,
    /// Fraction of packets lost, 0..=255 mapping to 0-100%.
    pub fraction_loss: u8,
    pub rtt_ms: i64,
    pub probing_interval_ms: i64,
}

/// AllocationConfig carries the bounds and hints a stream registers with the
/// bitrate allocator.
#[derive(Default, Debug, Clone)]
pub struct AllocationConfig {
    pub min_bitrate_bps: u32,
    pub max_bitrate_bps: u32,
    /// Rate the allocator may pad up to while the stream sends less.
    pub pad_up_bitrate_bps: u32,
    /// When false the allocator may starve this stream below its minimum
    /// instead of suspending others.
    pub enforce_min_bitrate: bool,
    pub track_id: String,
    pub bitrate_priority: f64,
}

/// PacketFeedback reports the delivery outcome of one sent packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketFeedback {
    pub sequence_number: u16,
    pub arrival_time_ms: i64,
}

impl PacketFeedback {
    /// Sentinel arrival time of a packet reported as lost.
    pub const NOT_RECEIVED: i64 = i64::MIN;

    pub fn lost(&self) -> bool {
        self.arrival_time_ms == Self::NOT_RECEIVED
    }
}

/// FecProtectionParams is the per-frame-class FEC configuration computed by
/// the FEC controller and pushed down to the RTP send modules.
#[derive(Default, Debug, Clone, Copy)]
pub struct FecProtectionParams {
    pub fec_rate: u8,
    pub max_fec_frames: u8,
    pub use_uep_protection: bool,
}

/// BitrateSent is a snapshot of one RTP send module's outgoing rates.
#[derive(Default, Debug, Clone, Copy)]
pub struct BitrateSent {
    pub total_bitrate_bps: u32,
    pub video_bitrate_bps: u32,
    pub fec_bitrate_bps: u32,
    pub nack_bitrate_bps: u32,
}

/// ProtectionRates aggregates the sent rates over all modules in response to
/// a protection request.
#[derive(Default, Debug, Clone, Copy)]
pub struct ProtectionRates {
    pub sent_video_rate_bps: u32,
    pub sent_nack_rate_bps: u32,
    pub sent_fec_rate_bps: u32,
}

/// BitrateAllocatorObserver receives the periodic rate samples of the
/// bitrate allocator and reports back its non-payload consumption.
#[async_trait]
pub trait BitrateAllocatorObserver {
    /// on_bitrate_updated consumes one rate sample and returns the bitrate
    /// spent on protection rather than encoder payload.
    async fn on_bitrate_updated(&self, sample: RateSample) -> u32;
}

/// BitrateAllocator hands out shares of the estimated link capacity to
/// registered observers.
#[async_trait]
pub trait BitrateAllocator {
    /// add_observer registers or re-registers an observer with updated
    /// bounds; registering an already known observer only replaces its
    /// allocation config.
    async fn add_observer(
        &self,
        observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>,
        config: AllocationConfig,
    );

    async fn remove_observer(&self, observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>);

    /// start_bitrate returns the bitrate the observer should assume before
    /// the first sample arrives.
    async fn start_bitrate(
        &self,
        observer: Arc<dyn BitrateAllocatorObserver + Send + Sync>,
    ) -> u32;
}

/// VideoStreamEncoder is the capability surface of the video encoder this
/// stream drives. Frames come back asynchronously through
/// [`VideoSendStream::on_encoded_frame`].
#[async_trait]
pub trait VideoStreamEncoder {
    async fn on_bitrate_updated(&self, target_bitrate_bps: u32, fraction_lost: u8, rtt_ms: i64);
    async fn send_key_frame(&self);
    async fn set_start_bitrate(&self, start_bitrate_bps: u32);
}

/// RtpSendModule owns sequencing, packetization and retransmission for one
/// SSRC. `incoming_control_packet` must be safe to call from any thread
/// concurrently with every other method.
#[async_trait]
pub trait RtpSendModule {
    async fn set_sending(&self, sending: bool);
    async fn set_sending_media(&self, sending: bool);
    async fn set_rtcp_mode(&self, mode: RtcpMode);
    async fn set_max_packet_size(&self, size: usize);
    async fn set_store_packets(&self, enabled: bool, history_size: u16);
    /// set_protection_config applies the resolved RED/ULPFEC payload types;
    /// `None` disables the scheme.
    async fn set_protection_config(
        &self,
        red_payload_type: Option<u8>,
        ulpfec_payload_type: Option<u8>,
    );

    async fn set_ssrc(&self, ssrc: u32);
    async fn set_rtp_state(&self, state: RtpState);
    async fn set_rtx_ssrc(&self, ssrc: u32);
    async fn set_rtx_state(&self, state: RtpState);
    async fn set_rtx_payload_type(&self, payload_type: u8, associated_payload_type: u8);
    async fn rtp_state(&self) -> RtpState;
    async fn rtx_state(&self) -> RtpState;

    async fn set_fec_parameters(&self, delta: FecProtectionParams, key: FecProtectionParams);
    async fn bitrate_sent(&self) -> BitrateSent;

    /// send_encoded_frame packetizes and queues one encoded frame.
    async fn send_encoded_frame(
        &self,
        frame: &EncodedFrame,
        codec_info: &CodecSpecificInfo,
    ) -> Result<()>;

    /// incoming_control_packet feeds raw RTCP from the network thread and
    /// reports whether the module handled it.
    async fn incoming_control_packet(&self, packet: &[u8]) -> bool;
}

/// TransportController is the shared send-side transport this stream tunes
/// pacing and probing on.
#[async_trait]
pub trait TransportController {
    async fn enable_periodic_alr_probing(&self, enable: bool);
    async fn set_pacing_factor(&self, factor: f64);
    async fn set_queue_time_limit(&self, limit_ms: i64);
    async fn register_packet_feedback_observer(
        &self,
        observer: Arc<dyn PacketFeedbackObserver + Send + Sync>,
    );
    async fn deregister_packet_feedback_observer(
        &self,
        observer: Arc<dyn PacketFeedbackObserver + Send + Sync>,
    );
}

/// PacketFeedbackObserver receives per-packet send and delivery events from
/// the transport. Implemented by this crate, registered by this crate.
#[async_trait]
pub trait PacketFeedbackObserver {
    async fn on_packet_added(&self, ssrc: u32, seq_num: u16);
    async fn on_packet_feedback(&self, feedback: Vec<PacketFeedback>);
}

/// ProtectionCallback lets the FEC controller push newly computed FEC
/// parameters down to the transport and read back what was actually sent.
#[async_trait]
pub trait ProtectionCallback {
    async fn on_protection_request(
        &self,
        delta: FecProtectionParams,
        key: FecProtectionParams,
    ) -> Result<ProtectionRates>;
}

/// FecController owns the FEC rate tables. `update_fec_rates` is the single
/// state-owning call into protection logic per rate-update tick.
#[async_trait]
pub trait FecController {
    async fn set_protection_callback(&self, callback: Arc<dyn ProtectionCallback + Send + Sync>);
    async fn set_protection_method(&self, fec_enabled: bool, nack_enabled: bool);
    async fn set_encoding_data(
        &self,
        width: u32,
        height: u32,
        num_temporal_layers: usize,
        max_packet_size: usize,
    );

    /// update_fec_rates consumes one sample plus the drained loss mask and
    /// returns the bitrate left for the encoder.
    async fn update_fec_rates(
        &self,
        estimated_bitrate_bps: u32,
        actual_framerate: u32,
        fraction_lost: u8,
        loss_mask: Vec<bool>,
        rtt_ms: i64,
    ) -> u32;

    /// update_with_encoded_data is called from the encoder callback thread
    /// for every produced frame.
    async fn update_with_encoded_data(&self, payload_size: usize, frame_type: FrameType);

    /// use_loss_vector_mask reports whether this controller wants the
    /// per-packet loss mask, and with it packet feedback registration.
    fn use_loss_vector_mask(&self) -> bool;
}

/// OverheadObserver learns the current per-packet header overhead from the
/// RTP send modules. Implemented by this crate; the caller wires it into the
/// modules it creates.
#[async_trait]
pub trait OverheadObserver {
    async fn on_overhead_changed(&self, overhead_bytes_per_packet: usize);
}

/// SendStatsObserver is the narrow statistics surface this subsystem reports
/// into.
pub trait SendStatsObserver {
    fn on_encoder_target_rate(&self, bitrate_bps: u32);
    /// send_frame_rate returns the current outgoing frame rate in fps.
    fn send_frame_rate(&self) -> u32;
    fn on_inactive_ssrc(&self, ssrc: u32);
}

/// EncodedFrameSink records encoded frames for debugging.
pub trait EncodedFrameSink {
    fn write_frame(&mut self, frame: &EncodedFrame, codec_type: VideoCodecType) -> Result<()>;
}
