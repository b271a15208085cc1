use crate::frame::VideoCodecType;

/// URI of the transport-wide congestion control header extension. Send-side
/// BWE, and with it the pacing/probing profiles, is only applied when this
/// extension has been negotiated.
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

/// RtcpMode mirrors the sender report behavior of the RTP send modules.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcpMode {
    #[default]
    Compound,
    ReducedSize,
    Off,
}

/// NetworkState is signaled by the caller when connectivity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Up,
    Down,
}

/// VideoContentType selects the pacing profile applied to the transport.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoContentType {
    #[default]
    Camera,
    Screen,
}

/// RTPHeaderExtension represents a negotiated RFC5285 RTP header extension.
#[derive(Default, Debug, Clone)]
pub struct RtpHeaderExtension {
    pub uri: String,
    pub id: isize,
}

/// RtxConfig sets up retransmission over secondary SSRCs. When used, the
/// SSRC list must be 1:1 with the media SSRC list.
#[derive(Default, Debug, Clone)]
pub struct RtxConfig {
    pub ssrcs: Vec<u32>,
    pub payload_type: Option<u8>,
}

/// FlexfecConfig sets up flexible forward error correction. Exactly one
/// protected media SSRC is supported; anything else degrades to no FlexFEC.
#[derive(Default, Debug, Clone)]
pub struct FlexfecConfig {
    pub payload_type: Option<u8>,
    pub ssrc: Option<u32>,
    pub protected_media_ssrcs: Vec<u32>,
}

/// UlpfecConfig sets up RED+ULPFEC. RED is the carrier format for ULPFEC, so
/// ULPFEC without RED is never transmitted.
#[derive(Default, Debug, Clone)]
pub struct UlpfecConfig {
    pub red_payload_type: Option<u8>,
    pub ulpfec_payload_type: Option<u8>,
    /// Payload type used when RED packets are retransmitted over RTX.
    pub red_rtx_payload_type: Option<u8>,
}

/// NackConfig enables receiver-driven retransmission. A positive history
/// window enables NACK.
#[derive(Default, Debug, Clone)]
pub struct NackConfig {
    pub rtp_history_ms: i64,
}

#[derive(Debug, Clone)]
pub struct RtpConfig {
    /// One SSRC per simulcast/spatial layer, lowest layer first.
    pub ssrcs: Vec<u32>,
    pub rtx: RtxConfig,
    pub flexfec: FlexfecConfig,
    pub ulpfec: UlpfecConfig,
    pub nack: NackConfig,
    pub rtcp_mode: RtcpMode,
    pub max_packet_size: usize,
    pub extensions: Vec<RtpHeaderExtension>,
}

impl Default for RtpConfig {
    fn default() -> Self {
        RtpConfig {
            ssrcs: vec![],
            rtx: RtxConfig::default(),
            flexfec: FlexfecConfig::default(),
            ulpfec: UlpfecConfig::default(),
            nack: NackConfig::default(),
            rtcp_mode: RtcpMode::default(),
            max_packet_size: 1460,
            extensions: vec![],
        }
    }
}

/// EncoderSettings describes the payload the encoder produces.
#[derive(Default, Debug, Clone)]
pub struct EncoderSettings {
    pub payload_type: u8,
    pub codec_type: VideoCodecType,
}

/// AlrSettings carries the pacing parameters of one application-limited
/// region probing profile.
#[derive(Debug, Clone, Copy)]
pub struct AlrSettings {
    pub pacing_factor: f64,
    pub max_paced_queue_time_ms: i64,
}

/// ExperimentSettings is a snapshot of every experiment flag this subsystem
/// reads, resolved once by the caller and threaded in through the
/// configuration instead of being read from global state ad hoc.
#[derive(Default, Debug, Clone)]
pub struct ExperimentSettings {
    /// Account for per-packet overhead when splitting the bitrate estimate.
    pub send_side_bwe_with_overhead: bool,
    /// Force ULPFEC off regardless of negotiated payload types.
    pub disable_ulpfec: bool,
    /// Overrides the 30 kbps encoder minimum bitrate floor.
    pub encoder_min_bitrate_bps_override: Option<u32>,
    /// Pacing profile for screen-share content.
    pub screenshare_alr: Option<AlrSettings>,
    /// Pacing profile for camera content.
    pub strict_pacing_alr: Option<AlrSettings>,
}

/// VideoSendConfig is owned by the send stream and immutable after
/// construction.
#[derive(Default, Debug, Clone)]
pub struct VideoSendConfig {
    pub rtp: RtpConfig,
    pub encoder: EncoderSettings,
    pub content_type: VideoContentType,
    /// Suspend the stream instead of padding up when the estimate drops
    /// below the encoder minimum.
    pub suspend_below_min_bitrate: bool,
    pub periodic_alr_bandwidth_probing: bool,
    /// Identifies this stream towards the bitrate allocator.
    pub track_id: String,
    pub experiments: ExperimentSettings,
}

impl VideoSendConfig {
    /// transport_cc_negotiated reports whether the transport-wide congestion
    /// control header extension is part of the negotiated extension set.
    pub fn transport_cc_negotiated(&self) -> bool {
        self.rtp
            .extensions
            .iter()
            .any(|ext| ext.uri == TRANSPORT_CC_URI)
    }
}

/// VideoStream describes one simulcast/spatial layer during encoder
/// reconfiguration.
#[derive(Default, Debug, Clone)]
pub struct VideoStream {
    pub width: u32,
    pub height: u32,
    pub min_bitrate_bps: u32,
    pub target_bitrate_bps: u32,
    pub max_bitrate_bps: u32,
    pub active: bool,
    pub bitrate_priority: Option<f64>,
    pub num_temporal_layers: Option<usize>,
}

/// RtpState is the resumable sequencing snapshot of one source. It is
/// injected at construction to resume a suspended stream and read back at
/// teardown; in between it is owned by the transport module.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpState {
    pub sequence_number: u16,
    pub start_timestamp: u32,
    pub timestamp: u32,
    pub capture_time_ms: i64,
    pub last_timestamp_time_ms: i64,
    pub media_has_been_sent: bool,
}
