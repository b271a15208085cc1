use bytes::Bytes;

/// FrameType describes an encoded video frame's dependency class.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Key frames are decodable on their own.
    Key,
    /// Delta frames depend on previously sent frames.
    #[default]
    Delta,
}

/// VideoCodecType is the codec family producing the encoded frames.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecType {
    Vp8,
    Vp9,
    H264,
    #[default]
    Generic,
}

impl VideoCodecType {
    /// supports_skipping_fec_packets reports whether the codec carries a
    /// picture ID, letting a receiver detect frame completeness without
    /// retransmitted FEC packets. Only VP8 and VP9 can.
    pub fn supports_skipping_fec_packets(&self) -> bool {
        matches!(self, VideoCodecType::Vp8 | VideoCodecType::Vp9)
    }
}

/// EncodedFrame is one compressed frame handed over by the encoder.
#[derive(Default, Debug, Clone)]
pub struct EncodedFrame {
    pub payload: Bytes,
    pub frame_type: FrameType,
    /// RTP timestamp of the frame.
    pub timestamp: u32,
    pub capture_time_ms: i64,
}

/// CodecSpecificInfo accompanies every encoded frame.
#[derive(Default, Debug, Clone, Copy)]
pub struct CodecSpecificInfo {
    pub codec_type: VideoCodecType,
    /// Index of the simulcast/spatial layer the frame belongs to.
    pub simulcast_idx: usize,
}
