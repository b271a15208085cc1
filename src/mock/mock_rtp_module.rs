use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::{RtcpMode, RtpState};
use crate::frame::{CodecSpecificInfo, EncodedFrame};
use crate::{BitrateSent, FecProtectionParams, Result, RtpSendModule};

/// MockRtpSendModule records every setter call and accepted frame for one
/// simulated SSRC.
#[derive(Default)]
pub struct MockRtpSendModule {
    sending: AtomicBool,
    sending_media: AtomicBool,
    rtcp_mode: Mutex<Option<RtcpMode>>,
    max_packet_size: AtomicUsize,
    store_packets: Mutex<Option<(bool, u16)>>,
    protection_config: Mutex<Option<(Option<u8>, Option<u8>)>>,
    ssrc: AtomicU32,
    rtx_ssrc: AtomicU32,
    rtp_state: Mutex<RtpState>,
    rtx_state: Mutex<RtpState>,
    rtx_payload_types: Mutex<Vec<(u8, u8)>>,
    fec_parameters: Mutex<Option<(FecProtectionParams, FecProtectionParams)>>,
    bitrate_sent: Mutex<BitrateSent>,
    sent_frames: Mutex<Vec<EncodedFrame>>,
    rtcp_packets: Mutex<Vec<Vec<u8>>>,
    handle_rtcp: AtomicBool,
}

impl MockRtpSendModule {
    pub fn new() -> Self {
        let module = MockRtpSendModule::default();
        module.handle_rtcp.store(true, Ordering::SeqCst);
        module
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    pub fn is_sending_media(&self) -> bool {
        self.sending_media.load(Ordering::SeqCst)
    }

    pub fn rtcp_mode(&self) -> Option<RtcpMode> {
        *self.rtcp_mode.lock().unwrap()
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size.load(Ordering::SeqCst)
    }

    pub fn store_packets(&self) -> Option<(bool, u16)> {
        *self.store_packets.lock().unwrap()
    }

    /// The last (red, ulpfec) payload type pair applied, if any.
    pub fn protection_config(&self) -> Option<(Option<u8>, Option<u8>)> {
        *self.protection_config.lock().unwrap()
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc.load(Ordering::SeqCst)
    }

    pub fn rtx_ssrc(&self) -> u32 {
        self.rtx_ssrc.load(Ordering::SeqCst)
    }

    /// Every (payload_type, associated_payload_type) mapping, in call order.
    pub fn rtx_payload_types(&self) -> Vec<(u8, u8)> {
        self.rtx_payload_types.lock().unwrap().clone()
    }

    pub fn fec_parameters(&self) -> Option<(FecProtectionParams, FecProtectionParams)> {
        *self.fec_parameters.lock().unwrap()
    }

    pub fn set_bitrate_sent_result(&self, bitrate_sent: BitrateSent) {
        *self.bitrate_sent.lock().unwrap() = bitrate_sent;
    }

    pub fn sent_frames(&self) -> Vec<EncodedFrame> {
        self.sent_frames.lock().unwrap().clone()
    }

    pub fn rtcp_packets(&self) -> Vec<Vec<u8>> {
        self.rtcp_packets.lock().unwrap().clone()
    }

    pub fn set_handle_rtcp(&self, handled: bool) {
        self.handle_rtcp.store(handled, Ordering::SeqCst);
    }
}

#[async_trait]
impl RtpSendModule for MockRtpSendModule {
    async fn set_sending(&self, sending: bool) {
        self.sending.store(sending, Ordering::SeqCst);
    }

    async fn set_sending_media(&self, sending: bool) {
        self.sending_media.store(sending, Ordering::SeqCst);
    }

    async fn set_rtcp_mode(&self, mode: RtcpMode) {
        *self.rtcp_mode.lock().unwrap() = Some(mode);
    }

    async fn set_max_packet_size(&self, size: usize) {
        self.max_packet_size.store(size, Ordering::SeqCst);
    }

    async fn set_store_packets(&self, enabled: bool, history_size: u16) {
        *self.store_packets.lock().unwrap() = Some((enabled, history_size));
    }

    async fn set_protection_config(
        &self,
        red_payload_type: Option<u8>,
        ulpfec_payload_type: Option<u8>,
    ) {
        *self.protection_config.lock().unwrap() = Some((red_payload_type, ulpfec_payload_type));
    }

    async fn set_ssrc(&self, ssrc: u32) {
        self.ssrc.store(ssrc, Ordering::SeqCst);
    }

    async fn set_rtp_state(&self, state: RtpState) {
        *self.rtp_state.lock().unwrap() = state;
    }

    async fn set_rtx_ssrc(&self, ssrc: u32) {
        self.rtx_ssrc.store(ssrc, Ordering::SeqCst);
    }

    async fn set_rtx_state(&self, state: RtpState) {
        *self.rtx_state.lock().unwrap() = state;
    }

    async fn set_rtx_payload_type(&self, payload_type: u8, associated_payload_type: u8) {
        self.rtx_payload_types
            .lock()
            .unwrap()
            .push((payload_type, associated_payload_type));
    }

    async fn rtp_state(&self) -> RtpState {
        *self.rtp_state.lock().unwrap()
    }

    async fn rtx_state(&self) -> RtpState {
        *self.rtx_state.lock().unwrap()
    }

    async fn set_fec_parameters(&self, delta: FecProtectionParams, key: FecProtectionParams) {
        *self.fec_parameters.lock().unwrap() = Some((delta, key));
    }

    async fn bitrate_sent(&self) -> BitrateSent {
        *self.bitrate_sent.lock().unwrap()
    }

    async fn send_encoded_frame(
        &self,
        frame: &EncodedFrame,
        _codec_info: &CodecSpecificInfo,
    ) -> Result<()> {
        self.sent_frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    async fn incoming_control_packet(&self, packet: &[u8]) -> bool {
        self.rtcp_packets.lock().unwrap().push(packet.to_vec());
        self.handle_rtcp.load(Ordering::SeqCst)
    }
}
