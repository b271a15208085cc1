pub(crate) mod encoder_activity;
mod observer;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, Weak};

use tokio::sync::Mutex;
use waitgroup::WaitGroup;

use encoder_activity::EncoderActivityMonitor;
use observer::{
    OverheadListener, PacketFeedbackListener, ProtectionRequestHandler, RateUpdateObserver,
};

use crate::config::{
    NetworkState, RtcpMode, RtpState, VideoContentType, VideoSendConfig, VideoStream,
};
use crate::error::{Error, Result};
use crate::frame::{CodecSpecificInfo, EncodedFrame};
use crate::loss_feedback::LossFeedbackAggregator;
use crate::protection::{resolve_flexfec, resolve_protection_policy};
use crate::rate;
use crate::{
    AllocationConfig, BitrateAllocator, EncodedFrameSink, FecController, FecProtectionParams,
    OverheadObserver, PacketFeedback, ProtectionRates, RateSample, RtpSendModule,
    SendStatsObserver, TransportController, VideoStreamEncoder,
};

/// Per-module packet history kept for NACK-driven retransmission.
pub(crate) const MIN_SEND_SIDE_PACKET_HISTORY_SIZE: u16 = 600;

// We don't do MTU discovery, so assume that we have the standard ethernet MTU.
pub(crate) const PATH_MTU: usize = 1500;

pub(crate) const DEFAULT_ENCODER_MIN_BITRATE_BPS: u32 = 30_000;

/// Pacing factor and queue limit applied when no probing experiment is
/// configured.
pub(crate) const DEFAULT_PACE_MULTIPLIER: f64 = 2.5;
pub(crate) const MAX_PACED_QUEUE_TIME_MS: i64 = 2000;

/// Upper bound on simulcast/spatial layers, and with it on recording sinks.
pub const MAX_SIMULCAST_STREAMS: usize = 4;

/// ActivationState reports whether the stream currently participates in
/// bitrate allocation and drives the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

struct FlexfecContext {
    ssrc: u32,
    module: Arc<dyn RtpSendModule + Send + Sync>,
}

/// Structural state owned by the control sequence. Every structural
/// operation serializes on the surrounding mutex; the frame and feedback hot
/// paths never touch it.
struct SendStreamState {
    active_layers: Vec<bool>,
    encoder_min_bitrate_bps: u32,
    encoder_max_bitrate_bps: u32,
    encoder_target_rate_bps: u32,
    encoder_bitrate_priority: f64,
    max_padding_bitrate_bps: u32,
    transport_overhead_bytes_per_packet: usize,
    loss_feedback: LossFeedbackAggregator,
}

impl SendStreamState {
    fn is_active(&self) -> bool {
        self.active_layers.iter().any(|active| *active)
    }
}

pub(crate) struct VideoSendStreamInternal {
    config: VideoSendConfig,
    rtp_modules: Vec<Arc<dyn RtpSendModule + Send + Sync>>,
    flexfec: Option<FlexfecContext>,
    encoder: Arc<dyn VideoStreamEncoder + Send + Sync>,
    allocator: Arc<dyn BitrateAllocator + Send + Sync>,
    transport: Arc<dyn TransportController + Send + Sync>,
    fec_controller: Arc<dyn FecController + Send + Sync>,
    stats: Arc<dyn SendStatsObserver + Send + Sync>,

    configured_pacing_factor: Option<f64>,

    weak_self: Weak<VideoSendStreamInternal>,
    rate_observer: Arc<RateUpdateObserver>,
    feedback_observer: Arc<PacketFeedbackListener>,

    state: Mutex<SendStreamState>,

    // Narrow cross-thread state; never taken together with `state` by the
    // hot paths.
    overhead_bytes_per_packet: SyncMutex<usize>,
    encoder_activity: SyncMutex<Option<Arc<EncoderActivityMonitor>>>,
    frame_sinks: SyncMutex<[Option<Box<dyn EncodedFrameSink + Send>>; MAX_SIMULCAST_STREAMS]>,

    watchdog_wg: SyncMutex<Option<WaitGroup>>,
}

/// VideoSendStream coordinates one outgoing video stream: it owns the
/// rate-split bookkeeping, the protection policy, encoder liveness
/// monitoring, and the activation state, and is the single object through
/// which the encoder, the RTP send modules and the bitrate allocator
/// interact with each other.
///
/// Structural operations (start, stop, active-layer changes, encoder
/// reconfiguration, teardown) serialize on one internal control sequence and
/// complete before their future resolves. [`VideoSendStream::deliver_rtcp`]
/// and [`VideoSendStream::on_encoded_frame`] may be called from any thread
/// at any time and never contend with the control sequence.
pub struct VideoSendStream {
    internal: Arc<VideoSendStreamInternal>,
}

impl std::fmt::Debug for VideoSendStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSendStream")
            .field("track_id", &self.internal.config.track_id)
            .field("ssrcs", &self.internal.config.rtp.ssrcs)
            .finish()
    }
}

impl VideoSendStream {
    /// new wires the stream up to its collaborators: one RTP send module per
    /// media SSRC (plus an optional FlexFEC module), the encoder, the
    /// bitrate allocator, the shared transport and the FEC controller.
    /// `suspended_states` resumes sequencing of a previously suspended
    /// stream. The stream starts out inactive.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        config: VideoSendConfig,
        initial_encoder_max_bitrate_bps: u32,
        initial_encoder_bitrate_priority: f64,
        suspended_states: HashMap<u32, RtpState>,
        rtp_modules: Vec<Arc<dyn RtpSendModule + Send + Sync>>,
        flexfec_module: Option<Arc<dyn RtpSendModule + Send + Sync>>,
        encoder: Arc<dyn VideoStreamEncoder + Send + Sync>,
        allocator: Arc<dyn BitrateAllocator + Send + Sync>,
        transport: Arc<dyn TransportController + Send + Sync>,
        fec_controller: Arc<dyn FecController + Send + Sync>,
        stats: Arc<dyn SendStatsObserver + Send + Sync>,
    ) -> Result<Self> {
        if config.rtp.ssrcs.is_empty() {
            return Err(Error::ErrNoMediaSsrcs);
        }
        if rtp_modules.len() != config.rtp.ssrcs.len() {
            return Err(Error::ErrRtpModuleCountMismatch);
        }
        if !config.rtp.rtx.ssrcs.is_empty()
            && config.rtp.rtx.ssrcs.len() != config.rtp.ssrcs.len()
        {
            return Err(Error::ErrRtxSsrcCountMismatch);
        }
        if initial_encoder_max_bitrate_bps == 0 {
            return Err(Error::ErrZeroEncoderMaxBitrate);
        }

        log::info!(
            "VideoSendStream: {} media sources, content type {:?}",
            config.rtp.ssrcs.len(),
            config.content_type
        );

        let flexfec = resolve_flexfec(&config, flexfec_module.is_some())
            .and_then(|ssrc| flexfec_module.map(|module| FlexfecContext { ssrc, module }));

        // If send-side BWE is negotiated, apply the pacing and probing
        // profile of the matching experiment, or the documented defaults.
        let mut configured_pacing_factor = None;
        if config.transport_cc_negotiated() {
            let alr_settings = match config.content_type {
                VideoContentType::Screen => config.experiments.screenshare_alr,
                VideoContentType::Camera => config.experiments.strict_pacing_alr,
            };
            if let Some(alr) = alr_settings {
                transport.enable_periodic_alr_probing(true).await;
                transport.set_pacing_factor(alr.pacing_factor).await;
                transport.set_queue_time_limit(alr.max_paced_queue_time_ms).await;
                configured_pacing_factor = Some(alr.pacing_factor);
            } else {
                transport.enable_periodic_alr_probing(false).await;
                transport.set_pacing_factor(DEFAULT_PACE_MULTIPLIER).await;
                transport.set_queue_time_limit(MAX_PACED_QUEUE_TIME_MS).await;
                configured_pacing_factor = Some(DEFAULT_PACE_MULTIPLIER);
            }
        }
        if config.periodic_alr_bandwidth_probing {
            transport.enable_periodic_alr_probing(true).await;
        }

        let loss_feedback = LossFeedbackAggregator::new(config.rtp.ssrcs.clone());
        let active_layers = vec![false; config.rtp.ssrcs.len()];
        let internal = Arc::new_cyclic(|weak_self: &Weak<VideoSendStreamInternal>| {
            VideoSendStreamInternal {
                rate_observer: Arc::new(RateUpdateObserver {
                    stream: weak_self.clone(),
                }),
                feedback_observer: Arc::new(PacketFeedbackListener {
                    stream: weak_self.clone(),
                }),
                weak_self: weak_self.clone(),
                state: Mutex::new(SendStreamState {
                    active_layers,
                    encoder_min_bitrate_bps: 0,
                    encoder_max_bitrate_bps: initial_encoder_max_bitrate_bps,
                    encoder_target_rate_bps: 0,
                    encoder_bitrate_priority: initial_encoder_bitrate_priority,
                    max_padding_bitrate_bps: 0,
                    transport_overhead_bytes_per_packet: 0,
                    loss_feedback,
                }),
                overhead_bytes_per_packet: SyncMutex::new(0),
                encoder_activity: SyncMutex::new(None),
                frame_sinks: SyncMutex::new([None, None, None, None]),
                watchdog_wg: SyncMutex::new(Some(WaitGroup::new())),
                configured_pacing_factor,
                config,
                rtp_modules,
                flexfec,
                encoder,
                allocator,
                transport,
                fec_controller,
                stats,
            }
        });

        internal.configure_modules(&suspended_states).await;
        internal.configure_protection().await;

        internal
            .fec_controller
            .set_protection_callback(Arc::new(ProtectionRequestHandler {
                stream: Arc::downgrade(&internal),
            }))
            .await;
        if internal.fec_controller.use_loss_vector_mask() {
            internal
                .transport
                .register_packet_feedback_observer(internal.feedback_observer.clone())
                .await;
        }

        let start_bitrate = internal
            .allocator
            .start_bitrate(internal.rate_observer.clone())
            .await;
        internal.encoder.set_start_bitrate(start_bitrate).await;

        Ok(VideoSendStream { internal })
    }

    /// start activates the stream: registers with the bitrate allocator,
    /// starts encoder liveness monitoring and requests a keyframe. A no-op
    /// when already active.
    pub async fn start(&self) {
        self.internal.start().await;
    }

    /// stop deactivates the stream and zeroes the encoder's rate. A no-op
    /// when already inactive.
    pub async fn stop(&self) {
        self.internal.stop().await;
    }

    /// update_active_layers enables or disables sending per media source,
    /// one flag per configured SSRC. Flipping the aggregate between
    /// none-active and some-active runs the same sequence as
    /// [`VideoSendStream::start`]/[`VideoSendStream::stop`].
    pub async fn update_active_layers(&self, active_layers: &[bool]) -> Result<()> {
        if active_layers.len() != self.internal.rtp_modules.len() {
            return Err(Error::ErrActiveLayerCountMismatch);
        }
        self.internal.update_active_layers(active_layers).await;
        Ok(())
    }

    /// reconfigure_encoder recomputes the encoder bitrate bounds, padding
    /// target and FEC encoding data from a new layer list. When active, the
    /// allocator registration is refreshed with the new bounds before the
    /// next rate-split tick can observe them.
    pub async fn reconfigure_encoder(
        &self,
        streams: Vec<VideoStream>,
        min_transmit_bitrate_bps: u32,
    ) -> Result<()> {
        self.internal
            .reconfigure_encoder(streams, min_transmit_bitrate_bps)
            .await
    }

    /// deliver_rtcp feeds raw incoming RTCP to every RTP send module.
    /// Callable from the network thread; never blocks on the control
    /// sequence. Returns whether every module handled the packet.
    pub async fn deliver_rtcp(&self, packet: &[u8]) -> bool {
        self.internal.deliver_rtcp(packet).await
    }

    /// on_encoded_frame accepts one encoded frame from the encoder, possibly
    /// from several hardware encoder threads in parallel, and routes it to
    /// the send module of its layer.
    pub async fn on_encoded_frame(
        &self,
        frame: &EncodedFrame,
        codec_info: &CodecSpecificInfo,
    ) -> Result<()> {
        self.internal.on_encoded_frame(frame, codec_info).await
    }

    /// signal_network_state switches RTCP on or off with connectivity.
    pub async fn signal_network_state(&self, network_state: NetworkState) {
        self.internal.signal_network_state(network_state).await;
    }

    /// set_transport_overhead updates the per-packet transport overhead and
    /// re-clamps the modules' max packet size against the path MTU. Values
    /// at or above the MTU are refused.
    pub async fn set_transport_overhead(&self, transport_overhead_bytes_per_packet: usize) {
        self.internal
            .set_transport_overhead(transport_overhead_bytes_per_packet)
            .await;
    }

    /// enable_encoded_frame_recording installs one optional recording sink
    /// per layer (at most [`MAX_SIMULCAST_STREAMS`]); missing trailing sinks
    /// are cleared. Installing any sink requests a keyframe so the recording
    /// starts decodable.
    pub async fn enable_encoded_frame_recording(
        &self,
        sinks: Vec<Box<dyn EncodedFrameSink + Send>>,
    ) {
        self.internal.enable_encoded_frame_recording(sinks).await;
    }

    /// get_source_states extracts the resumable sequencing snapshot of every
    /// configured source (media, RTX and FlexFEC). Only valid once stopped.
    pub async fn get_source_states(&self) -> Result<HashMap<u32, RtpState>> {
        self.internal.get_source_states().await
    }

    /// close permanently stops the stream, waits for the liveness task to
    /// wind down and hands back the per-source sequencing states for reuse.
    pub async fn close(&self) -> Result<HashMap<u32, RtpState>> {
        self.internal.stop().await;
        if self.internal.fec_controller.use_loss_vector_mask() {
            self.internal
                .transport
                .deregister_packet_feedback_observer(self.internal.feedback_observer.clone())
                .await;
        }
        let wg = { self.internal.watchdog_wg.lock().unwrap().take() };
        if let Some(wg) = wg {
            wg.wait().await;
        }
        self.internal.get_source_states().await
    }

    /// activation_state reports whether the stream currently participates in
    /// bitrate allocation.
    pub async fn activation_state(&self) -> ActivationState {
        let state = self.internal.state.lock().await;
        if state.is_active() {
            ActivationState::Active
        } else {
            ActivationState::Inactive
        }
    }

    /// configured_pacing_factor is the pacing factor applied to the
    /// transport at construction, if send-side BWE was negotiated.
    pub fn configured_pacing_factor(&self) -> Option<f64> {
        self.internal.configured_pacing_factor
    }

    /// overhead_observer returns the callback the caller wires into the RTP
    /// send modules it creates, so overhead changes reach the rate split.
    pub fn overhead_observer(&self) -> Arc<dyn OverheadObserver + Send + Sync> {
        Arc::new(OverheadListener {
            stream: Arc::downgrade(&self.internal),
        })
    }
}

impl VideoSendStreamInternal {
    async fn configure_modules(&self, suspended_states: &HashMap<u32, RtpState>) {
        for (i, module) in self.rtp_modules.iter().enumerate() {
            let ssrc = self.config.rtp.ssrcs[i];
            module.set_sending(false).await;
            module.set_sending_media(false).await;
            module.set_rtcp_mode(self.config.rtp.rtcp_mode).await;
            module.set_max_packet_size(self.config.rtp.max_packet_size).await;
            module.set_ssrc(ssrc).await;
            if let Some(state) = suspended_states.get(&ssrc) {
                module.set_rtp_state(*state).await;
            }
        }

        if let Some(flexfec) = &self.flexfec {
            flexfec.module.set_ssrc(flexfec.ssrc).await;
            if let Some(state) = suspended_states.get(&flexfec.ssrc) {
                flexfec.module.set_rtp_state(*state).await;
            }
        }

        if self.config.rtp.rtx.ssrcs.is_empty() {
            return;
        }

        for (i, module) in self.rtp_modules.iter().enumerate() {
            let ssrc = self.config.rtp.rtx.ssrcs[i];
            module.set_rtx_ssrc(ssrc).await;
            if let Some(state) = suspended_states.get(&ssrc) {
                module.set_rtx_state(*state).await;
            }
        }

        if let Some(rtx_payload_type) = self.config.rtp.rtx.payload_type {
            for module in &self.rtp_modules {
                module
                    .set_rtx_payload_type(rtx_payload_type, self.config.encoder.payload_type)
                    .await;
            }
        }
        if let (Some(red), Some(red_rtx)) = (
            self.config.rtp.ulpfec.red_payload_type,
            self.config.rtp.ulpfec.red_rtx_payload_type,
        ) {
            for module in &self.rtp_modules {
                module.set_rtx_payload_type(red_rtx, red).await;
            }
        }
    }

    async fn configure_protection(&self) {
        let policy = resolve_protection_policy(&self.config, self.flexfec.is_some());
        for module in &self.rtp_modules {
            module
                .set_store_packets(true, MIN_SEND_SIDE_PACKET_HISTORY_SIZE)
                .await;
            module
                .set_protection_config(policy.red_payload_type, policy.ulpfec_payload_type)
                .await;
        }
        // ULPFEC and FlexFEC share the same FEC rate calculation.
        self.fec_controller
            .set_protection_method(policy.fec_enabled(), policy.nack_enabled)
            .await;
    }

    fn allocation_config(&self, state: &SendStreamState) -> AllocationConfig {
        AllocationConfig {
            min_bitrate_bps: state.encoder_min_bitrate_bps,
            max_bitrate_bps: state.encoder_max_bitrate_bps,
            pad_up_bitrate_bps: state.max_padding_bitrate_bps,
            enforce_min_bitrate: !self.config.suspend_below_min_bitrate,
            track_id: self.config.track_id.clone(),
            bitrate_priority: state.encoder_bitrate_priority,
        }
    }

    async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.is_active() {
            return;
        }
        log::info!("VideoSendStream::start");
        let layers = vec![true; self.rtp_modules.len()];
        self.set_active_layers(&mut state, layers).await;
        self.start_sending(&mut state).await;
    }

    async fn stop(&self) {
        let mut state = self.state.lock().await;
        if !state.is_active() {
            return;
        }
        log::info!("VideoSendStream::stop");
        let layers = vec![false; self.rtp_modules.len()];
        self.set_active_layers(&mut state, layers).await;
        self.stop_sending(&mut state).await;
    }

    async fn update_active_layers(&self, active_layers: &[bool]) {
        let mut state = self.state.lock().await;
        log::info!("VideoSendStream::update_active_layers {active_layers:?}");
        let previously_active = state.is_active();
        self.set_active_layers(&mut state, active_layers.to_vec()).await;
        let now_active = state.is_active();
        if previously_active && !now_active {
            self.stop_sending(&mut state).await;
        } else if !previously_active && now_active {
            self.start_sending(&mut state).await;
        }
    }

    async fn set_active_layers(&self, state: &mut SendStreamState, layers: Vec<bool>) {
        for (module, active) in self.rtp_modules.iter().zip(layers.iter()) {
            module.set_sending(*active).await;
            module.set_sending_media(*active).await;
        }
        state.active_layers = layers;
    }

    async fn start_sending(&self, state: &mut SendStreamState) {
        self.allocator
            .add_observer(self.rate_observer.clone(), self.allocation_config(state))
            .await;

        // Start monitoring encoder activity.
        {
            let worker = {
                let wg = self.watchdog_wg.lock().unwrap();
                wg.as_ref().map(|wg| wg.worker())
            };
            let monitor = encoder_activity::spawn(self.weak_self.clone(), worker);
            let mut slot = self.encoder_activity.lock().unwrap();
            debug_assert!(slot.is_none());
            *slot = Some(monitor);
        }

        self.encoder.send_key_frame().await;
    }

    async fn stop_sending(&self, _state: &mut SendStreamState) {
        self.allocator.remove_observer(self.rate_observer.clone()).await;
        if let Some(monitor) = self.encoder_activity.lock().unwrap().take() {
            monitor.stop();
        }
        self.encoder.on_bitrate_updated(0, 0, 0).await;
        self.stats.on_encoder_target_rate(0);
    }

    async fn reconfigure_encoder(
        &self,
        streams: Vec<VideoStream>,
        min_transmit_bitrate_bps: u32,
    ) -> Result<()> {
        if streams.is_empty() {
            return Err(Error::ErrEncoderStreamsEmpty);
        }
        if streams.len() > self.config.rtp.ssrcs.len() {
            return Err(Error::ErrTooManyEncoderStreams);
        }

        let mut state = self.state.lock().await;

        let min_floor = self
            .config
            .experiments
            .encoder_min_bitrate_bps_override
            .unwrap_or(DEFAULT_ENCODER_MIN_BITRATE_BPS);
        state.encoder_min_bitrate_bps = streams[0].min_bitrate_bps.max(min_floor);

        let mut max_bitrate_bps = 0u32;
        let mut priority_sum = 0f64;
        for stream in &streams {
            // Don't allocate more bitrate than needed to inactive layers.
            if stream.active {
                max_bitrate_bps += stream.max_bitrate_bps;
            }
            if let Some(priority) = stream.bitrate_priority {
                if priority <= 0.0 {
                    return Err(Error::ErrInvalidBitratePriority);
                }
                priority_sum += priority;
            }
        }
        if priority_sum > 0.0 {
            state.encoder_bitrate_priority = priority_sum;
        }
        state.encoder_max_bitrate_bps = max_bitrate_bps.max(state.encoder_min_bitrate_bps);
        state.max_padding_bitrate_bps = rate::max_padding_bitrate_bps(
            &streams,
            min_transmit_bitrate_bps,
            self.config.suspend_below_min_bitrate,
        );

        // Clear stats for disabled layers.
        for ssrc in &self.config.rtp.ssrcs[streams.len()..] {
            self.stats.on_inactive_ssrc(*ssrc);
        }

        let num_temporal_layers = streams[streams.len() - 1].num_temporal_layers.unwrap_or(1);
        self.fec_controller
            .set_encoding_data(
                streams[0].width,
                streams[0].height,
                num_temporal_layers,
                self.config.rtp.max_packet_size,
            )
            .await;
        self.configure_protection().await;

        if state.is_active() {
            // The stream is started already; update the allocator with the
            // new bitrate limits.
            self.allocator
                .add_observer(self.rate_observer.clone(), self.allocation_config(&state))
                .await;
        }
        Ok(())
    }

    /// on_bitrate_updated is the rate-split tick: one sample in, the
    /// protection remainder out.
    pub(crate) async fn on_bitrate_updated(&self, sample: RateSample) -> u32 {
        let mut state = self.state.lock().await;
        if !state.is_active() {
            debug_assert!(false, "rate update on inactive stream");
            log::error!("Rate update on inactive video send stream, reporting zero usage.");
            return 0;
        }

        let overhead_bytes_per_packet = *self.overhead_bytes_per_packet.lock().unwrap();
        let transport_overhead = state.transport_overhead_bytes_per_packet;
        let with_overhead = self.config.experiments.send_side_bwe_with_overhead;

        let mut payload_bitrate_bps = sample.bitrate_bps;
        if with_overhead {
            payload_bitrate_bps -= rate::overhead_rate_bps(
                rate::packet_rate(
                    sample.bitrate_bps,
                    self.config.rtp.max_packet_size + transport_overhead,
                ),
                overhead_bytes_per_packet + transport_overhead,
                sample.bitrate_bps,
            );
        }

        // The encoder target is the estimated network rate minus protection
        // overhead. This is the single state-owning call into the FEC
        // controller per tick; the loss mask accumulated since the previous
        // tick is drained regardless of whether anything correlated.
        let loss_mask = state.loss_feedback.take_loss_mask();
        let mut encoder_target_rate_bps = self
            .fec_controller
            .update_fec_rates(
                payload_bitrate_bps,
                self.stats.send_frame_rate(),
                sample.fraction_loss,
                loss_mask,
                sample.rtt_ms,
            )
            .await;

        let encoder_overhead_rate_bps = if with_overhead {
            // The encoder rate may differ materially from the raw estimate,
            // so its packet overhead is estimated again, capped by what is
            // left of the raw estimate (not the payload-reduced one).
            rate::overhead_rate_bps(
                rate::packet_rate(
                    encoder_target_rate_bps,
                    self.config.rtp.max_packet_size + transport_overhead
                        - overhead_bytes_per_packet,
                ),
                overhead_bytes_per_packet + transport_overhead,
                sample.bitrate_bps - encoder_target_rate_bps,
            )
        } else {
            0
        };

        // With overhead accounting the protection remainder includes the
        // encoder's own packet overhead.
        let protection_bitrate_bps =
            sample.bitrate_bps - (encoder_target_rate_bps + encoder_overhead_rate_bps);

        encoder_target_rate_bps = encoder_target_rate_bps.min(state.encoder_max_bitrate_bps);
        state.encoder_target_rate_bps = encoder_target_rate_bps;
        self.encoder
            .on_bitrate_updated(encoder_target_rate_bps, sample.fraction_loss, sample.rtt_ms)
            .await;
        self.stats.on_encoder_target_rate(encoder_target_rate_bps);
        protection_bitrate_bps
    }

    pub(crate) async fn on_encoder_timed_out(&self, monitor: &EncoderActivityMonitor) {
        let state = self.state.lock().await;
        if !monitor.is_valid() {
            return;
        }
        // A stalled camera must not keep holding bandwidth hostage: stop
        // consuming allocation while producing nothing.
        if state.encoder_target_rate_bps > 0 {
            log::info!("Encoder timed out, pausing bitrate allocation.");
            self.allocator.remove_observer(self.rate_observer.clone()).await;
        }
    }

    pub(crate) async fn on_encoder_active(&self, monitor: &EncoderActivityMonitor) {
        let state = self.state.lock().await;
        if !monitor.is_valid() {
            return;
        }
        log::info!("Encoder is active again, resuming bitrate allocation.");
        self.allocator
            .add_observer(self.rate_observer.clone(), self.allocation_config(&state))
            .await;
    }

    async fn on_encoded_frame(
        &self,
        frame: &EncodedFrame,
        codec_info: &CodecSpecificInfo,
    ) -> Result<()> {
        let simulcast_idx = codec_info.simulcast_idx;

        {
            let monitor = self.encoder_activity.lock().unwrap();
            if let Some(monitor) = monitor.as_ref() {
                monitor.on_frame();
            }
        }

        self.fec_controller
            .update_with_encoded_data(frame.payload.len(), frame.frame_type)
            .await;

        let module = self
            .rtp_modules
            .get(simulcast_idx)
            .ok_or(Error::ErrUnknownSimulcastIndex)?;
        let result = module.send_encoded_frame(frame, codec_info).await;

        if simulcast_idx < MAX_SIMULCAST_STREAMS {
            let mut sinks = self.frame_sinks.lock().unwrap();
            if let Some(sink) = sinks[simulcast_idx].as_mut() {
                if let Err(err) = sink.write_frame(frame, codec_info.codec_type) {
                    log::warn!("failed writing encoded frame to recording sink: {err}");
                }
            }
        }

        result
    }

    async fn deliver_rtcp(&self, packet: &[u8]) -> bool {
        // Runs on the network thread; must not contend with the control
        // sequence. The modules are internally thread-safe for this path.
        let mut handled = true;
        for module in &self.rtp_modules {
            handled &= module.incoming_control_packet(packet).await;
        }
        handled
    }

    async fn signal_network_state(&self, network_state: NetworkState) {
        let _state = self.state.lock().await;
        let mode = match network_state {
            NetworkState::Up => self.config.rtp.rtcp_mode,
            NetworkState::Down => RtcpMode::Off,
        };
        for module in &self.rtp_modules {
            module.set_rtcp_mode(mode).await;
        }
    }

    async fn set_transport_overhead(&self, transport_overhead_bytes_per_packet: usize) {
        if transport_overhead_bytes_per_packet >= PATH_MTU {
            log::error!("Transport overhead exceeds size of ethernet frame");
            return;
        }
        let mut state = self.state.lock().await;
        state.transport_overhead_bytes_per_packet = transport_overhead_bytes_per_packet;
        let packet_size = self
            .config
            .rtp
            .max_packet_size
            .min(PATH_MTU - transport_overhead_bytes_per_packet);
        for module in &self.rtp_modules {
            module.set_max_packet_size(packet_size).await;
        }
    }

    pub(crate) fn on_overhead_changed(&self, overhead_bytes_per_packet: usize) {
        *self.overhead_bytes_per_packet.lock().unwrap() = overhead_bytes_per_packet;
    }

    pub(crate) async fn on_packet_added(&self, ssrc: u32, seq_num: u16) {
        let mut state = self.state.lock().await;
        state.loss_feedback.record_sent(ssrc, seq_num);
    }

    pub(crate) async fn on_packet_feedback(&self, feedback: Vec<PacketFeedback>) {
        // Lost feedback messages are not treated as lost packets.
        let mut state = self.state.lock().await;
        state.loss_feedback.record_feedback(&feedback);
    }

    pub(crate) async fn on_protection_request(
        &self,
        delta: FecProtectionParams,
        key: FecProtectionParams,
    ) -> Result<ProtectionRates> {
        let mut rates = ProtectionRates::default();
        for module in &self.rtp_modules {
            module.set_fec_parameters(delta, key).await;
            let sent = module.bitrate_sent().await;
            rates.sent_video_rate_bps += sent.video_bitrate_bps;
            rates.sent_fec_rate_bps += sent.fec_bitrate_bps;
            rates.sent_nack_rate_bps += sent.nack_bitrate_bps;
        }
        Ok(rates)
    }

    async fn enable_encoded_frame_recording(
        &self,
        sinks: Vec<Box<dyn EncodedFrameSink + Send>>,
    ) {
        let request_key_frame = !sinks.is_empty();
        {
            let mut slots = self.frame_sinks.lock().unwrap();
            let mut sinks = sinks.into_iter();
            for slot in slots.iter_mut() {
                *slot = sinks.next();
            }
        }
        if request_key_frame {
            // Get a keyframe into the recording as early as possible so the
            // output is actually decodable.
            self.encoder.send_key_frame().await;
        }
    }

    async fn get_source_states(&self) -> Result<HashMap<u32, RtpState>> {
        {
            let state = self.state.lock().await;
            if state.is_active() {
                return Err(Error::ErrSenderStillActive);
            }
        }

        let mut states = HashMap::new();
        for (i, module) in self.rtp_modules.iter().enumerate() {
            states.insert(self.config.rtp.ssrcs[i], module.rtp_state().await);
        }
        for (i, ssrc) in self.config.rtp.rtx.ssrcs.iter().enumerate() {
            states.insert(*ssrc, self.rtp_modules[i].rtx_state().await);
        }
        if let Some(flexfec) = &self.flexfec {
            states.insert(flexfec.ssrc, flexfec.module.rtp_state().await);
        }
        Ok(states)
    }
}
