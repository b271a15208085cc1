#[cfg(test)]
mod protection_test;

use crate::config::VideoSendConfig;

/// ProtectionPolicy is the resolved, internally consistent set of protection
/// schemes for one stream. It always holds that ULPFEC implies RED, and that
/// FlexFEC excludes both.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionPolicy {
    pub flexfec_enabled: bool,
    pub red_payload_type: Option<u8>,
    pub ulpfec_payload_type: Option<u8>,
    pub nack_enabled: bool,
}

impl ProtectionPolicy {
    pub fn red_enabled(&self) -> bool {
        self.red_payload_type.is_some()
    }

    pub fn ulpfec_enabled(&self) -> bool {
        self.ulpfec_payload_type.is_some()
    }

    /// fec_enabled reports whether any FEC rate logic should run. ULPFEC and
    /// FlexFEC share the same rate calculation.
    pub fn fec_enabled(&self) -> bool {
        self.flexfec_enabled || self.ulpfec_enabled()
    }
}

fn valid_payload_type(payload_type: u8) -> bool {
    payload_type <= 127
}

/// resolve_protection_policy derives a consistent protection policy from the
/// negotiated configuration. Conflicts are never errors: the caller's intent
/// is deterministically downgraded and a warning logged.
///
/// `flexfec_enabled` is resolved separately (see [`resolve_flexfec`]) since
/// FlexFEC availability also depends on a usable FlexFEC source.
pub fn resolve_protection_policy(
    config: &VideoSendConfig,
    flexfec_enabled: bool,
) -> ProtectionPolicy {
    let nack_enabled = config.rtp.nack.rtp_history_ms > 0;
    let mut red_payload_type = config.rtp.ulpfec.red_payload_type;
    let mut ulpfec_payload_type = config.rtp.ulpfec.ulpfec_payload_type;

    if config.experiments.disable_ulpfec {
        log::info!("Experiment to disable sending ULPFEC is enabled.");
        ulpfec_payload_type = None;
    }

    // If enabled, FlexFEC takes priority over RED+ULPFEC. RED can be safely
    // dropped: a receiver supporting FlexFEC has no RED/RTX workaround.
    if flexfec_enabled {
        if red_payload_type.is_some() {
            log::info!("Both FlexFEC and RED are configured. Disabling RED.");
            red_payload_type = None;
        }
        if ulpfec_payload_type.is_some() {
            log::info!("Both FlexFEC and ULPFEC are configured. Disabling ULPFEC.");
            ulpfec_payload_type = None;
        }
    }

    // Payload types without picture ID cannot determine that a stream is
    // complete without retransmitting FEC, so NACK+ULPFEC for such codecs
    // still retransmits the FEC packets and only wastes bandwidth.
    if nack_enabled
        && ulpfec_payload_type.is_some()
        && !config.encoder.codec_type.supports_skipping_fec_packets()
    {
        log::warn!(
            "Transmitting payload type without picture ID using NACK+ULPFEC is a waste \
             of bandwidth since ULPFEC packets also have to be retransmitted. Disabling ULPFEC."
        );
        ulpfec_payload_type = None;
    }

    if let Some(pt) = red_payload_type {
        if !valid_payload_type(pt) {
            log::warn!("RED payload type {pt} is out of range. Disabling RED.");
            red_payload_type = None;
        }
    }
    if let Some(pt) = ulpfec_payload_type {
        if !valid_payload_type(pt) {
            log::warn!("ULPFEC payload type {pt} is out of range. Disabling ULPFEC.");
            ulpfec_payload_type = None;
        }
    }

    // RED is the carrier format for ULPFEC; without it ULPFEC cannot be sent.
    if ulpfec_payload_type.is_some() && red_payload_type.is_none() {
        log::warn!("ULPFEC is enabled but RED is disabled. Disabling ULPFEC.");
        ulpfec_payload_type = None;
    }

    ProtectionPolicy {
        flexfec_enabled,
        red_payload_type,
        ulpfec_payload_type,
        nack_enabled,
    }
}

/// resolve_flexfec decides whether FlexFEC can actually be used and returns
/// the FlexFEC SSRC if so. An incomplete FlexFEC configuration is treated as
/// "feature not available" rather than a construction failure.
pub fn resolve_flexfec(config: &VideoSendConfig, module_available: bool) -> Option<u32> {
    let payload_type = config.rtp.flexfec.payload_type?;
    if !valid_payload_type(payload_type) {
        log::warn!("FlexFEC payload type {payload_type} is out of range. Disabling FlexFEC.");
        return None;
    }
    let ssrc = match config.rtp.flexfec.ssrc {
        Some(ssrc) => ssrc,
        None => {
            log::warn!("FlexFEC is enabled, but no FlexFEC SSRC given. Therefore disabling FlexFEC.");
            return None;
        }
    };
    if config.rtp.flexfec.protected_media_ssrcs.is_empty() {
        log::warn!(
            "FlexFEC is enabled, but no protected media SSRC given. Therefore disabling FlexFEC."
        );
        return None;
    }
    if config.rtp.flexfec.protected_media_ssrcs.len() > 1 {
        log::warn!(
            "The supplied FlexFEC configuration contained multiple protected media streams, \
             but only protecting a single media stream is supported. \
             To avoid confusion, disabling FlexFEC completely."
        );
        return None;
    }
    if !module_available {
        log::warn!("FlexFEC is enabled, but no FlexFEC send module given. Therefore disabling FlexFEC.");
        return None;
    }

    Some(ssrc)
}
