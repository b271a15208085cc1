use super::*;
use crate::config::{FlexfecConfig, UlpfecConfig};
use crate::frame::VideoCodecType;

fn base_config() -> VideoSendConfig {
    let mut config = VideoSendConfig::default();
    config.rtp.ssrcs = vec![1234];
    config.encoder.codec_type = VideoCodecType::Vp8;
    config
}

#[test]
fn test_ulpfec_without_red_is_disabled() {
    let mut config = base_config();
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: None,
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert!(!policy.ulpfec_enabled());
    assert!(!policy.red_enabled());
    assert!(!policy.fec_enabled());
}

#[test]
fn test_red_and_ulpfec_enabled_together() {
    let mut config = base_config();
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(118),
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert_eq!(Some(118), policy.red_payload_type);
    assert_eq!(Some(119), policy.ulpfec_payload_type);
    assert!(policy.fec_enabled());
}

#[test]
fn test_flexfec_disables_red_and_ulpfec() {
    let mut config = base_config();
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(100),
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, true);
    assert!(policy.flexfec_enabled);
    assert_eq!(None, policy.red_payload_type);
    assert_eq!(None, policy.ulpfec_payload_type);
    assert!(policy.fec_enabled());
}

#[test]
fn test_nack_with_codec_lacking_picture_id_disables_ulpfec() {
    let mut config = base_config();
    config.encoder.codec_type = VideoCodecType::H264;
    config.rtp.nack.rtp_history_ms = 1000;
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(118),
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert!(policy.nack_enabled);
    assert!(!policy.ulpfec_enabled());
    // RED stays negotiated for old receivers even without ULPFEC.
    assert_eq!(Some(118), policy.red_payload_type);
}

#[test]
fn test_nack_with_vp8_keeps_ulpfec() {
    let mut config = base_config();
    config.rtp.nack.rtp_history_ms = 1000;
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(118),
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert!(policy.nack_enabled);
    assert_eq!(Some(119), policy.ulpfec_payload_type);
}

#[test]
fn test_nack_only_without_fec() {
    let mut config = base_config();
    config.rtp.nack.rtp_history_ms = 1000;

    let policy = resolve_protection_policy(&config, false);
    assert!(policy.nack_enabled);
    assert!(!policy.ulpfec_enabled());
    assert!(!policy.fec_enabled());
}

#[test]
fn test_disable_ulpfec_experiment() {
    let mut config = base_config();
    config.experiments.disable_ulpfec = true;
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(118),
        ulpfec_payload_type: Some(119),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert!(!policy.ulpfec_enabled());
}

#[test]
fn test_out_of_range_payload_types_disabled() {
    let mut config = base_config();
    config.rtp.ulpfec = UlpfecConfig {
        red_payload_type: Some(200),
        ulpfec_payload_type: Some(201),
        red_rtx_payload_type: None,
    };

    let policy = resolve_protection_policy(&config, false);
    assert!(!policy.red_enabled());
    assert!(!policy.ulpfec_enabled());
}

#[test]
fn test_policy_invariants_over_configuration_space() {
    // ULPFEC never survives without RED, and FlexFEC never coexists with
    // RED or ULPFEC, regardless of input.
    for red in [None, Some(118u8), Some(200u8)] {
        for ulpfec in [None, Some(119u8), Some(201u8)] {
            for nack_ms in [0i64, 1000] {
                for flexfec in [false, true] {
                    for codec in [VideoCodecType::Vp8, VideoCodecType::H264] {
                        let mut config = base_config();
                        config.encoder.codec_type = codec;
                        config.rtp.nack.rtp_history_ms = nack_ms;
                        config.rtp.ulpfec.red_payload_type = red;
                        config.rtp.ulpfec.ulpfec_payload_type = ulpfec;

                        let policy = resolve_protection_policy(&config, flexfec);
                        assert!(!(policy.ulpfec_enabled() && !policy.red_enabled()));
                        assert!(
                            !(policy.flexfec_enabled
                                && (policy.red_enabled() || policy.ulpfec_enabled()))
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_flexfec_requires_ssrc_and_protected_media() {
    let mut config = base_config();
    config.rtp.flexfec = FlexfecConfig {
        payload_type: Some(120),
        ssrc: None,
        protected_media_ssrcs: vec![1234],
    };
    assert_eq!(None, resolve_flexfec(&config, true));

    config.rtp.flexfec.ssrc = Some(5678);
    config.rtp.flexfec.protected_media_ssrcs = vec![];
    assert_eq!(None, resolve_flexfec(&config, true));

    config.rtp.flexfec.protected_media_ssrcs = vec![1234, 2345];
    assert_eq!(None, resolve_flexfec(&config, true));

    config.rtp.flexfec.protected_media_ssrcs = vec![1234];
    assert_eq!(None, resolve_flexfec(&config, false));
    assert_eq!(Some(5678), resolve_flexfec(&config, true));
}
