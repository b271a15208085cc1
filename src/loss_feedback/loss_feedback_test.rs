use super::*;

const MEDIA_SSRC: u32 = 1234;

fn received(seq_num: u16) -> PacketFeedback {
    PacketFeedback {
        sequence_number: seq_num,
        arrival_time_ms: 1000,
    }
}

fn lost(seq_num: u16) -> PacketFeedback {
    PacketFeedback {
        sequence_number: seq_num,
        arrival_time_ms: PacketFeedback::NOT_RECEIVED,
    }
}

#[test]
fn test_feedback_builds_loss_mask() {
    let mut agg = LossFeedbackAggregator::new(vec![MEDIA_SSRC]);
    for seq in 0..4u16 {
        agg.record_sent(MEDIA_SSRC, seq);
    }
    agg.record_feedback(&[received(0), lost(1), received(2), lost(3)]);

    assert_eq!(vec![false, true, false, true], agg.take_loss_mask());
    // Drained.
    assert!(agg.take_loss_mask().is_empty());
    assert_eq!(0, agg.outstanding_len());
}

#[test]
fn test_foreign_ssrc_ignored() {
    let mut agg = LossFeedbackAggregator::new(vec![MEDIA_SSRC]);
    agg.record_sent(4321, 7);
    assert_eq!(0, agg.outstanding_len());

    agg.record_feedback(&[lost(7)]);
    assert!(agg.take_loss_mask().is_empty());
}

#[test]
fn test_feedback_for_unknown_packet_ignored() {
    let mut agg = LossFeedbackAggregator::new(vec![MEDIA_SSRC]);
    agg.record_sent(MEDIA_SSRC, 10);
    agg.record_feedback(&[lost(11), received(12)]);

    assert!(agg.take_loss_mask().is_empty());
    assert_eq!(1, agg.outstanding_len());
}

#[test]
fn test_outstanding_set_resets_on_overflow() {
    let mut agg = LossFeedbackAggregator::new(vec![MEDIA_SSRC]);
    for seq in 0..SEQ_NUM_SET_MAX_SIZE as u16 {
        agg.record_sent(MEDIA_SSRC, seq);
    }
    assert_eq!(SEQ_NUM_SET_MAX_SIZE, agg.outstanding_len());

    // One more distinct sequence number trips the hard reset.
    agg.record_sent(MEDIA_SSRC, SEQ_NUM_SET_MAX_SIZE as u16);
    assert_eq!(0, agg.outstanding_len());

    // Feedback for the cleared packets no longer correlates.
    agg.record_feedback(&[lost(0), lost(1)]);
    assert!(agg.take_loss_mask().is_empty());
}
