#[cfg(test)]
mod loss_feedback_test;

use std::collections::HashSet;

use crate::PacketFeedback;

// Assume an average video stream has around 3 packets per frame (1 mbps / 30
// fps / 1400B). A sequence number set with size 5500 will be able to store
// packet sequence numbers for at least the last 60 seconds.
pub(crate) const SEQ_NUM_SET_MAX_SIZE: usize = 5500;

/// LossFeedbackAggregator correlates sent packets of this stream's own media
/// SSRCs with later transport feedback and accumulates a per-packet loss
/// mask, drained once per rate-update tick.
#[derive(Debug)]
pub(crate) struct LossFeedbackAggregator {
    ssrcs: Vec<u32>,
    outstanding_seq_nums: HashSet<u16>,
    loss_mask: Vec<bool>,
}

impl LossFeedbackAggregator {
    pub(crate) fn new(ssrcs: Vec<u32>) -> Self {
        LossFeedbackAggregator {
            ssrcs,
            outstanding_seq_nums: HashSet::new(),
            loss_mask: vec![],
        }
    }

    /// record_sent notes a packet awaiting feedback. Packets from SSRCs this
    /// stream does not own are ignored; the feedback channel is shared with
    /// other senders. Overflow resets the whole set rather than evicting:
    /// losing attribution granularity beats unbounded growth.
    pub(crate) fn record_sent(&mut self, ssrc: u32, seq_num: u16) {
        if !self.ssrcs.contains(&ssrc) {
            return;
        }
        self.outstanding_seq_nums.insert(seq_num);
        if self.outstanding_seq_nums.len() > SEQ_NUM_SET_MAX_SIZE {
            log::warn!("Feedback packet sequence number set exceeded its max size, will get reset.");
            self.outstanding_seq_nums.clear();
        }
    }

    /// record_feedback resolves outstanding packets against delivery
    /// feedback. A feedback entry with no matching outstanding packet is
    /// silently dropped; a missing feedback entry is never treated as loss.
    pub(crate) fn record_feedback(&mut self, feedback: &[PacketFeedback]) {
        for packet in feedback {
            if self.outstanding_seq_nums.remove(&packet.sequence_number) {
                self.loss_mask.push(packet.lost());
            }
        }
    }

    /// take_loss_mask drains the accumulated mask.
    pub(crate) fn take_loss_mask(&mut self) -> Vec<bool> {
        std::mem::take(&mut self.loss_mask)
    }

    #[cfg(test)]
    pub(crate) fn outstanding_len(&self) -> usize {
        self.outstanding_seq_nums.len()
    }
}
