use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::frame::{EncodedFrame, VideoCodecType};
use crate::{EncodedFrameSink, Result, SendStatsObserver};

/// MockStats records reported encoder target rates and serves a settable
/// frame rate.
#[derive(Default)]
pub struct MockStats {
    target_rates: Mutex<Vec<u32>>,
    frame_rate_fps: AtomicU32,
    inactive_ssrcs: Mutex<Vec<u32>>,
}

impl MockStats {
    pub fn new(frame_rate_fps: u32) -> Self {
        let stats = MockStats::default();
        stats.frame_rate_fps.store(frame_rate_fps, Ordering::SeqCst);
        stats
    }

    pub fn target_rates(&self) -> Vec<u32> {
        self.target_rates.lock().unwrap().clone()
    }

    pub fn last_target_rate(&self) -> Option<u32> {
        self.target_rates.lock().unwrap().last().copied()
    }

    pub fn inactive_ssrcs(&self) -> Vec<u32> {
        self.inactive_ssrcs.lock().unwrap().clone()
    }
}

impl SendStatsObserver for MockStats {
    fn on_encoder_target_rate(&self, bitrate_bps: u32) {
        self.target_rates.lock().unwrap().push(bitrate_bps);
    }

    fn send_frame_rate(&self) -> u32 {
        self.frame_rate_fps.load(Ordering::SeqCst)
    }

    fn on_inactive_ssrc(&self, ssrc: u32) {
        self.inactive_ssrcs.lock().unwrap().push(ssrc);
    }
}

/// MockFrameSink shares its recorded frames through an Arc so tests keep
/// access after handing the sink over.
#[derive(Default)]
pub struct MockFrameSink {
    frames: Arc<Mutex<Vec<(EncodedFrame, VideoCodecType)>>>,
}

impl MockFrameSink {
    pub fn new() -> Self {
        MockFrameSink::default()
    }

    pub fn frames(&self) -> Arc<Mutex<Vec<(EncodedFrame, VideoCodecType)>>> {
        Arc::clone(&self.frames)
    }
}

impl EncodedFrameSink for MockFrameSink {
    fn write_frame(&mut self, frame: &EncodedFrame, codec_type: VideoCodecType) -> Result<()> {
        self.frames.lock().unwrap().push((frame.clone(), codec_type));
        Ok(())
    }
}
