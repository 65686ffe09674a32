use super::{Countdown, TickOutcome};
use crate::capture::{CaptureController, EncodedFrame};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// One countdown plus the frames it has accumulated. Dropping it discards the
/// buffer, which is how cancellation works.
#[derive(Debug)]
pub struct RecordingSession {
    countdown: Countdown,
    frames: Vec<EncodedFrame>,
}

impl RecordingSession {
    pub fn new(countdown: Countdown) -> Self {
        Self {
            countdown,
            frames: Vec::new(),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Advances one tick, sampling from `capture` when the policy asks for it.
    pub fn tick(&mut self, capture: &mut CaptureController) -> TickOutcome {
        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Sample {
            match capture.grab_frame() {
                Some(frame) => {
                    self.frames.push(frame);
                    log_debug!(
                        "Sampled frame {} ({}s left)",
                        self.frames.len(),
                        self.countdown.remaining()
                    );
                }
                None => log_warn!("No frame available at {}s left", self.countdown.remaining()),
            }
        }
        outcome
    }

    /// Hands the buffer off. An empty buffer gets one synchronous capture so
    /// the analysis always has something to look at when the camera works.
    pub fn into_frames(self, capture: &mut CaptureController) -> Vec<EncodedFrame> {
        let mut frames = self.frames;
        if frames.is_empty() {
            log_warn!("Recording produced no frames, capturing one now");
            frames.extend(capture.grab_frame());
        }
        log_info!("Recording finished with {} frame(s)", frames.len());
        frames
    }
}
