use serde::Serialize;

use crate::wire::TelemetryRecord;

/// One decoded telemetry sample stamped with its presentation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryFrame {
    /// Milliseconds from the start of the clip.
    pub timestamp_ms: f64,
    pub record: TelemetryRecord,
}

/// The time-indexed result of one extraction: frames sorted non-decreasing
/// by timestamp, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    frames: Vec<TelemetryFrame>,
}

impl Timeline {
    pub(crate) fn new(frames: Vec<TelemetryFrame>) -> Self {
        Timeline { frames }
    }

    pub fn frames(&self) -> &[TelemetryFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<TelemetryFrame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Return the frame whose timestamp is nearest to `time_ms`, breaking
    /// ties toward the earlier frame. `None` only when the timeline is empty.
    pub fn closest(&self, time_ms: f64) -> Option<&TelemetryFrame> {
        if self.frames.is_empty() {
            return None;
        }

        let idx = self.frames.partition_point(|f| f.timestamp_ms < time_ms);
        if idx == 0 {
            return self.frames.first();
        }
        if idx == self.frames.len() {
            return self.frames.last();
        }

        let before = &self.frames[idx - 1];
        let after = &self.frames[idx];
        if time_ms - before.timestamp_ms <= after.timestamp_ms - time_ms {
            Some(before)
        } else {
            Some(after)
        }
    }
}
