use crate::capture::{CaptureClient, CaptureError, FrameStatus, StreamMode};
use nalgebra as na;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Eq, PartialEq, Copy, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordedStatus {
    #[default]
    Success,
    NoFrame,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
struct RecordedFrame {
    at_ms: u64,
    #[serde(default)]
    status: RecordedStatus,
    #[serde(default)]
    markers: Vec<[f64; 3]>,
}

fn recorded_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct Recording {
    #[serde(default)]
    repeat: bool,
    /// Set to false for sessions captured without unlabeled marker data
    #[serde(default = "recorded_by_default")]
    unlabeled_markers: bool,
    frames: Vec<RecordedFrame>,
}

/// Capture client backed by a recorded session on disk.
///
/// Frames become visible once their `at_ms` offset has passed since the
/// stream mode was set. Pulling always yields the latest visible frame.
pub struct ReplayClient {
    recording: Recording,
    streaming_since: Option<Instant>,
    unlabeled_enabled: bool,
    current: Option<usize>,
}

impl ReplayClient {
    pub fn connect(address: &str) -> Result<Self, CaptureError> {
        let connect_error = |reason: String| CaptureError::Connect {
            address: address.to_owned(),
            reason,
        };
        let raw = std::fs::read_to_string(Path::new(address))
            .map_err(|error| connect_error(error.to_string()))?;
        let mut recording: Recording =
            serde_json::from_str(&raw).map_err(|error| connect_error(error.to_string()))?;
        recording.frames.sort_by_key(|frame| frame.at_ms);
        tracing::debug!(
            "Loaded {} recorded frames from {}",
            recording.frames.len(),
            address
        );
        Ok(Self {
            recording,
            streaming_since: None,
            unlabeled_enabled: false,
            current: None,
        })
    }

    fn span_ms(&self) -> u64 {
        self.recording
            .frames
            .last()
            .map(|frame| frame.at_ms.saturating_add(1))
            .unwrap_or(0)
    }

    /// Index of the latest frame visible after `elapsed` of streaming
    fn frame_at(&self, elapsed: Duration) -> Option<usize> {
        let mut offset = elapsed.as_millis() as u64;
        let span = self.span_ms();
        if self.recording.repeat && span > 0 {
            offset %= span;
        }
        self.recording
            .frames
            .iter()
            .rposition(|frame| frame.at_ms <= offset)
    }

    fn pull(&mut self, now: Instant) -> FrameStatus {
        let since = match self.streaming_since {
            Some(since) => since,
            None => return FrameStatus::Error("Stream mode not set".to_owned()),
        };
        self.current = self.frame_at(now.saturating_duration_since(since));
        match self.current.map(|index| self.recording.frames[index].status) {
            None | Some(RecordedStatus::NoFrame) => FrameStatus::NoFrame,
            Some(RecordedStatus::Error) => FrameStatus::Error("Recorded frame error".to_owned()),
            Some(RecordedStatus::Success) => FrameStatus::Success,
        }
    }

    fn current_markers(&self) -> &[[f64; 3]] {
        match self.current {
            Some(index) if self.unlabeled_enabled => &self.recording.frames[index].markers,
            _ => &[],
        }
    }
}

impl CaptureClient for ReplayClient {
    fn set_stream_mode(&mut self, mode: StreamMode) -> Result<(), CaptureError> {
        match mode {
            StreamMode::ClientPull | StreamMode::ClientPullPreFetch => {
                self.streaming_since = Some(Instant::now());
                Ok(())
            }
            StreamMode::ServerPush => Err(CaptureError::StreamMode(mode)),
        }
    }

    fn enable_unlabeled_marker_data(&mut self) -> Result<(), CaptureError> {
        if !self.recording.unlabeled_markers {
            return Err(CaptureError::EnableMarkers);
        }
        self.unlabeled_enabled = true;
        Ok(())
    }

    fn get_frame(&mut self) -> FrameStatus {
        self.pull(Instant::now())
    }

    fn unlabeled_marker_count(&self) -> usize {
        self.current_markers().len()
    }

    fn unlabeled_marker_position(&self, index: usize) -> Option<na::Point3<f64>> {
        self.current_markers()
            .get(index)
            .map(|&[x, y, z]| na::Point3::new(x, y, z))
    }
}
