use nalgebra as na;
use thiserror::Error;

/// How the capture server hands frames to the client.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum StreamMode {
    /// Client requests a frame and waits for the next one
    #[cfg_attr(not(test), allow(dead_code))]
    ClientPull,
    /// Client requests a frame and gets whatever is buffered
    ClientPullPreFetch,
    #[cfg_attr(not(test), allow(dead_code))]
    ServerPush,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    Success,
    NoFrame,
    Error(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Error while connecting to capture source {address}: {reason}")]
    Connect { address: String, reason: String },
    #[error("Error while setting stream mode {0:?}")]
    StreamMode(StreamMode),
    #[error("Error while enabling unlabeled markers")]
    EnableMarkers,
}

/// Minimal surface of a motion capture SDK client.
///
/// Connecting is left to the constructor of the concrete client.
/// Marker queries refer to the frame fetched by the last `get_frame` call.
pub trait CaptureClient {
    fn set_stream_mode(&mut self, mode: StreamMode) -> Result<(), CaptureError>;

    fn enable_unlabeled_marker_data(&mut self) -> Result<(), CaptureError>;

    /// Pulls the latest buffered frame. Never waits for a new sample.
    fn get_frame(&mut self) -> FrameStatus;

    fn unlabeled_marker_count(&self) -> usize;

    /// Global position of the marker in millimeters
    fn unlabeled_marker_position(&self, index: usize) -> Option<na::Point3<f64>>;
}
