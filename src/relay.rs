use crate::capture::{CaptureClient, FrameStatus};
use crate::marker_messages::{self, ByteOrder, Marker, MarkerFrame};
use crate::settings::RelaySettings;
use crate::udp::MessageSink;
use nalgebra as na;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// What to do when an iteration produced nothing to send
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RetryPolicy {
    /// Poll again right away. Spins the CPU while waiting for the first frame.
    Immediate,
    Backoff(Duration),
}

/// Tracks how long we have been waiting for usable data.
///
/// The timer runs from the start of the session until the first frame
/// with markers arrives. Once stopped it never runs again, even if the
/// markers disappear later on.
#[derive(Debug, Clone)]
pub struct SessionState {
    started: Instant,
    stopped_after: Option<Duration>,
}

impl SessionState {
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            stopped_after: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stopped_after.is_none()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.stopped_after
            .unwrap_or_else(|| now.saturating_duration_since(self.started))
    }

    /// Returns true only for the call that actually stopped the timer
    pub fn stop(&mut self, now: Instant) -> bool {
        if self.is_running() {
            self.stopped_after = Some(now.saturating_duration_since(self.started));
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Step {
    /// No usable frame yet
    Waiting,
    /// Capture source reported an error for this frame
    FrameError,
    Sent { markers: usize },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("No data received from capture source for {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("Failed to send markers: {0}")]
    Send(#[from] std::io::Error),
}

pub struct Relay<C, S, K> {
    capture: C,
    sink: S,
    clock: K,
    session: SessionState,
    timeout: Duration,
    delay: Duration,
    retry: RetryPolicy,
    byte_order: ByteOrder,
}

impl<C, S, K> Relay<C, S, K>
where
    C: CaptureClient,
    S: MessageSink,
    K: Clock,
{
    pub fn new(capture: C, sink: S, clock: K, settings: &RelaySettings) -> Self {
        let session = SessionState::start(clock.now());
        Self {
            capture,
            sink,
            clock,
            session,
            timeout: settings.timeout,
            delay: settings.delay(),
            retry: settings.retry,
            byte_order: marker_messages::WIRE_BYTE_ORDER,
        }
    }

    /// Runs one polling iteration without sleeping
    pub fn step(&mut self) -> Result<Step, RelayError> {
        let status = self.capture.get_frame();
        let marker_count = self.capture.unlabeled_marker_count();

        // Source not streaming yet and source streaming without markers
        // are both treated as "no data" while the timer runs
        if status == FrameStatus::NoFrame || (self.session.is_running() && marker_count == 0) {
            let elapsed = self.session.elapsed(self.clock.now());
            if self.session.is_running() && elapsed > self.timeout {
                return Err(RelayError::Timeout { elapsed });
            }
            return Ok(Step::Waiting);
        }
        if let FrameStatus::Error(reason) = status {
            tracing::warn!("Error while retrieving frame: {}", reason);
            return Ok(Step::FrameError);
        }

        if self.session.stop(self.clock.now()) {
            tracing::info!("Connection to capture source confirmed. Data broadcasting.");
        }

        // One record per reported marker, unreadable ones sit at the origin
        let markers: Vec<Marker> = (0..marker_count)
            .map(|index| {
                let position = self.capture.unlabeled_marker_position(index);
                if position.is_none() {
                    tracing::debug!("Position of unlabeled marker {} unavailable", index);
                }
                Marker::from_millimeters(index, &position.unwrap_or_else(na::Point3::origin))
            })
            .collect();
        self.log_frame(&markers);

        let message = marker_messages::encode_markers(&markers, self.byte_order);
        self.sink.send(&message)?;
        Ok(Step::Sent {
            markers: markers.len(),
        })
    }

    /// Relays frames until a fatal error happens. Never returns `Ok`.
    pub fn run(&mut self) -> Result<(), RelayError> {
        tracing::info!("Requesting broadcasting to begin.");
        loop {
            match self.step()? {
                Step::Sent { .. } => self.clock.sleep(self.delay),
                Step::Waiting | Step::FrameError => {
                    if let RetryPolicy::Backoff(pause) = self.retry {
                        self.clock.sleep(pause);
                    }
                }
            }
        }
    }

    fn log_frame(&self, markers: &[Marker]) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis())
            .unwrap_or_default();
        match serde_json::to_string(&MarkerFrame::new(ts, markers)) {
            Ok(json) => tracing::trace!("{}", json),
            Err(error) => tracing::debug!("Failed to serialize frame: {}", error),
        }
    }
}
