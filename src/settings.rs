use crate::relay::RetryPolicy;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Port the map editor listens on
pub const DEFAULT_PORT: u16 = 7500;
/// Should match the update frequency of the listening side
pub const DEFAULT_FREQUENCY_HZ: f64 = 20.0;
/// How long to wait for the first frame with markers
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_CAPTURE_SOURCE: &str = "capture.json";

#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub port: u16,
    pub frequency_hz: f64,
    pub capture_source: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            capture_source: DEFAULT_CAPTURE_SOURCE.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::Immediate,
        }
    }
}

impl RelaySettings {
    /// Builds settings from the optional positional arguments.
    /// Bad values are replaced with defaults, never rejected.
    pub fn from_args(port: Option<&str>, frequency: Option<&str>, capture_source: &str) -> Self {
        Self {
            port: port.map(parse_port).unwrap_or(DEFAULT_PORT),
            frequency_hz: frequency.map(parse_frequency).unwrap_or(DEFAULT_FREQUENCY_HZ),
            capture_source: capture_source.to_owned(),
            ..Default::default()
        }
    }

    /// Pause between two sent frames
    pub fn delay(&self) -> Duration {
        Duration::from_millis((1000.0 / self.frequency_hz).round() as u64)
    }

    pub fn destination(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.port)
    }
}

pub fn parse_port(raw: &str) -> u16 {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => port,
        _ => {
            tracing::warn!(
                "Invalid argument for port number {:?}. Using default port: {}",
                raw,
                DEFAULT_PORT
            );
            DEFAULT_PORT
        }
    }
}

pub fn parse_frequency(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(frequency) if frequency.is_finite() && frequency > 0.0 => frequency,
        _ => {
            tracing::warn!(
                "Invalid argument for update frequency {:?}. Using default frequency: {}",
                raw,
                DEFAULT_FREQUENCY_HZ
            );
            DEFAULT_FREQUENCY_HZ
        }
    }
}
