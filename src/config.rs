//! Client configuration.

use std::time::Duration;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3000";

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOADING_DELAY: Duration = Duration::from_secs(3);

/// Configuration for the connection and the game session.
///
/// # Example
///
/// ```
/// use knowledge_battle_client::TriviaConfig;
/// use std::time::Duration;
///
/// let config = TriviaConfig::new("ws://quiz.example:3000")
///     .with_loading_delay(Duration::from_secs(5));
/// assert_eq!(config.endpoint, "ws://quiz.example:3000");
/// assert_eq!(config.event_channel_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct TriviaConfig {
    /// Server address the WebSocket transport connects to.
    pub endpoint: String,
    /// Per-subscriber event buffer.
    ///
    /// A subscriber that falls further behind than this loses the oldest
    /// events (a warning is logged). Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`shutdown`](crate::ConnectionProvider::shutdown) waits for
    /// the connection loop before aborting it. Zero aborts immediately.
    pub shutdown_timeout: Duration,
    /// Deadline for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// How long a started game may go without a question before the
    /// loading indicator is shown.
    pub loading_delay: Duration,
}

impl TriviaConfig {
    /// Create a configuration for `endpoint` with default tuning.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            loading_delay: DEFAULT_LOADING_DELAY,
        }
    }

    /// Set the per-subscriber event buffer. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the WebSocket handshake deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the delay before the loading indicator appears.
    #[must_use]
    pub fn with_loading_delay(mut self, delay: Duration) -> Self {
        self.loading_delay = delay;
        self
    }
}

impl Default for TriviaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TriviaConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.loading_delay, Duration::from_secs(3));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let config = TriviaConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }
}
