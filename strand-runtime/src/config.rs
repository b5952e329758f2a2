//! Runtime configuration.

use std::time::Duration;

/// Default number of work units an actor may perform per run.
const MAX_CYCLES_PER_RUN_DEFAULT: u32 = 64;

/// Default maximum number of cached outbound connections.
const MAX_CONNECTIONS_DEFAULT: usize = 64;

/// Default connect timeout in milliseconds.
const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 5000;

/// Configuration for the [`ActorScheduler`](crate::ActorScheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Work units requested from an actor per run.
    pub max_cycles_per_run: u32,
    /// First pause after a run that did no work.
    pub idle_backoff_min: Duration,
    /// Longest pause between idle runs.
    pub idle_backoff_max: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_cycles_per_run: MAX_CYCLES_PER_RUN_DEFAULT,
            idle_backoff_min: Duration::from_micros(100),
            idle_backoff_max: Duration::from_millis(10),
        }
    }
}

impl SchedulerConfig {
    /// Sets the work units requested per run.
    ///
    /// # Panics
    /// Panics if `cycles` is 0.
    #[must_use]
    pub const fn with_max_cycles_per_run(mut self, cycles: u32) -> Self {
        assert!(cycles > 0, "max cycles per run must be positive");
        self.max_cycles_per_run = cycles;
        self
    }

    /// Sets the idle backoff bounds.
    ///
    /// # Panics
    /// Panics if `min` is zero or greater than `max`.
    #[must_use]
    pub fn with_idle_backoff(mut self, min: Duration, max: Duration) -> Self {
        assert!(!min.is_zero(), "idle backoff must be positive");
        assert!(min <= max, "idle backoff min must not exceed max");
        self.idle_backoff_min = min;
        self.idle_backoff_max = max;
        self
    }
}

/// Configuration for the [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPoolConfig {
    /// Maximum number of cached connections.
    pub max_connections: usize,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: MAX_CONNECTIONS_DEFAULT,
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS_DEFAULT),
        }
    }
}

impl ConnectionPoolConfig {
    /// Sets the maximum number of cached connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_cycles_per_run, 64);
        assert!(config.idle_backoff_min <= config.idle_backoff_max);
    }

    #[test]
    #[should_panic(expected = "idle backoff min must not exceed max")]
    fn test_scheduler_rejects_inverted_backoff() {
        let _ = SchedulerConfig::default()
            .with_idle_backoff(Duration::from_millis(10), Duration::from_millis(1));
    }

    #[test]
    fn test_connection_pool_builders() {
        let config = ConnectionPoolConfig::default()
            .with_max_connections(2)
            .with_connect_timeout(Duration::from_millis(50));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_millis(50));
    }
}
