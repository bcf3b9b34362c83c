//! Pool construction configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Source of the idle timeout, re-evaluated on every arming.
#[derive(Clone)]
pub enum TimeoutSource {
    /// A fixed duration.
    Fixed(Duration),
    /// A callable producing the duration fresh each time it is needed.
    Dynamic(Arc<dyn Fn() -> Duration + Send + Sync>),
}

impl TimeoutSource {
    /// A dynamic source backed by a closure.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        TimeoutSource::Dynamic(Arc::new(f))
    }

    /// Evaluate the source. `Dynamic` invokes its closure on every call.
    pub fn duration(&self) -> Duration {
        match self {
            TimeoutSource::Fixed(d) => *d,
            TimeoutSource::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for TimeoutSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutSource::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            TimeoutSource::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<fn>").finish(),
        }
    }
}

impl From<Duration> for TimeoutSource {
    fn from(d: Duration) -> Self {
        TimeoutSource::Fixed(d)
    }
}

/// Milliseconds shorthand.
impl From<u64> for TimeoutSource {
    fn from(millis: u64) -> Self {
        TimeoutSource::Fixed(Duration::from_millis(millis))
    }
}

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker slots (the concurrency limit). At least 1.
    pub concurrency: usize,
    /// Idle timeout before the resource is closed automatically.
    /// Zero closes as soon as the pool goes idle.
    pub timeout: TimeoutSource,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<TimeoutSource>) -> Self {
        self.timeout = timeout.into();
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: TimeoutSource::Fixed(Duration::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout.duration(), Duration::ZERO);
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let config = PoolConfig::new().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn fixed_timeout_from_millis() {
        let config = PoolConfig::new().with_timeout(250);
        assert_eq!(config.timeout.duration(), Duration::from_millis(250));
    }

    #[test]
    fn dynamic_timeout_is_evaluated_per_call() {
        static CALLS: AtomicU64 = AtomicU64::new(0);
        let source = TimeoutSource::dynamic(|| {
            let n = CALLS.fetch_add(1, Ordering::Relaxed);
            Duration::from_millis(n)
        });

        assert_eq!(source.duration(), Duration::from_millis(0));
        assert_eq!(source.duration(), Duration::from_millis(1));
        assert_eq!(CALLS.load(Ordering::Relaxed), 2);
    }
}
