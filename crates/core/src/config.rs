//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core
//! services. Nothing in the request path reads environment variables; doing so
//! leads to inconsistent behaviour in multi-threaded runtimes and test
//! harnesses.

use crate::error::{SampleError, SampleResult};

/// Default cap on concurrently in-flight bulk items.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    max_in_flight: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `max_in_flight` is zero; a bulk run with no
    /// workers would never make progress.
    pub fn new(max_in_flight: usize) -> SampleResult<Self> {
        if max_in_flight == 0 {
            return Err(SampleError::InvalidInput(
                "max_in_flight must be at least 1".into(),
            ));
        }
        Ok(Self { max_in_flight })
    }

    /// Maximum number of bulk items dispatched concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_in_flight_is_rejected() {
        assert!(matches!(
            CoreConfig::new(0),
            Err(SampleError::InvalidInput(_))
        ));
    }

    #[test]
    fn default_uses_the_documented_cap() {
        assert_eq!(CoreConfig::default().max_in_flight(), DEFAULT_MAX_IN_FLIGHT);
    }
}
