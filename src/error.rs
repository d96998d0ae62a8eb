//! Error types for the convergence waiter.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a probe while fetching remote state.
///
/// The display text is exactly the message the probe was built with. Benign
/// matchers compare against it, so no prefix is added.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProbeError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProbeError {
    /// Create a probe error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying client error, keeping its display text as the message.
    ///
    /// # Examples
    ///
    /// ```
    /// use hemmer_provider_waiter::ProbeError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
    /// let err = ProbeError::from_error(io);
    /// assert_eq!(err.message(), "connection reset");
    /// ```
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a probe error with an explicit message and an underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The probe did not answer within its per-call budget.
    pub fn deadline(budget: Duration) -> Self {
        Self::new(format!("probe did not complete within {:?}", budget))
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A wait configuration that breaks one of the waiter's preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No target state was configured, so the wait could never succeed.
    #[error("at least one target state is required")]
    NoTargetStates,

    /// A label was listed as both pending and target.
    #[error("state '{0}' is both pending and target")]
    OverlappingStates(String),

    /// The initial delay would consume the whole budget.
    #[error("timeout ({timeout:?}) must be greater than the initial delay ({initial_delay:?})")]
    DelayExceedsTimeout {
        /// Configured overall timeout.
        timeout: Duration,
        /// Configured initial delay.
        initial_delay: Duration,
    },

    /// Probes would time out before they could start.
    #[error("probe timeout must be non-zero")]
    ZeroProbeTimeout,

    /// The configuration could not be decoded.
    #[error("invalid wait configuration: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors that end a wait without reaching a target state.
///
/// Every variant produced by the polling loop carries the last observed state
/// label and, when the probe had returned one, the last payload.
#[derive(Debug, Error)]
pub enum WaitError<T: fmt::Debug> {
    /// The probe failed with an error that is not the recognised benign one.
    #[error("error while waiting for state (last state: '{last_state}'): {source}")]
    Probe {
        /// Last observed state label, empty if none was seen.
        last_state: String,
        /// Last observed payload.
        last: Option<T>,
        /// The probe failure.
        source: ProbeError,
    },

    /// The resource stayed pending past the configured budget.
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        /// Comma-separated target states.
        target: String,
        /// Last observed state label, empty if none was seen.
        last_state: String,
        /// Last observed payload.
        last: Option<T>,
        /// The configured overall timeout.
        timeout: Duration,
    },

    /// The resource reported a state that is neither pending nor target.
    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState {
        /// The unrecognised state label.
        state: String,
        /// Comma-separated target states.
        target: String,
        /// Payload that carried the state.
        last: Option<T>,
    },

    /// The shutdown signal fired before the wait finished.
    #[error("wait cancelled (last state: '{last_state}')")]
    Cancelled {
        /// Last observed state label, empty if none was seen.
        last_state: String,
        /// Last observed payload.
        last: Option<T>,
    },

    /// The configuration was rejected before any probe ran.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// The runtime for a blocking wait could not be created.
    #[error("failed to start wait runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// A blocking wait was started from a thread already driving a tokio runtime.
    #[error("blocking wait called from inside an async runtime")]
    NestedRuntime,
}

impl<T: fmt::Debug> WaitError<T> {
    /// The last state label observed before the wait ended, if any.
    pub fn last_state(&self) -> Option<&str> {
        let state = match self {
            Self::Probe { last_state, .. }
            | Self::Timeout { last_state, .. }
            | Self::Cancelled { last_state, .. } => last_state.as_str(),
            Self::UnexpectedState { state, .. } => state.as_str(),
            Self::InvalidConfig(_) | Self::Runtime(_) | Self::NestedRuntime => return None,
        };
        if state.is_empty() {
            None
        } else {
            Some(state)
        }
    }

    /// The last payload returned by the probe, if any.
    pub fn last_payload(&self) -> Option<&T> {
        match self {
            Self::Probe { last, .. }
            | Self::Timeout { last, .. }
            | Self::UnexpectedState { last, .. }
            | Self::Cancelled { last, .. } => last.as_ref(),
            Self::InvalidConfig(_) | Self::Runtime(_) | Self::NestedRuntime => None,
        }
    }

    /// Consume the error, returning the last payload.
    pub fn into_last_payload(self) -> Option<T> {
        match self {
            Self::Probe { last, .. }
            | Self::Timeout { last, .. }
            | Self::UnexpectedState { last, .. }
            | Self::Cancelled { last, .. } => last,
            Self::InvalidConfig(_) | Self::Runtime(_) | Self::NestedRuntime => None,
        }
    }

    /// Whether the wait ran out of time while the resource was still pending.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the probe itself failed.
    pub fn is_probe_error(&self) -> bool {
        matches!(self, Self::Probe { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_display_is_message() {
        let err = ProbeError::new("Topic 'orders' does not exist");
        assert_eq!(err.to_string(), "Topic 'orders' does not exist");
        assert_eq!(err.message(), "Topic 'orders' does not exist");
    }

    #[test]
    fn test_probe_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = ProbeError::with_source("GET /topic failed", io);
        assert_eq!(err.to_string(), "GET /topic failed");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "read timed out");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::OverlappingStates("ACTIVE".to_string());
        assert_eq!(err.to_string(), "state 'ACTIVE' is both pending and target");

        let err = ConfigError::NoTargetStates;
        assert_eq!(err.to_string(), "at least one target state is required");
    }

    #[test]
    fn test_wait_error_display() {
        let err: WaitError<()> = WaitError::Timeout {
            target: "ACTIVE".to_string(),
            last_state: "CONFIGURING".to_string(),
            last: None,
            timeout: Duration::from_secs(600),
        };
        assert_eq!(
            err.to_string(),
            "timeout while waiting for state to become 'ACTIVE' (last state: 'CONFIGURING', timeout: 600s)"
        );

        let err: WaitError<()> = WaitError::UnexpectedState {
            state: "DELETING".to_string(),
            target: "ACTIVE".to_string(),
            last: Some(()),
        };
        assert_eq!(
            err.to_string(),
            "unexpected state 'DELETING', wanted target 'ACTIVE'"
        );
    }

    #[test]
    fn test_wait_error_accessors() {
        let err: WaitError<u32> = WaitError::Probe {
            last_state: "CONFIGURING".to_string(),
            last: Some(7),
            source: ProbeError::new("boom"),
        };
        assert!(err.is_probe_error());
        assert!(!err.is_timeout());
        assert_eq!(err.last_state(), Some("CONFIGURING"));
        assert_eq!(err.last_payload(), Some(&7));
        assert_eq!(err.into_last_payload(), Some(7));

        let err: WaitError<u32> = WaitError::Cancelled {
            last_state: String::new(),
            last: None,
        };
        assert_eq!(err.last_state(), None);

        let err: WaitError<u32> = ConfigError::ZeroProbeTimeout.into();
        assert_eq!(err.to_string(), "probe timeout must be non-zero");
        assert!(err.last_payload().is_none());
    }
}
