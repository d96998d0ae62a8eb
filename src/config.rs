//! Wait configuration.
//!
//! A [`WaitConfig`] is built per operation, either with the `with_*` builder
//! methods or decoded from the provider's JSON configuration:
//!
//! ```
//! use std::time::Duration;
//! use hemmer_provider_waiter::WaitConfig;
//!
//! let config = WaitConfig::from_json(serde_json::json!({
//!     "pending_states": ["CONFIGURING"],
//!     "target_states": ["ACTIVE"],
//!     "timeout": "5m",
//! }))
//! .unwrap();
//!
//! assert_eq!(config.timeout, Duration::from_secs(300));
//! assert_eq!(config.initial_delay, Duration::from_secs(10));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Delay before the first probe.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Minimum spacing between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Overall budget for one wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Budget for a single probe call.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// How the delay between probes evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// Always wait the poll interval.
    #[default]
    Fixed,
    /// Multiply the delay by `factor` after each pending probe, capped at `max`.
    Exponential {
        /// Growth factor applied after every pending probe.
        factor: u32,
        /// Upper bound for the delay.
        #[serde(with = "humantime_serde")]
        max: Duration,
    },
}

impl Backoff {
    /// Delay before probe number `attempt + 1`, where attempt 0 follows the first probe.
    pub fn delay(&self, poll_interval: Duration, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed => poll_interval,
            Backoff::Exponential { factor, max } => {
                let growth = factor.max(1).saturating_pow(attempt);
                poll_interval.saturating_mul(growth).min(max.max(poll_interval))
            }
        }
    }
}

/// What to do with a state label that is neither pending nor target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatePolicy {
    /// End the wait with an unexpected-state error.
    #[default]
    Fail,
    /// Keep polling until a target state or the timeout.
    KeepPolling,
}

/// Parameters for one convergence wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Labels meaning the resource is still converging, in priority order.
    pub pending_states: Vec<String>,
    /// Labels meaning the resource is ready.
    pub target_states: Vec<String>,
    /// Sleep before the first probe.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Minimum spacing between probes.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Total budget, counted from the start of the wait.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Budget for a single probe call.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Growth of the inter-probe delay.
    pub backoff: Backoff,
    /// Handling of labels in neither set.
    pub unknown_state: UnknownStatePolicy,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            pending_states: Vec::new(),
            target_states: Vec::new(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            backoff: Backoff::Fixed,
            unknown_state: UnknownStatePolicy::Fail,
        }
    }
}

impl WaitConfig {
    /// Create a configuration with the given state sets and default timings.
    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::default()
            .with_pending_states(pending)
            .with_target_states(target)
    }

    /// Decode a configuration from JSON. Missing fields take their defaults
    /// and repeated state labels are dropped.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_value(value)?;
        config.pending_states = dedup(config.pending_states);
        config.target_states = dedup(config.target_states);
        config.validate()?;
        Ok(config)
    }

    /// Set the pending states. Duplicates are dropped, order is kept.
    pub fn with_pending_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.pending_states = dedup(states);
        self
    }

    /// Set the target states. Duplicates are dropped, order is kept.
    pub fn with_target_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.target_states = dedup(states);
        self
    }

    /// Set the delay before the first probe.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the minimum spacing between probes.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the budget for a single probe call.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the handling of unrecognised state labels.
    pub fn with_unknown_state(mut self, policy: UnknownStatePolicy) -> Self {
        self.unknown_state = policy;
        self
    }

    /// Check the waiter's preconditions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_states.is_empty() {
            return Err(ConfigError::NoTargetStates);
        }
        if let Some(state) = self
            .pending_states
            .iter()
            .find(|s| self.target_states.contains(*s))
        {
            return Err(ConfigError::OverlappingStates(state.clone()));
        }
        if self.timeout <= self.initial_delay {
            return Err(ConfigError::DelayExceedsTimeout {
                timeout: self.timeout,
                initial_delay: self.initial_delay,
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(())
    }

    /// Whether `state` is a target state.
    pub fn is_target(&self, state: &str) -> bool {
        self.target_states.iter().any(|s| s == state)
    }

    /// Whether `state` is a pending state.
    pub fn is_pending(&self, state: &str) -> bool {
        self.pending_states.iter().any(|s| s == state)
    }

    /// The label reported while the resource is not queryable yet.
    pub fn synthetic_pending_state(&self) -> &str {
        self.pending_states.first().map(String::as_str).unwrap_or("")
    }

    pub(crate) fn target_label(&self) -> String {
        self.target_states.join(", ")
    }
}

fn dedup<I>(states: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for state in states {
        let state = state.into();
        if !out.contains(&state) {
            out.push(state);
        }
    }
    out
}
