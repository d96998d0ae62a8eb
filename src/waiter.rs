//! The convergence waiter.
//!
//! A [`Waiter`] polls a [`Probe`] until the resource reports one of the
//! configured target states. The loop is:
//!
//! 1. sleep the initial delay;
//! 2. call the probe and classify the result;
//! 3. return on a target state, fail on a probe error or an unrecognised state;
//! 4. otherwise sleep the poll delay and repeat, until the timeout.
//!
//! Exactly one probe is in flight at a time. The loop keeps no state outside
//! the call, so independent waits can run concurrently.
//!
//! # Cancellation
//!
//! [`Waiter::wait_with_shutdown`] accepts any future as a shutdown signal.
//! It is raced against the initial delay, every probe call and every
//! inter-probe sleep; when it completes the wait returns
//! [`WaitError::Cancelled`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{UnknownStatePolicy, WaitConfig};
use crate::error::{ProbeError, WaitError};
use crate::matcher::{BenignError, NeverBenign};
use crate::probe::Probe;
use crate::types::{Observation, ProbeResult};

/// Deadline used when the configured timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// The outcome of a wait.
pub type WaitResult<T> = Result<Observation<T>, WaitError<T>>;

/// Polls a probe until its resource converges on a target state.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_waiter::{ExactMessage, WaitConfig, Waiter};
///
/// let waiter = Waiter::new(WaitConfig::new(["CONFIGURING"], ["ACTIVE"]))
///     .with_benign_error(ExactMessage::topic_not_found("orders"));
///
/// let topic = waiter.wait(&probe).await?;
/// assert_eq!(topic.state, "ACTIVE");
/// ```
#[derive(Clone)]
pub struct Waiter {
    config: WaitConfig,
    benign: Arc<dyn BenignError>,
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Waiter {
    /// Create a waiter. Every probe error is fatal until a benign matcher is set.
    pub fn new(config: WaitConfig) -> Self {
        Self {
            config,
            benign: Arc::new(NeverBenign),
        }
    }

    /// Set the predicate that recognises the "does not exist yet" error.
    pub fn with_benign_error(mut self, benign: impl BenignError + 'static) -> Self {
        self.benign = Arc::new(benign);
        self
    }

    /// Get the wait configuration.
    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait until the probe reports a target state.
    pub async fn wait<P>(&self, probe: &P) -> WaitResult<P::Snapshot>
    where
        P: Probe + ?Sized,
    {
        self.wait_with_shutdown(probe, std::future::pending::<()>()).await
    }

    /// Wait until the probe reports a target state or `shutdown` completes.
    #[instrument(
        skip_all,
        name = "waiter.wait",
        fields(targets = %self.config.target_label(), timeout = ?self.config.timeout)
    )]
    pub async fn wait_with_shutdown<P, S>(&self, probe: &P, shutdown: S) -> WaitResult<P::Snapshot>
    where
        P: Probe + ?Sized,
        S: Future<Output = ()>,
    {
        let config = &self.config;
        config.validate()?;

        let started = Instant::now();
        let deadline = started
            .checked_add(config.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        tokio::pin!(shutdown);

        let mut last_state = String::new();
        let mut last: Option<P::Snapshot> = None;
        let mut attempt: u32 = 0;

        if !config.initial_delay.is_zero() {
            debug!(delay = ?config.initial_delay, "Delaying first probe");
            tokio::select! {
                _ = sleep(config.initial_delay) => {}
                _ = &mut shutdown => {
                    info!("Wait cancelled before first probe");
                    return Err(WaitError::Cancelled { last_state, last });
                }
            }
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(last_state, last));
            }

            let budget = config.probe_timeout.min(remaining);
            let result = tokio::select! {
                result = timeout(budget, probe.probe()) => result,
                _ = &mut shutdown => {
                    info!(last_state = %last_state, "Wait cancelled during probe");
                    return Err(WaitError::Cancelled { last_state, last });
                }
            };
            attempt += 1;

            let result = match result {
                Ok(result) => result,
                Err(_) if Instant::now() >= deadline => {
                    return Err(self.timed_out(last_state, last));
                }
                Err(_) => Err(ProbeError::deadline(budget)),
            };

            match ProbeResult::classify(result, self.benign.as_ref()) {
                ProbeResult::Active { payload, state } => {
                    debug!(attempt, state = %state, "Got state while waiting");
                    if config.is_target(&state) {
                        info!(attempt, state = %state, "Resource reached target state");
                        return Ok(Observation::new(payload, state));
                    }
                    if !config.is_pending(&state) {
                        match config.unknown_state {
                            UnknownStatePolicy::Fail => {
                                warn!(state = %state, "Resource reported an unexpected state");
                                return Err(WaitError::UnexpectedState {
                                    state,
                                    target: config.target_label(),
                                    last: Some(payload),
                                });
                            }
                            UnknownStatePolicy::KeepPolling => {
                                debug!(state = %state, "Unrecognised state, polling on");
                            }
                        }
                    }
                    last_state = state;
                    last = Some(payload);
                }
                ProbeResult::BenignPending => {
                    last_state = config.synthetic_pending_state().to_string();
                    debug!(
                        attempt,
                        state = %last_state,
                        "Resource does not exist yet, treating as pending"
                    );
                }
                ProbeResult::Fatal(source) => {
                    error!(attempt, error = %source, "Probe failed while waiting");
                    return Err(WaitError::Probe {
                        last_state,
                        last,
                        source,
                    });
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(last_state, last));
            }
            let delay = config
                .backoff
                .delay(config.poll_interval, attempt - 1)
                .min(remaining);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut shutdown => {
                    info!(last_state = %last_state, "Wait cancelled between probes");
                    return Err(WaitError::Cancelled { last_state, last });
                }
            }
        }
    }

    /// Run [`Waiter::wait`] on a private current-thread runtime.
    ///
    /// For synchronous callers. Returns [`WaitError::NestedRuntime`] when
    /// called from inside a tokio runtime.
    pub fn wait_blocking<P>(&self, probe: &P) -> WaitResult<P::Snapshot>
    where
        P: Probe + ?Sized,
    {
        self.wait_blocking_with_shutdown(probe, std::future::pending::<()>())
    }

    /// Run [`Waiter::wait_with_shutdown`] on a private current-thread runtime.
    pub fn wait_blocking_with_shutdown<P, S>(
        &self,
        probe: &P,
        shutdown: S,
    ) -> WaitResult<P::Snapshot>
    where
        P: Probe + ?Sized,
        S: Future<Output = ()>,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            error!("Blocking wait called from inside an async runtime");
            return Err(WaitError::NestedRuntime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.wait_with_shutdown(probe, shutdown))
    }

    fn timed_out<T: std::fmt::Debug>(&self, last_state: String, last: Option<T>) -> WaitError<T> {
        warn!(
            last_state = %last_state,
            timeout = ?self.config.timeout,
            "Timed out waiting for target state"
        );
        WaitError::Timeout {
            target: self.config.target_label(),
            last_state,
            last,
            timeout: self.config.timeout,
        }
    }
}

/// Wait for `probe` to reach a target state of `config`.
///
/// Errors accepted by `benign` count as the first pending state.
pub async fn wait_for_state<P>(
    probe: &P,
    config: WaitConfig,
    benign: impl BenignError + 'static,
) -> WaitResult<P::Snapshot>
where
    P: Probe + ?Sized,
{
    Waiter::new(config).with_benign_error(benign).wait(probe).await
}
