//! Testing utilities for code that waits on remote resources.
//!
//! This module provides a scripted probe and assertion helpers so waits can be
//! tested without a network. Combine them with
//! `#[tokio::test(start_paused = true)]` to run ten-minute budgets instantly.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_waiter::testing::{assert_converged, ScriptedProbe};
//! use hemmer_provider_waiter::{ExactMessage, WaitConfig, Waiter};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_topic_becomes_active() {
//!     let probe = ScriptedProbe::new()
//!         .then_error("Topic 'orders' does not exist")
//!         .then_state("CONFIGURING")
//!         .then_state("ACTIVE");
//!
//!     let waiter = Waiter::new(WaitConfig::new(["CONFIGURING"], ["ACTIVE"]))
//!         .with_benign_error(ExactMessage::topic_not_found("orders"));
//!
//!     let result = waiter.wait(&probe).await;
//!     assert_converged(&result, "ACTIVE");
//!     assert_eq!(probe.calls(), 3);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{ProbeError, WaitError};
use crate::probe::Probe;
use crate::types::Observation;
use crate::waiter::WaitResult;

#[derive(Debug, Clone)]
enum Step<T> {
    Observe(Observation<T>),
    Fail(String),
}

/// A probe that replays a fixed script of observations and errors.
///
/// Each call consumes one step. Once the script is down to its last step,
/// that step is repeated forever, so a script ending in a pending state
/// keeps the resource pending.
pub struct ScriptedProbe<T = Value> {
    steps: Mutex<VecDeque<Step<T>>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl<T: Clone> Default for ScriptedProbe<T> {
    fn default() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }
}

impl ScriptedProbe<Value> {
    /// Create an empty script with JSON payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation whose payload is `{"state": <state>}`.
    pub fn then_state(self, state: &str) -> Self {
        self.then_observe(json!({ "state": state }), state)
    }
}

impl<T: Clone> ScriptedProbe<T> {
    /// Append an observation with an explicit payload.
    pub fn then_observe(self, payload: T, state: &str) -> Self {
        self.push(Step::Observe(Observation::new(payload, state)))
    }

    /// Append a probe error with the given message.
    pub fn then_error(self, message: &str) -> Self {
        self.push(Step::Fail(message.to_string()))
    }

    /// Delay every probe call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of probe calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, step: Step<T>) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
        self
    }

    fn next_step(&self) -> Option<Step<T>> {
        let mut steps = self
            .steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl<T> Probe for ScriptedProbe<T>
where
    T: Clone + Debug + Send + 'static,
{
    type Snapshot = T;

    async fn probe(&self) -> Result<Observation<T>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.next_step() {
            Some(Step::Observe(observation)) => Ok(observation),
            Some(Step::Fail(message)) => Err(ProbeError::new(message)),
            None => Err(ProbeError::new("probe script is empty")),
        }
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a wait converged on `state`.
///
/// # Panics
///
/// Panics if the wait failed or ended in another state.
pub fn assert_converged<T: Debug>(result: &WaitResult<T>, state: &str) {
    match result {
        Ok(observation) => assert_eq!(
            observation.state, state,
            "Expected wait to converge on '{}', but it ended in '{}'",
            state, observation.state
        ),
        Err(e) => panic!("Expected wait to converge on '{}', but got error: {}", state, e),
    }
}

/// Assert that a wait ran out of time.
///
/// # Panics
///
/// Panics if the wait succeeded or failed for another reason.
pub fn assert_timed_out<T: Debug>(result: &WaitResult<T>) {
    assert!(
        matches!(result, Err(WaitError::Timeout { .. })),
        "Expected a timeout, but got {:?}",
        result
    );
}

/// Assert that a wait failed because the probe returned an error containing `message`.
///
/// # Panics
///
/// Panics if the wait did not end with a probe error carrying that message.
pub fn assert_probe_failed<T: Debug>(result: &WaitResult<T>, message: &str) {
    match result {
        Err(WaitError::Probe { source, .. }) => assert!(
            source.message().contains(message),
            "Expected probe error containing '{}', but got '{}'",
            message,
            source.message()
        ),
        other => panic!("Expected a probe error, but got {:?}", other),
    }
}

/// Assert that a wait stopped on the unrecognised state `state`.
///
/// # Panics
///
/// Panics if the wait did not end with an unexpected-state error for `state`.
pub fn assert_unexpected_state<T: Debug>(result: &WaitResult<T>, state: &str) {
    match result {
        Err(WaitError::UnexpectedState { state: got, .. }) => assert_eq!(
            got, state,
            "Expected unexpected state '{}', but got '{}'",
            state, got
        ),
        other => panic!("Expected an unexpected-state error, but got {:?}", other),
    }
}

/// Assert that a wait was cancelled by its shutdown signal.
///
/// # Panics
///
/// Panics if the wait ended any other way.
pub fn assert_cancelled<T: Debug>(result: &WaitResult<T>) {
    assert!(
        matches!(result, Err(WaitError::Cancelled { .. })),
        "Expected the wait to be cancelled, but got {:?}",
        result
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_step() {
        let probe = ScriptedProbe::new()
            .then_error("Topic 'orders' does not exist")
            .then_state("CONFIGURING");

        let first = probe.probe().await.unwrap_err();
        assert_eq!(first.message(), "Topic 'orders' does not exist");

        for _ in 0..3 {
            let obs = probe.probe().await.unwrap();
            assert_eq!(obs.state, "CONFIGURING");
            assert_eq!(obs.payload["state"], "CONFIGURING");
        }
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let probe = ScriptedProbe::new();
        let err = probe.probe().await.unwrap_err();
        assert_eq!(err.message(), "probe script is empty");
    }

    #[tokio::test]
    async fn test_typed_payload() {
        let probe = ScriptedProbe::default().then_observe(42u32, "ACTIVE");
        let obs = probe.probe().await.unwrap();
        assert_eq!(obs.payload, 42);
    }

    #[test]
    fn test_assert_converged() {
        let result: WaitResult<()> = Ok(Observation::new((), "ACTIVE"));
        assert_converged(&result, "ACTIVE");
    }

    #[test]
    #[should_panic(expected = "Expected wait to converge on 'ACTIVE'")]
    fn test_assert_converged_fails_on_error() {
        let result: WaitResult<()> = Err(WaitError::Cancelled {
            last_state: String::new(),
            last: None,
        });
        assert_converged(&result, "ACTIVE");
    }

    #[test]
    fn test_assert_probe_failed() {
        let result: WaitResult<()> = Err(WaitError::Probe {
            last_state: String::new(),
            last: None,
            source: ProbeError::new("403 Forbidden: invalid token"),
        });
        assert_probe_failed(&result, "403 Forbidden");
    }

    #[test]
    #[should_panic(expected = "Expected a timeout")]
    fn test_assert_timed_out_fails_on_success() {
        let result: WaitResult<()> = Ok(Observation::new((), "ACTIVE"));
        assert_timed_out(&result);
    }

    #[test]
    fn test_assert_unexpected_state() {
        let result: WaitResult<()> = Err(WaitError::UnexpectedState {
            state: "DELETING".to_string(),
            target: "ACTIVE".to_string(),
            last: None,
        });
        assert_unexpected_state(&result, "DELETING");
    }
}
