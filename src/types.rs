//! Value types shared by probes and the waiter.

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::matcher::BenignError;

/// A snapshot of a remote resource together with its lifecycle state label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation<T> {
    /// The resource as returned by the remote API.
    pub payload: T,
    /// The state label extracted from the payload.
    pub state: String,
}

impl<T> Observation<T> {
    /// Create a new observation.
    pub fn new(payload: T, state: impl Into<String>) -> Self {
        Self {
            payload,
            state: state.into(),
        }
    }

    /// Apply a function to the payload, keeping the state label.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observation<U> {
        Observation {
            payload: f(self.payload),
            state: self.state,
        }
    }
}

/// The classified result of a single probe call.
#[derive(Debug)]
pub enum ProbeResult<T> {
    /// The resource exists and reported a state label.
    Active {
        /// The resource snapshot.
        payload: T,
        /// Its state label.
        state: String,
    },
    /// The resource is not queryable yet; the wait continues.
    BenignPending,
    /// The probe failed; the wait ends.
    Fatal(ProbeError),
}

impl<T> ProbeResult<T> {
    /// Classify a raw probe result against a benign-error matcher.
    ///
    /// Only an error the matcher accepts becomes [`ProbeResult::BenignPending`];
    /// every other error is fatal.
    pub fn classify(
        result: Result<Observation<T>, ProbeError>,
        benign: &dyn BenignError,
    ) -> Self {
        match result {
            Ok(observation) => Self::Active {
                payload: observation.payload,
                state: observation.state,
            },
            Err(err) if benign.is_benign(&err) => Self::BenignPending,
            Err(err) => Self::Fatal(err),
        }
    }
}
