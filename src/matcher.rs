//! Predicates that decide which probe errors mean "not created yet".
//!
//! The remote API can answer a lookup with a not-found error for a short window
//! after a create call was accepted. Only that exact error is treated as a
//! pending state. Matching is on the full display text of the error, including
//! the resource name, so unrelated not-found errors stay fatal.

use std::fmt;

use crate::error::ProbeError;

/// Decides whether a probe error is the benign "does not exist yet" condition.
///
/// Closures of the shape `Fn(&ProbeError) -> bool` implement this trait.
pub trait BenignError: Send + Sync {
    /// Return `true` if the wait should treat `err` as still pending.
    fn is_benign(&self, err: &ProbeError) -> bool;
}

impl<F> BenignError for F
where
    F: Fn(&ProbeError) -> bool + Send + Sync,
{
    fn is_benign(&self, err: &ProbeError) -> bool {
        self(err)
    }
}

/// Matches errors whose message equals a fixed string, byte for byte.
///
/// # Examples
///
/// ```
/// use hemmer_provider_waiter::{BenignError, ExactMessage, ProbeError};
///
/// let matcher = ExactMessage::topic_not_found("foo");
/// assert!(matcher.is_benign(&ProbeError::new("Topic 'foo' does not exist")));
/// assert!(!matcher.is_benign(&ProbeError::new("Topic 'bar' does not exist")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMessage {
    message: String,
}

impl ExactMessage {
    /// Match errors whose message is exactly `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Match the API's answer for a Kafka topic that is not queryable yet.
    pub fn topic_not_found(topic: &str) -> Self {
        Self::new(format!("Topic '{}' does not exist", topic))
    }

    /// The message this matcher accepts.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl BenignError for ExactMessage {
    fn is_benign(&self, err: &ProbeError) -> bool {
        err.to_string() == self.message
    }
}

impl fmt::Display for ExactMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exact message {:?}", self.message)
    }
}

/// Treats every probe error as fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverBenign;

impl BenignError for NeverBenign {
    fn is_benign(&self, _err: &ProbeError) -> bool {
        false
    }
}
