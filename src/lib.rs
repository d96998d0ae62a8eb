//! Hemmer Provider Waiter
//!
//! This crate lets Hemmer providers wait for remote resources to converge after
//! a create or update call. It follows the state-change pattern of
//! [terraform-plugin-sdk](https://github.com/hashicorp/terraform-plugin-sdk)'s
//! `StateChangeConf`, with an explicit policy for the "not found yet" window
//! and cancellation on shutdown.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Probe trait**: one call that fetches a resource and its state label
//! - **WaitConfig**: pending/target states, initial delay, poll interval, backoff and timeouts
//! - **Waiter**: the polling loop, returning the converged resource or a [`WaitError`]
//! - **Benign-error matchers**: exact-message predicates for "does not exist yet" errors
//! - **Kafka topics**: [`topic::TopicChangeWaiter`], the waiter used by topic create/update
//! - **Logging**: Integration with `tracing` for structured logging
//! - **Testing**: a scripted probe and assertion helpers
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_waiter::topic::{KafkaTopic, TopicChangeWaiter, TopicClient};
//! use hemmer_provider_waiter::{async_trait, ProbeError};
//!
//! struct ApiClient { /* ... */ }
//!
//! #[async_trait]
//! impl TopicClient for ApiClient {
//!     async fn get_topic(
//!         &self,
//!         project: &str,
//!         service_name: &str,
//!         topic: &str,
//!     ) -> Result<KafkaTopic, ProbeError> {
//!         self.fetch_topic(project, service_name, topic)
//!             .await
//!             .map_err(ProbeError::from_error)
//!     }
//! }
//!
//! async fn create_topic(client: ApiClient) -> Result<KafkaTopic, Box<dyn std::error::Error>> {
//!     // ... issue the create call ...
//!     let waiter = TopicChangeWaiter::new(client, "my-project", "kafka-1", "orders");
//!     let topic = waiter.wait().await?;
//!     Ok(topic.payload)
//! }
//! ```
//!
//! # Wait Semantics
//!
//! - A state in `target_states` ends the wait successfully.
//! - A state in `pending_states` keeps polling until `timeout`.
//! - An error accepted by the benign matcher counts as the first pending state.
//! - Any other probe error ends the wait immediately, without retry.
//! - Any other state ends the wait with [`WaitError::UnexpectedState`], unless
//!   [`UnknownStatePolicy::KeepPolling`] is configured.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod probe;
pub mod shutdown;
pub mod testing;
pub mod topic;
pub mod types;
pub mod waiter;

// Re-export main types at crate root
pub use config::{Backoff, UnknownStatePolicy, WaitConfig};
pub use error::{ConfigError, ProbeError, WaitError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use matcher::{BenignError, ExactMessage, NeverBenign};
pub use probe::{probe_fn, FnProbe, Probe};
pub use shutdown::shutdown_signal;
pub use types::{Observation, ProbeResult};
pub use waiter::{wait_for_state, WaitResult, Waiter};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
