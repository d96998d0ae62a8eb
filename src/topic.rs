//! Waiting for Kafka topics to become active.
//!
//! Creating or updating a topic returns before the topic is usable. The
//! platform reports `CONFIGURING` while it provisions the topic and `ACTIVE`
//! once it is ready. For a short window after creation the lookup fails with
//! `Topic '<name>' does not exist`; that exact answer counts as `CONFIGURING`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WaitConfig;
use crate::error::ProbeError;
use crate::matcher::ExactMessage;
use crate::probe::Probe;
use crate::types::Observation;
use crate::waiter::{WaitResult, Waiter};

/// State reported while a topic is being provisioned.
pub const TOPIC_CONFIGURING: &str = "CONFIGURING";

/// State reported once a topic is ready.
pub const TOPIC_ACTIVE: &str = "ACTIVE";

/// A Kafka topic as returned by the platform.
///
/// Only the name and state are interpreted; every other field is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaTopic {
    /// The topic name.
    pub topic_name: String,
    /// The lifecycle state label.
    pub state: String,
    /// Remaining attributes, untouched.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl KafkaTopic {
    /// Create a topic snapshot with no extra attributes.
    pub fn new(topic_name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            state: state.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Looks up a topic on the platform.
#[async_trait::async_trait]
pub trait TopicClient: Send + Sync {
    /// Fetch one topic of a service.
    async fn get_topic(
        &self,
        project: &str,
        service_name: &str,
        topic: &str,
    ) -> Result<KafkaTopic, ProbeError>;
}

/// Refreshes a topic until it is `ACTIVE`.
#[derive(Debug, Clone)]
pub struct TopicChangeWaiter<C> {
    client: C,
    project: String,
    service_name: String,
    topic: String,
}

impl<C: TopicClient> TopicChangeWaiter<C> {
    /// Create a waiter for `project/service_name/topic`.
    pub fn new(
        client: C,
        project: impl Into<String>,
        service_name: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            client,
            project: project.into(),
            service_name: service_name.into(),
            topic: topic.into(),
        }
    }

    /// The topic being waited on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Default tuning: 10s delay, 2s between probes, 10 minute budget.
    pub fn conf(&self) -> WaitConfig {
        WaitConfig::new([TOPIC_CONFIGURING], [TOPIC_ACTIVE])
    }

    /// A waiter with the given configuration that accepts this topic's
    /// not-found answer as pending.
    pub fn waiter(&self, config: WaitConfig) -> Waiter {
        Waiter::new(config).with_benign_error(ExactMessage::topic_not_found(&self.topic))
    }

    /// Wait with the default tuning.
    pub async fn wait(&self) -> WaitResult<KafkaTopic> {
        self.waiter(self.conf()).wait(self).await
    }

    /// Wait with a custom configuration.
    pub async fn wait_with_config(&self, config: WaitConfig) -> WaitResult<KafkaTopic> {
        self.waiter(config).wait(self).await
    }
}

#[async_trait::async_trait]
impl<C: TopicClient> Probe for TopicChangeWaiter<C> {
    type Snapshot = KafkaTopic;

    async fn probe(&self) -> Result<Observation<KafkaTopic>, ProbeError> {
        let topic = self
            .client
            .get_topic(&self.project, &self.service_name, &self.topic)
            .await
            .inspect_err(|e| {
                debug!(topic = %self.topic, error = %e, "Got error while waiting for topic to be up");
            })?;

        debug!(topic = %self.topic, state = %topic.state, "Got state while waiting for topic to be up");
        let state = topic.state.clone();
        Ok(Observation::new(topic, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers lookups from a queue; the last answer repeats.
    struct FakeClient {
        answers: Mutex<VecDeque<Result<KafkaTopic, String>>>,
        lookups: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeClient {
        fn new(answers: Vec<Result<KafkaTopic, String>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl TopicClient for FakeClient {
        async fn get_topic(
            &self,
            project: &str,
            service_name: &str,
            topic: &str,
        ) -> Result<KafkaTopic, ProbeError> {
            self.lookups.lock().unwrap().push((
                project.to_string(),
                service_name.to_string(),
                topic.to_string(),
            ));
            let mut answers = self.answers.lock().unwrap();
            let answer = if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().unwrap()
            };
            answer.map_err(ProbeError::new)
        }
    }

    fn not_found(topic: &str) -> Result<KafkaTopic, String> {
        Err(format!("Topic '{}' does not exist", topic))
    }

    #[test]
    fn test_default_conf() {
        let waiter = TopicChangeWaiter::new(FakeClient::new(vec![]), "proj", "kafka-1", "orders");
        let conf = waiter.conf();
        assert_eq!(conf.pending_states, vec!["CONFIGURING"]);
        assert_eq!(conf.target_states, vec!["ACTIVE"]);
        assert_eq!(conf.initial_delay, Duration::from_secs(10));
        assert_eq!(conf.poll_interval, Duration::from_secs(2));
        assert_eq!(conf.timeout, Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_becomes_active() {
        let client = FakeClient::new(vec![
            not_found("orders"),
            Ok(KafkaTopic::new("orders", "CONFIGURING")),
            Ok(KafkaTopic::new("orders", "ACTIVE")),
        ]);
        let waiter = TopicChangeWaiter::new(client, "proj", "kafka-1", "orders");

        let result = waiter.wait().await;

        assert_converged(&result, "ACTIVE");
        let topic = tokio_test::assert_ok!(result).payload;
        assert_eq!(topic.topic_name, "orders");
        let lookups = waiter.client.lookups.lock().unwrap();
        assert_eq!(lookups.len(), 3);
        assert_eq!(
            lookups[0],
            (
                "proj".to_string(),
                "kafka-1".to_string(),
                "orders".to_string()
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_topic_not_found_is_fatal() {
        let client = FakeClient::new(vec![not_found("payments")]);
        let waiter = TopicChangeWaiter::new(client, "proj", "kafka-1", "orders");

        let result = waiter.wait().await;

        assert_probe_failed(&result, "Topic 'payments' does not exist");
        assert_eq!(waiter.client.lookups.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_never_created_times_out() {
        let client = FakeClient::new(vec![not_found("orders")]);
        let waiter = TopicChangeWaiter::new(client, "proj", "kafka-1", "orders");
        let config = waiter
            .conf()
            .with_initial_delay(Duration::ZERO)
            .with_timeout(Duration::from_secs(30));

        let result = waiter.wait_with_config(config).await;

        assert_timed_out(&result);
        assert_eq!(result.unwrap_err().last_state(), Some("CONFIGURING"));
    }

    #[test]
    fn test_topic_deserialize_keeps_attributes() {
        let topic: KafkaTopic = serde_json::from_value(serde_json::json!({
            "topic_name": "orders",
            "state": "ACTIVE",
            "replication": 3,
            "retention_hours": 72,
        }))
        .unwrap();

        assert_eq!(topic.state, "ACTIVE");
        assert_eq!(topic.attributes["replication"], 3);
        assert_eq!(topic.attributes["retention_hours"], 72);
    }
}
