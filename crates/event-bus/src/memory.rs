use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::bus::{EventBus, MessageHandler, deliver};
use crate::{EventBusError, Message, Result};

const DEFAULT_PARTITIONS: usize = 4;

type Members = Arc<std::sync::RwLock<Vec<Arc<dyn MessageHandler>>>>;

/// One consumer group on one topic.
///
/// Each partition has its own queue and worker task, so messages in a
/// partition are handled strictly one after another.
struct ConsumerGroup {
    members: Members,
    partitions: Vec<mpsc::UnboundedSender<Message>>,
}

#[derive(Default)]
struct BusState {
    log: HashMap<String, Vec<Message>>,
    groups: HashMap<String, HashMap<String, ConsumerGroup>>,
}

/// In-process event bus with partitioned consumer groups.
///
/// Keys are hashed onto a fixed number of partitions per group. Each
/// partition is drained by a single task, which gives per-key ordering within
/// a group. Group members split partitions by index. A bus built with
/// [`InMemoryEventBus::with_log`] also keeps every published message in a
/// per-topic log for inspection; the log is never trimmed.
#[derive(Clone)]
pub struct InMemoryEventBus {
    state: Arc<RwLock<BusState>>,
    partition_count: usize,
    in_flight: Arc<AtomicUsize>,
    fail_on_publish: Arc<AtomicBool>,
    keep_log: bool,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }
}

impl InMemoryEventBus {
    /// Creates a bus with the default number of partitions per group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with `partitions` partitions per consumer group.
    pub fn with_partitions(partitions: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(BusState::default())),
            partition_count: partitions.max(1),
            in_flight: Arc::new(AtomicUsize::new(0)),
            fail_on_publish: Arc::new(AtomicBool::new(false)),
            keep_log: false,
        }
    }

    /// Keeps published messages for [`Self::published`]. For tests.
    pub fn with_log(mut self) -> Self {
        self.keep_log = true;
        self
    }

    /// Returns the number of partitions per consumer group.
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Configures the bus to reject publishes, simulating a broker outage.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns every message published on `topic`, oldest first.
    ///
    /// Always empty unless the bus was built [`with_log`](Self::with_log).
    pub async fn published(&self, topic: &str) -> Vec<Message> {
        self.state
            .read()
            .await
            .log
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of messages published on `topic`.
    pub async fn published_count(&self, topic: &str) -> usize {
        self.state
            .read()
            .await
            .log
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Returns the number of deliveries queued or being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until every queued delivery has been handled.
    pub async fn wait_for_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn partition_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partition_count as u64) as usize
    }

    fn spawn_group(&self, topic: &str, group_id: &str, members: Members) -> ConsumerGroup {
        let mut partitions = Vec::with_capacity(self.partition_count);

        for partition in 0..self.partition_count {
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
            let members = Arc::clone(&members);
            let in_flight = Arc::clone(&self.in_flight);
            let group_id = group_id.to_string();

            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    let handler = {
                        let members = members.read().unwrap_or_else(|e| e.into_inner());
                        if members.is_empty() {
                            None
                        } else {
                            Some(Arc::clone(&members[partition % members.len()]))
                        }
                    };

                    if let Some(handler) = handler {
                        deliver(handler.as_ref(), &message, &group_id).await;
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
                tracing::debug!(group_id = %group_id, partition, "partition worker exiting");
            });

            partitions.push(tx);
        }

        tracing::info!(
            topic,
            group_id,
            partitions = self.partition_count,
            "consumer group started"
        );

        ConsumerGroup {
            members,
            partitions,
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, message: Message) -> Result<()> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(EventBusError::PublishFailed {
                topic: message.topic,
                reason: "broker unavailable".to_string(),
            });
        }

        let mut state = self.state.write().await;

        if let Some(groups) = state.groups.get(&message.topic) {
            let partition = self.partition_for(&message.key);
            for group in groups.values() {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                if group.partitions[partition].send(message.clone()).is_err() {
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }

        metrics::counter!("event_bus_published_total", "topic" => message.topic.clone())
            .increment(1);
        tracing::debug!(topic = %message.topic, key = %message.key, "message published");

        if self.keep_log {
            state
                .log
                .entry(message.topic.clone())
                .or_default()
                .push(message);
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let groups = state.groups.entry(topic.to_string()).or_default();

        match groups.get(group_id) {
            Some(group) => {
                let mut members = group.members.write().unwrap_or_else(|e| e.into_inner());
                members.push(handler);
                tracing::info!(topic, group_id, members = members.len(), "consumer joined group");
            }
            None => {
                let members: Members = Arc::new(std::sync::RwLock::new(vec![handler]));
                let group = self.spawn_group(topic, group_id, members);
                groups.insert(group_id.to_string(), group);
            }
        }

        Ok(())
    }
}
