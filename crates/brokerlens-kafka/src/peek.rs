//! Peek through a transient consumer group.
//!
//! Each peek joins a fresh, uniquely named group so it never disturbs the
//! committed offsets of real consumers. The group is torn down on every
//! exit path: the consumer is closed first, then, unless
//! `delete_peek_groups` is off, the group is deleted on a best-effort basis.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rdkafka::admin::{AdminClient, AdminOptions};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError as ClientError;
use rdkafka::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::KafkaConfig;
use crate::error::Result;
use crate::model::KafkaRecord;

/// Name for a one-off peek group: `<client-id>-peek-<millis>-<token>`.
pub(crate) fn transient_group_id(client_id: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let token = Uuid::new_v4().simple().to_string();
    format!("{client_id}-peek-{millis}-{}", &token[..8])
}

pub(crate) async fn peek(
    config: &KafkaConfig,
    admin: Arc<AdminClient<DefaultClientContext>>,
    topic: &str,
    partitions: usize,
    count: usize,
) -> Result<Vec<KafkaRecord>> {
    let group_id = transient_group_id(config.client_id());
    let consumer: StreamConsumer = config
        .client_config()?
        .set("group.id", &group_id)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .set("enable.auto.offset.store", "false")
        .set("enable.partition.eof", "true")
        .create()?;
    debug!(topic = %topic, group = %group_id, count, "peeking");

    let window = PeekWindow::new(
        Instant::now(),
        config.peek_join_timeout(),
        config.peek_idle_timeout(),
    );
    // The consumer is closed when this future completes, before cleanup.
    let session = async move {
        let collected = collect(&consumer, topic, partitions, count, window).await;
        consumer.unsubscribe();
        collected
    };

    let cleanup = config
        .delete_peek_groups
        .then(|| delete_group(admin, group_id.clone(), config.metadata_timeout()));
    if cleanup.is_none() {
        debug!(group = %group_id, "transient group left to expire");
    }
    scoped(session, cleanup).await
}

/// Await `session`, then `cleanup` if given, whatever `session` produced.
async fn scoped<T, S, C>(session: S, cleanup: Option<C>) -> T
where
    S: Future<Output = T>,
    C: Future<Output = ()>,
{
    let outcome = session.await;
    if let Some(cleanup) = cleanup {
        cleanup.await;
    }
    outcome
}

/// Poll interval while the group is still joining.
const JOIN_POLL: Duration = Duration::from_millis(100);

/// Waiting rules for one peek.
///
/// Until the group is assigned partitions, silence is tolerated up to the
/// join deadline. Once assigned, silence longer than the idle window ends
/// the peek.
#[derive(Debug, Clone, Copy)]
struct PeekWindow {
    join_deadline: Instant,
    idle: Duration,
    assigned: bool,
}

impl PeekWindow {
    fn new(now: Instant, join: Duration, idle: Duration) -> Self {
        Self {
            join_deadline: now + join,
            idle,
            assigned: false,
        }
    }

    fn mark_assigned(&mut self) {
        self.assigned = true;
    }

    /// How long to wait for the next event.
    fn wait(&self, now: Instant) -> Duration {
        if self.assigned {
            self.idle
        } else {
            JOIN_POLL.min(self.join_deadline.saturating_duration_since(now))
        }
    }

    /// A wait ended with nothing received. Returns whether to keep waiting.
    fn on_silence(&mut self, now: Instant, has_assignment: bool) -> bool {
        if self.assigned {
            return false;
        }
        if has_assignment {
            self.assigned = true;
            return true;
        }
        now < self.join_deadline
    }
}

async fn collect(
    consumer: &StreamConsumer,
    topic: &str,
    partitions: usize,
    count: usize,
    mut window: PeekWindow,
) -> Result<Vec<KafkaRecord>> {
    consumer.subscribe(&[topic])?;

    let mut records = Vec::with_capacity(count);
    let mut drained = HashSet::new();
    while records.len() < count {
        match tokio::time::timeout(window.wait(Instant::now()), consumer.recv()).await {
            Err(_) => {
                let has_assignment = consumer
                    .assignment()
                    .map(|list| list.count() > 0)
                    .unwrap_or(false);
                if !window.on_silence(Instant::now(), has_assignment) {
                    debug!(
                        topic = %topic,
                        collected = records.len(),
                        assigned = window.assigned,
                        "peek window closed"
                    );
                    break;
                }
            }
            Ok(Ok(message)) => {
                window.mark_assigned();
                drained.remove(&message.partition());
                records.push(KafkaRecord::from_message(&message));
            }
            Ok(Err(ClientError::PartitionEOF(partition))) => {
                window.mark_assigned();
                drained.insert(partition);
                if drained.len() >= partitions {
                    break;
                }
            }
            Ok(Err(err)) => return Err(err.into()),
        }
    }
    Ok(records)
}

async fn delete_group(
    admin: Arc<AdminClient<DefaultClientContext>>,
    group_id: String,
    timeout: Duration,
) {
    let options = AdminOptions::new().request_timeout(Some(timeout));
    match admin.delete_groups(&[group_id.as_str()], &options).await {
        Ok(results) => {
            for result in results {
                if let Err((group, code)) = result {
                    warn!(group = %group, error = %code, "failed to delete transient consumer group");
                }
            }
        }
        Err(err) => {
            warn!(group = %group_id, error = %err, "failed to delete transient consumer group");
        }
    }
}
