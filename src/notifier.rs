//! A publish/subscribe channel pushing per-record change events to connected
//! sessions so derived views refresh without polling.

use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::models::DatabaseID;

/// The kind of record a change event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// An account record.
    Account,
    /// A savings goal record.
    Goal,
    /// A transaction record.
    Transaction,
}

/// What happened to the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The record was created.
    Created,
    /// A derived field of the record was updated.
    Updated,
    /// The record was deleted.
    Deleted,
}

/// A change to a single record.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    /// The kind of record that changed.
    pub entity: EntityKind,
    /// The ID of the record that changed.
    pub entity_id: DatabaseID,
    /// What happened to the record.
    pub change: ChangeKind,
    /// When the change was published.
    pub at: OffsetDateTime,
}

impl ChangeEvent {
    /// Create an event stamped with the current time.
    pub fn new(entity: EntityKind, entity_id: DatabaseID, change: ChangeKind) -> Self {
        Self {
            entity,
            entity_id,
            change,
            at: OffsetDateTime::now_utc(),
        }
    }
}

/// Limits which events a [Subscription] yields.
#[derive(Clone, Debug, Default)]
pub struct ChangeFilter {
    /// Yield only events for this record. `None` yields every event of the
    /// subscribed entity kind.
    pub entity_id: Option<DatabaseID>,
}

impl ChangeFilter {
    /// Whether `event` passes this filter.
    fn matches(&self, event: &ChangeEvent) -> bool {
        match self.entity_id {
            Some(entity_id) => event.entity_id == entity_id,
            None => true,
        }
    }
}

/// Fans change events out to any number of subscribers, one broadcast channel
/// per entity kind.
///
/// Publishing never blocks: each subscriber owns a bounded queue, and a
/// subscriber that falls behind loses the oldest events rather than
/// back-pressuring the publisher. Delivery is at-most-once per subscriber; a
/// session that subscribes after an event was published never sees it and is
/// expected to re-fetch current state instead.
#[derive(Clone, Debug)]
pub struct ChangeNotifier {
    accounts: broadcast::Sender<ChangeEvent>,
    goals: broadcast::Sender<ChangeEvent>,
    transactions: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    /// Create a notifier whose per-subscriber queues hold up to `capacity`
    /// events.
    pub fn new(capacity: usize) -> Self {
        let (accounts, _) = broadcast::channel(capacity);
        let (goals, _) = broadcast::channel(capacity);
        let (transactions, _) = broadcast::channel(capacity);

        Self {
            accounts,
            goals,
            transactions,
        }
    }

    fn channel(&self, entity: EntityKind) -> &broadcast::Sender<ChangeEvent> {
        match entity {
            EntityKind::Account => &self.accounts,
            EntityKind::Goal => &self.goals,
            EntityKind::Transaction => &self.transactions,
        }
    }

    /// Publish `event` to every current subscriber of its entity kind.
    ///
    /// Events for the same entity kind arrive at a given subscriber in
    /// publication order. An event published while there are no subscribers
    /// is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        // send only errors when there are no receivers, which is fine here.
        let _ = self.channel(event.entity).send(event);
    }

    /// Subscribe to changes of `entity`, starting from the next published
    /// event.
    pub fn subscribe(&self, entity: EntityKind, filter: ChangeFilter) -> Subscription {
        Subscription {
            receiver: self.channel(entity).subscribe(),
            filter,
        }
    }
}

/// A lazy sequence of [ChangeEvent]s for one entity kind.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    /// Wait for the next event that passes the subscription's filter.
    ///
    /// Returns `None` once the notifier has been dropped and all pending
    /// events have been consumed. If this subscriber fell behind and lost
    /// events, the loss is logged and delivery resumes from the oldest event
    /// still queued.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscriber lagged; oldest events were dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
