//! Shared coordination surface for inter-worker messaging and knowledge.
//!
//! The `Blackboard` is the only shared mutable resource in the engine. All
//! mutation goes through its lock-guarded API; no caller ever holds a
//! reference into its internal maps. Locks are split per subsystem
//! (messages, knowledge, market data, metrics) so contention on one does
//! not serialize the others, while drain-and-mark-read stays atomic.
//!
//! The blackboard is an owned component handed to workers and the
//! scheduler as an `Arc<Blackboard>` handle, never a process-wide global.

use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Message destination: a single worker or every registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "to", content = "worker")]
pub enum Recipient {
    /// Deliver to one worker's inbox.
    Worker(WorkerId),
    /// Deliver to every registered worker except the sender.
    Broadcast,
}

/// A message on the blackboard.
///
/// Owned by the blackboard; the read flag flips exactly once, when the
/// addressed worker drains its inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// The sending worker.
    pub from: WorkerId,
    /// The destination (worker id or broadcast sentinel).
    #[serde(flatten)]
    pub to: Recipient,
    /// Application-level type tag (e.g. "subtask_completed").
    pub kind: String,
    /// Opaque payload.
    pub payload: Value,
    /// Server-assigned publish timestamp.
    pub timestamp: DateTime<Utc>,
    /// Whether the addressed worker has drained this message.
    pub read: bool,
}

impl Message {
    /// Build a message ready for publishing. The timestamp is assigned
    /// by the blackboard at publish time.
    pub fn new(from: WorkerId, to: Recipient, kind: &str, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            kind: kind.to_string(),
            payload,
            timestamp: Utc::now(),
            read: false,
        }
    }
}

/// A key/value fact contributed by one or more workers.
///
/// Last-writer-wins per key; the contributor list accumulates across
/// overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
    pub contributors: Vec<WorkerId>,
}

/// Lock-guarded shared state: per-worker inboxes, knowledge store,
/// market/context data, and counter metrics.
#[derive(Debug, Default)]
pub struct Blackboard {
    /// Per-worker FIFO inboxes. Broadcasts fan out at publish time, which
    /// makes at-most-once delivery per worker a structural property.
    inboxes: Mutex<HashMap<WorkerId, VecDeque<Message>>>,
    /// Key/value knowledge store, last-writer-wins.
    knowledge: Mutex<HashMap<String, KnowledgeEntry>>,
    /// Market/context data. Reads vastly outnumber writes, so this uses
    /// a RwLock instead of sharing the message lock.
    market: RwLock<HashMap<String, Value>>,
    /// Counter metrics.
    metrics: Mutex<HashMap<String, u64>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker's inbox. A worker must be registered to receive
    /// broadcasts; direct messages create the inbox lazily. Broadcasts
    /// published before registration are not replayed.
    pub fn register_worker(&self, id: WorkerId) {
        let mut inboxes = self.lock_inboxes();
        inboxes.entry(id).or_default();
    }

    /// Publish a message, assigning the server timestamp.
    ///
    /// Direct messages go to the addressed worker's inbox; broadcasts fan
    /// out to every registered inbox except the sender's.
    pub fn publish(&self, mut message: Message) {
        message.timestamp = Utc::now();
        let mut inboxes = self.lock_inboxes();
        match message.to {
            Recipient::Worker(to) => {
                inboxes.entry(to).or_default().push_back(message);
            }
            Recipient::Broadcast => {
                let from = message.from;
                for (worker, queue) in inboxes.iter_mut() {
                    if *worker != from {
                        queue.push_back(message.clone());
                    }
                }
            }
        }
        self.bump_metric("messages_published");
    }

    /// Atomically remove and return all unread messages for a worker,
    /// marking them read. Messages are returned in FIFO publish order
    /// and each message is delivered at most once.
    pub fn drain(&self, worker: &WorkerId) -> Vec<Message> {
        let mut inboxes = self.lock_inboxes();
        let drained = inboxes
            .get_mut(worker)
            .map(|queue| queue.drain(..).collect::<Vec<_>>())
            .unwrap_or_default();
        drop(inboxes);

        drained
            .into_iter()
            .map(|mut m| {
                m.read = true;
                m
            })
            .collect()
    }

    /// Count of undrained messages for a worker.
    pub fn pending_count(&self, worker: &WorkerId) -> usize {
        self.lock_inboxes().get(worker).map_or(0, VecDeque::len)
    }

    /// Overwrite the knowledge entry for `key`, appending `contributor`
    /// to the entry's contributor list.
    pub fn put_knowledge(&self, key: &str, value: Value, contributor: WorkerId) {
        let mut knowledge = match self.knowledge.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = knowledge
            .entry(key.to_string())
            .or_insert_with(|| KnowledgeEntry {
                key: key.to_string(),
                value: Value::Null,
                updated_at: Utc::now(),
                contributors: Vec::new(),
            });
        entry.value = value;
        entry.updated_at = Utc::now();
        if !entry.contributors.contains(&contributor) {
            entry.contributors.push(contributor);
        }
        drop(knowledge);
        self.bump_metric("knowledge_writes");
    }

    /// Current value for `key`, or None if absent.
    pub fn get_knowledge(&self, key: &str) -> Option<KnowledgeEntry> {
        match self.knowledge.lock() {
            Ok(guard) => guard.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    /// Set a market/context data point.
    pub fn set_market(&self, key: &str, value: Value) {
        let mut market = match self.market.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        market.insert(key.to_string(), value);
    }

    /// Read a market/context data point. Concurrent reads do not contend
    /// with message or knowledge traffic.
    pub fn get_market(&self, key: &str) -> Option<Value> {
        match self.market.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    /// Increment a counter metric.
    pub fn bump_metric(&self, name: &str) {
        let mut metrics = match self.metrics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *metrics.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Current value of a counter metric (0 if never bumped).
    pub fn metric(&self, name: &str) -> u64 {
        match self.metrics.lock() {
            Ok(guard) => guard.get(name).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(name).copied().unwrap_or(0),
        }
    }

    fn lock_inboxes(&self) -> std::sync::MutexGuard<'_, HashMap<WorkerId, VecDeque<Message>>> {
        match self.inboxes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
