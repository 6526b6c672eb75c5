//! Fan-out of freshly stored entries to in-process subscribers.
//!
//! Publication happens after the storing transaction commits. Delivery is
//! at-most-once and best-effort: a subscriber that lags past the channel
//! capacity loses messages rather than exerting backpressure on ingestion,
//! and a subscriber that registers late sees only subsequent entries.

use tokio::sync::broadcast;
use tracehub_wire::TraceEntry;

/// A trace entry together with the row id it was stored under.
#[derive(Debug, Clone)]
pub struct StoredTraceEntry {
    pub entry_id: i64,
    pub entry: TraceEntry,
}

/// Subscriber registry for stored entries. Cheap to clone; all clones
/// publish into the same channel.
#[derive(Debug, Clone)]
pub struct EntryNotifier {
    tx: broadcast::Sender<StoredTraceEntry>,
}

impl EntryNotifier {
    /// Registry whose subscribers may buffer up to `capacity` entries
    /// before the oldest are dropped for them.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoredTraceEntry> {
        self.tx.subscribe()
    }

    /// Publish a stored entry to all current subscribers. Never blocks and
    /// never fails: with no subscriber registered the entry is simply
    /// dropped.
    pub fn publish(&self, stored: StoredTraceEntry) {
        let _ = self.tx.send(stored);
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EntryNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
