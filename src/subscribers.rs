use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::event::TransactionEvent;
use crate::event_sink::{EventSink, TransactionError};
use crate::transaction::{TransactionGuard, TransactionStack};

/// A registered listener.
///
/// Identity is the `Arc` allocation: adding the same `Arc` twice registers it
/// once, and any clone of the original `Arc` discards it.
pub type Listener = Arc<dyn Fn(TransactionEvent) + Send + Sync>;

/// Registry of listeners for the [`transactional`] entry point.
///
/// Add and remove a listener to receive events emitted by operations run
/// through [`transactional`]. Listeners are held with set semantics and
/// invoked in unspecified order.
pub struct Subscribers {
    listeners: RwLock<HashMap<usize, Listener>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Register `listener`. Registering the same listener twice is a no-op.
    pub fn add(&self, listener: Listener) {
        let key = listener_key(&listener);
        self.listeners.write().entry(key).or_insert(listener);
    }

    /// Remove `listener`. Removing a listener that was never registered is a
    /// no-op.
    pub fn discard(&self, listener: &Listener) {
        self.listeners.write().remove(&listener_key(listener));
    }
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Subscribers {
    fn handle(&self, event: TransactionEvent) {
        // Snapshot the set before invoking so a listener may add or discard
        // without deadlocking the delivery.
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

fn listener_key(listener: &Listener) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

// Global singleton instance
static SUBSCRIBERS: OnceLock<Arc<Subscribers>> = OnceLock::new();

thread_local! {
    // One ambient nesting chain per thread; sharing a chain across threads is
    // unsupported.
    static AMBIENT_STACK: TransactionStack = TransactionStack::new();
}

/// Get the process-wide subscriber registry used by [`transactional`].
///
/// This exists for code with no access to a session-scoped sink, such as
/// tests and legacy bridging. Prefer [`TransactionStack::with_transaction`]
/// with an explicit sink: events sent here are broadcast to every registered
/// listener rather than a specific session's.
pub fn subscribers() -> Arc<Subscribers> {
    SUBSCRIBERS
        .get_or_init(|| Arc::new(Subscribers::new()))
        .clone()
}

/// Run `op` inside a transaction whose events go to the process-wide
/// [`subscribers`] registry.
///
/// The transaction is opened on a thread-local ambient stack, so nested
/// `transactional` calls on one thread form a single chain with one
/// begin/terminal event pair. Prefer [`TransactionStack::with_transaction`]
/// with an explicit sink where one is available.
pub fn transactional<T, E, F>(op: F) -> Result<T, E>
where
    F: FnOnce(&TransactionGuard) -> Result<T, E>,
    E: From<TransactionError>,
{
    AMBIENT_STACK.with(|stack| {
        let sink: Arc<dyn EventSink> = subscribers();
        stack.with_transaction(sink, op)
    })
}
