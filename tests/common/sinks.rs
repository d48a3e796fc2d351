use parking_lot::RwLock;
use std::sync::Arc;

use nested_unit_of_work::{EventSink, TransactionEvent};

/// Sink that records every delivered event for verification in tests
pub struct RecordingSink {
    events: RwLock<Vec<TransactionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: RwLock::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<TransactionEvent> {
        self.events.read().clone()
    }

    pub fn count(&self, event: TransactionEvent) -> usize {
        self.events.read().iter().filter(|e| **e == event).count()
    }
}

impl EventSink for RecordingSink {
    fn handle(&self, event: TransactionEvent) {
        self.events.write().push(event);
    }
}
