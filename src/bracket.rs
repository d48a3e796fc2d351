use std::sync::Arc;

use crate::event_sink::{EventSink, TransactionError, TransactionResult};
use crate::transaction::{Transaction, TransactionStack};

/// Drives one transaction per begin/end pair from an external trigger source.
///
/// Any source that emits paired begin and end occurrences, such as a pointer
/// gesture or a tool lifecycle, can bracket its work in a transaction by
/// calling [`begin`](TransactionBracket::begin) on the first occurrence and
/// [`end`](TransactionBracket::end) on the second. Pairs may nest; ends must
/// mirror begins.
pub struct TransactionBracket {
    stack: TransactionStack,
    sink: Arc<dyn EventSink>,
    open: Vec<Transaction>,
}

impl TransactionBracket {
    pub fn new(stack: TransactionStack, sink: Arc<dyn EventSink>) -> Self {
        Self {
            stack,
            sink,
            open: Vec::new(),
        }
    }

    /// Open a transaction for a begin occurrence.
    pub fn begin(&mut self) {
        self.open.push(self.stack.begin(Arc::clone(&self.sink)));
    }

    /// Commit the transaction opened by the matching begin occurrence.
    pub fn end(&mut self) -> TransactionResult<()> {
        let mut tx = self.open.pop().ok_or(TransactionError::StackUnderflow)?;
        tx.commit()
    }

    /// Number of begin occurrences not yet ended.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
