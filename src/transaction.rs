use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::error;

use crate::event::TransactionEvent;
use crate::event_sink::{EventSink, TransactionError, TransactionResult};

/// One open entry on the stack. The id ties a [`Transaction`] handle to its
/// entry for the LIFO identity check; the flag records rollback intent.
#[derive(Debug)]
struct StackEntry {
    id: u64,
    needs_rollback: bool,
}

#[derive(Debug, Default)]
struct StackInner {
    entries: Vec<StackEntry>,
    next_id: u64,
}

/// The stack of currently open transactions for one logical execution
/// context.
///
/// Cloning yields another handle to the same stack; sessions that must not
/// share a nesting chain each construct their own. All operations assume one
/// logical thread of control manipulates the stack at a time: the interior
/// lock keeps re-entrant sinks sound, but interleaving independent nesting
/// chains on one stack from several threads is unsupported.
#[derive(Clone, Debug, Default)]
pub struct TransactionStack {
    inner: Arc<Mutex<StackInner>>,
}

impl TransactionStack {
    /// Create a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction against `sink`.
    ///
    /// If this is the first transaction on the stack, a
    /// [`TransactionEvent::Begin`] is delivered to `sink` before the push, so
    /// listeners observe that nothing inside the unit of work has executed
    /// yet.
    pub fn begin(&self, sink: Arc<dyn EventSink>) -> Transaction {
        if self.inner.lock().entries.is_empty() {
            // Delivered outside the lock so a listener may itself open a
            // transaction without deadlocking.
            sink.handle(TransactionEvent::Begin);
        }
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(StackEntry {
                id,
                needs_rollback: false,
            });
            id
        };
        Transaction {
            stack: self.clone(),
            sink,
            id,
        }
    }

    /// Open a transaction wrapped in a [`TransactionGuard`] that closes it
    /// when the guard leaves scope.
    pub fn begin_guarded(&self, sink: Arc<dyn EventSink>) -> TransactionGuard {
        TransactionGuard {
            tx: Some(self.begin(sink)),
        }
    }

    /// Run `op` inside a transaction against `sink`.
    ///
    /// If `op` returns an error and the transaction is not already marked for
    /// rollback, the rollback is logged and the transaction marked before the
    /// close, so the terminal event is [`TransactionEvent::Rollback`]. The
    /// transaction is closed exactly once on every exit path. Close errors
    /// convert into `E`; otherwise `op`'s own result is returned unchanged.
    pub fn with_transaction<T, E, F>(&self, sink: Arc<dyn EventSink>, op: F) -> Result<T, E>
    where
        F: FnOnce(&TransactionGuard) -> Result<T, E>,
        E: From<TransactionError>,
    {
        let guard = self.begin_guarded(sink);
        let result = op(&guard);
        if result.is_err() && !guard.needs_rollback() {
            error!("transaction terminated due to an error, performing a rollback");
            guard.rollback();
        }
        guard.commit()?;
        result
    }

    /// Number of currently open transactions.
    pub fn depth(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether any transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.depth() > 0
    }
}

/// A single open unit of work.
///
/// Opened by [`TransactionStack::begin`]; closed by
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback), in
/// exactly the reverse of the order transactions were opened. Only the close
/// that empties the stack delivers a terminal event, and its kind is decided
/// by whether any transaction in the nesting chain requested rollback.
pub struct Transaction {
    stack: TransactionStack,
    sink: Arc<dyn EventSink>,
    id: u64,
}

impl Transaction {
    /// Commit the transaction.
    ///
    /// The transaction is closed first. If that empties the stack, a
    /// [`TransactionEvent::Rollback`] is delivered when any transaction in
    /// the chain was marked for rollback, otherwise a
    /// [`TransactionEvent::Commit`]. Committing never clears the rollback
    /// flag; it only reads it.
    pub fn commit(&mut self) -> TransactionResult<()> {
        let entry = self.close()?;
        if self.stack.inner.lock().entries.is_empty() {
            if entry.needs_rollback {
                self.sink.handle(TransactionEvent::Rollback);
            } else {
                self.sink.handle(TransactionEvent::Commit);
            }
        }
        Ok(())
    }

    /// Roll back the transaction.
    ///
    /// Every transaction on the stack is marked for rollback, then the
    /// transaction is committed, which guarantees the eventual terminal event
    /// is [`TransactionEvent::Rollback`].
    pub fn rollback(&mut self) -> TransactionResult<()> {
        self.mark_rollback();
        self.commit()
    }

    /// Mark every transaction currently on the stack for rollback.
    ///
    /// The outermost close decides the terminal event, so rollback intent
    /// raised by an inner transaction must be visible to every enclosing one.
    /// Idempotent.
    pub fn mark_rollback(&self) {
        for entry in self.stack.inner.lock().entries.iter_mut() {
            entry.needs_rollback = true;
        }
    }

    /// Whether this transaction has been marked for rollback.
    pub fn needs_rollback(&self) -> bool {
        self.stack
            .inner
            .lock()
            .entries
            .iter()
            .any(|entry| entry.id == self.id && entry.needs_rollback)
    }

    /// Pop this transaction's entry off the stack.
    ///
    /// Fails with [`TransactionError::StackUnderflow`] if the stack is empty,
    /// and with [`TransactionError::OutOfOrderClose`] if the top entry does
    /// not belong to this transaction. In the latter case the popped entry is
    /// pushed back, so the stack is left unchanged and the rightful top can
    /// still be closed.
    fn close(&self) -> TransactionResult<StackEntry> {
        let mut inner = self.stack.inner.lock();
        let entry = inner
            .entries
            .pop()
            .ok_or(TransactionError::StackUnderflow)?;
        if entry.id != self.id {
            inner.entries.push(entry);
            return Err(TransactionError::OutOfOrderClose);
        }
        Ok(entry)
    }
}

/// Scoped wrapper around one open [`Transaction`].
///
/// The guard closes the transaction exactly once when it leaves scope. Inside
/// the scope, [`rollback`](TransactionGuard::rollback) flags failure without
/// closing; the accumulated flag decides the terminal event at close time. If
/// the scope unwinds from a panic, the transaction is marked for rollback
/// before the close.
pub struct TransactionGuard {
    tx: Option<Transaction>,
}

impl TransactionGuard {
    /// Mark the wrapped transaction for rollback without closing it.
    ///
    /// Closing happens when the guard leaves scope, or through
    /// [`commit`](TransactionGuard::commit).
    pub fn rollback(&self) {
        if let Some(tx) = &self.tx {
            tx.mark_rollback();
        }
    }

    /// Close the transaction now, surfacing any close error.
    ///
    /// Dropping the guard closes the transaction as well; this method exists
    /// for callers that need the [`TransactionResult`] instead of a logged
    /// error.
    pub fn commit(mut self) -> TransactionResult<()> {
        match self.tx.take() {
            Some(mut tx) => tx.commit(),
            None => Ok(()),
        }
    }

    fn needs_rollback(&self) -> bool {
        self.tx.as_ref().is_some_and(Transaction::needs_rollback)
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        let Some(mut tx) = self.tx.take() else {
            return;
        };
        if thread::panicking() && !tx.needs_rollback() {
            error!("transaction terminated due to a panic, performing a rollback");
            tx.mark_rollback();
        }
        if let Err(err) = tx.commit() {
            // A drop cannot surface the error; the failed close left the
            // stack consistent.
            error!("transaction could not be closed: {err}");
        }
    }
}
