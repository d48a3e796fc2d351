use crate::event::TransactionEvent;

/// Error type for transaction stack operations
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// A commit or rollback was attempted while no transaction was open.
    #[error("no transaction on stack")]
    StackUnderflow,

    /// A transaction other than the current stack top was closed.
    #[error("transaction on stack is not the transaction being closed")]
    OutOfOrderClose,
}

/// Result type for transaction stack operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Trait for components that receive transaction lifecycle events.
///
/// A sink is the delivery target for [`TransactionEvent`] values. The
/// coordinator makes no assumption about how a sink routes events further,
/// e.g. to a session-scoped listener fan-out. Implementations must tolerate
/// re-entrant use: a listener may open a new transaction while an event is
/// being handled.
pub trait EventSink: Send + Sync {
    /// Deliver a single lifecycle event.
    fn handle(&self, event: TransactionEvent);
}
