/// Lifecycle events emitted at the boundary of the outermost transaction.
///
/// Exactly one `Begin` is delivered when the stack transitions from empty to
/// non-empty, and exactly one `Commit` or `Rollback` when it transitions back
/// to empty. Inner transactions emit nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionEvent {
    /// A unit of work is starting; nothing inside it has executed yet.
    Begin,
    /// The outermost transaction closed without any rollback request.
    Commit,
    /// The outermost transaction closed after a rollback was requested
    /// somewhere in the nesting chain.
    Rollback,
}
