//! Nested Unit of Work Module
//!
//! This module provides nested transaction coordination primitives for grouping
//! mutating operations into atomic units. It isolates transaction lifecycle
//! signalling from the specific operations a transaction wraps.

pub mod bracket;
pub mod event;
pub mod event_sink;
pub mod subscribers;
pub mod transaction;

pub use bracket::TransactionBracket;
pub use event::TransactionEvent;
pub use event_sink::{EventSink, TransactionError, TransactionResult};
pub use subscribers::{subscribers, transactional, Listener, Subscribers};
pub use transaction::{Transaction, TransactionGuard, TransactionStack};
