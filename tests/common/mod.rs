pub mod sinks;

pub use sinks::RecordingSink;
