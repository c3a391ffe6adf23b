//! Progress observers for protocol runs

pub mod reporter;

pub use reporter::{ProgressReporter, SimpleProgress};
