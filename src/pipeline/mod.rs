//! Document lifecycle orchestration.

mod processor;

pub use processor::{DocumentProcessor, ProcessOutcome};
