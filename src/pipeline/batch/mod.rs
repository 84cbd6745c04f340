//! Sequential batch analysis.
//!
//! One result per input item, in input order. A failed item is recorded
//! and the run moves on.

pub mod types;
pub mod runner;

pub use types::*;
pub use runner::{new_batch_id, BatchOrchestrator};
