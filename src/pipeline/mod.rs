pub mod analysis;
pub mod batch;
pub mod conversation;
pub mod extraction;
pub mod import;
pub mod processor;
pub mod progress;
pub mod retrieval;
pub mod router;
