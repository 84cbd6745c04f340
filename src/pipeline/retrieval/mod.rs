pub mod context;
pub mod memory_store;

pub use context::*;
pub use memory_store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Vector store error: {0}")]
    Backend(String),

    #[error("Vector store lock poisoned")]
    LockPoisoned,
}
