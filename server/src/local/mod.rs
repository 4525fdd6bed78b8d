//! Local prompt library
//!
//! The anonymous user's library: prompts and collections kept in a local
//! JSON document, optionally mirrored to a remote personal library.

pub mod models;
pub mod queue;
pub mod storage;
pub mod store;
pub mod sync;

pub use models::*;
pub use queue::WriteQueue;
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
pub use store::{ImportSummary, LocalStore};
pub use sync::{reconcile, SyncReport};
