//! In-memory job record store.
//!
//! The store is the single stateful component of the render queue: one shared
//! instance per process, injected into every request handler. All operations
//! are synchronous map operations guarded by one mutex, so the select+update
//! sequence in [`JobStore::claim_next`] is atomic with respect to concurrent
//! dispatch calls.

pub mod error;
pub mod store;
pub mod sweep;

pub use error::{StoreError, StoreResult};
pub use store::{JobStore, StatusUpdate};
pub use sweep::{RetentionConfig, RetentionSweeper};
