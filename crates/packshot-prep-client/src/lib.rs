//! Client for the external render-prep worker.
//!
//! Cancellation and bulk clearing of finished jobs are delegated to this
//! worker; the queue relays its responses verbatim after injecting the
//! worker API token.

pub mod client;
pub mod error;

pub use client::{PrepClient, PrepClientConfig};
pub use error::{PrepError, PrepResult};
