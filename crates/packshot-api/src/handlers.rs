//! Request handlers.

pub mod downloads;
pub mod health;
pub mod jobs;
pub mod preview;
pub mod render;

pub use health::*;
