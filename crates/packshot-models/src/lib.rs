//! Shared data models for the packshot render queue.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and their lifecycle states
//! - Product references (render inputs)
//! - Render settings helpers (preview clamping)

pub mod job;
pub mod product;
pub mod settings;

// Re-export common types
pub use job::{Job, JobId, JobStatus};
pub use product::ProductRef;
pub use settings::clamp_for_preview;
