//! AWS-oriented adapters and handlers for tagged-resource lifecycle
//! enforcement.
//!
//! This crate owns runtime integration details (Lambda handlers, collaborator
//! adapters, and AWS SDK client implementations); the tracking-record model,
//! expiry rules, and error taxonomy live in `reaper_core`.

pub mod adapters;
pub mod aws;
pub mod handlers;
pub mod settings;
