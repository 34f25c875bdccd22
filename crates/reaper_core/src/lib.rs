//! Shared resource-lifecycle domain primitives.
//!
//! This crate owns the tracking-record model, canonical resource name
//! decoding, expiry rules, request/response contracts, and the error
//! taxonomy. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod arn;
pub mod contract;
pub mod error;
pub mod record;
