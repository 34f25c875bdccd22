//! Collaborator traits the handlers are written against.
//!
//! Handlers stay pure over these seams; AWS SDK implementations live in
//! `crate::aws` and mocks live next to the handler tests.

pub mod credentials;
pub mod directory;
pub mod notify;
pub mod services;
pub mod tags;
pub mod tracking;
