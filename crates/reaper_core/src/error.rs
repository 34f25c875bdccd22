//! Error taxonomy for lifecycle operations.
//!
//! Failures processing one resource, region, or account are caught at that
//! unit's boundary and converted into failed/error entries; they never abort a
//! larger batch. Cloud SDK errors are classified by error code so operator
//! logs can tell a denied role assumption from a missing resource from a
//! transient service fault.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Delegated credential assumption denied (wrong external id, trust
    /// policy mismatch, role deleted). Recoverable per account.
    #[error("authorization failure: {0}")]
    Authorization(String),

    /// Account or resource missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying cloud API error, not classified further.
    #[error("cloud service error: {0}")]
    Service(String),

    /// No liveness/deletion routine registered for this resource kind.
    #[error("unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    /// Tracking-store or account-directory read/write failure.
    #[error("store error: {0}")]
    Store(String),
}

impl LifecycleError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Error codes signalling a denied or unusable delegated credential.
const AUTHORIZATION_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
];

/// Error codes confirming the target does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidVolume.NotFound",
    "NoSuchBucket",
    "NoSuchKey",
    "NotFound",
    "NotFoundException",
    "ResourceNotFoundException",
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "RepositoryNotFoundException",
    "StackNotFoundException",
];

/// Classify a cloud SDK error by its error code. Unknown and missing codes
/// collapse to [LifecycleError::Service].
pub fn classify_sdk_error(code: Option<&str>, message: Option<&str>) -> LifecycleError {
    let message = message.unwrap_or("unknown error");
    match code {
        Some(code) if AUTHORIZATION_CODES.contains(&code) => {
            LifecycleError::Authorization(format!("{code}: {message}"))
        }
        Some(code) if NOT_FOUND_CODES.contains(&code) => {
            LifecycleError::NotFound(format!("{code}: {message}"))
        }
        Some(code) => LifecycleError::Service(format!("{code}: {message}")),
        None => LifecycleError::Service(message.to_string()),
    }
}
