use reaper_core::error::LifecycleError;
use reaper_core::record::ConnectedAccount;

/// Short-lived delegated credentials for acting inside a member account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

/// Obtains delegated credentials for a connected account. A denied assumption
/// surfaces as [LifecycleError::Authorization] and is recoverable per account;
/// it must never abort a multi-account batch.
pub trait CredentialBroker {
    fn assume(
        &self,
        account: &ConnectedAccount,
        session_name: &str,
    ) -> Result<SessionCredentials, LifecycleError>;
}
