use reaper_core::error::LifecycleError;
use reaper_core::record::ConnectedAccount;

/// Read access to the connected-accounts directory. Accounts are written by
/// the onboarding flow; scan and enforcement only read them.
pub trait AccountDirectory {
    /// Looks up one account by id. `Ok(None)` means the account is not
    /// connected, which is distinct from a directory read failure.
    fn get(&self, account_id: &str) -> Result<Option<ConnectedAccount>, LifecycleError>;

    /// Lists every connected account for sweep mode.
    fn list_all(&self) -> Result<Vec<ConnectedAccount>, LifecycleError>;
}
