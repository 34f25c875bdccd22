use chrono::NaiveDate;
use reaper_core::error::LifecycleError;
use reaper_core::record::TrackingRecord;

/// Tracking-record persistence keyed by (account id, resource id).
pub trait TrackingStore {
    /// Upserts a record. Rescanning a known resource overwrites its previous
    /// row, refreshing tags, expiry date, and scan timestamp.
    fn put(&self, record: &TrackingRecord) -> Result<(), LifecycleError>;

    /// Returns records for `account_id` whose expiry date is at or before
    /// `as_of` and whose state is not `deleted`. Records already marked
    /// deleted must never come back from this query.
    fn query_expired(
        &self,
        account_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<TrackingRecord>, LifecycleError>;

    /// Transitions a record to the terminal `deleted` state and stamps
    /// `deleted_at`. This is the only state mutation enforcement performs.
    fn mark_deleted(
        &self,
        account_id: &str,
        resource_id: &str,
        deleted_at: &str,
    ) -> Result<(), LifecycleError>;
}
