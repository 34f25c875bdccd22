use chrono::{DateTime, NaiveDate, Utc};
use reaper_core::contract::{EnforcementReport, SweepEnforcementSummary, DELETE_SESSION_NAME};
use reaper_core::error::LifecycleError;
use reaper_core::record::TrackingRecord;
use serde_json::{json, Value};

use crate::adapters::credentials::CredentialBroker;
use crate::adapters::directory::AccountDirectory;
use crate::adapters::notify::{ensure_subscription, NotificationChannel};
use crate::adapters::services::RegistryProvider;
use crate::adapters::tracking::TrackingStore;

use super::{
    error_response, parse_lifecycle_request, success_response, validation_error_response,
    ApiGatewayResponse,
};

/// Collaborators the enforcement entry point runs against.
pub struct EnforceDependencies<'a> {
    pub directory: &'a dyn AccountDirectory,
    pub broker: &'a dyn CredentialBroker,
    pub tracking: &'a dyn TrackingStore,
    pub registries: &'a dyn RegistryProvider,
    pub notifications: &'a dyn NotificationChannel,
}

/// Deletes expired tracked resources and notifies owners. A request naming an
/// account enforces just that account; an empty request sweeps every
/// connected account.
pub fn handle_enforce_event(
    event: Value,
    deps: &EnforceDependencies<'_>,
    tag_key: &str,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let request = match parse_lifecycle_request(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    match request.target_account() {
        Some(account_id) => success_response(200, enforce_account(account_id, deps, tag_key, now)),
        None => {
            let accounts = match deps.directory.list_all() {
                Ok(accounts) => accounts,
                Err(error) => {
                    log_enforce_error(
                        "account_listing_failed",
                        json!({"error": error.to_string()}),
                    );
                    return error_response(
                        500,
                        json!({
                            "error": "account_directory_unavailable",
                            "message": error.to_string(),
                        }),
                    );
                }
            };

            let mut summary = SweepEnforcementSummary {
                total_accounts: accounts.len(),
                processed: Vec::with_capacity(accounts.len()),
            };
            for account in &accounts {
                summary
                    .processed
                    .push(enforce_account(&account.account_id, deps, tag_key, now));
            }
            success_response(200, summary)
        }
    }
}

/// Enforces one account. A record failing anywhere in its pipeline lands in
/// `failed` with its state unchanged, so the next pass retries it; only a
/// failed expiry query sets `error`.
fn enforce_account(
    account_id: &str,
    deps: &EnforceDependencies<'_>,
    tag_key: &str,
    now: DateTime<Utc>,
) -> EnforcementReport {
    let today = now.date_naive();
    log_enforce_info(
        "account_enforcement_started",
        json!({"account_id": account_id, "as_of": today.to_string()}),
    );

    let expired = match deps.tracking.query_expired(account_id, today) {
        Ok(records) => records,
        Err(error) => {
            log_enforce_error(
                "expiry_query_failed",
                json!({"account_id": account_id, "error": error.to_string()}),
            );
            return EnforcementReport {
                account_id: account_id.to_string(),
                deleted: Vec::new(),
                failed: Vec::new(),
                error: Some(format!("expiry query failed: {error}")),
            };
        }
    };

    let mut report = EnforcementReport {
        account_id: account_id.to_string(),
        deleted: Vec::new(),
        failed: Vec::new(),
        error: None,
    };

    for record in expired {
        match enforce_record(&record, deps, tag_key, now) {
            Ok(()) => report.deleted.push(record.resource_id),
            Err(error) => {
                log_enforce_error(
                    "resource_enforcement_failed",
                    json!({
                        "account_id": account_id,
                        "resource_id": record.resource_id,
                        "kind": record.resource_type.as_str(),
                        "error": error.to_string(),
                    }),
                );
                report.failed.push(record.resource_id);
            }
        }
    }

    log_enforce_info(
        "account_enforcement_completed",
        json!({
            "account_id": account_id,
            "deleted": report.deleted.len(),
            "failed": report.failed.len(),
        }),
    );
    report
}

/// Runs the full pipeline for one expired record: owner subscription, role
/// assumption, deletion, state transition, notification. The record is marked
/// deleted before the notice is published; a failed publish never resurrects
/// the record.
fn enforce_record(
    record: &TrackingRecord,
    deps: &EnforceDependencies<'_>,
    tag_key: &str,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let account = deps.directory.get(&record.account_id)?.ok_or_else(|| {
        LifecycleError::NotFound(format!("account {} is no longer connected", record.account_id))
    })?;

    let email = record.owner_email.as_ref().unwrap_or(&account.owner_email);
    if let Err(error) = ensure_subscription(deps.notifications, email) {
        log_enforce_error(
            "subscription_check_failed",
            json!({"email": email, "error": error.to_string()}),
        );
    }

    let credentials = deps.broker.assume(&account, DELETE_SESSION_NAME)?;
    let registry = deps.registries.open_region(&credentials, &record.region);
    registry.delete(&record.resource_type, &record.resource_id)?;

    deps.tracking
        .mark_deleted(&record.account_id, &record.resource_id, &now.to_rfc3339())?;
    log_enforce_info(
        "resource_deleted",
        json!({
            "account_id": record.account_id,
            "resource_id": record.resource_id,
            "kind": record.resource_type.as_str(),
            "region": record.region,
        }),
    );

    let (subject, message) = deletion_notice(record, now.date_naive(), tag_key);
    if let Err(error) = deps.notifications.publish(&subject, &message) {
        log_enforce_error(
            "notification_publish_failed",
            json!({"resource_id": record.resource_id, "error": error.to_string()}),
        );
    }

    Ok(())
}

fn deletion_notice(
    record: &TrackingRecord,
    deleted_on: NaiveDate,
    tag_key: &str,
) -> (String, String) {
    let subject = format!(
        "Resource Reaper: {} resource deleted",
        record.resource_type.as_str().to_uppercase()
    );
    let message = format!(
        "The following resource has been automatically deleted:\n\
         - Resource ID: {}\n\
         - Account ID: {}\n\
         - Type: {}\n\
         - Region: {}\n\
         - Deleted On: {}\n\
         - Tag: {} = {}",
        record.resource_id,
        record.account_id,
        record.resource_type,
        record.region,
        deleted_on,
        tag_key,
        record.delete_after,
    );
    (subject, message)
}

fn log_enforce_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "enforce_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_enforce_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "enforce_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;
    use reaper_core::arn::ResourceKind;
    use reaper_core::record::{ConnectedAccount, ResourceState};

    use crate::adapters::credentials::SessionCredentials;
    use crate::adapters::services::{LifecycleRegistry, ServiceLifecycle};

    use super::*;

    struct StaticDirectory {
        accounts: Vec<ConnectedAccount>,
        fail: bool,
    }

    impl StaticDirectory {
        fn with_accounts(accounts: Vec<ConnectedAccount>) -> Self {
            Self {
                accounts,
                fail: false,
            }
        }
    }

    impl AccountDirectory for StaticDirectory {
        fn get(&self, account_id: &str) -> Result<Option<ConnectedAccount>, LifecycleError> {
            if self.fail {
                return Err(LifecycleError::Store("directory offline".to_string()));
            }
            Ok(self
                .accounts
                .iter()
                .find(|account| account.account_id == account_id)
                .cloned())
        }

        fn list_all(&self) -> Result<Vec<ConnectedAccount>, LifecycleError> {
            if self.fail {
                return Err(LifecycleError::Store("directory offline".to_string()));
            }
            Ok(self.accounts.clone())
        }
    }

    struct StubBroker {
        sessions: Mutex<Vec<String>>,
    }

    impl StubBroker {
        fn new() -> Self {
            Self {
                sessions: Mutex::new(Vec::new()),
            }
        }

        fn sessions(&self) -> Vec<String> {
            self.sessions.lock().expect("poisoned mutex").clone()
        }
    }

    impl CredentialBroker for StubBroker {
        fn assume(
            &self,
            _account: &ConnectedAccount,
            session_name: &str,
        ) -> Result<SessionCredentials, LifecycleError> {
            self.sessions
                .lock()
                .expect("poisoned mutex")
                .push(session_name.to_string());
            Ok(SessionCredentials {
                access_key_id: "AKIATESTKEY".to_string(),
                secret_access_key: "test-secret".to_string(),
                session_token: "test-token".to_string(),
            })
        }
    }

    struct InMemoryTracker {
        records: Mutex<Vec<TrackingRecord>>,
        fail_query: bool,
        fail_mark: bool,
    }

    impl InMemoryTracker {
        fn seeded(records: Vec<TrackingRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                fail_query: false,
                fail_mark: false,
            }
        }

        fn records(&self) -> Vec<TrackingRecord> {
            self.records.lock().expect("poisoned mutex").clone()
        }
    }

    impl TrackingStore for InMemoryTracker {
        fn put(&self, record: &TrackingRecord) -> Result<(), LifecycleError> {
            self.records
                .lock()
                .expect("poisoned mutex")
                .push(record.clone());
            Ok(())
        }

        fn query_expired(
            &self,
            account_id: &str,
            as_of: NaiveDate,
        ) -> Result<Vec<TrackingRecord>, LifecycleError> {
            if self.fail_query {
                return Err(LifecycleError::Store("query rejected".to_string()));
            }
            Ok(self
                .records
                .lock()
                .expect("poisoned mutex")
                .iter()
                .filter(|record| record.account_id == account_id && record.is_enforceable(as_of))
                .cloned()
                .collect())
        }

        fn mark_deleted(
            &self,
            account_id: &str,
            resource_id: &str,
            deleted_at: &str,
        ) -> Result<(), LifecycleError> {
            if self.fail_mark {
                return Err(LifecycleError::Store("update rejected".to_string()));
            }
            let mut records = self.records.lock().expect("poisoned mutex");
            for record in records.iter_mut() {
                if record.account_id == account_id && record.resource_id == resource_id {
                    record.state = ResourceState::Deleted;
                    record.deleted_at = Some(deleted_at.to_string());
                }
            }
            Ok(())
        }
    }

    struct RecordingDeleter {
        deletes: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl ServiceLifecycle for RecordingDeleter {
        fn check_live(&self, _resource_id: &str) -> Result<bool, LifecycleError> {
            Ok(true)
        }

        fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
            if self.fail {
                return Err(LifecycleError::Service("InternalError: deletion failed".to_string()));
            }
            self.deletes
                .lock()
                .expect("poisoned mutex")
                .push(resource_id.to_string());
            Ok(())
        }
    }

    struct RecordingRegistryProvider {
        kind: ResourceKind,
        deletes: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingRegistryProvider {
        fn for_instances() -> Self {
            Self {
                kind: ResourceKind::Ec2Instance,
                deletes: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }

        fn deletes(&self) -> Vec<String> {
            self.deletes.lock().expect("poisoned mutex").clone()
        }
    }

    impl RegistryProvider for RecordingRegistryProvider {
        fn open_region(
            &self,
            _credentials: &SessionCredentials,
            _region: &str,
        ) -> LifecycleRegistry {
            let mut registry = LifecycleRegistry::new();
            registry.register(
                self.kind.clone(),
                Box::new(RecordingDeleter {
                    deletes: Arc::clone(&self.deletes),
                    fail: self.fail,
                }),
            );
            registry
        }
    }

    struct RecordingChannel {
        subscriptions: Mutex<Vec<String>>,
        subscribe_calls: Mutex<Vec<String>>,
        published: Mutex<Vec<(String, String)>>,
        fail_listing: bool,
        fail_publish: bool,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self {
                subscriptions: Mutex::new(Vec::new()),
                subscribe_calls: Mutex::new(Vec::new()),
                published: Mutex::new(Vec::new()),
                fail_listing: false,
                fail_publish: false,
            }
        }

        fn subscribe_calls(&self) -> Vec<String> {
            self.subscribe_calls.lock().expect("poisoned mutex").clone()
        }

        fn published(&self) -> Vec<(String, String)> {
            self.published.lock().expect("poisoned mutex").clone()
        }
    }

    impl NotificationChannel for RecordingChannel {
        fn list_email_subscriptions(&self) -> Result<Vec<String>, LifecycleError> {
            if self.fail_listing {
                return Err(LifecycleError::Service("listing unavailable".to_string()));
            }
            Ok(self.subscriptions.lock().expect("poisoned mutex").clone())
        }

        fn subscribe_email(&self, email: &str) -> Result<(), LifecycleError> {
            self.subscriptions
                .lock()
                .expect("poisoned mutex")
                .push(email.to_string());
            self.subscribe_calls
                .lock()
                .expect("poisoned mutex")
                .push(email.to_string());
            Ok(())
        }

        fn publish(&self, subject: &str, message: &str) -> Result<(), LifecycleError> {
            if self.fail_publish {
                return Err(LifecycleError::Service("publish rejected".to_string()));
            }
            self.published
                .lock()
                .expect("poisoned mutex")
                .push((subject.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn connected_account(account_id: &str) -> ConnectedAccount {
        ConnectedAccount {
            account_id: account_id.to_string(),
            role_arn: format!("arn:aws:iam::{account_id}:role/lifecycle-delegate"),
            external_id: "shared-secret".to_string(),
            owner_email: format!("owner-{account_id}@example.com"),
        }
    }

    fn expired_record(account_id: &str, resource_id: &str) -> TrackingRecord {
        TrackingRecord {
            account_id: account_id.to_string(),
            resource_id: resource_id.to_string(),
            resource_type: ResourceKind::Ec2Instance,
            region: "ap-south-1".to_string(),
            arn: format!("arn:aws:ec2:ap-south-1:{account_id}:instance/{resource_id}"),
            tags: BTreeMap::from([("reaper-delete-after".to_string(), "2024-01-01".to_string())]),
            delete_after: "2024-01-01".to_string(),
            state: ResourceState::Active,
            owner_email: Some(format!("owner-{account_id}@example.com")),
            scanned_at: "2024-01-15T08:00:00+00:00".to_string(),
            deleted_at: None,
        }
    }

    fn enforcement_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn deletes_expired_resource_and_notifies_owner() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 200);
        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.deleted, vec!["i-0abc123"]);
        assert!(report.failed.is_empty());
        assert!(report.error.is_none());

        assert_eq!(registries.deletes(), vec!["i-0abc123"]);
        assert_eq!(broker.sessions(), vec![DELETE_SESSION_NAME]);

        let records = tracker.records();
        assert_eq!(records[0].state, ResourceState::Deleted);
        assert_eq!(
            records[0].deleted_at.as_deref(),
            Some(enforcement_time().to_rfc3339().as_str())
        );

        assert_eq!(channel.subscribe_calls(), vec!["owner-111122223333@example.com"]);
        let published = channel.published();
        assert_eq!(published.len(), 1);
        let (subject, message) = &published[0];
        assert_eq!(subject, "Resource Reaper: EC2-INSTANCE resource deleted");
        assert!(message.contains("- Resource ID: i-0abc123"));
        assert!(message.contains("- Deleted On: 2024-02-01"));
        assert!(message.contains("- Tag: reaper-delete-after = 2024-01-01"));
    }

    #[test]
    fn second_pass_finds_nothing_to_enforce() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let first = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );
        let second = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let first: EnforcementReport =
            serde_json::from_str(&first.body).expect("report should parse");
        let second: EnforcementReport =
            serde_json::from_str(&second.body).expect("report should parse");

        assert_eq!(first.deleted, vec!["i-0abc123"]);
        assert!(second.deleted.is_empty());
        assert!(second.failed.is_empty());
        assert_eq!(registries.deletes().len(), 1);
        assert_eq!(channel.published().len(), 1);
    }

    #[test]
    fn future_dated_record_is_untouched() {
        let mut record = expired_record("111122223333", "i-0later");
        record.delete_after = "2024-03-01".to_string();
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![record]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert!(report.deleted.is_empty());
        assert!(registries.deletes().is_empty());
        assert_eq!(tracker.records()[0].state, ResourceState::Active);
    }

    #[test]
    fn missing_directory_entry_fails_the_resource() {
        let directory = StaticDirectory::with_accounts(vec![]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 200);
        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.failed, vec!["i-0abc123"]);
        assert!(report.deleted.is_empty());
        assert!(registries.deletes().is_empty());
        assert_eq!(tracker.records()[0].state, ResourceState::Active);
        assert!(channel.published().is_empty());
    }

    #[test]
    fn delete_failure_keeps_the_record_active() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let mut registries = RecordingRegistryProvider::for_instances();
        registries.fail = true;
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.failed, vec!["i-0abc123"]);
        assert_eq!(tracker.records()[0].state, ResourceState::Active);
        assert!(channel.published().is_empty());
    }

    #[test]
    fn unsupported_kind_is_recorded_as_failed() {
        let mut record = expired_record("111122223333", "click-events");
        record.resource_type = ResourceKind::Unknown("kinesis".to_string());
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![record]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.failed, vec!["click-events"]);
        assert!(registries.deletes().is_empty());
        assert_eq!(tracker.records()[0].state, ResourceState::Active);
    }

    #[test]
    fn publish_failure_does_not_undo_the_deletion() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let mut channel = RecordingChannel::new();
        channel.fail_publish = true;
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.deleted, vec!["i-0abc123"]);
        assert!(report.failed.is_empty());
        assert_eq!(tracker.records()[0].state, ResourceState::Deleted);
    }

    #[test]
    fn mark_failure_is_recorded_as_failed() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let mut tracker =
            InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        tracker.fail_mark = true;
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.failed, vec!["i-0abc123"]);
        assert!(channel.published().is_empty());
    }

    #[test]
    fn subscription_failure_is_not_fatal() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let mut channel = RecordingChannel::new();
        channel.fail_listing = true;
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert_eq!(report.deleted, vec!["i-0abc123"]);
        assert_eq!(channel.published().len(), 1);
    }

    #[test]
    fn account_email_is_used_when_record_has_none() {
        let mut record = expired_record("111122223333", "i-0abc123");
        record.owner_email = None;
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![record]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(channel.subscribe_calls(), vec!["owner-111122223333@example.com"]);
    }

    #[test]
    fn expiry_query_failure_reports_error_without_aborting() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let mut tracker = InMemoryTracker::seeded(vec![]);
        tracker.fail_query = true;
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"accountId": "111122223333"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 200);
        let report: EnforcementReport =
            serde_json::from_str(&response.body).expect("report should parse");
        assert!(report.error.is_some());
        assert!(report.deleted.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn sweep_processes_every_connected_account() {
        let directory = StaticDirectory::with_accounts(vec![
            connected_account("111122223333"),
            connected_account("222233334444"),
        ]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![
            expired_record("111122223333", "i-0abc123"),
            expired_record("222233334444", "i-0def456"),
        ]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 200);
        let summary: SweepEnforcementSummary =
            serde_json::from_str(&response.body).expect("summary should parse");
        assert_eq!(summary.total_accounts, 2);
        assert_eq!(summary.processed.len(), 2);
        assert_eq!(summary.processed[0].deleted, vec!["i-0abc123"]);
        assert_eq!(summary.processed[1].deleted, vec!["i-0def456"]);
        assert_eq!(registries.deletes().len(), 2);
    }

    #[test]
    fn directory_failure_fails_the_sweep() {
        let mut directory = StaticDirectory::with_accounts(vec![]);
        directory.fail = true;
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body["error"], "account_directory_unavailable");
    }

    #[test]
    fn rejects_malformed_request_without_querying() {
        let directory = StaticDirectory::with_accounts(vec![connected_account("111122223333")]);
        let broker = StubBroker::new();
        let tracker = InMemoryTracker::seeded(vec![expired_record("111122223333", "i-0abc123")]);
        let registries = RecordingRegistryProvider::for_instances();
        let channel = RecordingChannel::new();
        let deps = EnforceDependencies {
            directory: &directory,
            broker: &broker,
            tracking: &tracker,
            registries: &registries,
            notifications: &channel,
        };

        let response = handle_enforce_event(
            json!({"body": "{oops"}),
            &deps,
            "reaper-delete-after",
            enforcement_time(),
        );

        assert_eq!(response.status_code, 400);
        assert!(registries.deletes().is_empty());
        assert_eq!(tracker.records()[0].state, ResourceState::Active);
    }

    #[test]
    fn deletion_notice_names_the_resource_and_expiry_tag() {
        let record = expired_record("111122223333", "i-0abc123");
        let (subject, message) = deletion_notice(
            &record,
            enforcement_time().date_naive(),
            "reaper-delete-after",
        );

        assert_eq!(subject, "Resource Reaper: EC2-INSTANCE resource deleted");
        assert_eq!(
            message,
            "The following resource has been automatically deleted:\n\
             - Resource ID: i-0abc123\n\
             - Account ID: 111122223333\n\
             - Type: ec2-instance\n\
             - Region: ap-south-1\n\
             - Deleted On: 2024-02-01\n\
             - Tag: reaper-delete-after = 2024-01-01"
        );
    }
}
