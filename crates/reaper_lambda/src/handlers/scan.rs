use chrono::{DateTime, Utc};
use reaper_core::arn::decode_arn;
use reaper_core::contract::{ScanReport, SweepScanSummary, SCAN_SESSION_NAME};
use reaper_core::record::{ConnectedAccount, ResourceState, TrackingRecord};
use serde_json::{json, Value};

use crate::adapters::credentials::CredentialBroker;
use crate::adapters::directory::AccountDirectory;
use crate::adapters::services::RegistryProvider;
use crate::adapters::tags::TagLister;
use crate::adapters::tracking::TrackingStore;

use super::{
    error_response, parse_lifecycle_request, success_response, validation_error_response,
    ApiGatewayResponse,
};

/// Collaborators the scan entry point runs against.
pub struct ScanDependencies<'a> {
    pub directory: &'a dyn AccountDirectory,
    pub broker: &'a dyn CredentialBroker,
    pub tags: &'a dyn TagLister,
    pub registries: &'a dyn RegistryProvider,
    pub tracking: &'a dyn TrackingStore,
}

/// Discovers tagged resources and upserts tracking records. A request naming
/// an account scans just that account; an empty request sweeps every
/// connected account, isolating failures per account.
pub fn handle_scan_event(
    event: Value,
    deps: &ScanDependencies<'_>,
    regions: &[String],
    tag_key: &str,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let request = match parse_lifecycle_request(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(account_id) = request.target_account() else {
        let accounts = match deps.directory.list_all() {
            Ok(accounts) => accounts,
            Err(error) => {
                log_scan_error("account_listing_failed", json!({"error": error.to_string()}));
                return error_response(
                    500,
                    json!({
                        "error": "account_directory_unavailable",
                        "message": error.to_string(),
                    }),
                );
            }
        };

        let mut summary = SweepScanSummary {
            accounts_scanned: 0,
            total_resources: 0,
            failed: Vec::new(),
        };
        for account in &accounts {
            let report = scan_connected_account(account, deps, regions, tag_key, now);
            if report.error.is_some() {
                summary.failed.push(report.account_id);
            } else {
                summary.accounts_scanned += 1;
                summary.total_resources += report.resources_stored;
            }
        }
        return success_response(200, summary);
    };

    let account = match deps.directory.get(account_id) {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(
                404,
                json!({
                    "error": "account_not_found",
                    "message": format!("Account {account_id} is not connected"),
                }),
            );
        }
        Err(error) => {
            log_scan_error(
                "account_lookup_failed",
                json!({"account_id": account_id, "error": error.to_string()}),
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

    success_response(200, scan_connected_account(&account, deps, regions, tag_key, now))
}

/// Scans one account across the target regions. Credential assumption is
/// region-independent, so a denied role ends the account's scan; every other
/// failure is contained to the region or resource it occurred in.
fn scan_connected_account(
    account: &ConnectedAccount,
    deps: &ScanDependencies<'_>,
    regions: &[String],
    tag_key: &str,
    now: DateTime<Utc>,
) -> ScanReport {
    let scanned_at = now.to_rfc3339();
    log_scan_info(
        "account_scan_started",
        json!({"account_id": account.account_id, "regions": regions}),
    );

    let mut report = ScanReport {
        account_id: account.account_id.clone(),
        resources_stored: 0,
        regions_scanned: Vec::new(),
        scanned_at: scanned_at.clone(),
        error: None,
    };

    for region in regions {
        let credentials = match deps.broker.assume(account, SCAN_SESSION_NAME) {
            Ok(credentials) => credentials,
            Err(error) => {
                log_scan_error(
                    "credential_assumption_failed",
                    json!({
                        "account_id": account.account_id,
                        "region": region,
                        "error": error.to_string(),
                    }),
                );
                report.error = Some(error.to_string());
                break;
            }
        };

        let resources = match deps.tags.list_by_tag(&credentials, region, tag_key) {
            Ok(resources) => resources,
            Err(error) => {
                log_scan_error(
                    "region_listing_failed",
                    json!({
                        "account_id": account.account_id,
                        "region": region,
                        "error": error.to_string(),
                    }),
                );
                continue;
            }
        };

        let registry = deps.registries.open_region(&credentials, region);
        let mut stored_in_region = 0usize;

        for resource in &resources {
            let Some(delete_after) = resource.tags.get(tag_key) else {
                continue;
            };
            if delete_after.trim().is_empty() {
                continue;
            }

            let name = decode_arn(&resource.arn);
            match registry.check_live(&name.kind, &name.resource_id) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    log_scan_error(
                        "liveness_check_failed",
                        json!({
                            "account_id": account.account_id,
                            "arn": resource.arn,
                            "kind": name.kind.as_str(),
                            "error": error.to_string(),
                        }),
                    );
                    continue;
                }
            }

            let record = TrackingRecord {
                account_id: account.account_id.clone(),
                resource_id: name.resource_id.clone(),
                resource_type: name.kind,
                region: region.clone(),
                arn: resource.arn.clone(),
                tags: resource.tags.clone(),
                delete_after: delete_after.clone(),
                state: ResourceState::Active,
                owner_email: Some(account.owner_email.clone()),
                scanned_at: scanned_at.clone(),
                deleted_at: None,
            };
            match deps.tracking.put(&record) {
                Ok(()) => stored_in_region += 1,
                Err(error) => {
                    log_scan_error(
                        "record_store_failed",
                        json!({
                            "account_id": account.account_id,
                            "arn": resource.arn,
                            "error": error.to_string(),
                        }),
                    );
                }
            }
        }

        report.resources_stored += stored_in_region;
        report.regions_scanned.push(region.clone());
        log_scan_info(
            "region_scan_completed",
            json!({
                "account_id": account.account_id,
                "region": region,
                "tagged_resources": resources.len(),
                "resources_stored": stored_in_region,
            }),
        );
    }

    log_scan_info(
        "account_scan_completed",
        json!({
            "account_id": account.account_id,
            "resources_stored": report.resources_stored,
            "regions_scanned": report.regions_scanned.len(),
            "failed": report.error.is_some(),
        }),
    );
    report
}

fn log_scan_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "scan_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_scan_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "scan_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
