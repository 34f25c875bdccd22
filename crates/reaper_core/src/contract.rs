use serde::{Deserialize, Serialize};

/// Tag key whose value is the date after which a resource may be deleted.
pub const LIFECYCLE_TAG_KEY: &str = "reaper-delete-after";

/// Fixed ordered region list scanned for every account unless overridden.
pub const DEFAULT_TARGET_REGIONS: &[&str] = &[
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-northeast-1",
];

pub const SCAN_SESSION_NAME: &str = "reaper-scan-session";
pub const DELETE_SESSION_NAME: &str = "reaper-delete-session";

/// Request payload shared by both entry points. Omitting `accountId` selects
/// full-sweep mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl LifecycleRequest {
    /// Target account, with empty or whitespace-only ids treated as absent.
    pub fn target_account(&self) -> Option<&str> {
        self.account_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Scan outcome for one account across all target regions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub account_id: String,
    pub resources_stored: usize,
    pub regions_scanned: Vec<String>,
    pub scanned_at: String,
    /// Set when credential assumption short-circuited the whole account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate scan outcome across a sweep. Accounts whose scan failed are
/// listed in `failed` only; any resources they stored before failing are
/// excluded from `accounts_scanned` and `total_resources`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepScanSummary {
    pub accounts_scanned: usize,
    pub total_resources: usize,
    pub failed: Vec<String>,
}

/// Enforcement outcome for one account: deleted and failed resource ids
/// coexist; `error` is set only when the expiry query itself failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementReport {
    pub account_id: String,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepEnforcementSummary {
    pub total_accounts: usize,
    pub processed: Vec<EnforcementReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_with_and_without_account_id() {
        let targeted: LifecycleRequest =
            serde_json::from_str(r#"{"accountId":"111122223333"}"#).expect("should parse");
        assert_eq!(targeted.target_account(), Some("111122223333"));

        let sweep: LifecycleRequest = serde_json::from_str("{}").expect("should parse");
        assert_eq!(sweep.target_account(), None);
    }

    #[test]
    fn blank_account_id_selects_sweep_mode() {
        let request: LifecycleRequest =
            serde_json::from_str(r#"{"accountId":"  "}"#).expect("should parse");
        assert_eq!(request.target_account(), None);
    }

    #[test]
    fn request_ignores_unrelated_fields() {
        let request: LifecycleRequest =
            serde_json::from_str(r#"{"accountId":"111","email":"owner@example.com"}"#)
                .expect("should parse");
        assert_eq!(request.target_account(), Some("111"));
    }

    #[test]
    fn reports_serialize_with_wire_field_names() {
        let report = ScanReport {
            account_id: "111".to_string(),
            resources_stored: 3,
            regions_scanned: vec!["ap-south-1".to_string()],
            scanned_at: "2024-01-01T08:00:00Z".to_string(),
            error: None,
        };
        let value = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(value["accountId"], "111");
        assert_eq!(value["resourcesStored"], 3);
        assert_eq!(value["regionsScanned"][0], "ap-south-1");
        assert!(value.get("error").is_none());

        let summary = SweepEnforcementSummary {
            total_accounts: 2,
            processed: vec![EnforcementReport {
                account_id: "111".to_string(),
                deleted: vec!["i-0abc123".to_string()],
                failed: Vec::new(),
                error: None,
            }],
        };
        let value = serde_json::to_value(&summary).expect("summary should serialize");
        assert_eq!(value["totalAccounts"], 2);
        assert_eq!(value["processed"][0]["deleted"][0], "i-0abc123");
    }
}
