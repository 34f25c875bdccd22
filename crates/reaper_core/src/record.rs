//! Connected-account and tracking-record model plus expiry rules.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arn::ResourceKind;

/// One onboarded member account. Written by the connection flow; read-only
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub account_id: String,
    pub role_arn: String,
    pub external_id: String,
    #[serde(rename = "email")]
    pub owner_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Active,
    Deleted,
}

impl ResourceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

/// Persisted expiry state of one discovered resource, keyed by
/// (account_id, resource_id). The scanner upserts these with state `active`;
/// the enforcer is the only writer of the `deleted` transition. Records are
/// never physically removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub account_id: String,
    pub resource_id: String,
    pub resource_type: ResourceKind,
    pub region: String,
    pub arn: String,
    pub tags: BTreeMap<String, String>,
    /// Lifecycle tag value as written on the resource, expected `YYYY-MM-DD`.
    pub delete_after: String,
    pub state: ResourceState,
    #[serde(rename = "email", skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub scanned_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl TrackingRecord {
    /// Expired and still active, so eligible for exactly one enforcement pass.
    /// Deleted records are permanently excluded.
    pub fn is_enforceable(&self, as_of: NaiveDate) -> bool {
        self.state == ResourceState::Active && is_expired(&self.delete_after, as_of)
    }
}

pub fn expiry_date(delete_after: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(delete_after.trim(), "%Y-%m-%d").ok()
}

/// Whether a lifecycle tag value marks a resource as expired at `as_of`.
/// Unparseable dates never expire; deletion is the irreversible branch, so a
/// bad tag value must not trigger it.
pub fn is_expired(delete_after: &str, as_of: NaiveDate) -> bool {
    match expiry_date(delete_after) {
        Some(date) => date <= as_of,
        None => false,
    }
}
