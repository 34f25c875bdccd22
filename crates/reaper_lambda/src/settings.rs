//! Runtime configuration read from the Lambda environment.

use reaper_core::contract::{DEFAULT_TARGET_REGIONS, LIFECYCLE_TAG_KEY};

const DEFAULT_ACCOUNTS_TABLE: &str = "ConnectedAccounts";
const DEFAULT_TRACKING_TABLE: &str = "ResourceTrackingRecords";
const DEFAULT_HOME_REGION: &str = "ap-south-1";

/// Environment-driven settings shared by both Lambda entry points.
pub struct Settings {
    pub accounts_table: String,
    pub tracking_table: String,
    pub topic_arn: Option<String>,
    pub target_regions: Vec<String>,
    pub lifecycle_tag_key: String,
    pub home_region: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let target_regions = lookup("TARGET_REGIONS")
            .map(|raw| parse_region_list(&raw))
            .filter(|regions| !regions.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_TARGET_REGIONS
                    .iter()
                    .map(|region| region.to_string())
                    .collect()
            });

        Settings {
            accounts_table: lookup("ACCOUNTS_TABLE")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_TABLE.to_string()),
            tracking_table: lookup("TRACKING_TABLE")
                .unwrap_or_else(|| DEFAULT_TRACKING_TABLE.to_string()),
            topic_arn: lookup("SNS_TOPIC_ARN").filter(|arn| !arn.trim().is_empty()),
            target_regions,
            lifecycle_tag_key: lookup("LIFECYCLE_TAG_KEY")
                .filter(|key| !key.trim().is_empty())
                .unwrap_or_else(|| LIFECYCLE_TAG_KEY.to_string()),
            home_region: lookup("HOME_REGION").unwrap_or_else(|| DEFAULT_HOME_REGION.to_string()),
        }
    }
}

fn parse_region_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .map(str::to_string)
        .collect()
}
