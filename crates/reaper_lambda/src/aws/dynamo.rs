//! DynamoDB-backed account directory and tracking store.
//!
//! Both tables live in the home region. The directory table is keyed by
//! `accountId`; the tracking table by (`accountId`, `resourceId`). Expired
//! records are found with a filtered scan because expiry cuts across the key
//! space.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::NaiveDate;
use reaper_core::arn::ResourceKind;
use reaper_core::error::LifecycleError;
use reaper_core::record::{ConnectedAccount, ResourceState, TrackingRecord};

use crate::adapters::directory::AccountDirectory;
use crate::adapters::tracking::TrackingStore;

use super::block_on_sdk;

pub struct DynamoAccountDirectory {
    client: Client,
    table: String,
}

impl DynamoAccountDirectory {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl AccountDirectory for DynamoAccountDirectory {
    fn get(&self, account_id: &str) -> Result<Option<ConnectedAccount>, LifecycleError> {
        let client = self.client.clone();
        let table = self.table.clone();
        let account_id = account_id.to_string();

        block_on_sdk(async move {
            let output = client
                .get_item()
                .table_name(table)
                .key("accountId", AttributeValue::S(account_id))
                .send()
                .await
                .map_err(store_error)?;

            match output.item() {
                Some(item) => Ok(Some(account_from_item(item)?)),
                None => Ok(None),
            }
        })
    }

    fn list_all(&self) -> Result<Vec<ConnectedAccount>, LifecycleError> {
        let client = self.client.clone();
        let table = self.table.clone();

        block_on_sdk(async move {
            let mut accounts = Vec::new();
            let mut start_key: Option<HashMap<String, AttributeValue>> = None;
            loop {
                let output = client
                    .scan()
                    .table_name(table.as_str())
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(store_error)?;

                for item in output.items() {
                    accounts.push(account_from_item(item)?);
                }

                match output.last_evaluated_key() {
                    Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                    _ => break,
                }
            }
            Ok(accounts)
        })
    }
}

pub struct DynamoTrackingStore {
    client: Client,
    table: String,
}

impl DynamoTrackingStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl TrackingStore for DynamoTrackingStore {
    fn put(&self, record: &TrackingRecord) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let table = self.table.clone();
        let item = item_from_record(record);

        block_on_sdk(async move {
            client
                .put_item()
                .table_name(table)
                .set_item(Some(item))
                .send()
                .await
                .map_err(store_error)?;
            Ok(())
        })
    }

    fn query_expired(
        &self,
        account_id: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<TrackingRecord>, LifecycleError> {
        let client = self.client.clone();
        let table = self.table.clone();
        let account_id = account_id.to_string();
        let cutoff = as_of.format("%Y-%m-%d").to_string();

        block_on_sdk(async move {
            let mut records = Vec::new();
            let mut start_key: Option<HashMap<String, AttributeValue>> = None;
            loop {
                // `state` is a DynamoDB reserved word, hence the alias.
                let output = client
                    .scan()
                    .table_name(table.as_str())
                    .filter_expression(
                        "accountId = :account AND deleteAfter <= :cutoff AND #state <> :deleted",
                    )
                    .expression_attribute_names("#state", "state")
                    .expression_attribute_values(":account", AttributeValue::S(account_id.clone()))
                    .expression_attribute_values(":cutoff", AttributeValue::S(cutoff.clone()))
                    .expression_attribute_values(
                        ":deleted",
                        AttributeValue::S(ResourceState::Deleted.as_str().to_string()),
                    )
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await
                    .map_err(store_error)?;

                for item in output.items() {
                    records.push(record_from_item(item)?);
                }

                match output.last_evaluated_key() {
                    Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                    _ => break,
                }
            }
            Ok(records)
        })
    }

    fn mark_deleted(
        &self,
        account_id: &str,
        resource_id: &str,
        deleted_at: &str,
    ) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let table = self.table.clone();
        let account_id = account_id.to_string();
        let resource_id = resource_id.to_string();
        let deleted_at = deleted_at.to_string();

        block_on_sdk(async move {
            client
                .update_item()
                .table_name(table)
                .key("accountId", AttributeValue::S(account_id))
                .key("resourceId", AttributeValue::S(resource_id))
                .update_expression("SET #state = :deleted, deletedAt = :at")
                .expression_attribute_names("#state", "state")
                .expression_attribute_values(
                    ":deleted",
                    AttributeValue::S(ResourceState::Deleted.as_str().to_string()),
                )
                .expression_attribute_values(":at", AttributeValue::S(deleted_at))
                .send()
                .await
                .map_err(store_error)?;
            Ok(())
        })
    }
}

fn store_error<E>(error: E) -> LifecycleError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    match error.code() {
        Some(code) => LifecycleError::Store(format!("{code}: {message}")),
        None => LifecycleError::Store(message),
    }
}

fn string_attribute(
    item: &HashMap<String, AttributeValue>,
    name: &str,
) -> Result<String, LifecycleError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| {
            LifecycleError::Store(format!("item attribute '{name}' missing or not a string"))
        })
}

fn optional_string_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|value| value.as_s().ok()).cloned()
}

fn account_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<ConnectedAccount, LifecycleError> {
    Ok(ConnectedAccount {
        account_id: string_attribute(item, "accountId")?,
        role_arn: string_attribute(item, "roleArn")?,
        external_id: string_attribute(item, "externalId")?,
        owner_email: string_attribute(item, "email")?,
    })
}

fn item_from_record(record: &TrackingRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        ("accountId".to_string(), AttributeValue::S(record.account_id.clone())),
        ("resourceId".to_string(), AttributeValue::S(record.resource_id.clone())),
        ("resourceType".to_string(), AttributeValue::S(record.resource_type.as_str().to_string())),
        ("region".to_string(), AttributeValue::S(record.region.clone())),
        ("arn".to_string(), AttributeValue::S(record.arn.clone())),
        ("deleteAfter".to_string(), AttributeValue::S(record.delete_after.clone())),
        ("state".to_string(), AttributeValue::S(record.state.as_str().to_string())),
        ("scannedAt".to_string(), AttributeValue::S(record.scanned_at.clone())),
    ]);

    let tags: HashMap<String, AttributeValue> = record
        .tags
        .iter()
        .map(|(key, value)| (key.clone(), AttributeValue::S(value.clone())))
        .collect();
    item.insert("tags".to_string(), AttributeValue::M(tags));

    if let Some(email) = &record.owner_email {
        item.insert("email".to_string(), AttributeValue::S(email.clone()));
    }
    if let Some(deleted_at) = &record.deleted_at {
        item.insert("deletedAt".to_string(), AttributeValue::S(deleted_at.clone()));
    }
    item
}

fn record_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<TrackingRecord, LifecycleError> {
    let mut tags = BTreeMap::new();
    if let Some(Ok(map)) = item.get("tags").map(AttributeValue::as_m) {
        for (key, value) in map {
            if let Ok(text) = value.as_s() {
                tags.insert(key.clone(), text.clone());
            }
        }
    }

    Ok(TrackingRecord {
        account_id: string_attribute(item, "accountId")?,
        resource_id: string_attribute(item, "resourceId")?,
        resource_type: ResourceKind::from(string_attribute(item, "resourceType")?),
        region: string_attribute(item, "region")?,
        arn: string_attribute(item, "arn")?,
        tags,
        delete_after: string_attribute(item, "deleteAfter")?,
        state: state_from_attribute(&string_attribute(item, "state")?)?,
        owner_email: optional_string_attribute(item, "email"),
        scanned_at: string_attribute(item, "scannedAt")?,
        deleted_at: optional_string_attribute(item, "deletedAt"),
    })
}

fn state_from_attribute(value: &str) -> Result<ResourceState, LifecycleError> {
    match value {
        "active" => Ok(ResourceState::Active),
        "deleted" => Ok(ResourceState::Deleted),
        other => Err(LifecycleError::Store(format!("unrecognized record state '{other}'"))),
    }
}
