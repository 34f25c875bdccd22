use std::collections::BTreeMap;

use aws_sdk_resourcegroupstaggingapi::types::TagFilter;
use aws_sdk_resourcegroupstaggingapi::Client;
use reaper_core::error::LifecycleError;

use crate::adapters::credentials::SessionCredentials;
use crate::adapters::tags::{TagLister, TaggedResource};

use super::{block_on_sdk, classify_aws, delegated_config};

/// Tag-based discovery through the Resource Groups Tagging API, which sees
/// every taggable service in a region through one paged listing.
pub struct TaggingApiLister;

impl TagLister for TaggingApiLister {
    fn list_by_tag(
        &self,
        credentials: &SessionCredentials,
        region: &str,
        tag_key: &str,
    ) -> Result<Vec<TaggedResource>, LifecycleError> {
        let config = delegated_config(credentials, region);
        let client = Client::new(&config);
        let filter = TagFilter::builder().key(tag_key).build();

        block_on_sdk(async move {
            let mut resources = Vec::new();
            let mut pagination_token: Option<String> = None;
            loop {
                let mut request = client
                    .get_resources()
                    .tag_filters(filter.clone())
                    .resources_per_page(50);
                if let Some(token) = pagination_token.take() {
                    request = request.pagination_token(token);
                }

                let output = request.send().await.map_err(classify_aws)?;

                for mapping in output.resource_tag_mapping_list() {
                    let Some(arn) = mapping.resource_arn() else {
                        continue;
                    };
                    let tags: BTreeMap<String, String> = mapping
                        .tags()
                        .iter()
                        .map(|tag| (tag.key().to_string(), tag.value().to_string()))
                        .collect();
                    resources.push(TaggedResource {
                        arn: arn.to_string(),
                        tags,
                    });
                }

                // The service signals the last page with an empty token.
                match output.pagination_token() {
                    Some(token) if !token.is_empty() => {
                        pagination_token = Some(token.to_string());
                    }
                    _ => break,
                }
            }
            Ok(resources)
        })
    }
}
