use std::collections::BTreeMap;

use reaper_core::error::LifecycleError;

use crate::adapters::credentials::SessionCredentials;

/// One resource returned by the tag-based discovery listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResource {
    pub arn: String,
    pub tags: BTreeMap<String, String>,
}

/// Lists every resource in one region carrying `tag_key`, under the given
/// delegated credentials. Implementations page through the full result set
/// before returning.
pub trait TagLister {
    fn list_by_tag(
        &self,
        credentials: &SessionCredentials,
        region: &str,
        tag_key: &str,
    ) -> Result<Vec<TaggedResource>, LifecycleError>;
}
