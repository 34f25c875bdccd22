//! AWS SDK implementations of the collaborator traits.
//!
//! Control-plane state (account directory, tracking table, notification
//! topic) lives in the home region under the runtime's own credentials.
//! Member-account clients are built per unit of work from delegated session
//! credentials and discarded with it.

pub mod dynamo;
pub mod services;
pub mod sns;
pub mod sts;
pub mod tagging;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::config::Credentials;
use aws_sdk_sts::error::ProvideErrorMetadata;
use reaper_core::error::{classify_sdk_error, LifecycleError};

use crate::adapters::credentials::SessionCredentials;

/// Bridges the SDK's async calls into the synchronous adapter traits. Needs
/// the multi-thread runtime flavor, which both lambda binaries configure.
pub(crate) fn block_on_sdk<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// SDK config for the home region under the runtime's own credentials.
pub async fn home_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// SDK config bound to one delegated session in one member-account region.
pub(crate) fn delegated_config(credentials: &SessionCredentials, region: &str) -> SdkConfig {
    let provider = Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        Some(credentials.session_token.clone()),
        None,
        "delegated-session",
    );
    block_on_sdk(
        aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(Region::new(region.to_string()))
            .load(),
    )
}

/// Classifies an SDK error into the lifecycle taxonomy by its error code,
/// falling back to the rendered error when the service sent no message.
pub(crate) fn classify_aws<E>(error: E) -> LifecycleError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    classify_sdk_error(error.code(), Some(message.as_str()))
}
