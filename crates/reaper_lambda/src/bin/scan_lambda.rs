use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use reaper_lambda::aws::dynamo::{DynamoAccountDirectory, DynamoTrackingStore};
use reaper_lambda::aws::home_config;
use reaper_lambda::aws::services::AwsRegistryProvider;
use reaper_lambda::aws::sts::StsCredentialBroker;
use reaper_lambda::aws::tagging::TaggingApiLister;
use reaper_lambda::handlers::scan::{handle_scan_event, ScanDependencies};
use reaper_lambda::handlers::ApiGatewayResponse;
use reaper_lambda::settings::Settings;
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let settings = Settings::from_env();
    let config = home_config(&settings.home_region).await;

    let directory = DynamoAccountDirectory::new(
        aws_sdk_dynamodb::Client::new(&config),
        settings.accounts_table,
    );
    let tracking = DynamoTrackingStore::new(
        aws_sdk_dynamodb::Client::new(&config),
        settings.tracking_table,
    );
    let broker = StsCredentialBroker::new(aws_sdk_sts::Client::new(&config));
    let tags = TaggingApiLister;
    let registries = AwsRegistryProvider;

    let deps = ScanDependencies {
        directory: &directory,
        broker: &broker,
        tags: &tags,
        registries: &registries,
        tracking: &tracking,
    };

    Ok(handle_scan_event(
        event.payload,
        &deps,
        &settings.target_regions,
        &settings.lifecycle_tag_key,
        Utc::now(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
