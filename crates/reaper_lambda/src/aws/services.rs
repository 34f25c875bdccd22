//! Per-service liveness and deletion routines.
//!
//! [AwsRegistryProvider] builds one registry per account-region unit of work;
//! every client inside it is bound to that delegated session. Liveness treats
//! a confirmed-missing resource as not live and leaves every other failure an
//! error, so the scanner can tell "gone" from "could not check".

use aws_sdk_dynamodb::types::TableStatus;
use aws_sdk_ec2::types::{InstanceStateName, VolumeState};
use reaper_core::arn::ResourceKind;
use reaper_core::error::LifecycleError;

use crate::adapters::credentials::SessionCredentials;
use crate::adapters::services::{LifecycleRegistry, RegistryProvider, ServiceLifecycle};

use super::{block_on_sdk, classify_aws, delegated_config};

/// Registry provider over the real AWS service clients.
pub struct AwsRegistryProvider;

impl RegistryProvider for AwsRegistryProvider {
    fn open_region(&self, credentials: &SessionCredentials, region: &str) -> LifecycleRegistry {
        let config = delegated_config(credentials, region);
        let ec2 = aws_sdk_ec2::Client::new(&config);

        let mut registry = LifecycleRegistry::new();
        registry.register(
            ResourceKind::Ec2Instance,
            Box::new(Ec2InstanceLifecycle {
                client: ec2.clone(),
            }),
        );
        registry.register(ResourceKind::EbsVolume, Box::new(EbsVolumeLifecycle { client: ec2 }));
        registry.register(
            ResourceKind::S3Bucket,
            Box::new(S3BucketLifecycle {
                client: aws_sdk_s3::Client::new(&config),
            }),
        );
        registry.register(
            ResourceKind::RdsInstance,
            Box::new(RdsInstanceLifecycle {
                client: aws_sdk_rds::Client::new(&config),
            }),
        );
        registry.register(
            ResourceKind::DynamoTable,
            Box::new(DynamoTableLifecycle {
                client: aws_sdk_dynamodb::Client::new(&config),
            }),
        );
        registry.register(
            ResourceKind::LambdaFunction,
            Box::new(LambdaFunctionLifecycle {
                client: aws_sdk_lambda::Client::new(&config),
            }),
        );
        registry.register(
            ResourceKind::CloudFormationStack,
            Box::new(CloudFormationStackLifecycle {
                client: aws_sdk_cloudformation::Client::new(&config),
            }),
        );
        registry.register(
            ResourceKind::EcrRepository,
            Box::new(EcrRepositoryLifecycle {
                client: aws_sdk_ecr::Client::new(&config),
            }),
        );
        registry
    }
}

/// Maps a confirmed-missing resource to `Ok(false)`; other errors stay as is.
fn live_unless_missing(result: Result<bool, LifecycleError>) -> Result<bool, LifecycleError> {
    match result {
        Err(error) if error.is_not_found() => Ok(false),
        other => other,
    }
}

struct Ec2InstanceLifecycle {
    client: aws_sdk_ec2::Client,
}

impl ServiceLifecycle for Ec2InstanceLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let instance_id = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            let output = client
                .describe_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .map_err(classify_aws)?;
            let state = output
                .reservations()
                .first()
                .and_then(|reservation| reservation.instances().first())
                .and_then(|instance| instance.state())
                .and_then(|state| state.name());
            Ok(matches!(state, Some(InstanceStateName::Running | InstanceStateName::Pending)))
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let instance_id = resource_id.to_string();
        block_on_sdk(async move {
            client
                .terminate_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct EbsVolumeLifecycle {
    client: aws_sdk_ec2::Client,
}

impl ServiceLifecycle for EbsVolumeLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let volume_id = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            let output = client
                .describe_volumes()
                .volume_ids(volume_id)
                .send()
                .await
                .map_err(classify_aws)?;
            let live = output
                .volumes()
                .first()
                .and_then(|volume| volume.state())
                .map(|state| !matches!(state, VolumeState::Deleting | VolumeState::Deleted))
                .unwrap_or(false);
            Ok(live)
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let volume_id = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_volume()
                .volume_id(volume_id)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct S3BucketLifecycle {
    client: aws_sdk_s3::Client,
}

impl ServiceLifecycle for S3BucketLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let bucket = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(true)
        }))
    }

    /// Buckets must be empty before deletion, so every object version the
    /// plain listing sees is removed first.
    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let bucket = resource_id.to_string();
        block_on_sdk(async move {
            let mut continuation_token: Option<String> = None;
            loop {
                let mut request = client.list_objects_v2().bucket(bucket.as_str());
                if let Some(token) = continuation_token.take() {
                    request = request.continuation_token(token);
                }

                let output = request.send().await.map_err(classify_aws)?;

                for object in output.contents() {
                    let Some(key) = object.key() else {
                        continue;
                    };
                    client
                        .delete_object()
                        .bucket(bucket.as_str())
                        .key(key)
                        .send()
                        .await
                        .map_err(classify_aws)?;
                }

                if output.is_truncated() == Some(true) {
                    continuation_token =
                        output.next_continuation_token().map(|token| token.to_string());
                } else {
                    break;
                }
            }

            client
                .delete_bucket()
                .bucket(bucket.as_str())
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct RdsInstanceLifecycle {
    client: aws_sdk_rds::Client,
}

impl ServiceLifecycle for RdsInstanceLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let instance_id = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            let output = client
                .describe_db_instances()
                .db_instance_identifier(instance_id)
                .send()
                .await
                .map_err(classify_aws)?;
            let live = output
                .db_instances()
                .first()
                .and_then(|instance| instance.db_instance_status())
                .map(|status| status != "deleting" && status != "deleted")
                .unwrap_or(false);
            Ok(live)
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let instance_id = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_db_instance()
                .db_instance_identifier(instance_id)
                .skip_final_snapshot(true)
                .delete_automated_backups(true)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct DynamoTableLifecycle {
    client: aws_sdk_dynamodb::Client,
}

impl ServiceLifecycle for DynamoTableLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let table = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            let output = client
                .describe_table()
                .table_name(table)
                .send()
                .await
                .map_err(classify_aws)?;
            let live = output
                .table()
                .and_then(|table| table.table_status())
                .map(|status| matches!(status, TableStatus::Active))
                .unwrap_or(false);
            Ok(live)
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let table = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_table()
                .table_name(table)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct LambdaFunctionLifecycle {
    client: aws_sdk_lambda::Client,
}

impl ServiceLifecycle for LambdaFunctionLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let function_name = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            client
                .get_function()
                .function_name(function_name)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(true)
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let function_name = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_function()
                .function_name(function_name)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct CloudFormationStackLifecycle {
    client: aws_sdk_cloudformation::Client,
}

impl ServiceLifecycle for CloudFormationStackLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let stack_name = resource_id.to_string();
        let result = block_on_sdk(async move {
            let output = client
                .describe_stacks()
                .stack_name(stack_name)
                .send()
                .await
                .map_err(classify_aws)?;
            let live = output
                .stacks()
                .first()
                .map(|stack| !stack.stack_status().as_str().starts_with("DELETE_"))
                .unwrap_or(false);
            Ok(live)
        });
        // A missing stack surfaces as a ValidationError, not a typed
        // not-found code.
        match result {
            Err(LifecycleError::Service(message)) if message.contains("does not exist") => {
                Ok(false)
            }
            other => live_unless_missing(other),
        }
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let stack_name = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_stack()
                .stack_name(stack_name)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}

struct EcrRepositoryLifecycle {
    client: aws_sdk_ecr::Client,
}

impl ServiceLifecycle for EcrRepositoryLifecycle {
    fn check_live(&self, resource_id: &str) -> Result<bool, LifecycleError> {
        let client = self.client.clone();
        let repository = resource_id.to_string();
        live_unless_missing(block_on_sdk(async move {
            let output = client
                .describe_repositories()
                .repository_names(repository)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(!output.repositories().is_empty())
        }))
    }

    fn delete(&self, resource_id: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let repository = resource_id.to_string();
        block_on_sdk(async move {
            client
                .delete_repository()
                .repository_name(repository)
                .force(true)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}
