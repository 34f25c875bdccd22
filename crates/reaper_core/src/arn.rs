//! Best-effort decoding of canonical resource names (ARNs).
//!
//! Naming formats vary by service, so decoding never fails: anything that does
//! not match a known `service:resource` shape falls back to
//! [ResourceKind::Unknown], which is conservatively treated as live and is
//! never eligible for deletion.

use serde::{Deserialize, Serialize};

/// Resource kinds the lifecycle registry can carry capabilities for.
///
/// `Unknown` carries the raw service name from the ARN so unrecognized types
/// stay visible in tracking records instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Ec2Instance,
    EbsVolume,
    S3Bucket,
    RdsInstance,
    DynamoTable,
    LambdaFunction,
    CloudFormationStack,
    EcrRepository,
    Unknown(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ec2Instance => "ec2-instance",
            Self::EbsVolume => "ebs-volume",
            Self::S3Bucket => "s3-bucket",
            Self::RdsInstance => "rds-instance",
            Self::DynamoTable => "dynamodb-table",
            Self::LambdaFunction => "lambda-function",
            Self::CloudFormationStack => "cloudformation-stack",
            Self::EcrRepository => "ecr-repository",
            Self::Unknown(service) => service,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ec2-instance" => Self::Ec2Instance,
            "ebs-volume" => Self::EbsVolume,
            "s3-bucket" => Self::S3Bucket,
            "rds-instance" => Self::RdsInstance,
            "dynamodb-table" => Self::DynamoTable,
            "lambda-function" => Self::LambdaFunction,
            "cloudformation-stack" => Self::CloudFormationStack,
            "ecr-repository" => Self::EcrRepository,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(value: ResourceKind) -> Self {
        value.as_str().to_string()
    }
}

/// Kind and service-scoped identifier decoded from one ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    pub kind: ResourceKind,
    pub resource_id: String,
}

/// Decode an ARN into a [ResourceName].
///
/// The general shape is `arn:partition:service:region:account:resource`; the
/// resource segment may itself contain `:` (Lambda) or `/` (most others), and
/// `ec2` needs the resource prefix to tell instances from volumes.
pub fn decode_arn(arn: &str) -> ResourceName {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 6 || parts[0] != "arn" {
        return ResourceName {
            kind: ResourceKind::Unknown("unknown".to_string()),
            resource_id: fallback_identifier(arn),
        };
    }

    let service = parts[2];
    let resource = parts[5..].join(":");

    let decoded = match service {
        "ec2" => match resource.split_once('/') {
            Some(("instance", id)) => Some((ResourceKind::Ec2Instance, id)),
            Some(("volume", id)) => Some((ResourceKind::EbsVolume, id)),
            _ => None,
        },
        // Bucket ARNs have empty region/account; object ARNs append /key.
        "s3" => Some((ResourceKind::S3Bucket, first_segment(&resource, '/'))),
        "rds" => resource
            .strip_prefix("db:")
            .map(|id| (ResourceKind::RdsInstance, id)),
        "dynamodb" => resource
            .strip_prefix("table/")
            .map(|id| (ResourceKind::DynamoTable, id)),
        // Qualified function ARNs carry a trailing :version or :alias.
        "lambda" => resource
            .strip_prefix("function:")
            .map(|rest| (ResourceKind::LambdaFunction, first_segment(rest, ':'))),
        // Stack ARNs are stack/<name>/<uuid>; deletion goes by name.
        "cloudformation" => resource
            .strip_prefix("stack/")
            .map(|rest| (ResourceKind::CloudFormationStack, first_segment(rest, '/'))),
        "ecr" => resource
            .strip_prefix("repository/")
            .map(|id| (ResourceKind::EcrRepository, id)),
        _ => None,
    };

    match decoded {
        Some((kind, id)) if !id.is_empty() => ResourceName {
            kind,
            resource_id: id.to_string(),
        },
        _ => ResourceName {
            kind: ResourceKind::Unknown(service.to_string()),
            resource_id: fallback_identifier(arn),
        },
    }
}

fn first_segment(value: &str, separator: char) -> &str {
    value.split(separator).next().unwrap_or(value)
}

fn fallback_identifier(arn: &str) -> String {
    let segment = match arn.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => arn.rsplit(':').next().unwrap_or(arn),
    };
    segment.to_string()
}
