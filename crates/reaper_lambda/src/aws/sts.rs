use aws_sdk_sts::Client;
use reaper_core::error::LifecycleError;
use reaper_core::record::ConnectedAccount;

use crate::adapters::credentials::{CredentialBroker, SessionCredentials};

use super::{block_on_sdk, classify_aws};

/// Credential broker backed by STS role assumption, using the role ARN and
/// external id captured when the account was connected.
pub struct StsCredentialBroker {
    client: Client,
}

impl StsCredentialBroker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl CredentialBroker for StsCredentialBroker {
    fn assume(
        &self,
        account: &ConnectedAccount,
        session_name: &str,
    ) -> Result<SessionCredentials, LifecycleError> {
        let client = self.client.clone();
        let role_arn = account.role_arn.clone();
        let external_id = account.external_id.clone();
        let session_name = session_name.to_string();

        block_on_sdk(async move {
            let output = client
                .assume_role()
                .role_arn(role_arn)
                .role_session_name(session_name)
                .external_id(external_id)
                .send()
                .await
                .map_err(classify_aws)?;

            let credentials = output.credentials().ok_or_else(|| {
                LifecycleError::Service("assume-role response carried no credentials".to_string())
            })?;

            Ok(SessionCredentials {
                access_key_id: credentials.access_key_id().to_string(),
                secret_access_key: credentials.secret_access_key().to_string(),
                session_token: credentials.session_token().to_string(),
            })
        })
    }
}
