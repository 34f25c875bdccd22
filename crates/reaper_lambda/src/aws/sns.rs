use aws_sdk_sns::Client;
use reaper_core::error::LifecycleError;

use crate::adapters::notify::NotificationChannel;

use super::{block_on_sdk, classify_aws};

/// Notification channel backed by one SNS topic in the home region. Owners
/// are reached through email subscriptions on that topic.
pub struct SnsNotificationChannel {
    client: Client,
    topic_arn: String,
}

impl SnsNotificationChannel {
    pub fn new(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

impl NotificationChannel for SnsNotificationChannel {
    fn list_email_subscriptions(&self) -> Result<Vec<String>, LifecycleError> {
        let client = self.client.clone();
        let topic_arn = self.topic_arn.clone();

        block_on_sdk(async move {
            let mut endpoints = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let mut request = client
                    .list_subscriptions_by_topic()
                    .topic_arn(topic_arn.as_str());
                if let Some(token) = next_token.take() {
                    request = request.next_token(token);
                }

                let output = request.send().await.map_err(classify_aws)?;

                for subscription in output.subscriptions() {
                    if subscription.protocol() != Some("email") {
                        continue;
                    }
                    if let Some(endpoint) = subscription.endpoint() {
                        endpoints.push(endpoint.to_string());
                    }
                }

                match output.next_token() {
                    Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                    _ => break,
                }
            }
            Ok(endpoints)
        })
    }

    fn subscribe_email(&self, email: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let topic_arn = self.topic_arn.clone();
        let email = email.to_string();

        block_on_sdk(async move {
            client
                .subscribe()
                .topic_arn(topic_arn)
                .protocol("email")
                .endpoint(email)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }

    fn publish(&self, subject: &str, message: &str) -> Result<(), LifecycleError> {
        let client = self.client.clone();
        let topic_arn = self.topic_arn.clone();
        let subject = subject.to_string();
        let message = message.to_string();

        block_on_sdk(async move {
            client
                .publish()
                .topic_arn(topic_arn)
                .subject(subject)
                .message(message)
                .send()
                .await
                .map_err(classify_aws)?;
            Ok(())
        })
    }
}
