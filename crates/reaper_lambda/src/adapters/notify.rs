use reaper_core::error::LifecycleError;
use serde_json::json;

/// Email notification channel for deletion notices, backed by one topic.
pub trait NotificationChannel {
    /// Endpoints of existing email subscriptions, confirmed or pending.
    fn list_email_subscriptions(&self) -> Result<Vec<String>, LifecycleError>;

    /// Requests a new email subscription. Confirmation happens out of band.
    fn subscribe_email(&self, email: &str) -> Result<(), LifecycleError>;

    fn publish(&self, subject: &str, message: &str) -> Result<(), LifecycleError>;
}

/// Subscribes `email` to the channel unless an email subscription with the
/// same endpoint already exists (endpoint comparison is case-insensitive).
/// Never waits for the owner to confirm.
pub fn ensure_subscription(
    channel: &dyn NotificationChannel,
    email: &str,
) -> Result<(), LifecycleError> {
    let existing = channel.list_email_subscriptions()?;
    if existing
        .iter()
        .any(|endpoint| endpoint.eq_ignore_ascii_case(email))
    {
        return Ok(());
    }

    channel.subscribe_email(email)?;
    log_notify_info("subscription_requested", json!({ "email": email }));
    Ok(())
}

fn log_notify_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "notification_gateway",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
