//! Failure notifications.
//!
//! Notifications are fire-and-forget: a notifier never fails the conversion
//! that triggered it. Delivery problems are logged and counted.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::{NotifierConfig, NotifierKind};
use crate::emit;
use crate::metrics::events::NotificationFailed;

/// Best-effort alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, subject: &str, _body: &str) {
        debug!(subject, "Notification dropped");
    }
}

/// Writes notifications to the error log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        error!(subject, body, "Conversion failure notification");
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

/// POSTs notifications as JSON `{"subject": .., "body": ..}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn send(&self, payload: &WebhookPayload<'_>) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        match self.send(&WebhookPayload { subject, body }).await {
            Ok(()) => debug!(subject, "Notification delivered"),
            Err(e) => {
                warn!(error = %e, subject, "Failed to deliver notification, continuing");
                emit!(NotificationFailed);
            }
        }
    }
}

/// Build the notifier selected by configuration.
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, reqwest::Error> {
    let notifier: Arc<dyn Notifier> = match (config.kind, &config.url) {
        (NotifierKind::None, _) => Arc::new(NoopNotifier),
        (NotifierKind::Log, _) => Arc::new(LogNotifier),
        (NotifierKind::Webhook, Some(url)) => Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?),
        // Rejected by config validation.
        (NotifierKind::Webhook, None) => Arc::new(LogNotifier),
    };
    Ok(notifier)
}

/// Subject line for a failure in `bucket`.
///
/// Prefixed with the environment named by the bucket's second `-`-separated
/// token, upper-cased: `lake-dev-data` gives `DEV: <subject>`.
pub fn failure_subject(bucket: &str, subject: &str) -> String {
    match bucket.split('-').nth(1).filter(|env| !env.is_empty()) {
        Some(env) => format!("{}: {subject}", env.to_uppercase()),
        None => subject.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_subject_env_prefix() {
        let subject = "Data Processing Error(Bronze-Silver)";
        assert_eq!(
            failure_subject("datalake-prod-raw", subject),
            "PROD: Data Processing Error(Bronze-Silver)"
        );
        assert_eq!(failure_subject("lake-dev", subject), format!("DEV: {subject}"));
        assert_eq!(failure_subject("lake", subject), subject);
        assert_eq!(failure_subject("lake--x", subject), subject);
    }

    #[test]
    fn test_from_config_kinds() {
        let mut config = NotifierConfig::default();
        assert!(from_config(&config).is_ok());

        config.kind = NotifierKind::Webhook;
        config.url = Some("http://127.0.0.1:9/hook".to_string());
        assert!(from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_propagate() {
        // Port 9 (discard) is not listening on test hosts.
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(200)).unwrap();

        notifier.notify("DEV: failure", "body").await;
    }

    #[tokio::test]
    async fn test_log_and_noop_notifiers() {
        LogNotifier.notify("s", "b").await;
        NoopNotifier.notify("s", "b").await;
    }
}
