//! Alert delivery.
//!
//! The pipeline hands events to a [`NotifierHandle`], which queues them for a
//! background worker. Queueing never blocks and delivery failures are only
//! logged.

use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, instrument, warn};

use crate::{
    Config,
    error::NotifyError,
    model::AlertEvent,
    provider::{REQUEST_TIMEOUT, http_client},
};

pub const ALERT_SUBJECT: &str = "Weather Alert";

#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError>;
}

/// Writes alerts to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        warn!(city = %event.city, threshold = event.threshold, "{}", event.message);
        Ok(())
    }
}

/// Sends alert emails through an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct MailNotifier {
    client: Client,
    endpoint: String,
    api_token: String,
    sender: Option<String>,
    recipient: String,
}

impl MailNotifier {
    pub fn new(
        endpoint: &str,
        api_token: &str,
        sender: Option<String>,
        recipient: &str,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(REQUEST_TIMEOUT)?,
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
            sender,
            recipient: recipient.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    #[instrument(skip(self, event), fields(city = %event.city), level = "info")]
    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "from": self.sender,
            "to": self.recipient,
            "subject": ALERT_SUBJECT,
            "text": event.message,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(recipient = %self.recipient, "alert email sent");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status: status.as_u16(), body: text })
        }
    }
}

/// Pick the notifier the configuration asks for.
///
/// Email alerts without a `[mail]` relay fall back to logging.
pub fn notifier_from_config(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    if !config.email_alert_enabled {
        return Ok(Arc::new(LogNotifier));
    }

    match &config.mail {
        Some(mail) => Ok(Arc::new(MailNotifier::new(
            &mail.endpoint,
            &mail.api_token,
            config.resolved_email_sender(),
            &config.email_recipient,
        )?)),
        None => {
            warn!("email alerts enabled without a [mail] relay; alerts will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Cheap, cloneable sender side of the notification queue.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::UnboundedSender<AlertEvent>,
}

impl NotifierHandle {
    /// Queue an alert. Never blocks; a closed worker is logged and ignored.
    pub fn notify(&self, event: AlertEvent) {
        if let Err(e) = self.tx.send(event) {
            error!(city = %e.0.city, "notifier worker is gone, dropping alert");
        }
    }
}

/// Start the background worker delivering queued alerts through `notifier`.
///
/// The worker exits once every handle has been dropped.
pub fn spawn_notifier(notifier: Arc<dyn Notifier>) -> (NotifierHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AlertEvent>();

    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = notifier.send(&event).await {
                error!(city = %event.city, error = %e, "failed to deliver alert");
            }
        }
    });

    (NotifierHandle { tx }, task)
}
