//! Admin notification delivery.
//!
//! With a webhook configured, notices are POSTed as JSON. Otherwise they are
//! only written to the log.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::application::collaborators::{CollaboratorError, Notifier};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookNotice<'a> {
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct WebhookNotifier {
    endpoint: Url,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|err| CollaboratorError::Notify(err.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&WebhookNotice {
                recipient,
                subject,
                body,
            })
            .send()
            .await
            .map_err(|err| CollaboratorError::Notify(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Notify(format!(
                "webhook answered with status {status}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), CollaboratorError> {
        info!(
            target: "plaqueboard::notifier",
            recipient,
            subject,
            body,
            "Admin notice"
        );
        Ok(())
    }
}
