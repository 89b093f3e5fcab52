//! The notification port and an HTTP adapter publishing to a notification gateway.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::store::SignupRecord;

/// Fire-and-forget publish of a subject and message to a topic.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<()>;
}

#[derive(Debug)]
pub struct NotifyClient {
    pub http_client: Client,
    pub url: reqwest::Url,
    pub topic: String,
    auth_token: SecretString,
}

impl NotifyClient {
    pub fn new<S: AsRef<str>>(
        url: S,
        topic: String,
        auth_token: SecretString,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let mut url =
            reqwest::Url::parse(url.as_ref()).map_err(|e| Error::UrlParsing(e.to_string()))?;
        // `Url::join` replaces the last segment unless the base path ends in a slash.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(NotifyClient {
            http_client,
            url,
            topic,
            auth_token,
        })
    }
}

#[async_trait]
impl Notifier for NotifyClient {
    #[tracing::instrument(name = "Publishing signup notification", skip(self, message))]
    async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        let url = self
            .url
            .join("publish")
            .map_err(|e| Error::UrlParsing(e.to_string()))?;

        let publish_request = PublishRequest {
            topic: &self.topic,
            subject,
            message,
        };

        let _resp = self
            .http_client
            .post(url)
            .header("X-Notify-Token", self.auth_token.expose_secret())
            .json(&publish_request)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishRequest<'a> {
    pub topic: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

/// The notification sent for every newly recorded signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupNotification {
    pub subject: String,
    pub message: String,
}

impl SignupNotification {
    pub fn new(record: &SignupRecord) -> Self {
        let subject = format!("New interest signup: {}", record.email);
        let message = format!(
            "🎉 Someone new wants in!\n\nEmail: {}\nTimestamp: {}\n\nAnother one joins the waitlist. Keep it going! 🚀",
            record.email, record.timestamp
        );

        Self { subject, message }
    }
}

// ###################################
// ->   ERROR & RESULT
// ###################################
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("url parsing error: {0}")]
    UrlParsing(String),
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}
