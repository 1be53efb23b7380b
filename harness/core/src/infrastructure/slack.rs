// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Slack Notification Adapter
//
// Anti-Corruption Layer for the Slack Web API. Notification is best-effort:
// a dead chat endpoint must never fail a polling cycle, so adapter errors
// are logged by callers and swallowed.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Network(String),

    #[error("chat endpoint rejected the call: {0}")]
    Api(String),
}

/// Outbound notification port. Run banners go to `post_message`; the
/// report files are attached at the end of a run via `upload_file`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, text: &str) -> Result<(), NotifyError>;

    async fn upload_file(&self, title: &str, content: &str) -> Result<(), NotifyError>;
}

/// Post a run banner, logging instead of failing when the endpoint is down.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.post_message(text).await {
        tracing::warn!(error = %e, "chat notification failed");
    }
}

/// Attach a finished report file to the channel, best-effort.
pub async fn upload_report_file(notifier: &dyn Notifier, path: Option<&std::path::Path>) {
    let Some(path) = path else {
        return;
    };
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not read report for upload");
            return;
        }
    };
    let title = path.display().to_string();
    if let Err(e) = notifier.upload_file(&title, &content).await {
        tracing::warn!(error = %e, "report upload failed");
    }
}

/// Notifier for runs with no bot token configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn post_message(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn upload_file(&self, _title: &str, _content: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub struct SlackNotifier {
    client: reqwest::Client,
    bot_token: String,
    channel: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,

    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(bot_token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            channel: channel.into(),
            base_url: "https://slack.com/api".to_owned(),
        }
    }

    /// Point the adapter somewhere else; tests use this.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call(&self, method: &str, form: Vec<(&str, &str)>) -> Result<(), NotifyError> {
        let url = format!("{}/{method}", self.base_url);
        debug!(%url, "slack call");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Network(format!("HTTP {}", response.status())));
        }
        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Api(format!("unreadable response: {e}")))?;
        if !body.ok {
            return Err(NotifyError::Api(
                body.error.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, text: &str) -> Result<(), NotifyError> {
        self.call(
            "chat.postMessage",
            vec![("channel", self.channel.as_str()), ("text", text)],
        )
        .await
    }

    async fn upload_file(&self, title: &str, content: &str) -> Result<(), NotifyError> {
        self.call(
            "files.upload",
            vec![
                ("channels", self.channel.as_str()),
                ("title", title),
                ("content", content),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_message_sends_channel_and_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("channel".into(), "#bot-reporting".into()),
                mockito::Matcher::UrlEncoded("text".into(), "STARTING".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let notifier =
            SlackNotifier::new("xoxb-test", "#bot-reporting").with_base_url(server.url());
        notifier.post_message("STARTING").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "invalid_auth"}"#)
            .create_async()
            .await;

        let notifier = SlackNotifier::new("bad", "#bot-reporting").with_base_url(server.url());
        let err = notifier.post_message("hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::Api(message) if message == "invalid_auth"));
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        NoopNotifier.post_message("x").await.unwrap();
        NoopNotifier.upload_file("t", "c").await.unwrap();
    }
}
