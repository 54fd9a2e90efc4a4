//! Outbound notification delivery.
//!
//! Services never talk to SMTP directly. They hand an [`OutgoingEmail`] to the
//! [`Notifier`] held in `AppState`, which reports delivery as a plain `bool`.
//! Failures are logged by the implementation and never surface as errors.
//!
//! - [`SmtpNotifier`]: lettre-backed delivery
//! - [`NoopNotifier`]: used when SMTP is disabled
//! - [`RecordingNotifier`]: captures messages in tests

pub mod dispatch;
mod smtp;

use std::fmt::Debug;

use async_trait::async_trait;

pub use dispatch::{DispatchReport, dispatch_all, dispatch_notification};
pub use smtp::SmtpNotifier;

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            html: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Attempts delivery. Returns whether the message was handed off.
    async fn send(&self, email: &OutgoingEmail) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        tracing::debug!(to = %email.to, subject = %email.subject, "Email delivery disabled");
        false
    }
}

/// Keeps every message it is asked to send.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries all fail, after recording the attempt.
    pub fn failing() -> Self {
        Self {
            sent: Default::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        !self.fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_notifier_keeps_messages() {
        let notifier = RecordingNotifier::new();
        let email = OutgoingEmail::new("parent@example.com", "Hello", "Body").with_html("<p>Body</p>");
        assert!(notifier.send(&email).await);
        assert_eq!(notifier.sent(), vec![email]);
    }

    #[tokio::test]
    async fn test_failing_notifier_still_records() {
        let notifier = RecordingNotifier::failing();
        let email = OutgoingEmail::new("parent@example.com", "Hello", "Body");
        assert!(!notifier.send(&email).await);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_noop_reports_not_delivered() {
        let email = OutgoingEmail::new("a@example.com", "s", "t");
        assert!(!NoopNotifier.send(&email).await);
    }
}
