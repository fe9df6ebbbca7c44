//! Outbound account notifications.
//!
//! The lifecycle manager hands a [`Mail`] to a [`Notifier`]; delivery is the
//! notifier's concern. [`LogNotifier`] writes mails to the log for development,
//! [`RecordingNotifier`] keeps them in memory so tests can read tokens back.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Mail templates known to the delivery layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Template {
    #[serde(rename = "email-confirmation")]
    EmailConfirmation,
    #[serde(rename = "recover-password")]
    RecoverPassword,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::EmailConfirmation => "email-confirmation",
            Template::RecoverPassword => "recover-password",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Template::EmailConfirmation => "Confirm your registration",
            Template::RecoverPassword => "Recover your password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailContext {
    pub token: String,
}

/// Payload sent to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub template: Template,
    pub context: MailContext,
}

impl Mail {
    pub fn new(template: Template, from: &str, to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            subject: template.subject().to_string(),
            template,
            context: MailContext {
                token: token.to_string(),
            },
        }
    }
}

/// Delivery failure reported by a notifier.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError>;
}

/// Logs each mail instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError> {
        info!(
            to = %mail.to,
            from = %mail.from,
            template = mail.template.name(),
            token = %mail.context.token,
            "mail dispatched"
        );
        Ok(())
    }
}

/// Keeps every mail in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Mail>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mails sent so far, oldest first.
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Token of the most recent mail to `to` using `template`.
    pub fn last_token(&self, to: &str, template: Template) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to == to && m.template == template)
            .map(|m| m.context.token)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, mail: Mail) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|e| NotifyError(e.to_string()))?
            .push(mail);
        Ok(())
    }
}
