//! Outbound administrator notification.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "admin notification failed: {}", self.message)
    }
}

impl Error for NotifyError {}

/// Sends a message to the site administrators.
pub trait Notifier {
    fn notify_admins(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify_admins(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        (**self).notify_admins(subject, body)
    }
}

/// Notifier that only records the delivery in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_admins(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(
            "event=admin_notify module=consistency status=ok channel=log subject={:?} body_lines={}",
            subject,
            body.lines().count()
        );
        Ok(())
    }
}
