//! Outcome notification.
//!
//! The scheduler reports job outcomes through the [`Notifier`] trait.
//! Notification is fire-and-log-on-error: a failed send never fails the job
//! run that produced it.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification transport failed.
    #[error("notification send failed: {0}")]
    Send(String),

    /// The remote endpoint rejected the message.
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Outbound channel for outcome notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message. Errors are reported to the caller, which logs them
    /// and moves on.
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes messages to the log instead of an external channel.
///
/// Used when no notification credentials are configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!(%message, "notification");
        Ok(())
    }
}
