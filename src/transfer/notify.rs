use log::{error, info};
use strum::Display;

use super::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A user-facing message: a stable translation key plus its English text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub key: String,
    pub message: String,
}

impl Notification {
    pub fn success(key: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn error(key: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<&TransferError> for Notification {
    fn from(err: &TransferError) -> Self {
        Notification::error(err.message_key(), err.to_string())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Prints notifications to stderr and mirrors them into the log.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                info!("{}: {}", notification.key, notification.message);
                eprintln!("✅ {}", notification.message);
            }
            NotificationKind::Error => {
                error!("{}: {}", notification.key, notification.message);
                eprintln!("❌ {}", notification.message);
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::{Notification, Notifier};

    /// Keeps every notification for later assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn keys(&self) -> Vec<String> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.key.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }
}
