//! Diagnostic notifications.
//!
//! Non-fatal issues encountered while loading, saving or repairing a model
//! are collected as [`Notification`] items rather than being silently
//! dropped or causing hard errors. Every notification is also emitted as a
//! `tracing` event.
//!
//! After an operation the caller can inspect [`Model::notifications`].
//!
//! [`Model::notifications`]: crate::Model::notifications

use std::fmt;

/// Severity level of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// A construct in the input is not implemented and was skipped.
    NotImplemented,
    /// Construct exists but is not supported in this context.
    NotSupported,
    /// Non-fatal warning (e.g., duplicate scene name in a legacy file).
    Warning,
    /// Error that was recovered from (e.g., dangling reference repaired).
    Error,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented => write!(f, "NotImplemented"),
            Self::NotSupported => write!(f, "NotSupported"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// A single notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub message: String,
}

impl Notification {
    /// Create a new notification
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.notification_type, self.message)
    }
}

/// Collects notifications during an operation.
#[derive(Debug, Clone, Default)]
pub struct NotificationCollection {
    items: Vec<Notification>,
}

impl NotificationCollection {
    /// Create a new notification collection
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record a notification and emit it as a tracing event.
    pub fn notify(&mut self, notification_type: NotificationType, message: impl Into<String>) {
        let message = message.into();
        match notification_type {
            NotificationType::Error => tracing::warn!(kind = %notification_type, "{message}"),
            NotificationType::Warning => tracing::warn!("{message}"),
            _ => tracing::debug!(kind = %notification_type, "{message}"),
        }
        self.items.push(Notification::new(notification_type, message));
    }

    /// Append every notification of `other`.
    pub fn extend(&mut self, other: NotificationCollection) {
        self.items.extend(other.items);
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate over all entries
    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    /// Get all notifications of a specific type.
    pub fn of_type(&self, nt: NotificationType) -> Vec<&Notification> {
        self.items.iter().filter(|n| n.notification_type == nt).collect()
    }

    /// Check whether any notification of the given type exists.
    pub fn has_type(&self, nt: NotificationType) -> bool {
        self.items.iter().any(|n| n.notification_type == nt)
    }
}

impl<'a> IntoIterator for &'a NotificationCollection {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
