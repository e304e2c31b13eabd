//! Notification system error types.
//!
//! This module defines the error types for the notification system. The
//! service never returns them to its callers; they are logged and turned
//! into the in-app fallback or a `Denied` permission.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The host has no notification capability.
    #[error("notifications are not supported on this host")]
    NotSupported,

    /// Notification permission was denied by the user.
    #[error("notification permission denied")]
    PermissionDenied,

    /// Asking the user for permission failed.
    #[error("failed to request notification permission: {0}")]
    PromptFailed(String),

    /// The host refused or failed to display a notification.
    #[error("failed to display notification: {0}")]
    DisplayFailed(String),
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::PromptFailed(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NotSupported => "in-app notifications will be used instead",
            Self::PermissionDenied | Self::PromptFailed(_) => {
                "allow notifications with `pomodoro notify --request-permission`"
            }
            Self::DisplayFailed(_) => "check that a notification daemon is running",
        }
    }
}
