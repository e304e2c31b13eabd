//! Notification payloads and the events broadcast by the service.

use serde::{Deserialize, Serialize};

use super::permission::PermissionState;

/// Default icon name for desktop notifications.
pub const DEFAULT_ICON: &str = "alarm-clock";

/// Default notification tag.
pub const DEFAULT_TAG: &str = "default";

/// Optional fields of a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// A notification to display, either by the host or in-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub options: NotificationOptions,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            options: NotificationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.options.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.options.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.options.tag = Some(tag.into());
        self
    }

    pub fn body(&self) -> &str {
        self.options.body.as_deref().unwrap_or("")
    }

    pub fn icon(&self) -> &str {
        self.options.icon.as_deref().unwrap_or(DEFAULT_ICON)
    }

    pub fn tag(&self) -> &str {
        self.options.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }
}

/// Events broadcast to every subscriber of the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum NotificationEvent {
    /// A notification the UI should render inline, because the host
    /// could not (or may not) display it.
    InAppNotification(NotificationRequest),
    /// The cached permission state changed or a prompt was answered.
    NotificationPermissionChanged { permission: PermissionState },
}
