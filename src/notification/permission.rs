//! Notification permission state.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::error::NotificationError;

/// Tri-state notification permission, mirroring the host's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The user has not been asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }

    /// Returns true once the user has answered either way.
    pub fn is_decided(&self) -> bool {
        !matches!(self, PermissionState::Default)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(PermissionState::Default),
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            other => Err(format!("unknown permission state: {other}")),
        }
    }
}

/// A host's answer to a permission request.
///
/// Hosts that can answer synchronously return `Ready`; hosts that answer
/// later through a callback hand back the receiving end of a channel. A
/// dropped sender counts as `Denied`.
#[derive(Debug)]
pub enum PermissionReply {
    Ready(PermissionState),
    Deferred(oneshot::Receiver<PermissionState>),
    Failed(NotificationError),
}
