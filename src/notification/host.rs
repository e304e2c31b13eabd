//! Host notification capability.
//!
//! [`NotificationHost`] is the seam between the notification service and
//! the platform. [`DesktopNotificationHost`] shows notifications through
//! `notify-rust` and asks for permission on the terminal.

use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;

use notify_rust::{Notification, Timeout};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::NotificationError;
use super::events::NotificationRequest;
use super::permission::{PermissionReply, PermissionState};

/// Milliseconds before a displayed notification is dismissed.
pub const AUTO_DISMISS_MS: u32 = 5_000;

/// Platform notification capability.
pub trait NotificationHost {
    /// Returns true if the host can display notifications at all.
    fn is_supported(&self) -> bool;

    /// Returns the host's current permission value.
    fn permission(&self) -> PermissionState;

    /// Asks the user for permission. Called only while the permission is
    /// `Default`.
    fn request_permission(&self) -> PermissionReply;

    /// Displays a notification that dismisses itself after
    /// [`AUTO_DISMISS_MS`] and closes when clicked.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::DisplayFailed` if the host rejects it.
    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}

impl<T: NotificationHost + ?Sized> NotificationHost for Rc<T> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn permission(&self) -> PermissionState {
        (**self).permission()
    }

    fn request_permission(&self) -> PermissionReply {
        (**self).request_permission()
    }

    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        (**self).display(request)
    }
}

// ============================================================================
// DesktopNotificationHost
// ============================================================================

/// Desktop notifications via the platform notification server.
#[derive(Debug, Clone)]
pub struct DesktopNotificationHost {
    app_name: String,
    permission: Arc<Mutex<PermissionState>>,
}

impl DesktopNotificationHost {
    /// Creates a host with a previously stored permission decision.
    pub fn new(app_name: impl Into<String>, permission: PermissionState) -> Self {
        Self {
            app_name: app_name.into(),
            permission: Arc::new(Mutex::new(permission)),
        }
    }

    fn store_permission(slot: &Mutex<PermissionState>, state: PermissionState) {
        let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = state;
    }
}

impl NotificationHost for DesktopNotificationHost {
    fn is_supported(&self) -> bool {
        cfg!(any(unix, windows))
    }

    fn permission(&self) -> PermissionState {
        *self
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn request_permission(&self) -> PermissionReply {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::clone(&self.permission);
        let app_name = self.app_name.clone();

        // Blocking stdin read; the caller awaits the channel instead.
        let spawned = thread::Builder::new()
            .name("notification-permission-prompt".into())
            .spawn(move || match prompt_on_terminal(&app_name) {
                Ok(state) => {
                    Self::store_permission(&slot, state);
                    let _ = tx.send(state);
                }
                Err(e) => {
                    warn!("Permission prompt failed: {}", e);
                }
            });

        match spawned {
            Ok(_) => PermissionReply::Deferred(rx),
            Err(e) => PermissionReply::Failed(NotificationError::PromptFailed(e.to_string())),
        }
    }

    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&request.title)
            .body(request.body())
            .icon(request.icon())
            .timeout(Timeout::Milliseconds(AUTO_DISMISS_MS));

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.action("default", "Open");

        let shown = notification
            .show()
            .map_err(|e| NotificationError::DisplayFailed(e.to_string()))?;
        debug!("Desktop notification shown: {} [{}]", request.title, request.tag());

        #[cfg(all(unix, not(target_os = "macos")))]
        watch_for_click(shown, request.tag().to_string());
        #[cfg(not(all(unix, not(target_os = "macos"))))]
        let _ = shown;

        Ok(())
    }
}

/// Asks on the terminal; end of input counts as a refusal.
fn prompt_on_terminal(app_name: &str) -> io::Result<PermissionState> {
    let mut stderr = io::stderr();
    write!(stderr, "Allow {app_name} to show desktop notifications? [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    let read = io::stdin().lock().read_line(&mut answer)?;
    if read == 0 {
        return Ok(PermissionState::Denied);
    }
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> PermissionState {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => PermissionState::Granted,
        _ => PermissionState::Denied,
    }
}

/// Waits for the user to click the notification. The server closes it on
/// activation; there is no window to raise from a terminal session.
#[cfg(all(unix, not(target_os = "macos")))]
fn watch_for_click(handle: notify_rust::NotificationHandle, tag: String) {
    let spawned = thread::Builder::new()
        .name("notification-click".into())
        .spawn(move || {
            handle.wait_for_action(|action| match action {
                "default" => debug!("Notification [{}] clicked", tag),
                "__closed" => debug!("Notification [{}] closed", tag),
                other => debug!("Notification [{}] action: {}", tag, other),
            });
        });
    if let Err(e) = spawned {
        warn!("Could not watch notification clicks: {}", e);
    }
}
