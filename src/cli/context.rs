//! Shared services for CLI commands.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::notification::{DesktopNotificationHost, NotificationService, PermissionState};
use crate::sound::RodioSoundPlayer;
use crate::storage::{FileStore, KeyValueStore, PERMISSION_KEY};
use crate::timer::SessionPersistence;

/// Application name shown on desktop notifications.
pub const APP_NAME: &str = "Pomodoro";

/// Store and notification service shared by every command.
pub struct AppContext {
    pub store: Rc<dyn KeyValueStore>,
    pub notifier: Rc<NotificationService>,
}

impl AppContext {
    /// Opens the store under `data_dir` (or the platform default) and
    /// creates the desktop notification service.
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let store = match data_dir {
            Some(dir) => FileStore::new(dir),
            None => FileStore::in_default_location()
                .context("could not determine where to store timer data")?,
        };
        debug!("Data directory: {}", store.dir().display());
        Ok(Self::with_store(Rc::new(store)))
    }

    /// Creates the desktop notification service on top of `store`.
    pub fn with_store(store: Rc<dyn KeyValueStore>) -> Self {
        let permission = load_permission(store.as_ref());
        let host = DesktopNotificationHost::new(APP_NAME, permission);
        let notifier = NotificationService::new(Box::new(host), Box::new(RodioSoundPlayer::new()));
        Self {
            store,
            notifier: Rc::new(notifier),
        }
    }

    pub fn persistence(&self) -> SessionPersistence {
        SessionPersistence::new(Rc::clone(&self.store))
    }

    /// Prompts for permission if undecided and remembers the answer.
    pub async fn ensure_permission(&self) -> PermissionState {
        let before = self.notifier.permission();
        let after = self.notifier.request_permission().await;
        if after != before {
            save_permission(self.store.as_ref(), after);
        }
        after
    }
}

/// Reads the remembered permission answer; anything unreadable is `Default`.
pub fn load_permission(store: &dyn KeyValueStore) -> PermissionState {
    match store.get(PERMISSION_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring stored permission: {}", e);
            PermissionState::Default
        }),
        Ok(None) => PermissionState::Default,
        Err(e) => {
            warn!("Could not read stored permission: {}", e);
            PermissionState::Default
        }
    }
}

/// Remembers a permission answer. Failures are logged.
pub fn save_permission(store: &dyn KeyValueStore, permission: PermissionState) {
    let result = serde_json::to_string(&permission)
        .map_err(anyhow::Error::from)
        .and_then(|json| store.set(PERMISSION_KEY, &json).map_err(anyhow::Error::from));
    if let Err(e) = result {
        warn!("Could not save notification permission: {}", e);
    }
}
