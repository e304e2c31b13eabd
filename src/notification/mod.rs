//! Notification and sound service.
//!
//! [`NotificationService`] is the single context object through which the
//! timer (and any other feature) reaches the host's notification and audio
//! capabilities. It:
//!
//! - Tracks the tri-state notification permission and asks for it once
//! - Plays preset tones through a [`SoundPlayer`]
//! - Displays host notifications when permitted
//! - Falls back to an in-app notification event otherwise
//!
//! Subscribers receive [`NotificationEvent`]s over a broadcast channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use pomodoro::notification::{DesktopNotificationHost, NotificationService, PermissionState};
//! use pomodoro::sound::RodioSoundPlayer;
//!
//! # async fn demo() {
//! let service = NotificationService::new(
//!     Box::new(DesktopNotificationHost::new("pomodoro", PermissionState::Default)),
//!     Box::new(RodioSoundPlayer::new()),
//! );
//! let mut events = service.subscribe();
//!
//! service.request_permission().await;
//! service.show_notification("Take medication", "2 pills", "medication", 70);
//! # }
//! ```

pub mod error;
mod events;
mod host;
mod permission;

use std::cell::{Cell, RefCell};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::sound::{SoundPlayer, ToneSpec};

pub use self::error::NotificationError;
pub use self::events::{
    NotificationEvent, NotificationOptions, NotificationRequest, DEFAULT_ICON, DEFAULT_TAG,
};
pub use self::host::{DesktopNotificationHost, NotificationHost, AUTO_DISMISS_MS};
pub use self::permission::{PermissionReply, PermissionState};

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Where a notification ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    /// Displayed by the host
    System,
    /// Broadcast as an in-app notification event
    InApp,
}

/// Result of [`NotificationService::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub channel: DeliveryChannel,
    /// `None` if no tone was requested
    pub sound_played: Option<bool>,
}

/// Process-wide notification and sound context.
///
/// Intended to be created once and shared (e.g. through `Rc`) with every
/// consumer. Access is single-threaded.
pub struct NotificationService {
    host: Box<dyn NotificationHost>,
    sound: Box<dyn SoundPlayer>,
    permission: Cell<PermissionState>,
    prompt_in_flight: Cell<bool>,
    events: broadcast::Sender<NotificationEvent>,
    last_in_app: RefCell<Option<NotificationRequest>>,
}

impl NotificationService {
    /// Creates the service, reading the host's current permission once.
    pub fn new(host: Box<dyn NotificationHost>, sound: Box<dyn SoundPlayer>) -> Self {
        let permission = if host.is_supported() {
            host.permission()
        } else {
            PermissionState::Denied
        };
        info!("Initial notification permission: {}", permission);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            host,
            sound,
            permission: Cell::new(permission),
            prompt_in_flight: Cell::new(false),
            events,
            last_in_app: RefCell::new(None),
        }
    }

    /// Subscribes to in-app notification and permission events.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    /// Returns true if the host can display notifications.
    pub fn is_supported(&self) -> bool {
        self.host.is_supported()
    }

    /// Returns the cached permission state.
    pub fn permission(&self) -> PermissionState {
        self.permission.get()
    }

    /// Asks the user for notification permission if not yet decided.
    ///
    /// Returns `Denied` without prompting when the host has no notification
    /// capability, and the current state without prompting when it is
    /// already decided. Prompt failures resolve to `Denied`.
    pub async fn request_permission(&self) -> PermissionState {
        if !self.host.is_supported() {
            debug!("Notifications not supported");
            return PermissionState::Denied;
        }

        let current = self.sync_permission();
        if current.is_decided() || self.prompt_in_flight.get() {
            return current;
        }

        self.prompt_in_flight.set(true);
        let answer = match self.host.request_permission() {
            PermissionReply::Ready(state) => state,
            PermissionReply::Deferred(reply) => reply.await.unwrap_or_else(|_| {
                warn!("Permission prompt ended without an answer");
                PermissionState::Denied
            }),
            PermissionReply::Failed(e) => {
                warn!("Error requesting notification permission: {}", e);
                PermissionState::Denied
            }
        };
        self.prompt_in_flight.set(false);

        info!("Notification permission result: {}", answer);
        self.permission.set(answer);
        self.broadcast(NotificationEvent::NotificationPermissionChanged { permission: answer });
        answer
    }

    /// Plays the preset `preset_name` (falling back to "default") at
    /// `volume` percent.
    ///
    /// Returns false if no audio is available or synthesis fails.
    pub fn play_sound(&self, preset_name: &str, volume: u32) -> bool {
        self.play_tone(&ToneSpec::new(preset_name, volume))
    }

    fn play_tone(&self, tone: &ToneSpec) -> bool {
        match self.sound.play(tone) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error playing sound '{}': {}", tone.preset.name, e);
                false
            }
        }
    }

    /// Plays `preset_name`, then shows `title`/`body` as a host notification
    /// if permitted, or as an in-app notification otherwise.
    pub fn show_notification(
        &self,
        title: &str,
        body: &str,
        preset_name: &str,
        volume: u32,
    ) -> Delivery {
        let request = NotificationRequest::new(title).with_body(body);
        self.deliver(&request, Some(ToneSpec::new(preset_name, volume)))
    }

    /// Shows `request`, playing `tone` first when given.
    ///
    /// Exactly one of {host notification, in-app event} happens per call.
    /// The tone does not depend on permission.
    pub fn deliver(&self, request: &NotificationRequest, tone: Option<ToneSpec>) -> Delivery {
        debug!("Attempting to show notification: {}", request.title);
        let sound_played = tone.map(|tone| self.play_tone(&tone));

        let permission = self.sync_permission();
        if permission == PermissionState::Granted {
            match self.host.display(request) {
                Ok(()) => {
                    return Delivery {
                        channel: DeliveryChannel::System,
                        sound_played,
                    }
                }
                Err(e) => warn!("Error showing notification: {}", e),
            }
        } else {
            debug!("Notification permission not granted: {}", permission);
        }

        self.show_in_app(request.clone());
        Delivery {
            channel: DeliveryChannel::InApp,
            sound_played,
        }
    }

    /// Broadcasts `request` as an in-app notification.
    pub fn show_in_app(&self, request: NotificationRequest) {
        *self.last_in_app.borrow_mut() = Some(request.clone());
        self.broadcast(NotificationEvent::InAppNotification(request));
    }

    /// Returns the most recent in-app notification, if any.
    pub fn last_in_app(&self) -> Option<NotificationRequest> {
        self.last_in_app.borrow().clone()
    }

    /// Re-reads the host permission, broadcasting if it changed.
    fn sync_permission(&self) -> PermissionState {
        let current = if self.host.is_supported() {
            self.host.permission()
        } else {
            PermissionState::Denied
        };
        if current != self.permission.replace(current) {
            info!("Notification permission changed: {}", current);
            self.broadcast(NotificationEvent::NotificationPermissionChanged {
                permission: current,
            });
        }
        current
    }

    fn broadcast(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("permission", &self.permission.get())
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MockNotificationHost
// ============================================================================

/// How a [`MockNotificationHost`] answers permission requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPrompt {
    /// Answer synchronously
    Ready(PermissionState),
    /// Answer through the deferred channel
    Deferred(PermissionState),
    /// Drop the deferred channel without answering
    Abandon,
    /// Fail to prompt
    Fail,
}

/// Mock notification host for testing. Share it through an `Rc`.
#[derive(Debug)]
pub struct MockNotificationHost {
    supported: Cell<bool>,
    permission: Cell<PermissionState>,
    prompt: Cell<MockPrompt>,
    prompt_count: Cell<usize>,
    should_fail: Cell<bool>,
    displayed: RefCell<Vec<NotificationRequest>>,
}

impl Default for MockNotificationHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: Cell::new(true),
            permission: Cell::new(PermissionState::Default),
            prompt: Cell::new(MockPrompt::Ready(PermissionState::Granted)),
            prompt_count: Cell::new(0),
            should_fail: Cell::new(false),
            displayed: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_permission(permission: PermissionState) -> Self {
        let host = Self::new();
        host.set_permission(permission);
        host
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.set(supported);
    }

    /// Changes the permission behind the service's back (e.g. revoked in
    /// system settings).
    pub fn set_permission(&self, permission: PermissionState) {
        self.permission.set(permission);
    }

    pub fn set_prompt(&self, prompt: MockPrompt) {
        self.prompt.set(prompt);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.set(should_fail);
    }

    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompt_count.get()
    }

    #[must_use]
    pub fn displayed(&self) -> Vec<NotificationRequest> {
        self.displayed.borrow().clone()
    }

    #[must_use]
    pub fn display_count(&self) -> usize {
        self.displayed.borrow().len()
    }
}

impl NotificationHost for MockNotificationHost {
    fn is_supported(&self) -> bool {
        self.supported.get()
    }

    fn permission(&self) -> PermissionState {
        self.permission.get()
    }

    fn request_permission(&self) -> PermissionReply {
        self.prompt_count.set(self.prompt_count.get() + 1);
        match self.prompt.get() {
            MockPrompt::Ready(state) => {
                self.permission.set(state);
                PermissionReply::Ready(state)
            }
            MockPrompt::Deferred(state) => {
                self.permission.set(state);
                let (tx, rx) = tokio::sync::oneshot::channel();
                let _ = tx.send(state);
                PermissionReply::Deferred(rx)
            }
            MockPrompt::Abandon => {
                let (_tx, rx) = tokio::sync::oneshot::channel();
                PermissionReply::Deferred(rx)
            }
            MockPrompt::Fail => {
                PermissionReply::Failed(NotificationError::PromptFailed("Mock failure".into()))
            }
        }
    }

    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        if self.should_fail.get() {
            return Err(NotificationError::DisplayFailed("Mock failure".to_string()));
        }
        self.displayed.borrow_mut().push(request.clone());
        Ok(())
    }
}
