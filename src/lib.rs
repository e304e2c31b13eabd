//! Pomodoro Timer Library
//!
//! This library provides the core functionality for the Pomodoro Timer CLI.
//! It includes:
//! - Timer engine with work/break cycling, auto-start and persistence
//! - Notification service with permission tracking and in-app fallback
//! - Synthesized alert tones from a fixed preset registry
//! - Key-value storage for sessions and settings
//! - CLI command parsing and display utilities
//! - Type definitions for settings and session state

pub mod cli;
pub mod notification;
pub mod sound;
pub mod storage;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    format_time, SessionRecord, SessionSnapshot, SettingUpdate, SettingsError, TimerMode,
    TimerSession, TimerSettings,
};

// Re-export timer types
pub use timer::{SessionPersistence, TimerCommand, TimerEngine, TimerEvent};

// Re-export notification types
pub use notification::{
    Delivery, DeliveryChannel, DesktopNotificationHost, MockNotificationHost, NotificationError,
    NotificationEvent, NotificationHost, NotificationRequest, NotificationService,
    PermissionState,
};

// Re-export sound types
pub use sound::{MockSoundPlayer, RodioSoundPlayer, SoundError, SoundPlayer, SoundPreset};

// Re-export storage types
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
