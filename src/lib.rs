//! Duewatch: deadline notification engine for task management apps.
//!
//! The engine combines four cooperating pieces around a shared in-app
//! alert feed:
//! - **Reminder evaluation**: per-task lead-time reminders that fire at
//!   most once inside their window
//! - **Deadline scanning**: alerts for tasks due within a fixed
//!   lookahead window, deduplicated per user and calendar day
//! - **Notification ledger**: durable record backing that dedupe
//! - **Realtime channel**: server-pushed alerts injected outside the
//!   polling cycle
//!
//! plus fire-and-forget outbound email per detected deadline. Hosts
//! supply task snapshots, a local notification capability, and an email
//! transport through narrow trait seams, so the core runs the same way
//! under a desktop app, a web backend, or the bundled headless daemon.

pub mod alerts;
pub mod channel;
pub mod config;
pub mod email;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod model;
pub mod notifier;
pub mod reminder;
pub mod scanner;
pub mod source;

pub use alerts::{Alert, AlertFeed, FeedEvent, SharedAlertFeed};
pub use channel::{ChannelEvent, ChannelHandle, spawn_channel};
pub use config::NotifyConfig;
pub use email::{EmailDispatcher, HttpEmailDispatcher};
pub use engine::{EngineEvent, EngineHandle, NotificationEngine};
pub use error::{NotifyError, Result};
pub use ledger::NotificationLedger;
pub use model::{Task, TaskPriority, TaskStatus, User};
pub use notifier::{LogNotifier, NotificationPermission, Notifier};
pub use source::{InMemoryTaskSource, JsonFileTaskSource, TaskSource};
