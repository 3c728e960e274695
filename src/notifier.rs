//! Local notification capability.
//!
//! The engine never talks to an OS notification service directly; hosts
//! supply an implementation of [`Notifier`]. Permission is requested
//! once at engine start and checked before every fire, so a denied host
//! silently degrades to in-app alerts only.

use tracing::info;

/// Host permission state for local notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not yet requested from the host.
    Undetermined,
    /// The host allows local notifications.
    Granted,
    /// The host refused local notifications.
    Denied,
}

/// Capability for raising local (OS-level) notifications.
pub trait Notifier: Send + Sync {
    /// Ask the host for permission. Called once at engine start.
    fn request_permission(&self);

    /// Current permission state.
    fn permission(&self) -> NotificationPermission;

    /// Raise a local notification. Callers check [`Notifier::permission`]
    /// first; implementations may assume permission was granted.
    fn notify(&self, title: &str, body: &str);
}

/// Notifier that writes notifications to the log. Used by headless hosts
/// that have no notification service of their own.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log-backed notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn request_permission(&self) {}

    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        info!(target: "duewatch::notify", "{title}: {body}");
    }
}

/// Notifier whose permission is always denied. Useful for hosts that
/// want in-app alerts only, and for tests.
#[derive(Debug, Default)]
pub struct DeniedNotifier;

impl DeniedNotifier {
    /// Create a permission-denied notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DeniedNotifier {
    fn request_permission(&self) {}

    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn notify(&self, _title: &str, _body: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_is_granted() {
        let notifier = LogNotifier::new();
        assert_eq!(notifier.permission(), NotificationPermission::Granted);
    }

    #[test]
    fn denied_notifier_is_denied() {
        let notifier = DeniedNotifier::new();
        assert_eq!(notifier.permission(), NotificationPermission::Denied);
    }
}
