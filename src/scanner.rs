//! Deadline window scanning.
//!
//! One pass per engine tick over the current task snapshot: every
//! non-Done task due within the lookahead window that has not yet
//! alerted today produces exactly one in-app alert, one ledger entry,
//! one local notification (when permitted), and one unawaited email
//! dispatch.

use crate::alerts::{Alert, SharedAlertFeed};
use crate::email::EmailDispatcher;
use crate::ledger::NotificationLedger;
use crate::model::{Task, TaskStatus, User};
use crate::notifier::{NotificationPermission, Notifier};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one deadline scan pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Alerts raised this pass, in feed order.
    pub raised: Vec<Alert>,
    /// Tasks skipped because today's ledger already held them.
    pub deduped: usize,
}

/// Scans the task snapshot for deadlines inside the lookahead window.
pub struct DeadlineScanner {
    lookahead_days: i64,
    email: Option<Arc<dyn EmailDispatcher>>,
}

impl DeadlineScanner {
    /// Create a scanner with the given lookahead window in calendar days.
    #[must_use]
    pub fn new(lookahead_days: i64) -> Self {
        Self {
            lookahead_days,
            email: None,
        }
    }

    /// Attach an email dispatcher invoked once per newly detected
    /// deadline.
    #[must_use]
    pub fn with_email(mut self, dispatcher: Arc<dyn EmailDispatcher>) -> Self {
        self.email = Some(dispatcher);
        self
    }

    /// Run one scan over the snapshot at `today`.
    ///
    /// The in-app alert, ledger record, and local notification complete
    /// before any email future is polled; email failures are logged and
    /// never block other tasks or the ledger write.
    pub fn scan(
        &self,
        tasks: &[Task],
        user: &User,
        today: NaiveDate,
        ledger: &mut NotificationLedger,
        feed: &SharedAlertFeed,
        notifier: &dyn Notifier,
    ) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        let mut notified_ids = Vec::new();

        for task in tasks {
            if task.status == TaskStatus::Done {
                continue;
            }
            let days = task.days_until_due(today);
            if days < 0 || days > self.lookahead_days {
                continue;
            }
            if ledger.contains(&user.id, today, &task.id) {
                outcome.deduped += 1;
                continue;
            }

            let message = deadline_message(task, days);
            let alert = Alert {
                message: message.clone(),
                task_id: Some(task.id.clone()),
                task_title: Some(task.title.clone()),
            };

            {
                let mut feed = feed.lock().unwrap_or_else(|e| e.into_inner());
                feed.append(alert.clone());
            }
            if notifier.permission() == NotificationPermission::Granted {
                notifier.notify("Upcoming Deadline", &message);
            }

            debug!(task_id = %task.id, days, "deadline alert raised");
            notified_ids.push(task.id.clone());
            outcome.raised.push(alert);
        }

        if !notified_ids.is_empty() {
            if let Err(e) = ledger.add_all(&user.id, today, notified_ids) {
                warn!("cannot persist notification ledger: {e}");
            }
            self.dispatch_emails(&outcome.raised, user);
        }

        outcome
    }

    /// Fire one email per raised alert without awaiting completion.
    fn dispatch_emails(&self, raised: &[Alert], user: &User) {
        let Some(dispatcher) = &self.email else {
            return;
        };
        if user.email.trim().is_empty() {
            debug!("user has no email address, skipping deadline emails");
            return;
        }

        for alert in raised {
            let dispatcher = Arc::clone(dispatcher);
            let to = user.email.clone();
            let title = alert.task_title.clone().unwrap_or_default();
            let subject = format!("Upcoming deadline: {title}");
            let body = format!("<p>{}</p>", alert.message);
            let task_id = alert.task_id.clone().unwrap_or_default();
            tokio::spawn(async move {
                if let Err(e) = dispatcher.send(&to, &subject, &body, &title).await {
                    warn!("deadline email for task '{task_id}' failed: {e}");
                }
            });
        }
    }
}

/// Phrase describing how far away a deadline is.
fn day_phrase(days: i64) -> String {
    match days {
        0 => "today".to_owned(),
        1 => "in 1 day".to_owned(),
        n => format!("in {n} days"),
    }
}

/// Message shown for an upcoming deadline.
fn deadline_message(task: &Task, days: i64) -> String {
    format!(
        "Upcoming Deadline: \"{}\" is due on {} ({}).",
        task.title,
        task.due_date.format("%b %-d"),
        day_phrase(days)
    )
}
