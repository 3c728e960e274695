//! Lead-time reminder evaluation.
//!
//! A task with a reminder lead time fires a single local notification
//! when the current time enters the window between
//! `due_moment - lead_minutes` and `due_moment`. Ticks that miss the
//! window entirely do not backfill the reminder.

use crate::model::{Task, TaskStatus};
use crate::notifier::{NotificationPermission, Notifier};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use tracing::debug;

/// A reminder that fired during an evaluation pass.
#[derive(Debug, Clone)]
pub struct FiredReminder {
    /// Id of the task that reminded.
    pub task_id: String,
    /// Title of the task that reminded.
    pub title: String,
    /// The instant the task is due.
    pub due_at: NaiveDateTime,
}

/// Evaluates per-task lead-time reminders.
///
/// The evaluator owns the at-most-once guard: a sent key (task id plus
/// due date) is recorded when a reminder fires and re-applied to every
/// fresh task snapshot, so a reminder never fires twice for the same due
/// date even though the task collection is reloaded each tick. A changed
/// due date produces a new key, letting a rescheduled task remind again.
pub struct ReminderEvaluator {
    default_due_time: NaiveTime,
    sent: HashSet<String>,
}

fn sent_key(task: &Task) -> String {
    format!("{}:{}", task.id, task.due_date)
}

impl ReminderEvaluator {
    /// Create an evaluator assuming `default_due_time` for tasks without
    /// an explicit due time.
    #[must_use]
    pub fn new(default_due_time: NaiveTime) -> Self {
        Self {
            default_due_time,
            sent: HashSet::new(),
        }
    }

    /// Re-apply previously fired reminders to a fresh snapshot.
    pub fn apply_sent_flags(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            if self.sent.contains(&sent_key(task)) {
                task.reminder_sent = true;
            }
        }
    }

    /// Run one reminder pass at `now`. Fired tasks get their
    /// `reminder_sent` flag set and a local notification (when
    /// permitted). Returns the reminders that fired.
    pub fn evaluate(
        &mut self,
        tasks: &mut [Task],
        now: NaiveDateTime,
        notifier: &dyn Notifier,
    ) -> Vec<FiredReminder> {
        let mut fired = Vec::new();

        for task in tasks.iter_mut() {
            let Some(lead_minutes) = task.reminder_lead_minutes else {
                continue;
            };
            if lead_minutes == 0 || task.reminder_sent || task.status == TaskStatus::Done {
                continue;
            }

            let due_moment = task.due_moment(self.default_due_time);
            let reminder_moment = due_moment - Duration::minutes(i64::from(lead_minutes));
            if now < reminder_moment || now >= due_moment {
                continue;
            }

            if notifier.permission() == NotificationPermission::Granted {
                notifier.notify(
                    &task.title,
                    &format!("Due at {}", due_moment.format("%H:%M")),
                );
            }
            task.reminder_sent = true;
            self.sent.insert(sent_key(task));
            debug!(task_id = %task.id, "reminder fired");
            fired.push(FiredReminder {
                task_id: task.id.clone(),
                title: task.title.clone(),
                due_at: due_moment,
            });
        }

        fired
    }
}
