//! Task and user models consumed by the notification core.
//!
//! Tasks and users are owned by the external persistence layer; the
//! engine only holds read-mostly snapshots of them, refreshed on every
//! tick through a [`crate::source::TaskSource`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet begun.
    #[default]
    NotStarted,
    /// Actively being worked on.
    InProgress,
    /// Awaiting review.
    Review,
    /// Finished. Done tasks never remind or alert.
    Done,
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A task as seen by the notification core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Parent project, if the task belongs to one.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Human-readable title.
    pub title: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow state.
    #[serde(default)]
    pub status: TaskStatus,
    /// Priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Calendar date the task is due.
    pub due_date: NaiveDate,
    /// Clock time the task is due, when one was set.
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    /// Minutes before the due moment at which the standard reminder
    /// fires. `None` (or zero) means no reminder is configured.
    #[serde(default)]
    pub reminder_lead_minutes: Option<u32>,
    /// At-most-once guard for the standard reminder. Once true for a
    /// given due date, the evaluator never resets it.
    #[serde(default)]
    pub reminder_sent: bool,
}

impl Task {
    /// Create a task with a fresh id, due on `due_date`.
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date,
            due_time: None,
            reminder_lead_minutes: None,
            reminder_sent: false,
        }
    }

    /// The instant the task is due: its due date combined with its due
    /// time, or `default_due_time` when none was set.
    #[must_use]
    pub fn due_moment(&self, default_due_time: NaiveTime) -> NaiveDateTime {
        self.due_date
            .and_time(self.due_time.unwrap_or(default_due_time))
    }

    /// Calendar days from `today` until the due date. Negative when the
    /// due date has already passed.
    #[must_use]
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }
}

/// A user as seen by the notification core.
///
/// Only `id` (ledger scoping) and `email` (outbound mail addressing) are
/// consumed here; the remaining fields ride along from the persistence
/// layer's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Address for deadline emails.
    pub email: String,
    /// Role within the project, if any.
    #[serde(default)]
    pub role: Option<String>,
    /// Avatar image URL, if any.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Date the user joined.
    #[serde(default)]
    pub joined: Option<NaiveDate>,
}

impl User {
    /// Create a user with the given identity and email address.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: None,
            avatar_url: None,
            joined: None,
        }
    }
}
