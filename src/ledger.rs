//! Per-day notification ledger.
//!
//! Durable record of which tasks have already raised a deadline alert
//! for a given user on a given calendar day, preventing duplicate
//! alerts within the same day. Backed by a JSON file so the record
//! survives host restarts; reload tolerates a missing or corrupt file.

use crate::error::{NotifyError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Composite ledger key: user id plus ISO calendar day.
fn ledger_key(user_id: &str, day: NaiveDate) -> String {
    format!("{user_id}:{}", day.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    /// Map from composite key to the set of task ids notified that day.
    #[serde(default)]
    notified: HashMap<String, BTreeSet<String>>,
}

/// File-backed per-user, per-day record of notified task ids.
pub struct NotificationLedger {
    path: Option<PathBuf>,
    state: LedgerState,
}

impl NotificationLedger {
    /// Open a ledger persisted at `path`, loading any existing state.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let state = load_state(&path);
        Self {
            path: Some(path),
            state,
        }
    }

    /// Create a ledger that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: LedgerState::default(),
        }
    }

    /// Default state file path (`~/.config/duewatch/notified.json`).
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(config).join("duewatch").join("notified.json"));
        }
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("duewatch")
                .join("notified.json")
        })
    }

    /// Returns `true` when a deadline alert for `task_id` was already
    /// raised for this user on `day`.
    #[must_use]
    pub fn contains(&self, user_id: &str, day: NaiveDate, task_id: &str) -> bool {
        self.state
            .notified
            .get(&ledger_key(user_id, day))
            .is_some_and(|ids| ids.contains(task_id))
    }

    /// Record task ids as notified for this user and day, then persist.
    ///
    /// Extends the stored set; already-present ids are ignored. A no-op
    /// call (nothing new) skips the disk write.
    ///
    /// # Errors
    ///
    /// Returns an error when the state file cannot be written.
    pub fn add_all<I>(&mut self, user_id: &str, day: NaiveDate, task_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let entry = self
            .state
            .notified
            .entry(ledger_key(user_id, day))
            .or_default();
        let before = entry.len();
        entry.extend(task_ids);
        if entry.len() == before {
            return Ok(());
        }
        self.save()
    }

    /// Drop entries whose day lies more than `keep_days` before `today`.
    /// Returns the number of removed entries. Persists only when
    /// something was removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the state file cannot be written.
    pub fn prune_older_than(&mut self, today: NaiveDate, keep_days: i64) -> Result<usize> {
        let before = self.state.notified.len();
        self.state.notified.retain(|key, _| {
            // Malformed keys are kept rather than silently destroyed.
            let Some((_, day_str)) = key.rsplit_once(':') else {
                return true;
            };
            let Ok(day) = NaiveDate::parse_from_str(day_str, "%Y-%m-%d") else {
                return true;
            };
            (today - day).num_days() <= keep_days
        });

        let removed = before - self.state.notified.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// Number of (user, day) entries currently stored.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.state.notified.len()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotifyError::Ledger(format!("cannot create ledger directory: {e}"))
            })?;
        }

        let json = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| NotifyError::Ledger(format!("cannot serialize ledger: {e}")))?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| NotifyError::Ledger(format!("cannot write ledger temp file: {e}")))?;
        std::fs::rename(&tmp_path, path)
            .map_err(|e| NotifyError::Ledger(format!("cannot finalize ledger file: {e}")))?;
        Ok(())
    }
}

fn load_state(path: &Path) -> LedgerState {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LedgerState::default(),
        Err(e) => {
            warn!("cannot read notification ledger at {}: {e}", path.display());
            return LedgerState::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "ignoring malformed notification ledger at {}: {e}",
                path.display()
            );
            LedgerState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn add_all_then_contains() {
        let mut ledger = NotificationLedger::in_memory();
        let day = date(2024, 10, 24);
        ledger
            .add_all("u1", day, vec!["t1".to_owned(), "t2".to_owned()])
            .unwrap();

        assert!(ledger.contains("u1", day, "t1"));
        assert!(ledger.contains("u1", day, "t2"));
        assert!(!ledger.contains("u1", day, "t3"));
    }

    #[test]
    fn entries_are_scoped_per_user_and_day() {
        let mut ledger = NotificationLedger::in_memory();
        let day = date(2024, 10, 24);
        ledger.add_all("u1", day, vec!["t1".to_owned()]).unwrap();

        assert!(!ledger.contains("u2", day, "t1"));
        assert!(!ledger.contains("u1", date(2024, 10, 25), "t1"));
    }

    #[test]
    fn add_all_extends_existing_set() {
        let mut ledger = NotificationLedger::in_memory();
        let day = date(2024, 10, 24);
        ledger.add_all("u1", day, vec!["t1".to_owned()]).unwrap();
        ledger.add_all("u1", day, vec!["t2".to_owned()]).unwrap();

        assert!(ledger.contains("u1", day, "t1"));
        assert!(ledger.contains("u1", day, "t2"));
        assert_eq!(ledger.entry_count(), 1);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified.json");
        let day = date(2024, 10, 24);

        {
            let mut ledger = NotificationLedger::open(path.clone());
            ledger.add_all("u1", day, vec!["t1".to_owned()]).unwrap();
        }

        let reopened = NotificationLedger::open(path);
        assert!(reopened.contains("u1", day, "t1"));
    }

    #[test]
    fn corrupt_state_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let ledger = NotificationLedger::open(path);
        assert_eq!(ledger.entry_count(), 0);
    }

    #[test]
    fn prune_drops_stale_days_only() {
        let mut ledger = NotificationLedger::in_memory();
        let today = date(2024, 10, 24);
        ledger
            .add_all("u1", date(2024, 10, 10), vec!["old".to_owned()])
            .unwrap();
        ledger
            .add_all("u1", date(2024, 10, 22), vec!["recent".to_owned()])
            .unwrap();
        ledger.add_all("u1", today, vec!["now".to_owned()]).unwrap();

        let removed = ledger.prune_older_than(today, 4).unwrap();
        assert_eq!(removed, 1);
        assert!(!ledger.contains("u1", date(2024, 10, 10), "old"));
        assert!(ledger.contains("u1", date(2024, 10, 22), "recent"));
        assert!(ledger.contains("u1", today, "now"));
    }

    #[test]
    fn prune_is_noop_when_nothing_is_stale() {
        let mut ledger = NotificationLedger::in_memory();
        let today = date(2024, 10, 24);
        ledger.add_all("u1", today, vec!["t".to_owned()]).unwrap();

        assert_eq!(ledger.prune_older_than(today, 4).unwrap(), 0);
        assert_eq!(ledger.entry_count(), 1);
    }

    #[test]
    fn user_ids_containing_colons_survive_pruning() {
        let mut ledger = NotificationLedger::in_memory();
        let today = date(2024, 10, 24);
        ledger
            .add_all("org:u1", today, vec!["t".to_owned()])
            .unwrap();

        assert_eq!(ledger.prune_older_than(today, 4).unwrap(), 0);
        assert!(ledger.contains("org:u1", today, "t"));
    }
}
