//! Notification engine.
//!
//! Owns the reminder evaluator, deadline scanner, ledger, and alert
//! feed, and drives the two periodic passes on a fixed interval: once
//! immediately at session start, then every `tick_secs`. The realtime
//! channel runs separately (see [`crate::channel`]) and shares only the
//! alert feed with the engine.

use crate::alerts::SharedAlertFeed;
use crate::config::NotifyConfig;
use crate::email::EmailDispatcher;
use crate::ledger::NotificationLedger;
use crate::model::{Task, User};
use crate::notifier::Notifier;
use crate::reminder::ReminderEvaluator;
use crate::scanner::DeadlineScanner;
use crate::source::TaskSource;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Runtime event emitted by the engine for host observability.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The engine loop started.
    Started,
    /// A lead-time reminder fired.
    ReminderFired {
        /// Id of the reminding task.
        task_id: String,
        /// Title of the reminding task.
        title: String,
    },
    /// A deadline alert was raised.
    DeadlineAlert {
        /// Id of the alerting task.
        task_id: Option<String>,
        /// Message placed in the alert feed.
        message: String,
    },
    /// One tick finished.
    TickCompleted {
        /// Reminders fired this tick.
        reminders: usize,
        /// Deadline alerts raised this tick.
        alerted: usize,
    },
    /// A non-fatal problem was logged.
    Warning(String),
    /// The engine loop stopped.
    Stopped,
}

/// Handle for a running engine loop.
pub struct EngineHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl EngineHandle {
    /// Request shutdown. The loop exits before its next tick.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Request shutdown and wait for the loop to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = self.join.await;
    }
}

/// Periodic deadline notification engine.
pub struct NotificationEngine {
    config: NotifyConfig,
    user: User,
    source: Arc<dyn TaskSource>,
    notifier: Arc<dyn Notifier>,
    feed: SharedAlertFeed,
    ledger: NotificationLedger,
    evaluator: ReminderEvaluator,
    scanner: DeadlineScanner,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    tasks: Vec<Task>,
}

impl NotificationEngine {
    /// Create an engine with the given collaborators and event channel.
    ///
    /// The ledger defaults to the configured path, the crate default
    /// path, or memory-only when no home directory can be determined;
    /// override with [`NotificationEngine::with_ledger`]. Email dispatch
    /// is off until [`NotificationEngine::with_email_dispatcher`].
    pub fn new(
        config: NotifyConfig,
        user: User,
        source: Arc<dyn TaskSource>,
        notifier: Arc<dyn Notifier>,
        feed: SharedAlertFeed,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let ledger = match config
            .ledger
            .path
            .clone()
            .or_else(NotificationLedger::default_path)
        {
            Some(path) => NotificationLedger::open(path),
            None => NotificationLedger::in_memory(),
        };
        let evaluator = ReminderEvaluator::new(config.scan.default_due_time());
        let scanner = DeadlineScanner::new(config.scan.lookahead_days);
        Self {
            config,
            user,
            source,
            notifier,
            feed,
            ledger,
            evaluator,
            scanner,
            event_tx,
            tasks: Vec::new(),
        }
    }

    /// Replace the notification ledger.
    #[must_use]
    pub fn with_ledger(mut self, ledger: NotificationLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Attach an outbound email dispatcher.
    #[must_use]
    pub fn with_email_dispatcher(mut self, dispatcher: Arc<dyn EmailDispatcher>) -> Self {
        self.scanner = DeadlineScanner::new(self.config.scan.lookahead_days).with_email(dispatcher);
        self
    }

    /// Run one evaluation cycle at `now`: refresh the snapshot, run the
    /// reminder pass, run the deadline scan, prune the ledger.
    ///
    /// Exposed so hosts and tests can drive the engine with explicit
    /// timestamps; [`NotificationEngine::run`] calls this on the wall
    /// clock.
    pub async fn tick(&mut self, now: NaiveDateTime) {
        match self.source.load().await {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                warn!("task snapshot refresh failed, keeping previous snapshot: {e}");
                let _ = self
                    .event_tx
                    .send(EngineEvent::Warning(format!("task refresh failed: {e}")));
            }
        }

        self.evaluator.apply_sent_flags(&mut self.tasks);
        let fired =
            self.evaluator
                .evaluate(&mut self.tasks, now, self.notifier.as_ref());
        for reminder in &fired {
            let _ = self.event_tx.send(EngineEvent::ReminderFired {
                task_id: reminder.task_id.clone(),
                title: reminder.title.clone(),
            });
        }

        let today = now.date();
        let outcome = self.scanner.scan(
            &self.tasks,
            &self.user,
            today,
            &mut self.ledger,
            &self.feed,
            self.notifier.as_ref(),
        );
        for alert in &outcome.raised {
            let _ = self.event_tx.send(EngineEvent::DeadlineAlert {
                task_id: alert.task_id.clone(),
                message: alert.message.clone(),
            });
        }

        if self.config.ledger.prune {
            match self
                .ledger
                .prune_older_than(today, self.config.scan.lookahead_days)
            {
                Ok(0) => {}
                Ok(removed) => info!("pruned {removed} stale ledger entries"),
                Err(e) => warn!("ledger pruning failed: {e}"),
            }
        }

        let _ = self.event_tx.send(EngineEvent::TickCompleted {
            reminders: fired.len(),
            alerted: outcome.raised.len(),
        });
    }

    /// Start the engine loop: one tick immediately, then every
    /// `tick_secs`. Returns a handle whose [`EngineHandle::stop`] is the
    /// only way the loop ends.
    pub fn run(mut self) -> EngineHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            self.notifier.request_permission();
            info!(
                "notification engine started (tick every {}s, {}-day window)",
                self.config.scan.tick_secs, self.config.scan.lookahead_days
            );
            let _ = self.event_tx.send(EngineEvent::Started);

            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.scan.tick_secs.max(1)));
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("notification engine stopped");
                        let _ = self.event_tx.send(EngineEvent::Stopped);
                        return;
                    }
                    _ = interval.tick() => {
                        self.tick(Local::now().naive_local()).await;
                    }
                }
            }
        });
        EngineHandle {
            stop_tx: Some(stop_tx),
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::alerts::AlertFeed;
    use crate::model::TaskStatus;
    use crate::notifier::LogNotifier;
    use crate::source::InMemoryTaskSource;
    use chrono::{NaiveDate, NaiveTime};

    fn engine_with_tasks(
        tasks: Vec<Task>,
    ) -> (
        NotificationEngine,
        SharedAlertFeed,
        mpsc::UnboundedReceiver<EngineEvent>,
    ) {
        let feed = AlertFeed::new().into_shared();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = NotificationEngine::new(
            NotifyConfig::default(),
            User::new("u1", "Dana", "dana@example.com"),
            Arc::new(InMemoryTaskSource::new(tasks)),
            Arc::new(LogNotifier::new()),
            feed.clone(),
            event_tx,
        )
        .with_ledger(NotificationLedger::in_memory());
        (engine, feed, event_rx)
    }

    fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn tick_raises_deadline_alerts_once_per_day() {
        let task = Task::new("Ship release", NaiveDate::from_ymd_opt(2024, 10, 28).unwrap());
        let (mut engine, feed, _event_rx) = engine_with_tasks(vec![task]);

        engine.tick(at(2024, 10, 24, 10)).await;
        engine.tick(at(2024, 10, 24, 11)).await;
        assert_eq!(feed.lock().unwrap().len(), 1);

        engine.tick(at(2024, 10, 25, 10)).await;
        let guard = feed.lock().unwrap();
        assert_eq!(guard.len(), 2);
        assert!(guard.alerts()[1].message.contains("(in 3 days)"));
    }

    #[tokio::test]
    async fn done_tasks_produce_no_events() {
        let mut task = Task::new("Finished", NaiveDate::from_ymd_opt(2024, 10, 25).unwrap());
        task.status = TaskStatus::Done;
        let (mut engine, feed, mut event_rx) = engine_with_tasks(vec![task]);

        engine.tick(at(2024, 10, 24, 10)).await;
        assert!(feed.lock().unwrap().is_empty());

        // Only the tick-completed event, with nothing counted.
        let event = event_rx.try_recv().unwrap();
        match event {
            EngineEvent::TickCompleted { reminders, alerted } => {
                assert_eq!(reminders, 0);
                assert_eq!(alerted, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reminder_and_deadline_events_are_emitted() {
        let mut task = Task::new("Ship release", NaiveDate::from_ymd_opt(2024, 10, 24).unwrap());
        task.due_time = NaiveTime::from_hms_opt(14, 0, 0);
        task.reminder_lead_minutes = Some(30);
        let (mut engine, _feed, mut event_rx) = engine_with_tasks(vec![task]);

        engine
            .tick(
                NaiveDate::from_ymd_opt(2024, 10, 24)
                    .unwrap()
                    .and_time(NaiveTime::from_hms_opt(13, 45, 0).unwrap()),
            )
            .await;

        let mut saw_reminder = false;
        let mut saw_alert = false;
        while let Ok(event) = event_rx.try_recv() {
            match event {
                EngineEvent::ReminderFired { .. } => saw_reminder = true,
                EngineEvent::DeadlineAlert { .. } => saw_alert = true,
                _ => {}
            }
        }
        assert!(saw_reminder);
        assert!(saw_alert);
    }

    #[tokio::test]
    async fn reminder_sent_flag_survives_source_refresh() {
        let mut task = Task::new("Ship release", NaiveDate::from_ymd_opt(2024, 10, 24).unwrap());
        task.due_time = NaiveTime::from_hms_opt(14, 0, 0);
        task.reminder_lead_minutes = Some(30);
        let source = InMemoryTaskSource::new(vec![task.clone()]);

        let feed = AlertFeed::new().into_shared();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut engine = NotificationEngine::new(
            NotifyConfig::default(),
            User::new("u1", "Dana", "dana@example.com"),
            Arc::new(source.clone()),
            Arc::new(LogNotifier::new()),
            feed,
            event_tx,
        )
        .with_ledger(NotificationLedger::in_memory());

        let in_window = NaiveDate::from_ymd_opt(2024, 10, 24)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(13, 45, 0).unwrap());
        engine.tick(in_window).await;

        // The source still reports the unsent flag, as a persistence
        // layer that never stores it would.
        source.set_tasks(vec![task]);
        engine
            .tick(
                NaiveDate::from_ymd_opt(2024, 10, 24)
                    .unwrap()
                    .and_time(NaiveTime::from_hms_opt(13, 50, 0).unwrap()),
            )
            .await;

        let reminder_count = std::iter::from_fn(|| event_rx.try_recv().ok())
            .filter(|e| matches!(e, EngineEvent::ReminderFired { .. }))
            .count();
        assert_eq!(reminder_count, 1);
    }

    #[tokio::test]
    async fn source_failure_keeps_previous_snapshot() {
        struct FailingSource;

        #[async_trait::async_trait]
        impl TaskSource for FailingSource {
            async fn load(&self) -> crate::error::Result<Vec<Task>> {
                Err(crate::error::NotifyError::Tasks("boom".to_owned()))
            }
        }

        let feed = AlertFeed::new().into_shared();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut engine = NotificationEngine::new(
            NotifyConfig::default(),
            User::new("u1", "Dana", "dana@example.com"),
            Arc::new(FailingSource),
            Arc::new(LogNotifier::new()),
            feed,
            event_tx,
        )
        .with_ledger(NotificationLedger::in_memory());

        engine.tick(at(2024, 10, 24, 10)).await;
        let saw_warning = std::iter::from_fn(|| event_rx.try_recv().ok())
            .any(|e| matches!(e, EngineEvent::Warning(_)));
        assert!(saw_warning);
    }

    #[tokio::test]
    async fn run_ticks_immediately_and_stops_cleanly() {
        let task = Task::new("Ship release", NaiveDate::from_ymd_opt(2024, 10, 28).unwrap());
        let (engine, _feed, mut event_rx) = engine_with_tasks(vec![task]);

        let handle = engine.run();
        // First tick happens immediately on start.
        let started = event_rx.recv().await.unwrap();
        assert!(matches!(started, EngineEvent::Started));

        let mut saw_tick = false;
        while let Some(event) = event_rx.recv().await {
            match event {
                EngineEvent::TickCompleted { .. } => {
                    saw_tick = true;
                    break;
                }
                EngineEvent::Stopped => break,
                _ => {}
            }
        }
        assert!(saw_tick);

        handle.shutdown().await;
    }
}
