//! Headless notification daemon.
//!
//! Loads the duewatch config, wires the engine to a JSON task snapshot
//! and the HTTP mail API, optionally connects the realtime alert
//! channel, and runs until interrupted. Intended as the host process for
//! deployments without an embedding application; alerts and engine
//! events are written to the log.

use duewatch::alerts::{AlertFeed, FeedEvent};
use duewatch::channel::spawn_channel;
use duewatch::config::NotifyConfig;
use duewatch::email::HttpEmailDispatcher;
use duewatch::engine::{EngineEvent, NotificationEngine};
use duewatch::model::User;
use duewatch::notifier::LogNotifier;
use duewatch::source::JsonFileTaskSource;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(NotifyConfig::default_config_path);
    let config = if config_path.exists() {
        NotifyConfig::from_file(&config_path)?
    } else {
        tracing::info!(
            "no config at {}, running with defaults",
            config_path.display()
        );
        NotifyConfig::default()
    };

    let tasks_path = config.tasks_file.clone().unwrap_or_else(|| {
        config_path
            .parent()
            .map(|p| p.join("tasks.json"))
            .unwrap_or_else(|| PathBuf::from("tasks.json"))
    });
    tracing::info!("watching task snapshot at {}", tasks_path.display());

    let user = User::new(
        config.user.id.clone(),
        config.user.name.clone(),
        config.user.email.clone(),
    );

    let (feed, mut feed_rx) = AlertFeed::with_event_stream();
    let feed = feed.into_shared();
    let notifier = Arc::new(LogNotifier::new());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut engine = NotificationEngine::new(
        config.clone(),
        user,
        Arc::new(JsonFileTaskSource::new(tasks_path)),
        notifier.clone(),
        feed.clone(),
        event_tx,
    );
    if config.email.enabled {
        engine = engine.with_email_dispatcher(Arc::new(HttpEmailDispatcher::new(&config.email)));
    }

    let engine_handle = engine.run();
    let channel_handle = if config.channel.enabled && !config.channel.url.trim().is_empty() {
        Some(spawn_channel(config.channel.url.clone(), feed, notifier))
    } else {
        None
    };

    tokio::spawn(async move {
        while let Some(event) = feed_rx.recv().await {
            match event {
                FeedEvent::Appended(alert) | FeedEvent::Prepended(alert) => {
                    tracing::info!("alert: {}", alert.message);
                }
                FeedEvent::Removed { .. } => {}
            }
        }
    });
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                EngineEvent::Warning(msg) => tracing::warn!("{msg}"),
                EngineEvent::TickCompleted { reminders, alerted }
                    if reminders > 0 || alerted > 0 =>
                {
                    tracing::info!("tick: {reminders} reminders, {alerted} deadline alerts");
                }
                _ => {}
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    if let Some(handle) = channel_handle {
        handle.shutdown().await;
    }
    engine_handle.shutdown().await;
    Ok(())
}
