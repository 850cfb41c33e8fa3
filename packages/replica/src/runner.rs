//! Background loop driving a mounted replica.
//!
//! Refreshes on every store notification for the mounted room and on every
//! poll tick, and sends heartbeats on its own interval. The loop runs the
//! leave cleanup when it stops, whether through `stop` or by dropping the
//! handle.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use yoriai_server::domain::{RoomSynchronizer, SyncError, SyncEvent};

use crate::synchronizer::ReplicaSynchronizer;

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct ReplicaRunner;

/// Handle to a running replica loop
pub struct RunnerHandle {
    /// Events observed on refresh, in observation order
    pub events: mpsc::UnboundedReceiver<SyncEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), SyncError>>>,
}

impl RunnerHandle {
    /// Stop the loop and wait for the leave cleanup.
    pub async fn stop(mut self) -> Result<(), SyncError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await.unwrap_or_else(|e| {
            tracing::warn!("Replica loop ended abnormally: {}", e);
            Ok(())
        })
    }
}

impl Drop for RunnerHandle {
    // The detached loop still finishes the leave cleanup.
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl ReplicaRunner {
    /// Spawn the loop for an already mounted synchronizer.
    pub async fn spawn(synchronizer: Arc<ReplicaSynchronizer>) -> Result<RunnerHandle, SyncError> {
        let key = synchronizer
            .mounted_key()
            .await
            .ok_or(SyncError::NotJoined)?;
        let config = synchronizer.config();
        let notifications = synchronizer.store().subscribe();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(
            synchronizer,
            key,
            config.poll_interval.max(MIN_INTERVAL),
            config.heartbeat_interval.max(MIN_INTERVAL),
            notifications,
            events_tx,
            shutdown_rx,
        ));

        Ok(RunnerHandle {
            events,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }
}

async fn run(
    synchronizer: Arc<ReplicaSynchronizer>,
    key: String,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    mut notifications: broadcast::Receiver<String>,
    events: mpsc::UnboundedSender<SyncEvent>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), SyncError> {
    let mut poll = tokio::time::interval(poll_interval);
    // Mounting already refreshed lastSeen, so the first heartbeat waits a full period.
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + heartbeat_interval,
        heartbeat_interval,
    );
    let mut listening = true;
    tracing::debug!("Replica loop started for '{}'", key);

    loop {
        let refresh = tokio::select! {
            _ = &mut shutdown => break,
            _ = poll.tick() => true,
            _ = heartbeat.tick() => match synchronizer.heartbeat().await {
                Ok(()) => false,
                Err(e @ (SyncError::NotJoined | SyncError::RoomUnavailable(_))) => {
                    tracing::info!("Stopping replica loop for '{}': {}", key, e);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Heartbeat for '{}' failed: {}", key, e);
                    false
                }
            },
            notification = notifications.recv(), if listening => match notification {
                Ok(changed) => changed == key,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} notification(s), refreshing", skipped);
                    true
                }
                Err(broadcast::error::RecvError::Closed) => {
                    listening = false;
                    false
                }
            },
        };
        if !refresh {
            continue;
        }

        match synchronizer.sync().await {
            Ok(observed) => {
                for event in observed {
                    if events.send(event).is_err() {
                        tracing::debug!("Event receiver dropped for '{}'", key);
                    }
                }
            }
            Err(e @ (SyncError::NotJoined | SyncError::RoomUnavailable(_))) => {
                tracing::info!("Stopping replica loop for '{}': {}", key, e);
                break;
            }
            Err(e) => tracing::warn!("Refresh of '{}' failed: {}", key, e),
        }
    }
    tracing::debug!("Replica loop stopped for '{}'", key);

    match synchronizer.leave().await {
        // Already unmounted by a direct leave or disconnect.
        Err(SyncError::NotJoined) => Ok(()),
        result => result,
    }
}
