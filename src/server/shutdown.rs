//! Graceful shutdown for the server.
//!
//! SIGINT/SIGTERM stop the accept loop and broadcast a shutdown signal to
//! every live session. Sessions finish their current cycle, restore the
//! remote terminal and close. The coordinator waits for them up to the
//! configured timeout and aborts whatever is still running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

/// Shutdown signal sent to all active sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Finish the current cycle and close cleanly
    Graceful,
    /// Timeout exceeded; remaining tasks are about to be aborted
    Force,
}

pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    /// Set under the `tasks` lock once `shutdown()` has taken the list.
    closed: AtomicBool,
    shutdown_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            shutdown_tx,
            tasks: Arc::new(Mutex::new(Vec::new())),
            closed: AtomicBool::new(false),
            shutdown_timeout,
        }
    }

    /// Get a receiver for shutdown signals. Sessions and the accept loop
    /// listen on one of these.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    /// Track a task so shutdown can wait for it. Finished tasks are pruned
    /// on every call so the list tracks live connections only.
    ///
    /// A task registered after shutdown began has missed the broadcast and
    /// would never be drained, so it is aborted instead. Returns whether the
    /// task is being tracked.
    pub async fn register_task(&self, task: JoinHandle<()>) -> bool {
        let mut tasks = self.tasks.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            task.abort();
            return false;
        }
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        true
    }

    pub async fn active_tasks(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.len()
    }

    /// Broadcast `Graceful`, wait up to the timeout for tracked tasks, then
    /// broadcast `Force` and abort the rest. Returns how many were aborted.
    pub async fn shutdown(&self) -> usize {
        let mut tasks = {
            let mut tracked = self.tasks.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *tracked)
        };
        info!(
            "Initiating graceful shutdown of {} session(s)...",
            tasks.iter().filter(|t| !t.is_finished()).count()
        );
        let _ = self.shutdown_tx.send(ShutdownSignal::Graceful);

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            for task in tasks.iter_mut() {
                let _ = task.await;
            }
        })
        .await;

        if drained.is_ok() {
            info!("Graceful shutdown completed");
            return 0;
        }

        warn!("Shutdown timeout exceeded, forcing shutdown");
        let _ = self.shutdown_tx.send(ShutdownSignal::Force);
        let mut aborted = 0;
        for task in tasks.iter().filter(|t| !t.is_finished()) {
            task.abort();
            aborted += 1;
        }
        aborted
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

/// Resolves when SIGINT or SIGTERM arrives (Ctrl-C elsewhere).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_subscription() {
        let coordinator = ShutdownCoordinator::default();
        let mut rx = coordinator.subscribe();

        assert_eq!(coordinator.shutdown().await, 0);

        let signal = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("signal within timeout")
            .expect("no broadcast error");
        assert_eq!(signal, ShutdownSignal::Graceful);
    }

    #[tokio::test]
    async fn test_cooperative_tasks_drain_without_abort() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut rx = coordinator.subscribe();
        let task = tokio::spawn(async move {
            let _ = rx.recv().await;
        });
        assert!(coordinator.register_task(task).await);

        assert_eq!(coordinator.shutdown().await, 0);
        assert_eq!(coordinator.active_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_tasks_registered_after_shutdown_are_aborted() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        assert_eq!(coordinator.shutdown().await, 0);

        let late = tokio::spawn(std::future::pending::<()>());
        let handle = late.abort_handle();
        assert!(!coordinator.register_task(late).await);
        assert_eq!(coordinator.active_tasks().await, 0);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("late task aborted");
    }

    #[tokio::test]
    async fn test_stuck_tasks_are_aborted_after_timeout() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        let mut rx = coordinator.subscribe();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        coordinator.register_task(task).await;

        assert_eq!(coordinator.shutdown().await, 1);
        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Graceful);
        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Force);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_pruned() {
        let coordinator = ShutdownCoordinator::default();
        let done = tokio::spawn(async {});
        let _ = tokio::time::timeout(Duration::from_secs(1), async {
            while !done.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        coordinator.register_task(done).await;
        coordinator
            .register_task(tokio::spawn(std::future::pending::<()>()))
            .await;
        assert_eq!(coordinator.active_tasks().await, 1);
    }
}
