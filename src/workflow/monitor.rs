//! # Status Monitor
//!
//! Background loop that refreshes the workflow status on a fixed interval.
//!
//! At most one loop is alive per monitor. Every run owns its own stop flag,
//! so a stale loop can never be revived by a later start. The loop sleeps in
//! short ticks and re-checks the flag between them; `stop()` therefore takes
//! effect within one tick and joins the task with a bounded wait.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::coordinator::WorkflowCoordinator;
use super::status::{StatusBoard, StepReport};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::logging::log_error;

/// Something that can refresh the workflow status
#[async_trait]
pub trait StatusRefresher: Send + Sync + 'static {
    async fn refresh_status(&self) -> Result<()>;
}

/// Runs a coordinator refresh and publishes the reports on a status board
#[derive(Debug, Clone)]
pub struct CoordinatorRefresher {
    coordinator: Arc<Mutex<WorkflowCoordinator>>,
    board: StatusBoard,
}

impl CoordinatorRefresher {
    pub fn new(coordinator: Arc<Mutex<WorkflowCoordinator>>, board: StatusBoard) -> Self {
        Self { coordinator, board }
    }
}

#[async_trait]
impl StatusRefresher for CoordinatorRefresher {
    async fn refresh_status(&self) -> Result<()> {
        let board = self.board.clone();
        let result = {
            let mut coordinator = self.coordinator.lock().await;
            coordinator
                .update_workflow_status_with(&mut |report: &StepReport| board.publish_step(report))
                .await
        };

        match result {
            Ok(reports) => {
                debug!(steps = reports.len(), "Workflow status published");
                self.board.record_refresh();
                Ok(())
            }
            Err(error) => {
                self.board.record_error(error.to_string());
                Err(error)
            }
        }
    }
}

struct MonitorRun {
    id: Uuid,
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Decrements the live-loop counter however the loop ends, abort included
struct LiveLoopGuard(Arc<AtomicUsize>);

impl LiveLoopGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveLoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct StatusMonitor {
    refresher: Arc<dyn StatusRefresher>,
    config: MonitorConfig,
    current: Mutex<Option<MonitorRun>>,
    running: AtomicBool,
    live_loops: Arc<AtomicUsize>,
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("config", &self.config)
            .field("live_loops", &self.live_loops())
            .finish_non_exhaustive()
    }
}

impl StatusMonitor {
    pub fn new(refresher: Arc<dyn StatusRefresher>, config: MonitorConfig) -> Self {
        Self {
            refresher,
            config,
            current: Mutex::new(None),
            running: AtomicBool::new(false),
            live_loops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of monitoring loops currently alive
    pub fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }

    /// Whether a monitoring run is active. Does not wait for a pending start or stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Refresh once now, then keep refreshing in the background.
    /// A loop that is already running is stopped first.
    ///
    /// The first refresh runs inside the new loop's task, so a concurrent
    /// `stop()` stays bounded by the join timeout even while it is pending.
    pub async fn start(&self) {
        let first_refresh = {
            let mut current = self.current.lock().await;
            if let Some(run) = current.take() {
                self.stop_run(run).await;
            }

            let id = Uuid::new_v4();
            info!(run_id = %id, "🚀 MONITOR: Starting workflow monitoring");

            let (refreshed_tx, refreshed_rx) = oneshot::channel();
            let active = Arc::new(AtomicBool::new(true));
            let handle = tokio::spawn(monitoring_loop(
                id,
                self.refresher.clone(),
                active.clone(),
                self.config.interval(),
                self.config.tick(),
                refreshed_tx,
                LiveLoopGuard::enter(self.live_loops.clone()),
            ));

            *current = Some(MonitorRun { id, active, handle });
            self.running.store(true, Ordering::SeqCst);
            refreshed_rx
        };

        // A stop that aborts the run drops the sender
        if first_refresh.await.is_err() {
            debug!("Monitoring run ended before its first refresh completed");
        }
    }

    /// Stop the running loop, if any. Returns whether one was running.
    pub async fn stop(&self) -> bool {
        let mut current = self.current.lock().await;
        match current.take() {
            Some(run) => {
                self.running.store(false, Ordering::SeqCst);
                self.stop_run(run).await;
                true
            }
            None => false,
        }
    }

    async fn stop_run(&self, mut run: MonitorRun) {
        info!(run_id = %run.id, "🛑 MONITOR: Stopping workflow monitoring");
        run.active.store(false, Ordering::SeqCst);

        match tokio::time::timeout(self.config.stop_timeout(), &mut run.handle).await {
            Ok(Ok(())) => debug!(run_id = %run.id, "Monitoring loop finished"),
            Ok(Err(join_error)) => {
                warn!(run_id = %run.id, error = %join_error, "Monitoring loop ended abnormally")
            }
            Err(_) => {
                warn!(
                    run_id = %run.id,
                    timeout_ms = self.config.stop_timeout_ms,
                    "Monitoring loop did not stop in time, aborting it"
                );
                run.handle.abort();
            }
        }
    }
}

async fn monitoring_loop(
    run_id: Uuid,
    refresher: Arc<dyn StatusRefresher>,
    active: Arc<AtomicBool>,
    interval: Duration,
    tick: Duration,
    first_refresh: oneshot::Sender<()>,
    _guard: LiveLoopGuard,
) {
    if let Err(error) = refresher.refresh_status().await {
        log_error("status_monitor", "initial_refresh", &error.to_string(), None);
    }
    let _ = first_refresh.send(());

    loop {
        if !sleep_while_active(&active, interval, tick).await {
            break;
        }

        match refresher.refresh_status().await {
            Ok(()) => debug!(run_id = %run_id, "Status updated"),
            Err(error) => {
                // The next wait is the backoff; no retry before a full interval
                log_error(
                    "status_monitor",
                    "refresh_status",
                    &error.to_string(),
                    Some(&format!("retrying in {}ms", interval.as_millis())),
                );
            }
        }
    }
    debug!(run_id = %run_id, "Monitoring loop exited");
}

/// Sleep for `interval` in `tick` steps. Returns false once the flag is cleared.
async fn sleep_while_active(active: &AtomicBool, interval: Duration, tick: Duration) -> bool {
    let ticks = (interval.as_millis() / tick.as_millis().max(1)).max(1);
    for _ in 0..ticks {
        if !active.load(Ordering::SeqCst) {
            return false;
        }
        tokio::time::sleep(tick).await;
    }
    active.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;

    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl StatusRefresher for CountingRefresher {
        async fn refresh_status(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(WorkflowError::MoveForwardFailed { step_number: 2 });
            }
            Ok(())
        }
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            interval_ms: 100,
            tick_ms: 10,
            stop_timeout_ms: 200,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_immediately_then_on_interval() {
        let refresher = Arc::new(CountingRefresher::default());
        let monitor = StatusMonitor::new(refresher.clone(), fast_config());

        monitor.start().await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 4);

        assert!(monitor.is_running());
        assert!(monitor.stop().await);
        assert!(!monitor.stop().await);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_end_the_loop() {
        let refresher = Arc::new(CountingRefresher::default());
        refresher.fail.store(true, Ordering::SeqCst);
        let monitor = StatusMonitor::new(refresher.clone(), fast_config());

        monitor.start().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(monitor.live_loops(), 1);

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_while_active_stops_within_a_tick() {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let sleeper = tokio::spawn(async move {
            sleep_while_active(&flag, Duration::from_secs(10), Duration::from_secs(1)).await
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        active.store(false, Ordering::SeqCst);
        let started = tokio::time::Instant::now();
        assert!(!sleeper.await.unwrap());
        assert!(started.elapsed() <= Duration::from_secs(1));
    }

    struct SlowRefresher {
        delay: Duration,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl StatusRefresher for SlowRefresher {
        async fn refresh_status(&self) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_bounded_during_first_refresh() {
        let refresher = Arc::new(SlowRefresher {
            delay: Duration::from_secs(30),
            finished: AtomicUsize::new(0),
        });
        let config = MonitorConfig {
            interval_ms: 1_000,
            tick_ms: 100,
            stop_timeout_ms: 2_000,
        };
        let monitor = Arc::new(StatusMonitor::new(refresher.clone(), config.clone()));

        let starter = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.start().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(monitor.is_running());
        assert_eq!(monitor.live_loops(), 1);

        let started = tokio::time::Instant::now();
        assert!(monitor.stop().await);
        assert!(started.elapsed() <= config.stop_timeout() + config.tick());

        // The pending start returns once its run is gone
        starter.await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!monitor.is_running());
        assert_eq!(monitor.live_loops(), 0);
        assert_eq!(refresher.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_for_a_slow_first_refresh() {
        let refresher = Arc::new(SlowRefresher {
            delay: Duration::from_secs(3),
            finished: AtomicUsize::new(0),
        });
        let monitor = StatusMonitor::new(refresher.clone(), fast_config());

        let started = tokio::time::Instant::now();
        monitor.start().await;
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(refresher.finished.load(Ordering::SeqCst), 1);
        assert!(monitor.is_running());

        assert!(monitor.stop().await);
    }
}
