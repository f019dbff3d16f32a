use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::errors::{ApiError, PollingError};
use crate::models::{TaskHandle, TaskStatus};
use crate::services::ApiClient;

/// Where status snapshots come from. The HTTP adapter in production, scripted sources in tests.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, handle: &TaskHandle) -> Result<TaskStatus, ApiError>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, handle: &TaskHandle) -> Result<TaskStatus, ApiError> {
        self.task_status(handle).await
    }
}

/// One delivered snapshot, tagged with the number of the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub sequence: u64,
    pub status: TaskStatus,
}

/// How a polling session ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// A SUCCESS or FAILURE snapshot was observed and delivered.
    Completed(TaskStatus),
    Cancelled,
    Failed(PollingError),
}

/// Owner's grip on a running poll loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct PollerHandle {
    task: TaskHandle,
    token: CancellationToken,
    join: Option<JoinHandle<PollOutcome>>,
}

impl PollerHandle {
    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    /// Stops future polls; a response still in flight is dropped unseen.
    ///
    /// The token is checked right before every delivery, but a cancel issued from another
    /// thread cannot interrupt an `on_update` call that has already started. At most that one
    /// snapshot may land after `cancel` returns; callers needing a hard cutoff gate on their
    /// own state inside the callback.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Cancelling poller for task {}", self.task);
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn finished(mut self) -> PollOutcome {
        let Some(join) = self.join.take() else {
            return PollOutcome::Cancelled;
        };
        match join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Poller for task {} panicked: {}", self.task, e);
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Starts polling `handle` on the current runtime.
///
/// The loop waits `interval` before each request and never issues a request while another
/// is outstanding. `on_update` runs exactly once per successful poll, with the whole snapshot.
pub fn start<S, F>(
    source: Arc<S>,
    handle: TaskHandle,
    config: PollingConfig,
    on_update: F,
) -> PollerHandle
where
    S: StatusSource + ?Sized + 'static,
    F: FnMut(PollUpdate) + Send + 'static,
{
    let token = CancellationToken::new();
    tracing::info!(
        "Polling task {} every {} ms",
        handle,
        config.interval_ms
    );
    let join = tokio::spawn(run(
        source,
        handle.clone(),
        config,
        on_update,
        token.clone(),
    ));

    PollerHandle {
        task: handle,
        token,
        join: Some(join),
    }
}

async fn run<S, F>(
    source: Arc<S>,
    handle: TaskHandle,
    config: PollingConfig,
    mut on_update: F,
    token: CancellationToken,
) -> PollOutcome
where
    S: StatusSource + ?Sized,
    F: FnMut(PollUpdate),
{
    let mut sequence: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        // wait for the next tick, or the backoff after a failure
        let delay = if consecutive_failures == 0 {
            config.interval()
        } else {
            config.backoff(consecutive_failures)
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => return PollOutcome::Cancelled,
            _ = sleep(delay) => {}
        }

        // one request at a time, abandoned if the owner cancels meanwhile
        sequence += 1;
        tracing::debug!("Status check #{} for task {}", sequence, handle);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Discarding in-flight status check #{} for task {}", sequence, handle);
                return PollOutcome::Cancelled;
            }
            result = source.fetch_status(&handle) => result,
        };

        match result {
            // a failure that resolved after the owner cancelled is not reported
            Err(_) if token.is_cancelled() => return PollOutcome::Cancelled,
            Ok(status) => {
                consecutive_failures = 0;
                let terminal = status.is_terminal();
                tracing::debug!(
                    "Task {} is {} ({}){}",
                    handle,
                    status.state,
                    status.status,
                    status
                        .progress
                        .map(|p| format!(" at {}%", p))
                        .unwrap_or_default()
                );
                // the response may have resolved in the same tick the owner cancelled
                if token.is_cancelled() {
                    return PollOutcome::Cancelled;
                }
                on_update(PollUpdate {
                    sequence,
                    status: status.clone(),
                });
                if terminal {
                    tracing::info!("Task {} finished with {}", handle, status.state);
                    return PollOutcome::Completed(status);
                }
            }
            Err(source_err) => {
                // count the failure, then retry or give up
                consecutive_failures += 1;
                if consecutive_failures > config.max_retries {
                    tracing::error!(
                        "Status check #{} for task {} failed, giving up: {}",
                        sequence,
                        handle,
                        source_err
                    );
                    return PollOutcome::Failed(PollingError {
                        task_id: handle.as_str().to_string(),
                        sequence,
                        source: source_err,
                    });
                }
                tracing::warn!(
                    "Status check #{} for task {} failed (attempt {}/{}), retrying in {:?}: {}",
                    sequence,
                    handle,
                    consecutive_failures,
                    config.max_retries,
                    config.backoff(consecutive_failures),
                    source_err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskState;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    // Hands out scripted answers in order; the last answer repeats.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<TaskStatus, ApiError>>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        latency: Duration,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        // cancelled just before the answer is handed back
        cancel_on_return: Option<CancellationToken>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TaskStatus, ApiError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                latency: Duration::ZERO,
                gate: None,
                cancel_on_return: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _handle: &TaskHandle) -> Result<TaskStatus, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_return {
                token.cancel();
            }
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                match script.front().unwrap() {
                    Ok(status) => Ok(status.clone()),
                    Err(_) => Err(ApiError::Transport("scripted failure".into())),
                }
            }
        }
    }

    fn collect() -> (Arc<Mutex<Vec<PollUpdate>>>, impl FnMut(PollUpdate) + Send + 'static) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        (updates, move |update| sink.lock().unwrap().push(update))
    }

    fn pending(progress: Option<f64>) -> Result<TaskStatus, ApiError> {
        Ok(TaskStatus::pending("Pendiente...", progress))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_success() {
        let source = Arc::new(ScriptedSource::new(vec![
            pending(None),
            pending(Some(40.0)),
            Ok(TaskStatus::success(json!({"sequence_count": 10}))),
        ]));
        let (updates, on_update) = collect();

        let poller = start(source.clone(), TaskHandle::new("t1"), PollingConfig::default(), on_update);
        let outcome = poller.finished().await;

        assert!(matches!(outcome, PollOutcome::Completed(ref s) if s.state == TaskState::Success));
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates.iter().map(|u| u.sequence).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(updates[1].status.progress, Some(40.0));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_failure() {
        let source = Arc::new(ScriptedSource::new(vec![
            pending(None),
            Ok(TaskStatus::failure("Formato FASTA inválido")),
        ]));
        let (updates, on_update) = collect();

        let outcome = start(source.clone(), TaskHandle::new("t2"), PollingConfig::default(), on_update)
            .finished()
            .await;

        match outcome {
            PollOutcome::Completed(status) => {
                assert_eq!(status.error(), Some("Formato FASTA inválido"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(updates.lock().unwrap().len(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_states_keep_polling() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(TaskStatus::in_state(TaskState::Other("PROGRESS".into()), "Procesando...", Some(10.0))),
            Ok(TaskStatus::in_state(TaskState::Other("RETRY".into()), "", None)),
            Ok(TaskStatus::success(json!({}))),
        ]));
        let (updates, on_update) = collect();

        let outcome = start(source, TaskHandle::new("t3"), PollingConfig::default(), on_update)
            .finished()
            .await;
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(updates.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_one_interval_before_first_request() {
        let source = Arc::new(ScriptedSource::new(vec![pending(None)]));
        let (_updates, on_update) = collect();
        let poller = start(source.clone(), TaskHandle::new("t4"), PollingConfig::default(), on_update);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(source.calls(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(source.calls(), 1);
        assert!(!poller.is_finished());
        assert!(!poller.is_cancelled());

        poller.cancel();
        assert!(poller.is_cancelled());
        while !poller.is_finished() {
            tokio::task::yield_now().await;
        }
        assert!(matches!(poller.finished().await, PollOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_response() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut scripted = ScriptedSource::new(vec![Ok(TaskStatus::success(json!({"sequence_count": 1})))]);
        scripted.gate = Some((entered.clone(), release.clone()));
        let source = Arc::new(scripted);
        let (updates, on_update) = collect();

        let poller = start(source.clone(), TaskHandle::new("t5"), PollingConfig::default(), on_update);
        entered.notified().await;
        poller.cancel();
        release.notify_one();

        assert!(matches!(poller.finished().await, PollOutcome::Cancelled));
        assert!(updates.lock().unwrap().is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let source = Arc::new(ScriptedSource::new(vec![pending(None)]));
        let (updates, on_update) = collect();
        let poller = start(source.clone(), TaskHandle::new("t6"), PollingConfig::default(), on_update);

        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(source.calls(), 2);
        drop(poller);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(updates.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_ends_session_by_default() {
        let source = Arc::new(ScriptedSource::new(vec![
            pending(None),
            Err(ApiError::Timeout(30)),
            pending(None),
        ]));
        let (updates, on_update) = collect();

        let outcome = start(source.clone(), TaskHandle::new("t7"), PollingConfig::default(), on_update)
            .finished()
            .await;
        match outcome {
            PollOutcome::Failed(err) => {
                assert_eq!(err.task_id, "t7");
                assert_eq!(err.sequence, 2);
                assert!(matches!(err.source, ApiError::Timeout(30)));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(updates.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_recovers() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(ApiError::Connect("reset".into())),
            Err(ApiError::Connect("reset".into())),
            Ok(TaskStatus::success(json!({"sequence_count": 2}))),
        ]));
        let (updates, on_update) = collect();
        let config = PollingConfig {
            max_retries: 2,
            ..PollingConfig::default()
        };

        let outcome = start(source.clone(), TaskHandle::new("t8"), config, on_update)
            .finished()
            .await;
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].sequence, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_gives_up() {
        let source = Arc::new(ScriptedSource::new(vec![Err(ApiError::Connect("down".into()))]));
        let (_updates, on_update) = collect();
        let config = PollingConfig {
            max_retries: 2,
            ..PollingConfig::default()
        };

        let outcome = start(source.clone(), TaskHandle::new("t9"), config, on_update)
            .finished()
            .await;
        assert!(matches!(outcome, PollOutcome::Failed(ref e) if e.sequence == 3));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_responses_never_overlap() {
        let mut scripted = ScriptedSource::new(vec![
            pending(None),
            pending(None),
            pending(None),
            Ok(TaskStatus::success(json!({}))),
        ]);
        // each response takes longer than the polling interval
        scripted.latency = Duration::from_secs(10);
        let source = Arc::new(scripted);
        let (_updates, on_update) = collect();

        let outcome = start(source.clone(), TaskHandle::new("t10"), PollingConfig::default(), on_update)
            .finished()
            .await;
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_landing_with_response_delivers_nothing() {
        let token = CancellationToken::new();
        let mut scripted = ScriptedSource::new(vec![Ok(TaskStatus::success(json!({"sequence_count": 4})))]);
        scripted.cancel_on_return = Some(token.clone());
        let source = Arc::new(scripted);
        let (updates, on_update) = collect();

        let outcome = run(
            source.clone(),
            TaskHandle::new("t11"),
            PollingConfig::default(),
            on_update,
            token,
        )
        .await;
        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert!(updates.lock().unwrap().is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_callback_stops_further_updates() {
        let source = Arc::new(ScriptedSource::new(vec![
            pending(None),
            pending(Some(50.0)),
            Ok(TaskStatus::success(json!({}))),
        ]));
        let token = CancellationToken::new();
        let stop = token.clone();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        let outcome = run(
            source.clone(),
            TaskHandle::new("t12"),
            PollingConfig::default(),
            move |update: PollUpdate| {
                sink.lock().unwrap().push(update.sequence);
                stop.cancel();
            },
            token,
        )
        .await;
        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(*updates.lock().unwrap(), vec![1]);
        assert_eq!(source.calls(), 1);
    }
}
