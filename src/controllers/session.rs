use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{Config, PollingConfig};
use crate::errors::GenolabError;
use crate::models::{SubmitOutcome, TaskHandle, TaskState, TaskStatus, UploadRequest};
use crate::poller::{self, PollOutcome, PollUpdate, PollerHandle, StatusSource};
use crate::render::{render, RenderedView};
use crate::services::ApiClient;
use crate::upload::UploadSubmitter;

/// What the upload page is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Uploading,
    /// A `raw` upload: the file was stored, nothing to poll.
    Stored {
        file_url: Option<String>,
        analysis_id: Option<i64>,
        message: Option<String>,
    },
    /// Waiting on a queued analysis; `snapshot` is the latest status seen.
    Polling {
        task: TaskHandle,
        snapshot: Option<TaskStatus>,
    },
    Completed {
        task: TaskHandle,
        analysis_type: String,
        view: RenderedView,
    },
    /// The analysis ran and reported FAILURE.
    Failed { task: TaskHandle, message: String },
    /// Something went wrong on our side of the exchange.
    Error(String),
}

impl SessionState {
    pub fn is_polling(&self) -> bool {
        matches!(self, SessionState::Polling { .. })
    }
}

type StateListener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Shared {
    generation: u64,
    state: SessionState,
    listener: Option<StateListener>,
}

impl Shared {
    fn set(&mut self, state: SessionState) {
        self.state = state;
        if let Some(listener) = &self.listener {
            listener(&self.state);
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller behind the upload page. Owns at most one poller at a time; starting a new
/// upload cancels the previous one, and dropping the session cancels it too.
pub struct AnalysisSession {
    submitter: UploadSubmitter,
    source: Arc<dyn StatusSource>,
    polling: PollingConfig,
    shared: Arc<Mutex<Shared>>,
    poller: Option<PollerHandle>,
}

impl AnalysisSession {
    pub fn new(client: ApiClient, config: &Config) -> Self {
        Self {
            submitter: UploadSubmitter::new(client.clone(), config.upload.clone()),
            source: Arc::new(client),
            polling: config.polling.clone(),
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                state: SessionState::Idle,
                listener: None,
            })),
            poller: None,
        }
    }

    /// Calls `listener` on every state change, including the ones made by the poller.
    pub fn on_change<F>(self, listener: F) -> Self
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        lock(&self.shared).listener = Some(Arc::new(listener));
        self
    }

    /// Polls through `source` instead of the upload client.
    pub fn with_status_source(mut self, source: Arc<dyn StatusSource>) -> Self {
        self.source = source;
        self
    }

    pub fn state(&self) -> SessionState {
        lock(&self.shared).state.clone()
    }

    pub fn active_task(&self) -> Option<&TaskHandle> {
        self.poller.as_ref().map(PollerHandle::task)
    }

    /// Submits `request`, then either records the stored file or starts polling its task.
    pub async fn upload(&mut self, request: &UploadRequest) -> SessionState {
        // stop the previous task's poller and open a new generation
        self.cancel();
        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.set(SessionState::Uploading);
            shared.generation
        };

        let outcome = self.submitter.submit(request).await;

        // a newer upload started while this one was in flight
        let mut shared = lock(&self.shared);
        if shared.generation != generation {
            tracing::debug!("Upload of generation {} superseded", generation);
            return shared.state.clone();
        }

        match outcome {
            Ok(SubmitOutcome::Stored {
                file_url,
                analysis_id,
                message,
            }) => shared.set(SessionState::Stored {
                file_url,
                analysis_id,
                message,
            }),
            Ok(SubmitOutcome::Task { handle, message }) => {
                if let Some(message) = message {
                    tracing::info!("{}", message);
                }
                // start polling the new task
                shared.set(SessionState::Polling {
                    task: handle.clone(),
                    snapshot: None,
                });
                let callback = snapshot_handler(
                    self.shared.clone(),
                    generation,
                    handle.clone(),
                    request.analysis_type.trim().to_string(),
                );
                self.poller = Some(poller::start(
                    self.source.clone(),
                    handle,
                    self.polling.clone(),
                    callback,
                ));
            }
            Err(err) => {
                tracing::error!("Upload failed: {}", err);
                shared.set(SessionState::Error(err.user_message()));
            }
        }

        shared.state.clone()
    }

    /// Waits for the active poller, if any, and returns the resulting state.
    pub async fn wait(&mut self) -> SessionState {
        let Some(poller) = self.poller.take() else {
            return self.state();
        };

        // only a lost task changes the state here, snapshots were applied as they came
        if let PollOutcome::Failed(err) = poller.finished().await {
            let mut shared = lock(&self.shared);
            if shared.state.is_polling() {
                shared.set(SessionState::Error(GenolabError::Polling(err).user_message()));
            }
        }
        self.state()
    }

    /// Stops the active poller. The last state stays as it was, and a snapshot the poller
    /// is delivering at that moment is ignored.
    pub fn cancel(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
            lock(&self.shared).generation += 1;
        }
    }
}

// Snapshots from an older generation belong to a superseded upload and are dropped.
fn snapshot_handler(
    shared: Arc<Mutex<Shared>>,
    generation: u64,
    task: TaskHandle,
    analysis_type: String,
) -> impl FnMut(PollUpdate) + Send + 'static {
    move |update: PollUpdate| {
        let mut shared = lock(&shared);
        if shared.generation != generation {
            tracing::debug!(
                "Ignoring status #{} for superseded task {}",
                update.sequence,
                task
            );
            return;
        }

        // map the snapshot onto the session state
        let status = update.status;
        let next = match status.state {
            TaskState::Success => SessionState::Completed {
                task: task.clone(),
                view: render(&analysis_type, status.result().unwrap_or(&serde_json::Value::Null)),
                analysis_type: analysis_type.clone(),
            },
            TaskState::Failure => SessionState::Failed {
                task: task.clone(),
                message: status.error().unwrap_or("Error desconocido").to_string(),
            },
            _ => SessionState::Polling {
                task: task.clone(),
                snapshot: Some(status),
            },
        };
        shared.set(next);
    }
}
