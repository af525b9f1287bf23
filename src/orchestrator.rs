//! Runs one analysis request at a time against the entry store.
//!
//! A request moves `Idle -> Running`, then back to `Idle` with a recorded
//! [`RequestOutcome`]. The current [`AnalysisStatus`] is published on a watch
//! channel so a front end can render it without polling the store.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::AnalysisEngine;
use crate::diary_entry::DiaryEntry;
use crate::entry_store::EntryStore;
use crate::error::{DiaryError, ErrorKind, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Running {
        entry_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Succeeded {
        entry_id: Uuid,
    },
    Failed {
        entry_id: Uuid,
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisStatus {
    pub state: RequestState,
    /// Latest known copy of the entry the last request addressed.
    pub current_entry: Option<DiaryEntry>,
    pub last_outcome: Option<RequestOutcome>,
}

impl AnalysisStatus {
    pub fn is_running(&self) -> bool {
        matches!(self.state, RequestState::Running { .. })
    }

    /// Message for the presentation layer when the last request failed.
    pub fn failure_message(&self) -> Option<&str> {
        match &self.last_outcome {
            Some(RequestOutcome::Failed { message, .. }) => Some(message),
            _ => None,
        }
    }
}

pub struct AnalysisOrchestrator {
    store: Arc<EntryStore>,
    engine: Arc<dyn AnalysisEngine>,
    status: watch::Sender<AnalysisStatus>,
}

impl AnalysisOrchestrator {
    pub fn new(store: Arc<EntryStore>, engine: Arc<dyn AnalysisEngine>) -> Self {
        let (status, _) = watch::channel(AnalysisStatus::default());
        AnalysisOrchestrator {
            store,
            engine,
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status.borrow().clone()
    }

    /// Analyzes the entry and attaches the result.
    ///
    /// Rejected with [`DiaryError::AlreadyRunning`] while another request is in
    /// flight; the in-flight request's status is left alone in that case.
    pub async fn analyze(&self, entry_id: Uuid) -> Result<DiaryEntry> {
        let started = self.status.send_if_modified(|status| {
            if status.is_running() {
                return false;
            }
            status.state = RequestState::Running { entry_id };
            true
        });
        if !started {
            warn!(entry_id = %entry_id, "analysis rejected, another request is running");
            return Err(DiaryError::AlreadyRunning);
        }

        let mut guard = RunningGuard {
            status: &self.status,
            armed: true,
        };
        info!(entry_id = %entry_id, engine = self.engine.name(), "analysis started");

        let mut fetched = None;
        let result = self.run(entry_id, &mut fetched).await;
        guard.armed = false;

        match &result {
            Ok(updated) => {
                info!(entry_id = %entry_id, sentiment = ?updated.sentiment(), "analysis attached");
                self.status.send_modify(|status| {
                    status.state = RequestState::Idle;
                    status.current_entry = Some(updated.clone());
                    status.last_outcome = Some(RequestOutcome::Succeeded { entry_id });
                });
            }
            Err(e) => {
                warn!(entry_id = %entry_id, error = %e, "analysis failed");
                let kind = e.kind();
                self.status.send_modify(|status| {
                    status.state = RequestState::Idle;
                    status.current_entry = fetched;
                    status.last_outcome = Some(RequestOutcome::Failed {
                        entry_id,
                        kind,
                        message: kind.user_message().to_string(),
                    });
                });
            }
        }

        result
    }

    async fn run(&self, entry_id: Uuid, fetched: &mut Option<DiaryEntry>) -> Result<DiaryEntry> {
        let entry = self.store.get(entry_id).await?;
        *fetched = Some(entry.clone());

        let analysis = self.engine.analyze(&entry.content).await?;
        self.store.attach_analysis(entry_id, analysis).await
    }
}

/// Resets the state to `Idle` if an in-flight `analyze` future is dropped.
struct RunningGuard<'a> {
    status: &'a watch::Sender<AnalysisStatus>,
    armed: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_modify(|status| status.state = RequestState::Idle);
        }
    }
}
