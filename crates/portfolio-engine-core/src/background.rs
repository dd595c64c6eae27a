//! Off-thread execution of engine computations.
//!
//! Callers submit work, receive a task id, and observe the task's life
//! through events on a channel: queued, started, coarse progress, then one
//! terminal event. Cancellation is cooperative, honoured at the compute
//! loops' checkpoint boundaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::types::{
    AssetData, ComputationOutput, EfficientFrontier, EngineConfig, Objective,
    PortfolioConstraints, PortfolioResult,
};
use crate::{covariance, frontier, matrix, optimizer};
use crate::EngineResult;

/// Unique id assigned to each submitted task.
pub type TaskId = Uuid;

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// Work accepted by the background executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskRequest {
    MatrixInvert {
        matrix: Vec<Vec<Decimal>>,
    },
    Covariance {
        assets: Vec<AssetData>,
    },
    PortfolioOptimization {
        assets: Vec<AssetData>,
        constraints: PortfolioConstraints,
        objective: Objective,
    },
    EfficientFrontier {
        assets: Vec<AssetData>,
        constraints: PortfolioConstraints,
    },
}

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Payload of a successful task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskOutcome {
    Matrix(Vec<Vec<Decimal>>),
    Covariance(Vec<Vec<Decimal>>),
    Portfolio(ComputationOutput<PortfolioResult>),
    Frontier(ComputationOutput<EfficientFrontier>),
}

/// Event emitted on the executor's channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TaskEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEventKind {
    Queued,
    Started,
    Progress {
        percent: u8,
        stage: String,
    },
    Completed {
        outcome: TaskOutcome,
        elapsed_ms: u64,
    },
    Failed {
        kind: String,
        message: String,
    },
    Cancelled,
}

impl TaskEvent {
    fn new(task_id: TaskId, kind: TaskEventKind) -> Self {
        Self {
            task_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Status implied by this event.
    pub fn status(&self) -> TaskStatus {
        match &self.kind {
            TaskEventKind::Queued => TaskStatus::Queued,
            TaskEventKind::Started | TaskEventKind::Progress { .. } => TaskStatus::Running,
            TaskEventKind::Completed { .. } => TaskStatus::Completed,
            TaskEventKind::Failed { .. } => TaskStatus::Failed,
            TaskEventKind::Cancelled => TaskStatus::Cancelled,
        }
    }

    /// Whether this event ends the task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status(),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

struct QueuedTask {
    id: TaskId,
    request: TaskRequest,
    cancel: CancellationToken,
}

/// Runs engine computations off the caller's thread, one task at a time.
///
/// The caller holds only the submission handle and the event receiver;
/// everything else crosses the boundary as messages. Submissions made while
/// a task is running queue FIFO. The executor provides no scheduler beyond
/// that: run several instances for real concurrency.
pub struct BackgroundExecutor {
    submit_tx: mpsc::UnboundedSender<QueuedTask>,
    event_tx: mpsc::UnboundedSender<TaskEvent>,
    tokens: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
}

impl BackgroundExecutor {
    /// Spawn the dispatcher and hand back the executor plus its event
    /// stream. Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let tokens: Arc<Mutex<HashMap<TaskId, CancellationToken>>> =
            Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(dispatch_loop(
            submit_rx,
            event_tx.clone(),
            config,
            Arc::clone(&tokens),
        ));

        (
            Self {
                submit_tx,
                event_tx,
                tokens,
            },
            event_rx,
        )
    }

    /// Queue a task. Emits a `Queued` event and returns the task id.
    pub fn submit(&self, request: TaskRequest) -> EngineResult<TaskId> {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.tokens.lock().insert(id, cancel.clone());

        let _ = self
            .event_tx
            .send(TaskEvent::new(id, TaskEventKind::Queued));
        if self
            .submit_tx
            .send(QueuedTask {
                id,
                request,
                cancel,
            })
            .is_err()
        {
            self.tokens.lock().remove(&id);
            return Err(EngineError::Execution(
                "executor dispatcher has shut down".into(),
            ));
        }

        tracing::debug!(task_id = %id, "task queued");
        Ok(id)
    }

    /// Request cooperative cancellation. Returns false for unknown or
    /// already-finished tasks.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        match self.tokens.lock().get(&task_id) {
            Some(token) => {
                token.cancel();
                tracing::debug!(task_id = %task_id, "cancellation requested");
                true
            }
            None => false,
        }
    }
}

async fn dispatch_loop(
    mut submit_rx: mpsc::UnboundedReceiver<QueuedTask>,
    event_tx: mpsc::UnboundedSender<TaskEvent>,
    config: EngineConfig,
    tokens: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
) {
    while let Some(QueuedTask {
        id,
        request,
        cancel,
    }) = submit_rx.recv().await
    {
        if cancel.is_cancelled() {
            let _ = event_tx.send(TaskEvent::new(id, TaskEventKind::Cancelled));
            tokens.lock().remove(&id);
            tracing::info!(task_id = %id, "task cancelled before start");
            continue;
        }

        let _ = event_tx.send(TaskEvent::new(id, TaskEventKind::Started));
        tracing::info!(task_id = %id, "task started");
        let started = Instant::now();

        let progress_tx = event_tx.clone();
        let ctx = ExecutionContext::with_cancellation(cancel).on_progress(move |percent, stage| {
            let _ = progress_tx.send(TaskEvent::new(
                id,
                TaskEventKind::Progress {
                    percent,
                    stage: stage.to_string(),
                },
            ));
        });

        let cfg = config.clone();
        let joined = tokio::task::spawn_blocking(move || run_task(request, &cfg, &ctx)).await;

        let kind = match joined {
            Ok(Ok(outcome)) => TaskEventKind::Completed {
                outcome,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
            Ok(Err(EngineError::TaskCancelled)) => TaskEventKind::Cancelled,
            Ok(Err(err)) => TaskEventKind::Failed {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
            Err(join_err) => TaskEventKind::Failed {
                kind: "execution".to_string(),
                message: format!("worker terminated abnormally: {join_err}"),
            },
        };

        match &kind {
            TaskEventKind::Completed { elapsed_ms, .. } => {
                tracing::info!(task_id = %id, elapsed_ms = *elapsed_ms, "task completed");
            }
            TaskEventKind::Cancelled => tracing::info!(task_id = %id, "task cancelled"),
            TaskEventKind::Failed { kind, message } => {
                tracing::warn!(task_id = %id, kind = %kind, message = %message, "task failed");
            }
            _ => {}
        }

        let _ = event_tx.send(TaskEvent::new(id, kind));
        tokens.lock().remove(&id);
    }
}

fn run_task(
    request: TaskRequest,
    config: &EngineConfig,
    ctx: &ExecutionContext,
) -> EngineResult<TaskOutcome> {
    match request {
        TaskRequest::MatrixInvert { matrix: input } => {
            matrix::invert(&input, ctx).map(TaskOutcome::Matrix)
        }
        TaskRequest::Covariance { assets } => {
            covariance::estimate(&assets, ctx).map(TaskOutcome::Covariance)
        }
        TaskRequest::PortfolioOptimization {
            assets,
            constraints,
            objective,
        } => optimizer::optimize_with(&assets, &constraints, config, objective, ctx)
            .map(TaskOutcome::Portfolio),
        TaskRequest::EfficientFrontier {
            assets,
            constraints,
        } => frontier::efficient_frontier_with(&assets, &constraints, config, ctx)
            .map(TaskOutcome::Frontier),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
