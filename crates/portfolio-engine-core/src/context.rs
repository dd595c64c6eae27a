use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::EngineResult;

type ProgressFn = dyn Fn(u8, &str) + Send + Sync;

/// Cancellation and progress plumbing threaded through the compute pipeline.
///
/// The synchronous call path uses [`ExecutionContext::foreground`], which
/// never cancels and reports nowhere. The background layer installs a live
/// token plus a callback that forwards onto its event channel.
pub struct ExecutionContext {
    cancel: CancellationToken,
    on_progress: Option<Box<ProgressFn>>,
}

impl ExecutionContext {
    /// Context for direct synchronous calls: no cancellation, no progress.
    pub fn foreground() -> Self {
        Self {
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Context driven by an external cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            on_progress: None,
        }
    }

    /// Install a progress callback.
    pub fn on_progress(mut self, f: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Poll the cancellation token. Cancellation is honoured only at these
    /// loop boundaries, never by preemption.
    pub fn checkpoint(&self) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            Err(EngineError::TaskCancelled)
        } else {
            Ok(())
        }
    }

    /// Report coarse progress: percent of total work plus a stage message.
    pub fn report(&self, percent: u8, stage: &str) {
        if let Some(cb) = &self.on_progress {
            cb(percent.min(100), stage);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::foreground()
    }
}

/// Emission stride for a loop of `total` iterations: roughly every 10%.
pub(crate) fn progress_stride(total: usize) -> usize {
    (total / 10).max(1)
}

pub(crate) fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((done * 100) / total).min(100) as u8
    }
}
