pub mod covariance;
pub mod frontier;
pub mod optimize;

use colored::Colorize;
use portfolio_engine_core::background::{
    BackgroundExecutor, TaskEventKind, TaskOutcome, TaskRequest,
};
use portfolio_engine_core::EngineConfig;

use crate::input::CliResult;

/// Run one task through the background executor, echoing progress lines to
/// stderr, and return its outcome.
pub(crate) async fn run_task_with_progress(
    request: TaskRequest,
    config: EngineConfig,
) -> CliResult<TaskOutcome> {
    let (executor, mut events) = BackgroundExecutor::start(config);
    let task_id = executor.submit(request)?;

    while let Some(event) = events.recv().await {
        if event.task_id != task_id {
            continue;
        }
        match event.kind {
            TaskEventKind::Queued => {}
            TaskEventKind::Started => eprintln!("{}", "started".dimmed()),
            TaskEventKind::Progress { percent, stage } => {
                eprintln!("{} {}", format!("[{:>3}%]", percent).cyan(), stage);
            }
            TaskEventKind::Completed {
                outcome,
                elapsed_ms,
            } => {
                eprintln!("{}", format!("completed in {} ms", elapsed_ms).green());
                return Ok(outcome);
            }
            TaskEventKind::Failed { message, .. } => return Err(message.into()),
            TaskEventKind::Cancelled => return Err("task cancelled".into()),
        }
    }
    Err("event stream closed before completion".into())
}
