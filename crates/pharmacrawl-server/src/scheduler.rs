//! Background job scheduler.
//!
//! When a cron expression is configured, a job triggers the same start path
//! as `POST /api/v1/crawl`. A tick that lands while a run is in progress is
//! skipped.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;
use crate::runner::{start_crawl, StartError};

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// schedule is not a valid cron expression, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    schedule: Option<&str>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    if let Some(schedule) = schedule {
        register_crawl_job(&scheduler, state, schedule).await?;
        tracing::info!(schedule, "scheduled crawl registered");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_crawl_job(
    scheduler: &JobScheduler,
    state: AppState,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting crawl");
            match start_crawl(&state).await {
                Ok(targets) => {
                    tracing::info!(targets = targets.len(), "scheduler: crawl started");
                }
                Err(StartError::AlreadyRunning) => {
                    tracing::info!("scheduler: crawl already running; skipping tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: crawl could not start");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
