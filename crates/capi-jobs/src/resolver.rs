//! Job resolver: fetch a job, or poll it until it is terminal.

use crate::{CallContext, PollingConfig, MIN_POLL_INTERVAL};
use capi_types::{
    ApiRequest, CapiError, Job, JobFailedError, JobHandle, JobState, PollTimeoutError,
    StopReason, Transport,
};
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Path of a job resource relative to the API root.
pub fn job_path(guid: &str) -> String {
    format!("/v3/jobs/{}", guid)
}

/// Final word of one `resolve` call. Every variant carries the last job observed, so a
/// caller can keep tracking the operation even when polling gave up.
#[derive(Debug)]
#[must_use]
pub enum Resolution {
    /// Job reached `COMPLETE`.
    Complete(Job),
    /// Job reached `FAILED`.
    Failed { job: Job, error: JobFailedError },
    /// Deadline or cancellation fired first. `last` is `None` only if no fetch succeeded.
    Stopped {
        last: Option<Job>,
        error: PollTimeoutError,
    },
    /// A fetch failed (transport, decode, not found).
    Errored { last: Option<Job>, error: CapiError },
}

impl Resolution {
    /// Last job observed.
    pub fn job(&self) -> Option<&Job> {
        match self {
            Resolution::Complete(job) | Resolution::Failed { job, .. } => Some(job),
            Resolution::Stopped { last, .. } | Resolution::Errored { last, .. } => last.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Resolution::Complete(_))
    }

    pub fn into_parts(self) -> (Option<Job>, Result<(), CapiError>) {
        match self {
            Resolution::Complete(job) => (Some(job), Ok(())),
            Resolution::Failed { job, error } => (Some(job), Err(error.into())),
            Resolution::Stopped { last, error } => (last, Err(error.into())),
            Resolution::Errored { last, error } => (last, Err(error)),
        }
    }

    /// Drops the last-known job on failure.
    pub fn into_result(self) -> Result<Job, CapiError> {
        match self {
            Resolution::Complete(job) => Ok(job),
            Resolution::Failed { error, .. } => Err(error.into()),
            Resolution::Stopped { error, .. } => Err(error.into()),
            Resolution::Errored { error, .. } => Err(error),
        }
    }
}

/// Reads jobs through a [`Transport`] and polls them to a terminal state.
///
/// Holds nothing but the transport and an immutable [`PollingConfig`]; concurrent calls
/// for the same job poll independently.
pub struct JobResolver<T> {
    transport: T,
    config: PollingConfig,
}

impl<T: Transport> JobResolver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PollingConfig::default())
    }

    /// The fields are public, so the interval floor is applied again here.
    pub fn with_config(transport: T, mut config: PollingConfig) -> Self {
        config.interval = config.interval.max(MIN_POLL_INTERVAL);
        Self { transport, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One GET of the job. 404 is `JobNotFound`; other non-2xx statuses are transport errors.
    pub async fn fetch(&self, guid: &str) -> Result<Job, CapiError> {
        validate_guid(guid)?;
        let res = self.transport.send(ApiRequest::get(job_path(guid))).await?;
        if res.status == 404 {
            return Err(CapiError::JobNotFound(guid.to_string()));
        }
        let job: Job = res.error_for_status()?.decode("job")?;
        Ok(job)
    }

    pub async fn resolve_handle(&self, handle: &JobHandle, ctx: &CallContext) -> Resolution {
        self.resolve(handle.guid(), ctx).await
    }

    /// Poll until the job is terminal, the poll timeout or the caller's deadline elapses, or
    /// the caller cancels. Fetches are sequential, `interval` apart; both the wait and an
    /// in-flight fetch are abandoned as soon as cancellation or the deadline fires.
    pub async fn resolve(&self, guid: &str, ctx: &CallContext) -> Resolution {
        let now = Instant::now();
        let poll_deadline = now
            .checked_add(self.config.timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let (deadline, deadline_reason) = match ctx.deadline() {
            Some(d) if d < poll_deadline => (d, StopReason::CallerDeadline),
            _ => (poll_deadline, StopReason::PollTimeout(self.config.timeout)),
        };
        let token = ctx.token();
        let mut last: Option<Job> = None;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let fetched = tokio::select! {
                biased;
                _ = token.cancelled() => return stopped(guid, last, StopReason::Canceled),
                _ = sleep_until(deadline) => return stopped(guid, last, deadline_reason),
                r = self.fetch(guid) => r,
            };
            let job = match fetched {
                Ok(job) => job,
                Err(error) => {
                    tracing::warn!(job_guid = %guid, attempt, error = %error, "job fetch failed");
                    return Resolution::Errored { last, error };
                }
            };
            tracing::debug!(job_guid = %guid, attempt, state = %job.state, "polled job");

            match job.state {
                JobState::Complete => {
                    tracing::info!(
                        job_guid = %guid,
                        operation = %job.operation,
                        attempts = attempt,
                        warnings = job.warnings.len(),
                        "job complete"
                    );
                    return Resolution::Complete(job);
                }
                JobState::Failed => {
                    let error = JobFailedError::from_job(&job);
                    tracing::warn!(
                        job_guid = %guid,
                        operation = %job.operation,
                        errors = %error.message(),
                        "job failed"
                    );
                    return Resolution::Failed { job, error };
                }
                JobState::Processing => {}
                JobState::Other(ref state) => {
                    tracing::warn!(job_guid = %guid, state = %state, "unrecognised job state, still polling");
                }
            }
            last = Some(job);

            tokio::select! {
                biased;
                _ = token.cancelled() => return stopped(guid, last, StopReason::Canceled),
                _ = sleep_until(deadline) => return stopped(guid, last, deadline_reason),
                _ = sleep(self.config.interval) => {}
            }
        }
    }
}

fn validate_guid(guid: &str) -> Result<(), CapiError> {
    if guid.trim().is_empty() || guid.contains(['/', '?', '#']) {
        return Err(CapiError::InvalidJobGuid(guid.to_string()));
    }
    Ok(())
}

fn stopped(guid: &str, last: Option<Job>, reason: StopReason) -> Resolution {
    let last_state = last.as_ref().map(|j| j.state.clone());
    tracing::warn!(
        job_guid = %guid,
        state = last_state.as_ref().map(JobState::as_str).unwrap_or("<none>"),
        reason = %reason,
        "stopped polling job before a terminal state"
    );
    Resolution::Stopped {
        last,
        error: PollTimeoutError {
            guid: guid.to_string(),
            last_state,
            reason,
        },
    }
}
