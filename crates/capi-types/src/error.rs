//! Error taxonomy shared by the transport, the job resolver and the outcome dispatcher.

use crate::{ApiError, Job, JobState};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The exchange did not complete (connection, I/O, bad URL).
    #[error("request failed: {0}")]
    Request(String),
    /// The control plane answered with a non-2xx status.
    #[error("unexpected status {status}: {}", status_summary(.errors, .body))]
    Status {
        status: u16,
        errors: Vec<ApiError>,
        body: String,
    },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(_) => None,
        }
    }
}

fn status_summary(errors: &[ApiError], body: &str) -> String {
    if errors.is_empty() {
        return body.trim().to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
#[error("failed to decode {what}: {source}")]
pub struct DecodeError {
    pub what: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// A job reached `FAILED`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("job {guid} ({operation}) failed: {message}")]
pub struct JobFailedError {
    pub guid: String,
    pub operation: String,
    pub errors: Vec<ApiError>,
    message: String,
}

impl JobFailedError {
    pub fn from_job(job: &Job) -> Self {
        Self {
            guid: job.guid.clone(),
            operation: job.operation.clone(),
            errors: job.errors.clone(),
            message: aggregate_details(&job.errors),
        }
    }

    /// Aggregated error details: one error's detail verbatim, or a numbered list.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One error: its detail verbatim. Several: `1. first; 2. second`.
pub fn aggregate_details(errors: &[ApiError]) -> String {
    match errors {
        [] => "no error details reported".to_string(),
        [only] => only.detail.clone(),
        many => many
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {}", i + 1, e.detail))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Why polling stopped before a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StopReason {
    #[error("poll timeout of {0:?} elapsed")]
    PollTimeout(Duration),
    #[error("caller deadline elapsed")]
    CallerDeadline,
    #[error("canceled by caller")]
    Canceled,
}

/// Deadline or cancellation fired before the job was terminal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stopped waiting for job {guid} in state {}: {reason}", state_label(.last_state))]
pub struct PollTimeoutError {
    pub guid: String,
    pub last_state: Option<JobState>,
    #[source]
    pub reason: StopReason,
}

fn state_label(state: &Option<JobState>) -> &str {
    state.as_ref().map(JobState::as_str).unwrap_or("<never fetched>")
}

#[derive(Debug, thiserror::Error)]
pub enum CapiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error(transparent)]
    JobFailed(#[from] JobFailedError),
    #[error(transparent)]
    PollTimeout(#[from] PollTimeoutError),
    /// 202 Accepted without a usable job location.
    #[error("malformed async response (status {status}): {reason}")]
    MalformedAsyncResponse { status: u16, reason: String },
    #[error("invalid job guid: {0:?}")]
    InvalidJobGuid(String),
    /// A completed job lacks the link to the resource it produced.
    #[error("job {guid} completed without a {link:?} link")]
    MissingJobLink { guid: String, link: String },
}

impl CapiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CapiError::PollTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_job(errors: Vec<ApiError>) -> Job {
        let mut job = Job::new("j1", "service_broker.delete", JobState::Failed);
        job.errors = errors;
        job
    }

    #[test]
    fn single_error_detail_is_verbatim() {
        let job = failed_job(vec![ApiError::new(10008, "CF-X", "broker has instances")]);
        let err = JobFailedError::from_job(&job);
        assert_eq!(err.message(), "broker has instances");
        let shown = err.to_string();
        assert!(shown.contains("broker has instances"));
        assert!(shown.contains("service_broker.delete"));
    }

    #[test]
    fn several_errors_are_numbered() {
        let job = failed_job(vec![
            ApiError::new(10008, "CF-X", "broker has instances"),
            ApiError::new(10001, "CF-Y", "catalog unreachable"),
        ]);
        let err = JobFailedError::from_job(&job);
        assert_eq!(
            err.message(),
            "1. broker has instances; 2. catalog unreachable"
        );
    }

    #[test]
    fn timeout_names_last_state() {
        let err = PollTimeoutError {
            guid: "j1".to_string(),
            last_state: Some(JobState::Processing),
            reason: StopReason::Canceled,
        };
        let shown = err.to_string();
        assert!(shown.contains("PROCESSING"));
        assert!(shown.contains("canceled by caller"));
        assert!(CapiError::from(err).is_timeout());
    }
}
