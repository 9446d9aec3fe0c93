//! Job records (v3 `/v3/jobs/{guid}`) and the sync/async outcome of mutating calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// State of an asynchronous job.
///
/// The wire value is an open string. Only `PROCESSING`, `COMPLETE` and `FAILED` are
/// recognised; anything else is kept verbatim in `Other` and counts as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Processing,
    Complete,
    Failed,
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Processing => "PROCESSING",
            JobState::Complete => "COMPLETE",
            JobState::Failed => "FAILED",
            JobState::Other(s) => s.as_str(),
        }
    }

    /// `COMPLETE` or `FAILED`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PROCESSING" => JobState::Processing,
            "COMPLETE" => JobState::Complete,
            "FAILED" => JobState::Failed,
            _ => JobState::Other(s),
        }
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        JobState::from(s.to_string())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error as reported by the control plane (job errors and error envelopes).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl ApiError {
    pub fn new(code: i64, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.title, self.code, self.detail)
    }
}

/// Advisory message attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWarning {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Asynchronous operation record. Read-only from the client's side; every fetch is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub guid: String,
    #[serde(default)]
    pub operation: String,
    pub state: JobState,
    #[serde(default)]
    pub errors: Vec<ApiError>,
    #[serde(default)]
    pub warnings: Vec<JobWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, Link>,
}

impl Job {
    /// Bare job with no errors, warnings or links.
    pub fn new(guid: impl Into<String>, operation: impl Into<String>, state: JobState) -> Self {
        Self {
            guid: guid.into(),
            operation: operation.into(),
            state,
            errors: Vec::new(),
            warnings: Vec::new(),
            created_at: None,
            updated_at: None,
            links: HashMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Warning details in order.
    pub fn warning_details(&self) -> Vec<&str> {
        self.warnings.iter().map(|w| w.detail.as_str()).collect()
    }
}

/// Reference to a job accepted by the control plane. Carries only the guid; the state
/// must be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    guid: String,
}

impl JobHandle {
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.guid)
    }
}

/// Result of a mutating call: finished inline, or accepted as a job.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    Resolved(T),
    Pending(JobHandle),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    pub fn job(&self) -> Option<&JobHandle> {
        match self {
            Outcome::Pending(handle) => Some(handle),
            Outcome::Resolved(_) => None,
        }
    }

    pub fn into_resolved(self) -> Option<T> {
        match self {
            Outcome::Resolved(v) => Some(v),
            Outcome::Pending(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Resolved(v) => Outcome::Resolved(f(v)),
            Outcome::Pending(handle) => Outcome::Pending(handle),
        }
    }
}
