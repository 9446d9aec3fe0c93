//! Asynchronous job handling: resolve jobs to a terminal state, and classify mutating
//! responses as finished inline or accepted as a job.

mod config;
mod context;
mod dispatch;
mod resolver;

pub use capi_types::{CapiError, Job, JobHandle, JobState, Outcome};
pub use config::{PollingConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, MIN_POLL_INTERVAL};
pub use context::CallContext;
pub use dispatch::{dispatch, dispatch_no_content, job_guid_from_location};
pub use resolver::{job_path, JobResolver, Resolution};
