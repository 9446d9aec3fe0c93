//! Control-plane client: mutating operations routed through the sync/async dispatcher,
//! with optional waiting on the resulting jobs.

mod client;
mod resources;

pub use capi_jobs::{CallContext, JobResolver, PollingConfig, Resolution, MIN_POLL_INTERVAL};
pub use capi_types::{CapiError, Job, JobHandle, JobState, Outcome};
pub use client::{CapiClient, Finished, WaitError};
pub use resources::{
    BindingKind, CreateCredentialBinding, LastOperation, ServiceCredentialBinding,
};
