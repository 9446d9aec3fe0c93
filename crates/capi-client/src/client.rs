//! Client core: send mutations, classify their outcome, wait on jobs.

use capi_http::HttpTransport;
use capi_jobs::{dispatch, dispatch_no_content, CallContext, JobResolver, PollingConfig, Resolution};
use capi_types::{ApiRequest, CapiError, Job, JobHandle, Outcome, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// How a mutation ended once waited on.
#[derive(Debug, Clone, PartialEq)]
pub enum Finished<T> {
    /// Completed synchronously with the final resource.
    Inline(T),
    /// Completed through a job that reached `COMPLETE`.
    Job(Job),
}

/// A wait that did not reach `COMPLETE`, with the last job observed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct WaitError {
    /// `None` when the job was never fetched, or the call failed before any job existed.
    pub job: Option<Job>,
    #[source]
    pub error: CapiError,
}

impl WaitError {
    pub fn into_parts(self) -> (Option<Job>, CapiError) {
        (self.job, self.error)
    }
}

impl From<CapiError> for WaitError {
    fn from(error: CapiError) -> Self {
        Self { job: None, error }
    }
}

/// `Complete` yields the job; every other resolution keeps its job on the error.
pub(crate) fn settle(resolution: Resolution) -> Result<Job, WaitError> {
    match resolution {
        Resolution::Complete(job) => Ok(job),
        Resolution::Failed { job, error } => Err(WaitError {
            job: Some(job),
            error: error.into(),
        }),
        Resolution::Stopped { last, error } => Err(WaitError {
            job: last,
            error: error.into(),
        }),
        Resolution::Errored { last, error } => Err(WaitError { job: last, error }),
    }
}

/// Control-plane client over any [`Transport`].
pub struct CapiClient {
    transport: Arc<dyn Transport>,
    jobs: JobResolver<Arc<dyn Transport>>,
}

impl CapiClient {
    pub fn new(transport: Arc<dyn Transport>, polling: PollingConfig) -> Self {
        let jobs = JobResolver::with_config(Arc::clone(&transport), polling);
        Self { transport, jobs }
    }

    /// `HttpTransport::from_env` with the given polling settings.
    pub fn from_env_with(polling: PollingConfig) -> Self {
        Self::new(Arc::new(HttpTransport::from_env()), polling)
    }

    pub fn jobs(&self) -> &JobResolver<Arc<dyn Transport>> {
        &self.jobs
    }

    /// GET a resource and decode it.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CapiError> {
        let res = self.transport.send(ApiRequest::get(path)).await?;
        let resource = res
            .error_for_status()?
            .decode(std::any::type_name::<T>())?;
        Ok(resource)
    }

    /// Send a mutation whose synchronous answer carries a `T`.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
    ) -> Result<Outcome<T>, CapiError> {
        let (method, path) = (req.method, req.path.clone());
        let res = self.transport.send(req).await?;
        let outcome = dispatch(res)?;
        log_outcome(method, &path, &outcome);
        Ok(outcome)
    }

    /// Send a mutation whose synchronous answer has no body.
    pub async fn mutate_no_content(&self, req: ApiRequest) -> Result<Outcome<()>, CapiError> {
        let (method, path) = (req.method, req.path.clone());
        let res = self.transport.send(req).await?;
        let outcome = dispatch_no_content(res)?;
        log_outcome(method, &path, &outcome);
        Ok(outcome)
    }

    pub async fn get_job(&self, guid: &str) -> Result<Job, CapiError> {
        self.jobs.fetch(guid).await
    }

    pub async fn wait(&self, handle: &JobHandle, ctx: &CallContext) -> Resolution {
        self.jobs.resolve_handle(handle, ctx).await
    }

    /// Wait on a pending outcome; a resolved one is returned as is.
    ///
    /// On failure or timeout the error still carries the last job, warnings included.
    pub async fn finish<T>(
        &self,
        outcome: Outcome<T>,
        ctx: &CallContext,
    ) -> Result<Finished<T>, WaitError> {
        match outcome {
            Outcome::Resolved(resource) => Ok(Finished::Inline(resource)),
            Outcome::Pending(handle) => {
                let job = settle(self.wait(&handle, ctx).await)?;
                Ok(Finished::Job(job))
            }
        }
    }
}

fn log_outcome<T>(method: capi_types::Method, path: &str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Resolved(_) => tracing::info!(%method, path, "completed synchronously"),
        Outcome::Pending(handle) => {
            tracing::info!(%method, path, job_guid = %handle, "accepted as job")
        }
    }
}
