//! Scripted transport for tests: canned replies per route, no network.

use capi_types::{ApiRequest, Job, Method, RawResponse, Transport, TransportError};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Reply {
    Response(RawResponse),
    Error(String),
}

/// A request seen by [`MockTransport`], with the (tokio) instant it arrived.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub at: Instant,
}

/// Transport that answers from per-route queues.
///
/// Replies for a `(method, path)` are consumed in order; the last one repeats for every
/// later request on that route. Unscripted routes answer 404 with a control-plane error
/// envelope.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, method: Method, path: impl Into<String>, response: RawResponse) {
        self.push_reply(method, path.into(), Reply::Response(response));
    }

    pub fn push_error(&self, method: Method, path: impl Into<String>, message: impl Into<String>) {
        self.push_reply(method, path.into(), Reply::Error(message.into()));
    }

    /// Queue `job` as the next answer to `GET /v3/jobs/{guid}`.
    pub fn push_job(&self, job: &Job) {
        let body = serde_json::to_value(job).expect("job serializes");
        self.push(
            Method::Get,
            format!("/v3/jobs/{}", job.guid),
            RawResponse::json(200, &body),
        );
    }

    fn push_reply(&self, method: Method, path: String, reply: Reply) {
        self.routes
            .lock()
            .expect("mock routes lock")
            .entry((method, path))
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock requests lock").clone()
    }

    /// Number of requests seen for `(method, path)`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .expect("mock requests lock")
            .iter()
            .filter(|r| r.request.method == method && r.request.path == path)
            .count()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().expect("mock routes lock");
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests
            .lock()
            .expect("mock requests lock")
            .push(RecordedRequest {
                request: req.clone(),
                at: Instant::now(),
            });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.next_reply(req.method, &req.path) {
            Some(Reply::Response(res)) => Ok(res),
            Some(Reply::Error(message)) => Err(TransportError::Request(message)),
            None => Ok(RawResponse::json(
                404,
                &json!({
                    "errors": [{
                        "code": 10010,
                        "title": "CF-ResourceNotFound",
                        "detail": format!("{} {} not scripted", req.method, req.path)
                    }]
                }),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capi_types::JobState;

    #[tokio::test]
    async fn last_reply_repeats() {
        let mock = MockTransport::new();
        mock.push_job(&Job::new("j1", "app.delete", JobState::Processing));
        mock.push_job(&Job::new("j1", "app.delete", JobState::Complete));

        let mut states = Vec::new();
        for _ in 0..3 {
            let res = mock.send(ApiRequest::get("/v3/jobs/j1")).await.unwrap();
            let job: Job = res.decode("job").unwrap();
            states.push(job.state);
        }
        assert_eq!(
            states,
            vec![JobState::Processing, JobState::Complete, JobState::Complete]
        );
        assert_eq!(mock.count(Method::Get, "/v3/jobs/j1"), 3);
    }

    #[tokio::test]
    async fn unscripted_route_is_not_found() {
        let mock = MockTransport::new();
        let res = mock.send(ApiRequest::delete("/v3/apps/x")).await.unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.api_errors()[0].title, "CF-ResourceNotFound");
    }
}
