//! reqwest implementation of [`Transport`].

use capi_types::{ApiRequest, Headers, Method, RawResponse, Transport, TransportError};
use std::fmt;

/// Transport that sends requests to a control-plane API root (e.g. `https://api.example.org`).
///
/// The bearer token, when set, is sent verbatim; obtaining and refreshing it is up to the caller.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Use a preconfigured client (proxy, TLS roots, timeouts).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Reads `CF_API_URL` and `CF_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CF_API_URL").unwrap_or_else(|_| "http://localhost:9022".to_string());
        let token = std::env::var("CF_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Self::new(base_url, token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(&req.path);
        tracing::debug!(method = %req.method, url = %url, "sending request");

        let mut builder = self.client.request(reqwest_method(req.method), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        let res = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("{} {}: {}", req.method, url, e)))?;
        let status = res.status().as_u16();
        let headers: Headers = res
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = res
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("{} {}: {}", req.method, url, e)))?;

        tracing::debug!(method = %req.method, url = %url, status, "received response");
        Ok(RawResponse::new(status, headers, body.to_vec()))
    }
}
