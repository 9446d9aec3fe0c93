//! Transport contract: one HTTP exchange in, status + headers + body out.

use crate::{ApiError, DecodeError, TransportError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request handed to a [`Transport`]. `path` is relative to the API root (e.g. `/v3/jobs/abc`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response headers. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Completed HTTP exchange as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiError>,
}

impl RawResponse {
    pub fn new(status: u16, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// JSON response with no headers besides content type.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let headers = Headers::from_iter([("Content-Type", "application/json")]);
        Self::new(status, headers, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// True when the body holds anything besides whitespace.
    pub fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn decode<T: DeserializeOwned>(&self, what: &'static str) -> Result<T, DecodeError> {
        serde_json::from_slice(&self.body).map_err(|source| DecodeError { what, source })
    }

    /// Errors from a `{"errors": [...]}` envelope; empty when the body has another shape.
    pub fn api_errors(&self) -> Vec<ApiError> {
        serde_json::from_slice::<ErrorEnvelope>(&self.body)
            .map(|e| e.errors)
            .unwrap_or_default()
    }

    /// Pass 2xx responses through; turn anything else into `TransportError::Status`.
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(TransportError::Status {
            status: self.status,
            errors: self.api_errors(),
            body: self.body_text(),
        })
    }
}

/// Issues one HTTP exchange against the control plane.
///
/// Implementations return any status code as a `RawResponse`; only failures to complete
/// the exchange (connection, I/O, invalid URL) are `TransportError::Request`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, TransportError> {
        (**self).send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_ignores_case() {
        let headers = Headers::from_iter([("location", "/v3/jobs/abc")]);
        assert_eq!(headers.get("Location"), Some("/v3/jobs/abc"));
        assert_eq!(headers.get("LOCATION"), Some("/v3/jobs/abc"));
        assert_eq!(headers.get("Content-Type"), None);
    }

    #[test]
    fn error_for_status_decodes_envelope() {
        let res = RawResponse::json(
            422,
            &json!({ "errors": [{ "code": 10008, "title": "CF-UnprocessableEntity", "detail": "name taken" }] }),
        );
        match res.error_for_status() {
            Err(TransportError::Status { status, errors, .. }) => {
                assert_eq!(status, 422);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].detail, "name taken");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_body_is_empty() {
        let res = RawResponse::new(204, Headers::new(), " \n");
        assert!(!res.has_body());
        assert!(res.is_success());
    }
}
