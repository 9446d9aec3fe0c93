//! Classification of mutating responses: finished inline, or accepted as a job.
//!
//! Rule, in order:
//! 1. `202 Accepted` with a `Location` naming `…/jobs/{guid}` is `Outcome::Pending`.
//! 2. Any other 2xx with a body is decoded into the resource, `Outcome::Resolved`.
//! 3. Anything else that is 2xx is a malformed async response. Non-2xx is a transport error.

use capi_types::{CapiError, JobHandle, Outcome, RawResponse};
use serde::de::DeserializeOwned;

const ACCEPTED: u16 = 202;

/// Classify a mutating response whose synchronous form carries a `T` body.
pub fn dispatch<T: DeserializeOwned>(res: RawResponse) -> Result<Outcome<T>, CapiError> {
    let res = res.error_for_status()?;
    if res.status == ACCEPTED {
        return accepted_job(&res).map(Outcome::Pending);
    }
    if !res.has_body() {
        return Err(CapiError::MalformedAsyncResponse {
            status: res.status,
            reason: "success response carries neither a job location nor a body".to_string(),
        });
    }
    let resource: T = res.decode(std::any::type_name::<T>())?;
    tracing::debug!(status = res.status, "mutation completed synchronously");
    Ok(Outcome::Resolved(resource))
}

/// Classify a mutating response whose synchronous form has no body (typically 204).
pub fn dispatch_no_content(res: RawResponse) -> Result<Outcome<()>, CapiError> {
    let res = res.error_for_status()?;
    if res.status == ACCEPTED {
        return accepted_job(&res).map(Outcome::Pending);
    }
    tracing::debug!(status = res.status, "mutation completed synchronously");
    Ok(Outcome::Resolved(()))
}

fn accepted_job(res: &RawResponse) -> Result<JobHandle, CapiError> {
    let location = res
        .header("Location")
        .ok_or_else(|| CapiError::MalformedAsyncResponse {
            status: res.status,
            reason: "202 Accepted without a Location header".to_string(),
        })?;
    let guid = job_guid_from_location(location).ok_or_else(|| {
        CapiError::MalformedAsyncResponse {
            status: res.status,
            reason: format!("Location {:?} does not name a job", location),
        }
    })?;
    tracing::info!(job_guid = %guid, "mutation accepted as job");
    Ok(JobHandle::new(guid))
}

/// Job guid from a `Location` value such as `https://api.example.org/v3/jobs/abc` or
/// `/v3/jobs/abc`. Query and fragment are ignored.
pub fn job_guid_from_location(location: &str) -> Option<&str> {
    let location = location.trim();
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let path = match path.find("://") {
        Some(i) => {
            let rest = &path[i + 3..];
            rest.find('/').map(|j| &rest[j..])?
        }
        None => path,
    };
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let guid = segments.next()?;
    let parent = segments.next()?;
    (parent == "jobs" && !guid.is_empty()).then_some(guid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capi_types::{Headers, TransportError};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Binding {
        guid: String,
        name: String,
    }

    fn accepted(location: Option<&str>) -> RawResponse {
        let mut headers = Headers::new();
        if let Some(loc) = location {
            headers.insert("Location", loc);
        }
        RawResponse::new(202, headers, Vec::new())
    }

    #[test]
    fn accepted_with_location_is_pending() {
        let outcome: Outcome<Binding> =
            dispatch(accepted(Some("https://api.example.org/v3/jobs/abc"))).unwrap();
        assert_eq!(outcome, Outcome::Pending(JobHandle::new("abc")));
    }

    #[test]
    fn created_with_body_is_resolved() {
        let res = RawResponse::json(201, &json!({ "guid": "b1", "name": "creds" }));
        let outcome: Outcome<Binding> = dispatch(res).unwrap();
        assert_eq!(
            outcome,
            Outcome::Resolved(Binding {
                guid: "b1".to_string(),
                name: "creds".to_string()
            })
        );
    }

    #[test]
    fn accepted_without_location_is_malformed() {
        let err = dispatch::<Binding>(accepted(None)).unwrap_err();
        assert!(matches!(
            err,
            CapiError::MalformedAsyncResponse { status: 202, .. }
        ));
    }

    #[test]
    fn accepted_pointing_elsewhere_is_malformed() {
        let err = dispatch::<Binding>(accepted(Some("/v3/service_brokers/abc"))).unwrap_err();
        assert!(matches!(err, CapiError::MalformedAsyncResponse { .. }));
    }

    #[test]
    fn empty_success_other_than_accepted_is_malformed() {
        for status in [200, 201, 204] {
            let res = RawResponse::new(status, Headers::new(), "  \n");
            match dispatch::<Binding>(res).unwrap_err() {
                CapiError::MalformedAsyncResponse { status: seen, .. } => assert_eq!(seen, status),
                other => panic!("expected malformed response for {}, got {:?}", status, other),
            }
        }
    }

    #[test]
    fn location_on_non_accepted_status_is_ignored() {
        for status in [200, 201] {
            let mut res = RawResponse::json(status, &json!({ "guid": "b2", "name": "creds" }));
            res.headers.insert("Location", "/v3/jobs/not-a-job");
            let outcome: Outcome<Binding> = dispatch(res).unwrap();
            assert!(!outcome.is_pending());
            assert_eq!(outcome.into_resolved().map(|b| b.guid), Some("b2".to_string()));
        }
    }

    #[test]
    fn created_with_wrong_shape_is_decode_error() {
        let res = RawResponse::json(201, &json!({ "unexpected": true }));
        let err = dispatch::<Binding>(res).unwrap_err();
        assert!(matches!(err, CapiError::Decode(_)));
    }

    #[test]
    fn error_status_is_transport_error() {
        let res = RawResponse::json(
            422,
            &json!({ "errors": [{ "code": 10008, "title": "CF-UnprocessableEntity", "detail": "name taken" }] }),
        );
        match dispatch::<Binding>(res).unwrap_err() {
            CapiError::Transport(TransportError::Status { status, errors, .. }) => {
                assert_eq!(status, 422);
                assert_eq!(errors[0].detail, "name taken");
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn no_content_is_resolved_unit() {
        let res = RawResponse::new(204, Headers::new(), Vec::new());
        assert_eq!(dispatch_no_content(res).unwrap(), Outcome::Resolved(()));
        let outcome = dispatch_no_content(accepted(Some("/v3/jobs/j9"))).unwrap();
        assert_eq!(outcome.job().map(JobHandle::guid), Some("j9"));
    }

    #[test]
    fn location_forms() {
        assert_eq!(job_guid_from_location("/v3/jobs/abc"), Some("abc"));
        assert_eq!(job_guid_from_location("/v3/jobs/abc/"), Some("abc"));
        assert_eq!(
            job_guid_from_location("https://api.example.org/v3/jobs/abc?x=1#frag"),
            Some("abc")
        );
        assert_eq!(job_guid_from_location("https://api.example.org"), None);
        assert_eq!(job_guid_from_location("/v3/jobs/"), None);
        assert_eq!(job_guid_from_location("abc"), None);
    }
}
