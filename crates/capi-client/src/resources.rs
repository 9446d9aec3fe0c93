//! Representative resource operations. Brokers and apps always delete in the background;
//! credential bindings are created inline or as a job depending on the service instance.

use crate::client::{settle, WaitError};
use crate::CapiClient;
use capi_jobs::CallContext;
use capi_types::{ApiRequest, CapiError, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    App,
    Key,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCredentialBinding {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: BindingKind,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
}

/// Body of `POST /v3/service_credential_bindings`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCredentialBinding {
    pub kind: BindingKind,
    pub name: Option<String>,
    pub service_instance_guid: String,
    pub app_guid: Option<String>,
    pub parameters: Option<serde_json::Value>,
}

impl CreateCredentialBinding {
    pub fn app(service_instance_guid: impl Into<String>, app_guid: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::App,
            name: None,
            service_instance_guid: service_instance_guid.into(),
            app_guid: Some(app_guid.into()),
            parameters: None,
        }
    }

    pub fn key(service_instance_guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::Key,
            name: Some(name.into()),
            service_instance_guid: service_instance_guid.into(),
            app_guid: None,
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    fn to_body(&self) -> serde_json::Value {
        let mut relationships = json!({
            "service_instance": { "data": { "guid": self.service_instance_guid } }
        });
        if let Some(ref app) = self.app_guid {
            relationships["app"] = json!({ "data": { "guid": app } });
        }
        let mut body = json!({ "type": self.kind, "relationships": relationships });
        if let Some(ref name) = self.name {
            body["name"] = json!(name);
        }
        if let Some(ref parameters) = self.parameters {
            body["parameters"] = parameters.clone();
        }
        body
    }
}

const BINDING_LINK: &str = "service_credential_binding";

impl CapiClient {
    pub async fn delete_service_broker(&self, guid: &str) -> Result<Outcome<()>, CapiError> {
        self.mutate_no_content(ApiRequest::delete(format!("/v3/service_brokers/{}", guid)))
            .await
    }

    pub async fn delete_app(&self, guid: &str) -> Result<Outcome<()>, CapiError> {
        self.mutate_no_content(ApiRequest::delete(format!("/v3/apps/{}", guid)))
            .await
    }

    pub async fn get_service_credential_binding(
        &self,
        guid: &str,
    ) -> Result<ServiceCredentialBinding, CapiError> {
        self.get(&format!("/v3/service_credential_bindings/{}", guid))
            .await
    }

    /// Inline (201) for user-provided instances, a job (202) for managed ones.
    pub async fn create_service_credential_binding(
        &self,
        req: &CreateCredentialBinding,
    ) -> Result<Outcome<ServiceCredentialBinding>, CapiError> {
        self.mutate(ApiRequest::post(
            "/v3/service_credential_bindings",
            req.to_body(),
        ))
        .await
    }

    /// Create a binding and, when the create runs as a job, wait for it and read the
    /// binding the job links to. A failed or stopped job comes back on the error.
    pub async fn create_service_credential_binding_and_wait(
        &self,
        req: &CreateCredentialBinding,
        ctx: &CallContext,
    ) -> Result<ServiceCredentialBinding, WaitError> {
        match self.create_service_credential_binding(req).await? {
            Outcome::Resolved(binding) => Ok(binding),
            Outcome::Pending(handle) => {
                let job = settle(self.wait(&handle, ctx).await)?;
                let Some(guid) = job
                    .links
                    .get(BINDING_LINK)
                    .and_then(|link| last_path_segment(&link.href))
                else {
                    let error = CapiError::MissingJobLink {
                        guid: job.guid.clone(),
                        link: BINDING_LINK.to_string(),
                    };
                    return Err(WaitError {
                        job: Some(job),
                        error,
                    });
                };
                let guid = guid.to_string();
                self.get_service_credential_binding(&guid)
                    .await
                    .map_err(|error| WaitError {
                        job: Some(job),
                        error,
                    })
            }
        }
    }

    pub async fn delete_service_credential_binding(
        &self,
        guid: &str,
    ) -> Result<Outcome<()>, CapiError> {
        self.mutate_no_content(ApiRequest::delete(format!(
            "/v3/service_credential_bindings/{}",
            guid
        )))
        .await
    }
}

fn last_path_segment(href: &str) -> Option<&str> {
    href.split(['?', '#'])
        .next()
        .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
        .filter(|s| !s.is_empty())
}
