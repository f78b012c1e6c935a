//! Request-issuing seam between the dispatcher and the resource server.

use async_trait::async_trait;
use reqwest::{multipart::Form, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{Job, JobId, Service, ServiceEnvelope, ServiceId, User, Volume, VolumeId},
    protocol::{JobCreatedResponse, JobsResponse, ServicesResponse, UserResponse, VolumesResponse},
};
use tracing::debug;
use url::{ParseError, Url};

use crate::ClientError;

/// Multipart body of a job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub service_id: ServiceId,
    pub fields: Vec<(String, String)>,
}

impl JobSubmission {
    fn into_form(self) -> Form {
        self.fields.into_iter().fold(
            Form::new().text("serviceID", self.service_id.0),
            |form, (key, value)| form.text(key, value),
        )
    }
}

#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError>;
    async fn get_service(&self, id: &ServiceId) -> Result<ServiceEnvelope, ClientError>;
    async fn update_service(&self, service: &Service) -> Result<ServiceEnvelope, ClientError>;
    async fn list_jobs(&self) -> Result<Vec<Job>, ClientError>;
    async fn create_job(&self, submission: JobSubmission) -> Result<JobId, ClientError>;
    async fn delete_job(&self, id: &JobId) -> Result<Value, ClientError>;
    async fn job_output(&self, id: &JobId) -> Result<Value, ClientError>;
    async fn list_volumes(&self) -> Result<Vec<Volume>, ClientError>;
    async fn inspect_volume(&self, id: &VolumeId) -> Result<Value, ClientError>;
    async fn current_user(&self) -> Result<User, ClientError>;
}

/// [`ResourceApi`] over HTTP, rooted at the configured API base.
pub struct HttpResourceApi {
    http: Client,
    api_base: Url,
}

impl HttpResourceApi {
    pub fn new(api_base: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), api_base)
    }

    pub fn with_client(http: Client, api_base: &str) -> Result<Self, ClientError> {
        let api_base = Url::parse(api_base)?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(api_base.scheme().to_string()));
        }
        Ok(Self { http, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Appends `segments` to the base path, percent-encoding each one so an
    /// ID cannot add path levels, a query or a fragment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut endpoint = self.api_base.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "http: GET");
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

/// Reads a body the server does not promise to be JSON.
async fn read_payload(response: Response) -> Result<Value, ClientError> {
    let text = response.error_for_status()?.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        let body: ServicesResponse = self.get_json(&["services"]).await?;
        Ok(body.services)
    }

    async fn get_service(&self, id: &ServiceId) -> Result<ServiceEnvelope, ClientError> {
        self.get_json(&["services", id.as_str()]).await
    }

    async fn update_service(&self, service: &Service) -> Result<ServiceEnvelope, ClientError> {
        debug!(service_id = %service.id, "http: PUT service");
        Ok(self
            .http
            .put(self.endpoint(&["services", service.id.as_str()])?)
            .json(service)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let body: JobsResponse = self.get_json(&["jobs"]).await?;
        Ok(body.jobs)
    }

    async fn create_job(&self, submission: JobSubmission) -> Result<JobId, ClientError> {
        debug!(service_id = %submission.service_id, fields = submission.fields.len(), "http: POST job");
        let body: JobCreatedResponse = self
            .http
            .post(self.endpoint(&["jobs"])?)
            .multipart(submission.into_form())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.job_id)
    }

    async fn delete_job(&self, id: &JobId) -> Result<Value, ClientError> {
        debug!(job_id = %id, "http: DELETE job");
        let response = self
            .http
            .delete(self.endpoint(&["jobs", id.as_str()])?)
            .send()
            .await?;
        read_payload(response).await
    }

    async fn job_output(&self, id: &JobId) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["jobs", id.as_str(), "output"])?)
            .send()
            .await?;
        read_payload(response).await
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>, ClientError> {
        let body: VolumesResponse = self.get_json(&["volumes"]).await?;
        Ok(body.volumes)
    }

    async fn inspect_volume(&self, id: &VolumeId) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["volumes", id.as_str(), ""])?)
            .send()
            .await?;
        read_payload(response).await
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        let body: UserResponse = self.get_json(&["user"]).await?;
        Ok(body.user)
    }
}
