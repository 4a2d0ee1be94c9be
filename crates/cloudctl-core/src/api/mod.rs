//! HTTP client for the storage and compute APIs
//!
//! Every mutating call returns an [`OperationHandle`]; reading the state of
//! that operation goes through the [`StatusFetcher`] implementation so the
//! same client can drive a [`Poller`](crate::operation::Poller).

pub mod models;

pub use models::{
    Disk, DiskCreateRequest, DiskResizeRequest, HostChannelAdapter, Instance, InstanceDisk,
    InterfaceIps, NetworkInterface, PrivateIpv4, PublicIpv4,
};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::attachment::AttachmentRecord;
use crate::operation::{Operation, OperationHandle, OperationKind, StatusFetcher};
use crate::reconcile::AttachmentSubmitter;
use models::{
    AttachDisksRequest, DetachDisksRequest, DiskAttachment, ListResponse, OperationResponse,
};

/// Transport-level failure talking to the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not the expected JSON
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build a status error, preferring the `message` field of a JSON body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("no response body")
                        .to_string()
                } else {
                    body.trim().to_string()
                }
            });
        ApiError::Status { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Request(e) => e.is_timeout(),
            ApiError::Status { status, .. } => *status == 408 || *status == 504,
            _ => false,
        }
    }

    /// Server errors, throttling and connection failures
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Request(e) => e.is_timeout() || e.is_connect(),
            ApiError::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }
}

/// Upper bound on a single request made by [`ApiClient::new`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one API endpoint and access token
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with a [`DEFAULT_REQUEST_TIMEOUT`] on every request
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Self::with_http_client(http, base_url, access_token)
    }

    /// Use a preconfigured `reqwest::Client` (timeouts, proxies, user agent)
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        access_token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self {
            http,
            base_url,
            access_token: access_token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn submit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        project_id: &str,
        kind: OperationKind,
    ) -> Result<OperationHandle, ApiError> {
        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response: OperationResponse = self.send(request).await?;
        debug!(
            "Submitted {} operation {} ({})",
            kind, response.operation.operation_id, response.operation.state
        );
        Ok(OperationHandle::new(
            response.operation.operation_id,
            project_id,
            kind,
        ))
    }

    // Disks

    pub async fn create_disk(
        &self,
        project_id: &str,
        request: &DiskCreateRequest,
    ) -> Result<OperationHandle, ApiError> {
        let url = self.endpoint(&["projects", project_id, "storage", "disks"]);
        self.submit(Method::POST, url, Some(request), project_id, OperationKind::Disk)
            .await
    }

    pub async fn resize_disk(
        &self,
        project_id: &str,
        disk_id: &str,
        request: &DiskResizeRequest,
    ) -> Result<OperationHandle, ApiError> {
        let url = self.endpoint(&["projects", project_id, "storage", "disks", disk_id]);
        self.submit(Method::PATCH, url, Some(request), project_id, OperationKind::Disk)
            .await
    }

    pub async fn delete_disk(
        &self,
        project_id: &str,
        disk_id: &str,
    ) -> Result<OperationHandle, ApiError> {
        let url = self.endpoint(&["projects", project_id, "storage", "disks", disk_id]);
        self.submit::<()>(Method::DELETE, url, None, project_id, OperationKind::Disk)
            .await
    }

    pub async fn list_disks(&self, project_id: &str) -> Result<Vec<Disk>, ApiError> {
        let url = self.endpoint(&["projects", project_id, "storage", "disks"]);
        let response: ListResponse<Disk> = self.send(self.request(Method::GET, url)).await?;
        Ok(response.items)
    }

    pub async fn get_disk_operation(
        &self,
        project_id: &str,
        operation_id: &str,
    ) -> Result<Operation, ApiError> {
        let url = self.endpoint(&[
            "projects",
            project_id,
            "storage",
            "disks",
            "operations",
            operation_id,
        ]);
        self.send(self.request(Method::GET, url)).await
    }

    // Instances

    pub async fn get_instance(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<Instance, ApiError> {
        let url = self.endpoint(&[
            "projects",
            project_id,
            "compute",
            "vms",
            "instances",
            instance_id,
        ]);
        self.send(self.request(Method::GET, url)).await
    }

    pub async fn attach_disks(
        &self,
        project_id: &str,
        instance_id: &str,
        records: &[AttachmentRecord],
    ) -> Result<OperationHandle, ApiError> {
        let url = self.instance_action(project_id, instance_id, "attach-disks");
        let body = AttachDisksRequest {
            attach_disks: records.iter().map(DiskAttachment::from).collect(),
        };
        self.submit(Method::POST, url, Some(&body), project_id, OperationKind::Instance)
            .await
    }

    pub async fn detach_disks(
        &self,
        project_id: &str,
        instance_id: &str,
        disk_ids: &[String],
    ) -> Result<OperationHandle, ApiError> {
        let url = self.instance_action(project_id, instance_id, "detach-disks");
        let body = DetachDisksRequest {
            detach_disks: disk_ids.to_vec(),
        };
        self.submit(Method::POST, url, Some(&body), project_id, OperationKind::Instance)
            .await
    }

    pub async fn get_instance_operation(
        &self,
        project_id: &str,
        operation_id: &str,
    ) -> Result<Operation, ApiError> {
        let url = self.endpoint(&[
            "projects",
            project_id,
            "compute",
            "vms",
            "instances",
            "operations",
            operation_id,
        ]);
        self.send(self.request(Method::GET, url)).await
    }

    fn instance_action(&self, project_id: &str, instance_id: &str, action: &str) -> Url {
        self.endpoint(&[
            "projects",
            project_id,
            "compute",
            "vms",
            "instances",
            instance_id,
            action,
        ])
    }
}

#[async_trait]
impl StatusFetcher for ApiClient {
    async fn fetch(
        &self,
        project_id: &str,
        operation_id: &str,
        kind: OperationKind,
    ) -> Result<Operation, ApiError> {
        match kind {
            OperationKind::Disk => self.get_disk_operation(project_id, operation_id).await,
            OperationKind::Instance => self.get_instance_operation(project_id, operation_id).await,
        }
    }
}

#[async_trait]
impl AttachmentSubmitter for ApiClient {
    async fn attach(
        &self,
        project_id: &str,
        instance_id: &str,
        record: &AttachmentRecord,
    ) -> Result<OperationHandle, ApiError> {
        self.attach_disks(project_id, instance_id, std::slice::from_ref(record))
            .await
    }

    async fn detach(
        &self,
        project_id: &str,
        instance_id: &str,
        record: &AttachmentRecord,
    ) -> Result<OperationHandle, ApiError> {
        self.detach_disks(project_id, instance_id, std::slice::from_ref(&record.id))
            .await
    }
}
