//! Blob service clients for the Azure Blob REST API.
//!
//! References are built the same way the provider SDKs build them: a [`BlobServiceClient`] for
//! the account, a [`ContainerClient`] for a container inside it, and a [`BlobClient`] for a blob
//! inside that. Building a reference performs no I/O and does not check the target exists.

use async_trait::async_trait;
use reqwest::{
    Client, Method,
    header::{CONTENT_LENGTH, HeaderName, HeaderValue},
};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{BlobCopier, CopyBlobRequest, CopyStarted, StorageCredentials, StorageError};
use crate::config::{ACCOUNT_PLACEHOLDER, StorageConfig};

static MS_VERSION: HeaderName = HeaderName::from_static("x-ms-version");
static MS_COPY_SOURCE: HeaderName = HeaderName::from_static("x-ms-copy-source");
static MS_COPY_STATUS: HeaderName = HeaderName::from_static("x-ms-copy-status");
static MS_COPY_ID: HeaderName = HeaderName::from_static("x-ms-copy-id");
static MS_ERROR_CODE: HeaderName = HeaderName::from_static("x-ms-error-code");

/// Client for one storage account's blob service.
#[derive(Debug, Clone)]
pub struct BlobServiceClient {
    http: Client,
    endpoint: Url,
    api_version: HeaderValue,
    credentials: StorageCredentials,
}

/// Reference to a container. Holds no state beyond its name.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    service: BlobServiceClient,
    name: String,
}

/// Reference to a single blob.
#[derive(Debug, Clone)]
pub struct BlobClient {
    container: ContainerClient,
    name: String,
}

impl BlobServiceClient {
    /// Resolve the blob endpoint for `credentials`' account from the configured template.
    pub fn new(http: Client, config: &StorageConfig, credentials: StorageCredentials) -> Result<Self, StorageError> {
        let account = credentials.account();
        let invalid = |reason: String| StorageError::InvalidEndpoint {
            account: account.to_string(),
            reason,
        };

        // The account name ends up in the host or path, so it must not be able to reshape the URL
        if account.is_empty() || !account.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("account names may only contain letters and digits".to_string()));
        }

        let endpoint =
            Url::parse(&config.blob_endpoint.replace(ACCOUNT_PLACEHOLDER, account)).map_err(|e| invalid(e.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(invalid("endpoint cannot be used as a base URL".to_string()));
        }

        let api_version = HeaderValue::from_str(&config.api_version)?;

        Ok(Self {
            http,
            endpoint,
            api_version,
            credentials,
        })
    }

    pub fn container_client(&self, name: impl Into<String>) -> Result<ContainerClient, StorageError> {
        let name = name.into();
        check_segment(&name, &name)?;
        Ok(ContainerClient {
            service: self.clone(),
            name,
        })
    }
}

impl ContainerClient {
    /// Reference a blob in this container. `/` in `name` separates virtual directories.
    pub fn blob_client(&self, name: impl Into<String>) -> Result<BlobClient, StorageError> {
        let name = name.into();
        for segment in name.split('/') {
            check_segment(segment, &name)?;
        }
        Ok(BlobClient {
            container: self.clone(),
            name,
        })
    }
}

/// `url` drops `.` and `..` segments and keeps empty ones, so any of those would address a
/// different blob than the one named.
fn check_segment(segment: &str, name: &str) -> Result<(), StorageError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(StorageError::InvalidResourceName { name: name.to_string() });
    }
    Ok(())
}

impl BlobClient {
    /// `<endpoint>/<container>/<blob>`. `/` inside the blob name stays a path separator;
    /// everything else is percent-encoded per segment.
    pub fn url(&self) -> Url {
        let mut url = self.container.service.endpoint.clone();
        // endpoint was checked with cannot_be_a_base() when the service client was built
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(&self.container.name);
            segments.extend(self.name.split('/'));
        }
        url
    }

    /// Start an asynchronous server-side copy of `source` into this blob.
    ///
    /// Returns as soon as the service has accepted the copy. The reported status is usually
    /// `pending`; small same-account copies may already be `success`.
    #[instrument(skip_all, fields(container = %self.container.name, blob = %self.name))]
    pub async fn start_copy_from_url(&self, source: &Url) -> Result<CopyStarted, StorageError> {
        let service = &self.container.service;

        let mut request = service
            .http
            .request(Method::PUT, self.url())
            .header(CONTENT_LENGTH, HeaderValue::from_static("0"))
            .header(&MS_VERSION, &service.api_version)
            .header(&MS_COPY_SOURCE, HeaderValue::from_str(source.as_str())?)
            .build()?;
        service.credentials.authorize(&mut request)?;

        debug!("Sending copy request to {}", request.url());
        let response = service.http.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let header_code = header_string(response.headers(), &MS_ERROR_CODE);
            let body = response.text().await.unwrap_or_default();
            debug!("Copy request rejected with {}: {}", status, body);
            return Err(service_error(status, header_code, &body));
        }

        let copy_status = header_string(response.headers(), &MS_COPY_STATUS).ok_or(StorageError::MissingCopyStatus)?;
        let copy_id = header_string(response.headers(), &MS_COPY_ID);
        debug!(status = %copy_status, copy_id = ?copy_id, "Copy accepted");

        Ok(CopyStarted {
            status: copy_status,
            copy_id,
        })
    }
}

fn header_string(headers: &reqwest::header::HeaderMap, name: &HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Error document returned by the blob service:
/// `<Error><Code>...</Code><Message>...</Message></Error>`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn service_error(status: reqwest::StatusCode, header_code: Option<String>, body: &str) -> StorageError {
    let parsed: ServiceErrorBody = if body.trim().is_empty() {
        ServiceErrorBody::default()
    } else {
        quick_xml::de::from_str(body).unwrap_or_default()
    };

    // The message carries RequestId/Time lines after the first; those belong in logs only
    let message = parsed
        .message
        .as_deref()
        .and_then(|m| m.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(str::to_string);

    StorageError::Service {
        status,
        code: header_code.or(parsed.code),
        message,
    }
}

/// [`BlobCopier`] backed by the Azure Blob REST API.
#[derive(Debug, Clone)]
pub struct AzureBlobCopier {
    http: Client,
    config: StorageConfig,
}

impl AzureBlobCopier {
    /// Build the shared HTTP client. Requires a rustls crypto provider to be installed.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl BlobCopier for AzureBlobCopier {
    async fn start_copy(&self, request: &CopyBlobRequest) -> Result<CopyStarted, StorageError> {
        let credentials = StorageCredentials::new(&request.account, &request.account_key)?;
        let service = BlobServiceClient::new(self.http.clone(), &self.config, credentials)?;
        let blob = service.container_client(&request.container)?.blob_client(&request.blob)?;

        let source = Url::parse(request.source_url.trim()).map_err(StorageError::InvalidSourceUrl)?;
        blob.start_copy_from_url(&source).await
    }
}
