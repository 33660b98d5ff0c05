//! Outbound access to the destination blob service.
//!
//! The handler talks to storage through the [`BlobCopier`] trait. [`AzureBlobCopier`] is the
//! production implementation: it authenticates with the destination account's SharedKey,
//! resolves a container/blob reference and issues a single
//! [Copy Blob](https://learn.microsoft.com/en-us/rest/api/storageservices/copy-blob) request.
//! The service performs the copy asynchronously; only the status reported when the copy was
//! accepted is returned.

mod client;
mod credential;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error as ThisError;

pub use client::{AzureBlobCopier, BlobClient, BlobServiceClient, ContainerClient};
pub use credential::StorageCredentials;

/// A validated request to copy `source_url` into `container/blob` of `account`.
#[derive(Clone, PartialEq, Eq)]
pub struct CopyBlobRequest {
    pub account: String,
    pub account_key: String,
    pub container: String,
    pub blob: String,
    pub source_url: String,
}

impl fmt::Debug for CopyBlobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyBlobRequest")
            .field("account", &self.account)
            .field("account_key", &"<redacted>")
            .field("container", &self.container)
            .field("blob", &self.blob)
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// What the blob service reported when it accepted the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStarted {
    /// `x-ms-copy-status`, e.g. `pending` or `success`
    pub status: String,
    /// `x-ms-copy-id`, needed to abort or track the copy
    pub copy_id: Option<String>,
}

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("The storage account key is not a valid base64 string: {0}")]
    InvalidAccountKey(#[source] base64::DecodeError),

    #[error("Invalid URI: the source URL could not be parsed: {0}")]
    InvalidSourceUrl(#[source] url::ParseError),

    #[error("Invalid container or blob name '{name}': empty, '.' and '..' path segments are not allowed")]
    InvalidResourceName { name: String },

    #[error("Invalid blob endpoint for account '{account}': {reason}")]
    InvalidEndpoint { account: String, reason: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Copy request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{}", service_message(.status, .message))]
    Service {
        status: StatusCode,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("The blob service accepted the copy but did not report a copy status")]
    MissingCopyStatus,
}

fn service_message(status: &StatusCode, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!(
            "The remote server returned an error: ({}) {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}

/// Starts server-side blob copies.
#[async_trait]
pub trait BlobCopier: Send + Sync {
    async fn start_copy(&self, request: &CopyBlobRequest) -> Result<CopyStarted, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_prefers_azure_message() {
        let err = StorageError::Service {
            status: StatusCode::NOT_FOUND,
            code: Some("ContainerNotFound".to_string()),
            message: Some("The specified container does not exist.".to_string()),
        };
        assert_eq!(err.to_string(), "The specified container does not exist.");
    }

    #[test]
    fn test_service_error_falls_back_to_status() {
        let err = StorageError::Service {
            status: StatusCode::FORBIDDEN,
            code: None,
            message: None,
        };
        assert_eq!(err.to_string(), "The remote server returned an error: (403) Forbidden");
    }

    #[test]
    fn test_copy_request_debug_redacts_key() {
        let request = CopyBlobRequest {
            account: "acct".to_string(),
            account_key: "c2VjcmV0".to_string(),
            container: "movie-trailer".to_string(),
            blob: "test-A.mp4".to_string(),
            source_url: "https://example/blob".to_string(),
        };
        let debug = format!("{request:?}");
        assert!(debug.contains("movie-trailer"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
