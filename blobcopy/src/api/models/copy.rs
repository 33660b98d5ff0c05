//! API request/response models for blob copies.

use crate::errors::{Error, Result};
use crate::storage::CopyBlobRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Body of a copy request, as sent by the caller.
///
/// Every field is optional at the decoding stage so that a missing or `null` field can be
/// reported by name. Use [`CopyRequest::validate`] to obtain a request the storage layer accepts.
#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    /// [Required] Name of the blob to create at the destination
    #[schema(example = "test-A.mp4")]
    pub dest_filename: Option<String>,
    /// Name of the storage account holding the source. Accepted but not used for the copy.
    #[schema(example = "mediaimports")]
    pub source_storage_account_name: Option<String>,
    /// [Required] Name of the destination storage account
    #[schema(example = "acct")]
    pub dest_storage_account_name: Option<String>,
    /// [Required] Access key of the destination storage account
    #[schema(format = Password)]
    pub dest_storage_account_key: Option<String>,
    /// [Required] Container in the destination account
    #[schema(example = "movie-trailer")]
    pub dest_container: Option<String>,
    /// [Required] URL of the source blob. The blob service must be able to read it,
    /// so private sources need a SAS token.
    #[schema(example = "https://example.blob.core.windows.net/media/test-A.mp4")]
    pub source_url: Option<String>,
}

impl fmt::Debug for CopyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyRequest")
            .field("dest_filename", &self.dest_filename)
            .field("source_storage_account_name", &self.source_storage_account_name)
            .field("dest_storage_account_name", &self.dest_storage_account_name)
            .field("dest_storage_account_key", &self.dest_storage_account_key.as_ref().map(|_| "<redacted>"))
            .field("dest_container", &self.dest_container)
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// Returns the field's value, or a missing-field error if it is absent, null or empty.
/// Whitespace is passed through as given.
fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::MissingField { field }),
    }
}

impl CopyRequest {
    /// Decode a request body. Unknown fields are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::BadRequest {
            message: format!("Invalid request body: {e}"),
        })
    }

    /// Check required fields in a fixed order and stop at the first one missing.
    pub fn validate(self) -> Result<CopyBlobRequest> {
        let blob = required(self.dest_filename, "destFilename")?;
        let account = required(self.dest_storage_account_name, "destStorageAccountName")?;
        let account_key = required(self.dest_storage_account_key, "destStorageAccountKey")?;
        let container = required(self.dest_container, "destContainer")?;
        let source_url = required(self.source_url, "sourceUrl")?;

        Ok(CopyBlobRequest {
            account,
            account_key,
            container,
            blob,
            source_url,
        })
    }
}

/// Result of starting a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CopyResponse {
    /// Copy status reported by the blob service when it accepted the copy
    #[schema(example = "pending")]
    pub status: String,
}
