use crate::batch::PendingFile;
use crate::transport::error::TransportResult;
use crate::tree::FileNode;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

/// Called with (bytes sent, bytes total) while a request body streams out
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One batch of a directory upload
#[derive(Debug, Clone)]
pub struct BatchUploadRequest {
    pub files: Vec<PendingFile>,
    pub relative_paths: Vec<String>,
    /// Comma-joined recipients, empty for link delivery
    pub recipients: String,
    /// Identifier returned by batch 1; absent on the first batch
    pub transfer_dir: Option<String>,
}

/// Single-shot upload of a flat file selection
#[derive(Debug, Clone)]
pub struct FlatUploadRequest {
    pub files: Vec<PendingFile>,
    pub recipients: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(rename = "transferDirUrl", alias = "uploadDirUrl")]
    pub transfer_dir_url: String,
}

impl UploadReceipt {
    /// Trailing path segment of the returned URL
    pub fn transfer_dir(&self) -> Option<&str> {
        self.transfer_dir_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteUploadRequest {
    #[serde(rename = "uploadDir")]
    pub upload_dir: String,
    #[serde(rename = "emailAddresses")]
    pub email_addresses: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    #[serde(default)]
    pub files: Vec<FileNode>,
    #[serde(default = "zero", deserialize_with = "string_or_number")]
    pub total_size: String,
    #[serde(default = "zero", deserialize_with = "string_or_number")]
    pub number_of_files: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

/// Body of a zip download, plus its announced length
pub struct ZipStream {
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, TransportResult<Bytes>>,
}

impl fmt::Debug for ZipStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

fn zero() -> String {
    "0".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(zero()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
