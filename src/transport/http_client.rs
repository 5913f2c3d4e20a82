use crate::batch::PendingFile;
use crate::config::ClientConfig;
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::service::{ListingService, TransferService};
use crate::transport::types::{
    BatchUploadRequest, CompleteUploadRequest, ErrorBody, FlatUploadRequest, ListingResponse,
    ProgressCallback, UploadReceipt, ZipStream,
};
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

// Granularity of upload progress reports
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// reqwest-backed client for both the transfer and the listing endpoints
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> TransportResult<Self> {
        let parsed = Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> TransportResult<Self> {
        Self::new(&config.api_url, config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Build a multipart form whose file parts report bytes as they are read.
    /// Disk-backed files are loaded here, one batch at a time.
    async fn file_form(files: &[PendingFile], progress: ProgressCallback) -> TransportResult<Form> {
        let total: u64 = files.iter().map(PendingFile::size).sum();
        let sent = Arc::new(AtomicU64::new(0));

        let mut form = Form::new();
        for file in files {
            let payload = file.read().await.map_err(|e| TransportError::FileRead {
                name: file.name.clone(),
                reason: e.to_string(),
            })?;
            let part = counting_part(file, payload, sent.clone(), total, progress.clone());
            form = form.part("files", part);
        }
        Ok(form)
    }

    async fn send_form(&self, url: String, form: Form) -> TransportResult<UploadReceipt> {
        let response = self.client.post(url).multipart(form).send().await?;
        parse_json(response).await
    }
}

fn counting_part(
    file: &PendingFile,
    payload: Bytes,
    sent: Arc<AtomicU64>,
    total: u64,
    progress: ProgressCallback,
) -> Part {
    let len = payload.len() as u64;
    let stream = counting_stream(payload, sent, total, progress);
    Part::stream_with_length(Body::wrap_stream(stream), len).file_name(file.name.clone())
}

/// Split a payload into chunks, reporting the running byte count as each one is polled
fn counting_stream(
    payload: Bytes,
    sent: Arc<AtomicU64>,
    total: u64,
    progress: ProgressCallback,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let len = payload.len();
    let chunks: Vec<Bytes> = (0..len)
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| payload.slice(start..(start + UPLOAD_CHUNK_SIZE).min(len)))
        .collect();

    futures::stream::iter(chunks).map(move |chunk| {
        let acked = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
        progress(acked, total);
        Ok(chunk)
    })
}

async fn check_status(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message);
    tracing::warn!("Request failed with status {}: {}", status, body);

    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> TransportResult<T> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

impl TransferService for HttpClient {
    async fn upload(
        &self,
        request: BatchUploadRequest,
        progress: ProgressCallback,
    ) -> TransportResult<UploadReceipt> {
        let mut form = Self::file_form(&request.files, progress)
            .await?
            .text("paths", request.relative_paths.join(","))
            .text("emailAddresses", request.recipients);
        if let Some(dir) = request.transfer_dir {
            form = form.text("uploadDir", dir);
        }

        self.send_form(self.endpoint("api/upload"), form).await
    }

    async fn upload_flat(
        &self,
        request: FlatUploadRequest,
        progress: ProgressCallback,
    ) -> TransportResult<UploadReceipt> {
        let form = Self::file_form(&request.files, progress)
            .await?
            .text("emailAddresses", request.recipients);

        self.send_form(self.endpoint("api/upload-files"), form).await
    }

    async fn complete_upload(&self, request: CompleteUploadRequest) -> TransportResult<()> {
        let response = self
            .client
            .post(self.endpoint("api/upload/complete-upload"))
            .json(&request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

impl ListingService for HttpClient {
    async fn get_listing(&self, transfer_id: &str) -> TransportResult<ListingResponse> {
        let url = self.endpoint(&format!("api/files/{}", urlencoding::encode(transfer_id)));
        let response = self.client.get(url).send().await?;
        parse_json(response).await
    }

    async fn download_zip(&self, transfer_id: &str) -> TransportResult<ZipStream> {
        let url = self.endpoint(&format!(
            "api/files/download/{}",
            urlencoding::encode(transfer_id)
        ));
        let response = check_status(self.client.get(url).send().await?).await?;

        Ok(ZipStream {
            content_length: response.content_length(),
            stream: response.bytes_stream().map_err(TransportError::from).boxed(),
        })
    }
}
