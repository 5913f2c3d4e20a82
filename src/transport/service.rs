use crate::transport::error::TransportResult;
use crate::transport::types::{
    BatchUploadRequest, CompleteUploadRequest, FlatUploadRequest, ListingResponse,
    ProgressCallback, UploadReceipt, ZipStream,
};
use std::future::Future;

/// Backend that stores uploads and sends completion notifications
pub trait TransferService: Send + Sync {
    /// Upload one batch of a directory transfer
    fn upload(
        &self,
        request: BatchUploadRequest,
        progress: ProgressCallback,
    ) -> impl Future<Output = TransportResult<UploadReceipt>> + Send;

    /// Upload a flat selection in a single request
    fn upload_flat(
        &self,
        request: FlatUploadRequest,
        progress: ProgressCallback,
    ) -> impl Future<Output = TransportResult<UploadReceipt>> + Send;

    /// Tell the backend every batch of a transfer has landed
    fn complete_upload(
        &self,
        request: CompleteUploadRequest,
    ) -> impl Future<Output = TransportResult<()>> + Send;
}

/// Backend that lists stored transfers and serves them as zip archives
pub trait ListingService: Send + Sync {
    fn get_listing(
        &self,
        transfer_id: &str,
    ) -> impl Future<Output = TransportResult<ListingResponse>> + Send;

    fn download_zip(
        &self,
        transfer_id: &str,
    ) -> impl Future<Output = TransportResult<ZipStream>> + Send;
}
