pub mod error;
pub mod http_client;
pub mod service;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use http_client::HttpClient;
pub use service::{ListingService, TransferService};
pub use types::{
    BatchUploadRequest, CompleteUploadRequest, FlatUploadRequest, ListingResponse,
    ProgressCallback, UploadReceipt, ZipStream,
};
