use crate::download::error::{DownloadError, DownloadResult};
use crate::download::types::{DownloadProgress, DownloadState};
use crate::metrics;
use crate::transport::ListingService;
use futures::StreamExt;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Streams a transfer's zip archive to disk and reports how far along it is.
///
/// Bytes land in a temporary file next to the destination and are renamed to
/// `<id>.zip` only once the whole body has arrived.
pub struct DownloadTracker<L> {
    service: Arc<L>,
    dest_dir: PathBuf,
    state: Arc<RwLock<DownloadState>>,
    event_tx: mpsc::UnboundedSender<DownloadProgress>,
    event_rx: Arc<RwLock<Option<mpsc::UnboundedReceiver<DownloadProgress>>>>,
}

impl<L: ListingService> DownloadTracker<L> {
    pub fn new(service: Arc<L>, dest_dir: impl Into<PathBuf>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            service,
            dest_dir: dest_dir.into(),
            state: Arc::new(RwLock::new(DownloadState::Idle)),
            event_tx,
            event_rx: Arc::new(RwLock::new(Some(event_rx))),
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state.read().clone()
    }

    /// Take progress receiver (can only be called once)
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<DownloadProgress>> {
        self.event_rx.write().take()
    }

    /// Where the archive for `transfer_id` ends up. Ids that would leave the
    /// destination directory are rejected.
    pub fn target_path(&self, transfer_id: &str) -> DownloadResult<PathBuf> {
        if transfer_id.is_empty()
            || transfer_id.contains(['/', '\\', '\0'])
            || transfer_id.contains("..")
        {
            return Err(DownloadError::InvalidTransferId(transfer_id.to_string()));
        }
        Ok(self.dest_dir.join(format!("{transfer_id}.zip")))
    }

    /// Download the archive for `transfer_id`, returning the saved path
    pub async fn download(&self, transfer_id: &str) -> DownloadResult<PathBuf> {
        {
            let mut state = self.state.write();
            if state.is_active() {
                return Err(DownloadError::AlreadyInProgress);
            }
            *state = DownloadState::Downloading(DownloadProgress::new(0, None));
        }

        match self.fetch(transfer_id).await {
            Ok(path) => {
                tracing::info!(transfer_id, path = %path.display(), "Archive saved");
                metrics::record_download_complete();
                *self.state.write() = DownloadState::Completed { path: path.clone() };
                Ok(path)
            }
            Err(e) => {
                tracing::warn!(transfer_id, "Download failed: {}", e);
                metrics::record_download_failed(failure_reason(&e));
                *self.state.write() = DownloadState::Failed {
                    error: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn fetch(&self, transfer_id: &str) -> DownloadResult<PathBuf> {
        let target = self.target_path(transfer_id)?;
        let mut body = self.service.download_zip(transfer_id).await?;
        let total = body.content_length;
        tracing::info!(transfer_id, total = ?total, "Downloading archive");

        let staging = tempfile::Builder::new()
            .prefix(".treedrop-")
            .suffix(".part")
            .tempfile_in(&self.dest_dir)?;
        let mut file = tokio::fs::File::from_std(staging.reopen()?);

        let mut loaded = 0u64;
        self.publish(DownloadProgress::new(loaded, total));
        while let Some(chunk) = body.stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            loaded += chunk.len() as u64;
            metrics::record_download_bytes(chunk.len() as u64);
            self.publish(DownloadProgress::new(loaded, total));
        }
        file.flush().await?;
        drop(file);

        persist(staging, &target)?;
        Ok(target)
    }

    fn publish(&self, progress: DownloadProgress) {
        tracing::debug!(loaded = progress.loaded, percent = ?progress.percent, "Download progress");
        *self.state.write() = DownloadState::Downloading(progress);
        // Nobody listening is fine
        let _ = self.event_tx.send(progress);
    }
}

fn persist(staging: tempfile::NamedTempFile, target: &Path) -> DownloadResult<()> {
    staging
        .persist(target)
        .map_err(|e| DownloadError::Persist {
            path: target.display().to_string(),
            reason: e.error.to_string(),
        })?;
    Ok(())
}

fn failure_reason(error: &DownloadError) -> &'static str {
    match error {
        DownloadError::Transport(_) => "transport",
        DownloadError::Io(_) => "io",
        DownloadError::Persist { .. } => "persist",
        DownloadError::InvalidTransferId(_) => "invalid_id",
        DownloadError::AlreadyInProgress => "busy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ListingResponse, TransportError, TransportResult, ZipStream};
    use bytes::Bytes;

    struct ChunkedService {
        chunks: Vec<TransportResult<Bytes>>,
        announce_length: bool,
    }

    impl ChunkedService {
        fn ok(chunks: &[&'static [u8]], announce_length: bool) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect(),
                announce_length,
            }
        }
    }

    impl ListingService for ChunkedService {
        async fn get_listing(&self, _transfer_id: &str) -> TransportResult<ListingResponse> {
            unreachable!("downloads never list")
        }

        async fn download_zip(&self, _transfer_id: &str) -> TransportResult<ZipStream> {
            let chunks: Vec<TransportResult<Bytes>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(bytes) => Ok(bytes.clone()),
                    Err(_) => Err(TransportError::Request("connection reset".into())),
                })
                .collect();
            let length = chunks
                .iter()
                .filter_map(|c| c.as_ref().ok())
                .map(|b| b.len() as u64)
                .sum();

            Ok(ZipStream {
                content_length: self.announce_length.then_some(length),
                stream: futures::stream::iter(chunks).boxed(),
            })
        }
    }

    #[tokio::test]
    async fn test_saves_archive_with_percent() {
        let dir = tempfile::tempdir().unwrap();
        let service = ChunkedService::ok(&[b"PK\x03\x04", b"abcd"], true);
        let tracker = DownloadTracker::new(Arc::new(service), dir.path());
        let mut progress = tracker.take_receiver().unwrap();

        let path = tracker.download("abc").await.unwrap();
        assert_eq!(path, dir.path().join("abc.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04abcd");
        assert_eq!(tracker.state(), DownloadState::Completed { path });

        let mut percents = Vec::new();
        while let Ok(update) = progress.try_recv() {
            percents.push(update.percent);
        }
        assert_eq!(percents, vec![Some(0.0), Some(50.0), Some(100.0)]);
    }

    #[tokio::test]
    async fn test_unknown_length_has_no_percent() {
        let dir = tempfile::tempdir().unwrap();
        let service = ChunkedService::ok(&[b"abc"], false);
        let tracker = DownloadTracker::new(Arc::new(service), dir.path());
        let mut progress = tracker.take_receiver().unwrap();

        tracker.download("abc").await.unwrap();
        while let Ok(update) = progress.try_recv() {
            assert_eq!(update.percent, None);
            assert_eq!(update.total, None);
        }
    }

    #[tokio::test]
    async fn test_rejects_ids_outside_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir(&dest).unwrap();
        let service = ChunkedService::ok(&[b"PK"], true);
        let tracker = DownloadTracker::new(Arc::new(service), &dest);

        for id in ["../escaped", "a/b", "a\\b", "..", ""] {
            let err = tracker.download(id).await.unwrap_err();
            assert!(matches!(err, DownloadError::InvalidTransferId(_)), "{id}");
            assert!(matches!(tracker.state(), DownloadState::Failed { .. }));
        }

        assert!(!dir.path().join("escaped.zip").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);

        // A plain id still downloads after the rejections
        let path = tracker.download("abc").await.unwrap();
        assert_eq!(path, dest.join("abc.zip"));
    }

    #[tokio::test]
    async fn test_failure_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = ChunkedService {
            chunks: vec![
                Ok(Bytes::from_static(b"abc")),
                Err(TransportError::Request("reset".into())),
            ],
            announce_length: true,
        };
        let tracker = DownloadTracker::new(Arc::new(service), dir.path());

        let err = tracker.download("abc").await.unwrap_err();
        assert!(matches!(err, DownloadError::Transport(_)));
        assert!(matches!(tracker.state(), DownloadState::Failed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
