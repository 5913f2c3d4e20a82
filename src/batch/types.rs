use bytes::Bytes;
use std::path::PathBuf;

/// Where a pending file's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Already held in memory
    Memory(Bytes),
    /// Read from disk when the batch carrying it is sent
    Disk { path: PathBuf, len: u64 },
}

/// A file picked by the user, waiting to be uploaded.
///
/// `relative_path` is empty for flat selections and holds the path inside
/// the picked directory (e.g. `dirA/sub/file.txt`) otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub relative_path: String,
    pub source: FileSource,
}

impl PendingFile {
    /// File picked on its own, outside of any directory hierarchy
    pub fn flat(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            relative_path: String::new(),
            source: FileSource::Memory(payload.into()),
        }
    }

    /// File picked as part of a directory; the name is the last path segment
    pub fn in_directory(relative_path: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::with_source(relative_path.into(), FileSource::Memory(payload.into()))
    }

    /// File on disk whose contents are read only when its batch goes out.
    /// An empty `relative_path` makes it a flat selection named after `path`.
    pub fn on_disk(relative_path: impl Into<String>, path: impl Into<PathBuf>, len: u64) -> Self {
        let path = path.into();
        let relative_path = relative_path.into();
        if relative_path.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Self {
                name,
                relative_path,
                source: FileSource::Disk { path, len },
            };
        }
        Self::with_source(relative_path, FileSource::Disk { path, len })
    }

    fn with_source(relative_path: String, source: FileSource) -> Self {
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            relative_path,
            source,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.source {
            FileSource::Memory(payload) => payload.len() as u64,
            FileSource::Disk { len, .. } => *len,
        }
    }

    /// Load the file's bytes
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(payload) => Ok(payload.clone()),
            FileSource::Disk { path, .. } => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// An ordered, contiguous slice of the selection sent in one request.
/// Batches are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub number: u32,
    pub files: &'a [PendingFile],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(PendingFile::size).sum()
    }

    pub fn relative_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.relative_path.clone()).collect()
    }
}

/// The current set of picked files. Only ever replaced as a whole.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    files: Vec<PendingFile>,
}

impl Selection {
    pub fn new(files: Vec<PendingFile>) -> Self {
        Self { files }
    }

    pub fn replace(&mut self, files: Vec<PendingFile>) {
        self.files = files;
    }

    pub fn clear(&mut self) {
        self.files = Vec::new();
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(PendingFile::size).sum()
    }

    /// Human summary shown next to the picker, e.g. "Selected 3 files"
    pub fn summary(&self) -> Option<String> {
        match self.files.len() {
            0 => None,
            1 => Some("Selected 1 file".to_string()),
            n => Some(format!("Selected {n} files")),
        }
    }
}
