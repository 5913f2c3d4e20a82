use serde::{Deserialize, Serialize};

/// How recipients learn about a finished transfer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Backend emails the listed recipients
    #[default]
    Email,
    /// User copies a shareable link; no recipients
    Link,
}

/// What the user picked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UploadMode {
    /// A directory hierarchy, uploaded in batches
    #[default]
    Directory,
    /// Loose files, uploaded in one capped request
    Files,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMode::Directory => "directory",
            UploadMode::Files => "files",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading,
    /// Every batch landed; completion notification pending
    Completing,
    Completed,
    Failed { batch: u32, error: String },
}

impl UploadState {
    pub fn is_active(&self) -> bool {
        matches!(self, UploadState::Uploading | UploadState::Completing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Start {
        total_batches: u32,
        mode: UploadMode,
        delivery: DeliveryMode,
        recipients: Vec<String>,
    },
    BatchProgress {
        batch: u32,
        acked: u64,
        total: u64,
    },
    BatchAcked {
        batch: u32,
        transfer_dir: Option<String>,
    },
    BatchFailed {
        batch: u32,
        error: String,
    },
    CompletionAcked,
    CompletionFailed {
        error: String,
    },
    Reset,
}

/// Snapshot published to observers whenever progress or state changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadProgress {
    pub session_id: String,
    pub batch: u32,
    pub total_batches: u32,
    pub progress_percent: f32,
    pub state: UploadState,
}

/// The one submission in flight (or just finished)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub session_id: String,
    /// 1-based; `total_batches + 1` once every batch is done
    pub current_batch_index: u32,
    pub total_batches: u32,
    pub transfer_dir: Option<String>,
    pub progress_percent: f32,
    pub recipients: Vec<String>,
    pub delivery_mode: DeliveryMode,
    pub upload_mode: UploadMode,
    pub state: UploadState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UploadSession {
    /// Empty session, as before any submit
    pub fn idle() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            session_id: String::new(),
            current_batch_index: 0,
            total_batches: 0,
            transfer_dir: None,
            progress_percent: 0.0,
            recipients: Vec::new(),
            delivery_mode: DeliveryMode::default(),
            upload_mode: UploadMode::default(),
            state: UploadState::Idle,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new(
        total_batches: u32,
        upload_mode: UploadMode,
        delivery_mode: DeliveryMode,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            current_batch_index: 1,
            total_batches,
            upload_mode,
            delivery_mode,
            recipients,
            state: UploadState::Uploading,
            ..Self::idle()
        }
    }

    /// All batches acknowledged
    pub fn all_batches_done(&self) -> bool {
        self.total_batches > 0 && self.current_batch_index > self.total_batches
    }

    /// Recipient field sent to the backend: joined addresses, or `None` for link delivery
    pub fn completion_recipients(&self) -> Option<String> {
        match self.delivery_mode {
            DeliveryMode::Email => Some(self.recipients.join(",")),
            DeliveryMode::Link => None,
        }
    }

    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            session_id: self.session_id.clone(),
            batch: self.current_batch_index,
            total_batches: self.total_batches,
            progress_percent: self.progress_percent,
            state: self.state.clone(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

/// Parameters of one submit
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub mode: UploadMode,
    pub delivery: DeliveryMode,
    pub recipients: Vec<String>,
}

impl SubmitOptions {
    /// Recipient field for upload requests; empty for link delivery
    pub fn upload_recipients(&self) -> String {
        match self.delivery {
            DeliveryMode::Email => self.recipients.join(","),
            DeliveryMode::Link => String::new(),
        }
    }
}

/// Result of a successful submit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadOutcome {
    pub session_id: String,
    pub transfer_dir: Option<String>,
    pub transfer_dir_url: Option<String>,
    /// Link to hand out when delivering by link
    pub share_link: Option<String>,
    pub batches: u32,
    pub files: usize,
    pub progress_percent: f32,
    pub message: String,
}
