use crate::upload::error::{UploadError, UploadResult};

/// Status shown when an entry is rejected
pub const INVALID_EMAIL_MESSAGE: &str = "Invalid email address";

/// Accepts `local@domain.tld`: one `@`, no whitespace, dotted domain with non-empty labels
pub fn validate_email(address: &str) -> bool {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Recipient addresses being collected for email delivery, plus the pending input
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    addresses: Vec<String>,
    input: String,
    message: Option<String>,
}

impl Recipients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending input; any previous rejection message goes away
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
        self.message = None;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Commit the pending input (blur or Enter). The input is cleared only when accepted.
    pub fn commit(&mut self) -> UploadResult<bool> {
        let input = self.input.clone();
        let added = self.add(&input)?;
        if added {
            self.input.clear();
        }
        Ok(added)
    }

    /// Append `input` if it is a valid address. Returns whether anything was added.
    ///
    /// Blank input is ignored without a message. An invalid address leaves the
    /// list as it was, sets [`INVALID_EMAIL_MESSAGE`] and returns
    /// [`UploadError::InvalidEmail`].
    pub fn add(&mut self, input: &str) -> UploadResult<bool> {
        let candidate = input.trim();
        if candidate.is_empty() {
            return Ok(false);
        }

        if !validate_email(candidate) {
            tracing::debug!(input = candidate, "Rejected recipient");
            self.message = Some(INVALID_EMAIL_MESSAGE.to_string());
            return Err(UploadError::InvalidEmail(candidate.to_string()));
        }

        self.addresses.push(candidate.to_string());
        self.message = None;
        Ok(true)
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.addresses.len()).then(|| self.addresses.remove(index))
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn joined(&self) -> String {
        self.addresses.join(",")
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
        self.input.clear();
        self.message = None;
    }
}
