use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server responded with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not read {name}: {reason}")]
    FileRead { name: String, reason: String },
}

impl TransportError {
    /// Human-readable message supplied by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Request(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message() {
        let err = TransportError::Status {
            status: 404,
            message: Some("Directory not found".into()),
        };
        assert_eq!(err.server_message(), Some("Directory not found"));

        let blank = TransportError::Status {
            status: 500,
            message: Some("  ".into()),
        };
        assert_eq!(blank.server_message(), None);
        assert_eq!(TransportError::Request("reset".into()).server_message(), None);
    }
}
