use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream call, after retries when surfaced by the fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("upstream request failed: {0}")]
    Upstream(FetchError),

    #[error("no usable data: {0}")]
    Empty(String),

    #[error("scan cancelled")]
    Cancelled,
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;

impl From<FetchError> for ScanError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => ScanError::Cancelled,
            other => ScanError::Upstream(other),
        }
    }
}

impl ScanError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ScanError::Validation { field, reason: reason.into() }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, ScanError::Upstream(_) | ScanError::Empty(_))
    }

    /// Text safe to show an end user. Upstream detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::Validation { field, reason } => {
                format!("Please check the {} field: {}", field, reason)
            }
            ScanError::Upstream(_) | ScanError::Empty(_) => {
                "The data source is unavailable right now. Please try again later.".to_string()
            }
            ScanError::Cancelled => "The scan was cancelled.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_fetch_maps_to_cancelled_scan() {
        assert!(matches!(ScanError::from(FetchError::Cancelled), ScanError::Cancelled));
        assert!(!FetchError::Cancelled.is_retryable());
    }

    #[test]
    fn test_user_message_hides_upstream_text() {
        let err = ScanError::from(FetchError::Rpc {
            code: -32000,
            message: "header not found at node-7.internal".into(),
        });
        assert!(err.is_upstream());
        assert!(!err.user_message().contains("node-7"));
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = ScanError::validation("address", "required for contract tokens");
        assert!(!err.is_upstream());
        assert!(err.user_message().contains("address"));
    }
}
