//! Request interface to the conversion backend

use async_trait::async_trait;
use tcwizard_core::{StatusReport, StatusUpdate};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Backend returned status {0}")]
    Status(u16),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Backend contract consumed by the controller
#[async_trait]
pub trait BackendApi: Send + Sync + 'static {
    /// `GET /status`.
    ///
    /// `Ok(None)` means the request succeeded but the body could not be
    /// decoded as a status report.
    async fn get_status(&self) -> Result<Option<StatusReport>, TransportError>;

    /// `PATCH /status`; the acknowledgement body is ignored
    async fn patch_status(&self, update: &StatusUpdate) -> Result<(), TransportError>;

    /// `GET /firmware/proxy?url=...`
    async fn download_firmware(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Statuses the backend contract treats as success (2xx and 3xx)
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status_range() {
        assert!(!is_success_status(199));
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(is_success_status(304));
        assert!(!is_success_status(400));
        assert!(!is_success_status(502));
    }
}
