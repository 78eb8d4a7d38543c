//! Firmware intake validation
//!
//! This module provides:
//! - The size policy every staged firmware binary must pass
//! - Local checks on a user-supplied firmware URL
//! - The in-memory candidate that arms the flash action

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Smallest accepted firmware image (1 KiB)
pub const MIN_FIRMWARE_SIZE: usize = 1024;
/// Largest accepted firmware image (512 KiB)
pub const MAX_FIRMWARE_SIZE: usize = 512 * 1024;

pub const MSG_TOO_SMALL: &str = "firmware must have at least 1KB";
pub const MSG_TOO_LARGE: &str = "firmware must not exceed 512KB";
pub const MSG_VALID: &str = "firmware is valid";
pub const MSG_INVALID_URL: &str = "Please enter a valid URL";
pub const MSG_DOWNLOAD_FAILED: &str = "Could not download file at given URL";
pub const MSG_READ_FAILED: &str = "Could not read the selected file";

/// Pass/fail judgment on a firmware binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub valid: bool,
    pub message: String,
    /// Size of the judged binary; absent for input and download failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
}

impl ValidationVerdict {
    /// Failed verdict that never looked at any bytes
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            size_in_bytes: None,
        }
    }
}

/// Validate a firmware binary. Only its length is examined.
pub fn validate(bytes: &[u8]) -> ValidationVerdict {
    let size = bytes.len();
    let (valid, message) = if size < MIN_FIRMWARE_SIZE {
        (false, MSG_TOO_SMALL)
    } else if size > MAX_FIRMWARE_SIZE {
        (false, MSG_TOO_LARGE)
    } else {
        (true, MSG_VALID)
    };

    ValidationVerdict {
        valid,
        message: message.to_string(),
        size_in_bytes: Some(size as u64),
    }
}

/// Reject URLs that are empty or not `http`-prefixed before any request
pub fn check_firmware_url(url: &str) -> Result<(), ValidationVerdict> {
    if url.is_empty() || !url.starts_with("http") {
        return Err(ValidationVerdict::rejected(MSG_INVALID_URL));
    }
    Ok(())
}

/// Where a firmware candidate came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum FirmwareOrigin {
    Url { url: String },
    Upload { name: String },
}

/// A firmware binary held in memory between validation and flashing
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareCandidate {
    bytes: Vec<u8>,
    origin: FirmwareOrigin,
}

impl FirmwareCandidate {
    pub fn new(bytes: Vec<u8>, origin: FirmwareOrigin) -> Self {
        Self { bytes, origin }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn origin(&self) -> &FirmwareOrigin {
        &self.origin
    }

    /// Standard base64 of the binary, as sent in the flash request
    pub fn encode_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Debug for FirmwareCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareCandidate")
            .field("size_in_bytes", &self.bytes.len())
            .field("origin", &self.origin)
            .finish()
    }
}
