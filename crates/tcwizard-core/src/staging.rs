//! Firmware staging behind the point-of-no-return gate
//!
//! The staging model tracks the firmware panel: which intake source is
//! selected, what the details area shows, and the validated candidate (if
//! any). A candidate is only ever held when its verdict was valid, so
//! `candidate.is_some()` is the gate.
//!
//! Intake I/O happens elsewhere. Each fetch or read is started with a
//! [`Ticket`]; completions carrying an outdated ticket are dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::firmware::{
    check_firmware_url, validate, FirmwareCandidate, FirmwareOrigin, ValidationVerdict,
    MSG_DOWNLOAD_FAILED, MSG_READ_FAILED,
};

/// Monotonic identifier of an async operation
pub type Ticket = u64;

pub const MSG_CHECKING: &str = "Checking firmware...";

/// Intake path selected in the firmware panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareSource {
    #[default]
    Url,
    Upload,
}

impl fmt::Display for FirmwareSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareSource::Url => f.write_str("url"),
            FirmwareSource::Upload => f.write_str("upload"),
        }
    }
}

impl FromStr for FirmwareSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(FirmwareSource::Url),
            "upload" => Ok(FirmwareSource::Upload),
            other => Err(format!("unknown firmware source: {}", other)),
        }
    }
}

/// What the firmware details area shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FirmwareDetails {
    #[default]
    Hidden,
    /// A URL fetch is in flight
    Checking { message: String },
    Verdict(ValidationVerdict),
}

/// Snapshot of the firmware panel for a renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwarePanelView {
    pub visible: bool,
    pub source: FirmwareSource,
    pub url: String,
    pub details: FirmwareDetails,
    /// Whether the flash confirmation control is shown
    pub point_of_no_return: bool,
}

/// Firmware panel state and the held candidate
#[derive(Debug, Default)]
pub struct FirmwareStaging {
    visible: bool,
    source: FirmwareSource,
    url: String,
    details: FirmwareDetails,
    candidate: Option<FirmwareCandidate>,
    generation: Ticket,
    pending: Option<FirmwareOrigin>,
}

impl FirmwareStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn source(&self) -> FirmwareSource {
        self.source
    }

    pub fn details(&self) -> &FirmwareDetails {
        &self.details
    }

    /// Whether a validated candidate is armed for flashing
    pub fn gate_unlocked(&self) -> bool {
        self.candidate.is_some()
    }

    pub fn candidate(&self) -> Option<&FirmwareCandidate> {
        self.candidate.as_ref()
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Hide the panel and forget everything staged in it
    pub fn close(&mut self) {
        self.visible = false;
        self.url.clear();
        self.reset();
    }

    /// Switch intake path; any held candidate is discarded
    pub fn select_source(&mut self, source: FirmwareSource) {
        debug!(from = %self.source, to = %source, "Firmware source changed");
        self.source = source;
        self.reset();
    }

    /// Start a URL intake.
    ///
    /// Returns `None` when the URL is rejected locally; the details area then
    /// shows the input failure and no request must be made.
    pub fn begin_url_fetch(&mut self, url: &str) -> Option<Ticket> {
        if self.source != FirmwareSource::Url {
            self.select_source(FirmwareSource::Url);
        }
        self.url = url.to_string();
        let ticket = self.reset();

        if let Err(verdict) = check_firmware_url(url) {
            debug!(url = %url, "Firmware URL rejected locally");
            self.details = FirmwareDetails::Verdict(verdict);
            return None;
        }

        self.details = FirmwareDetails::Checking {
            message: MSG_CHECKING.to_string(),
        };
        self.pending = Some(FirmwareOrigin::Url {
            url: url.to_string(),
        });
        Some(ticket)
    }

    /// Start reading a selected file
    pub fn begin_upload(&mut self, name: &str) -> Ticket {
        if self.source != FirmwareSource::Upload {
            self.select_source(FirmwareSource::Upload);
        }
        let ticket = self.reset();
        self.pending = Some(FirmwareOrigin::Upload {
            name: name.to_string(),
        });
        ticket
    }

    /// Apply the result of an intake started with `ticket`.
    ///
    /// Returns `false` when the ticket is stale and nothing was changed.
    pub fn complete(&mut self, ticket: Ticket, result: Result<Vec<u8>, String>) -> bool {
        if ticket != self.generation {
            debug!(ticket, current = self.generation, "Dropping stale firmware intake");
            return false;
        }
        let Some(origin) = self.pending.take() else {
            return false;
        };

        match result {
            Ok(bytes) => {
                let verdict = validate(&bytes);
                debug!(valid = verdict.valid, size = bytes.len(), "Firmware validated");
                if verdict.valid {
                    self.candidate = Some(FirmwareCandidate::new(bytes, origin));
                }
                self.details = FirmwareDetails::Verdict(verdict);
            }
            Err(reason) => {
                let message = match origin {
                    FirmwareOrigin::Url { .. } => MSG_DOWNLOAD_FAILED,
                    FirmwareOrigin::Upload { .. } => MSG_READ_FAILED,
                };
                debug!(reason = %reason, "Firmware intake failed");
                self.details = FirmwareDetails::Verdict(ValidationVerdict::rejected(message));
            }
        }
        true
    }

    /// Hand the armed candidate to the flash action, re-locking the gate
    pub fn take_candidate(&mut self) -> Option<FirmwareCandidate> {
        self.candidate.take()
    }

    pub fn view(&self) -> FirmwarePanelView {
        FirmwarePanelView {
            visible: self.visible,
            source: self.source,
            url: self.url.clone(),
            details: self.details.clone(),
            point_of_no_return: self.gate_unlocked(),
        }
    }

    /// Drop the candidate, hide the details, and invalidate in-flight intakes
    fn reset(&mut self) -> Ticket {
        self.candidate = None;
        self.pending = None;
        self.details = FirmwareDetails::Hidden;
        self.generation += 1;
        self.generation
    }
}
