//! User actions exposed by workflow states

use serde::{Deserialize, Serialize};
use std::fmt;

/// An action a user can trigger from a rendered button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Ask the backend to start (or restart) a conversion
    StartConversion,
    /// Ask the backend to abort the running conversion
    CancelConversion,
    /// Ask the backend to flash the staged firmware
    StartFlash,
    /// Open the firmware panel; local only, no backend request
    ShowFirmwarePanel,
}

impl Action {
    /// Message shown in the `loading` state while the request is in flight.
    /// `None` for actions that never leave the current state.
    pub fn loading_message(&self) -> Option<&'static str> {
        match self {
            Action::StartConversion => Some("Starting conversion..."),
            Action::CancelConversion => Some("Cancelling..."),
            Action::StartFlash => Some("Starting flashing..."),
            Action::ShowFirmwarePanel => None,
        }
    }

    /// Backend state requested by this action
    pub fn target_state(&self) -> Option<&'static str> {
        match self {
            Action::StartConversion => Some("converting"),
            Action::CancelConversion => Some("ready"),
            Action::StartFlash => Some("flashing"),
            Action::ShowFirmwarePanel => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::StartConversion => "startConversion",
            Action::CancelConversion => "cancelConversion",
            Action::StartFlash => "startFlash",
            Action::ShowFirmwarePanel => "showFirmwarePanel",
        };
        f.write_str(name)
    }
}
