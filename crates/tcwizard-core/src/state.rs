//! Workflow states and their presentation table

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::action::Action;
use crate::directive::DetailDirective;
use crate::params::StateParams;

/// Download path for the firmware read back during conversion
pub const ORIGINAL_FIRMWARE_HREF: &str = "/firmware/original.bin";

const POWER_HINT: &str = "Make sure your device is powered and in pairing mode.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown workflow state: {0}")]
pub struct UnknownStateError(pub String);

/// A named phase of the conversion/flashing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowState {
    Loading,
    Ready,
    Converting,
    Converted,
    ConversionCancelled,
    ConversionError,
    Flashing,
    Flashed,
    FlashingError,
    ServerCommunicationError,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 10] = [
        WorkflowState::Loading,
        WorkflowState::Ready,
        WorkflowState::Converting,
        WorkflowState::Converted,
        WorkflowState::ConversionCancelled,
        WorkflowState::ConversionError,
        WorkflowState::Flashing,
        WorkflowState::Flashed,
        WorkflowState::FlashingError,
        WorkflowState::ServerCommunicationError,
    ];

    /// Wire name as used by the backend status endpoint
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Loading => "loading",
            WorkflowState::Ready => "ready",
            WorkflowState::Converting => "converting",
            WorkflowState::Converted => "converted",
            WorkflowState::ConversionCancelled => "conversion-cancelled",
            WorkflowState::ConversionError => "conversion-error",
            WorkflowState::Flashing => "flashing",
            WorkflowState::Flashed => "flashed",
            WorkflowState::FlashingError => "flashing-error",
            WorkflowState::ServerCommunicationError => "server-communication-error",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownStateError> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.name() == name)
            .ok_or_else(|| UnknownStateError(name.to_string()))
    }

    /// Index into the status icon sprite strip
    pub fn icon_offset(&self) -> u32 {
        match self {
            WorkflowState::Loading | WorkflowState::Converting | WorkflowState::Flashing => 2,
            WorkflowState::Ready | WorkflowState::Flashed => 3,
            WorkflowState::ConversionCancelled => 4,
            WorkflowState::ConversionError
            | WorkflowState::FlashingError
            | WorkflowState::ServerCommunicationError => 5,
            WorkflowState::Converted => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Loading => "",
            WorkflowState::Ready => "READY",
            WorkflowState::Converting => "CONVERTING",
            WorkflowState::Converted => "CONVERTED",
            WorkflowState::ConversionCancelled => "CANCELLED",
            WorkflowState::Flashing => "FLASHING",
            WorkflowState::Flashed => "FLASHED",
            WorkflowState::ConversionError
            | WorkflowState::FlashingError
            | WorkflowState::ServerCommunicationError => "ERROR",
        }
    }

    /// Whether the status icon animates
    pub fn spin(&self) -> bool {
        matches!(
            self,
            WorkflowState::Loading | WorkflowState::Converting | WorkflowState::Flashing
        )
    }

    /// Actions a user may trigger while this state is current
    pub fn permitted_actions(&self) -> &'static [Action] {
        match self {
            WorkflowState::Loading
            | WorkflowState::Flashing
            | WorkflowState::ServerCommunicationError => &[],
            WorkflowState::Ready
            | WorkflowState::ConversionCancelled
            | WorkflowState::ConversionError
            | WorkflowState::Flashed => &[Action::StartConversion],
            WorkflowState::Converting => &[Action::CancelConversion],
            WorkflowState::Converted => &[Action::ShowFirmwarePanel, Action::StartConversion],
            WorkflowState::FlashingError => &[Action::StartFlash, Action::StartConversion],
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        self.permitted_actions().contains(&action)
    }

    /// Directives describing this state, in display order
    pub fn details(&self, params: &StateParams) -> Vec<DetailDirective> {
        match self {
            WorkflowState::Loading => params
                .get_str("message")
                .map(|m| vec![DetailDirective::message(m)])
                .unwrap_or_default(),
            WorkflowState::Ready => vec![
                DetailDirective::message(POWER_HINT),
                DetailDirective::button("Convert", Action::StartConversion),
            ],
            WorkflowState::Converting => vec![
                DetailDirective::message("Please wait while your device is converted..."),
                DetailDirective::button("Cancel", Action::CancelConversion),
            ],
            WorkflowState::Converted => vec![
                DetailDirective::message("Your device has been successfully converted."),
                DetailDirective::message(format!(
                    "Flash frequency: <b>{} MHz</b>",
                    display_value(params.get("flash_freq"))
                )),
                DetailDirective::message(format!(
                    "Flash mode: <b>{}</b>",
                    display_value(params.get("flash_mode"))
                )),
                DetailDirective::message(format!(
                    "Flash size: <b>{} KB</b>",
                    display_kib(params.get("flash_size"))
                )),
                DetailDirective::link(
                    "Download original firmware:",
                    "original.bin",
                    ORIGINAL_FIRMWARE_HREF,
                ),
                DetailDirective::button("Flash Firmware", Action::ShowFirmwarePanel),
                DetailDirective::button("Convert Another Device", Action::StartConversion),
            ],
            WorkflowState::ConversionCancelled => vec![
                DetailDirective::message("Conversion has been cancelled."),
                DetailDirective::button("Restart Conversion", Action::StartConversion),
            ],
            WorkflowState::ConversionError => vec![
                DetailDirective::message(
                    params.get_str("message").unwrap_or("Could not convert device."),
                ),
                DetailDirective::message(POWER_HINT),
                DetailDirective::button("Retry", Action::StartConversion),
            ],
            WorkflowState::Flashing => vec![DetailDirective::text(
                "Please wait while your device is being flashed...",
            )],
            WorkflowState::Flashed => vec![
                DetailDirective::message("Your device has been successfully flashed."),
                DetailDirective::button("Convert Another Device", Action::StartConversion),
            ],
            WorkflowState::FlashingError => vec![
                DetailDirective::message(
                    params.get_str("message").unwrap_or("Could not flash device."),
                ),
                DetailDirective::button("Retry", Action::StartFlash),
                DetailDirective::button("Convert Another Device", Action::StartConversion),
            ],
            WorkflowState::ServerCommunicationError => vec![DetailDirective::text(
                "Could not communicate with Tuya Convert OS server",
            )],
        }
    }

    /// Full presentation of this state for a renderer
    pub fn view(&self, params: &StateParams) -> StatusView {
        StatusView {
            state: *self,
            icon_offset: self.icon_offset(),
            label: self.label().to_string(),
            spin: self.spin(),
            details: self.details(params),
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a renderer paints for the current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub state: WorkflowState,
    pub icon_offset: u32,
    pub label: String,
    pub spin: bool,
    pub details: Vec<DetailDirective>,
}

impl StatusView {
    /// Actions bound to the rendered buttons, in display order
    pub fn actions(&self) -> Vec<Action> {
        self.details.iter().filter_map(DetailDirective::action).collect()
    }
}

/// Render a server-reported scalar without JSON quoting
fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Render a byte count as kibibytes; fractional values keep their decimals
fn display_kib(value: Option<&Value>) -> String {
    let bytes = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match bytes {
        Some(bytes) => format!("{}", bytes / 1024.0),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(state: WorkflowState, params: &StateParams) -> Vec<String> {
        state.details(params).iter().map(DetailDirective::plain_text).collect()
    }

    #[test]
    fn test_names_round_trip_through_from_name() {
        for state in WorkflowState::ALL {
            assert_eq!(WorkflowState::from_name(state.name()), Ok(state));
        }
        assert_eq!(
            WorkflowState::from_name("exploded"),
            Err(UnknownStateError("exploded".to_string()))
        );
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        for state in WorkflowState::ALL {
            assert_eq!(serde_json::to_value(state).unwrap(), json!(state.name()));
        }
    }

    #[test]
    fn test_presentation_table() {
        let table: Vec<(WorkflowState, u32, &str, bool)> = WorkflowState::ALL
            .iter()
            .map(|s| (*s, s.icon_offset(), s.label(), s.spin()))
            .collect();
        assert_eq!(
            table,
            vec![
                (WorkflowState::Loading, 2, "", true),
                (WorkflowState::Ready, 3, "READY", false),
                (WorkflowState::Converting, 2, "CONVERTING", true),
                (WorkflowState::Converted, 6, "CONVERTED", false),
                (WorkflowState::ConversionCancelled, 4, "CANCELLED", false),
                (WorkflowState::ConversionError, 5, "ERROR", false),
                (WorkflowState::Flashing, 2, "FLASHING", true),
                (WorkflowState::Flashed, 3, "FLASHED", false),
                (WorkflowState::FlashingError, 5, "ERROR", false),
                (WorkflowState::ServerCommunicationError, 5, "ERROR", false),
            ]
        );
    }

    #[test]
    fn test_loading_details() {
        assert!(WorkflowState::Loading.details(&StateParams::new()).is_empty());
        assert_eq!(
            WorkflowState::Loading.details(&StateParams::message("Loading...")),
            vec![DetailDirective::message("Loading...")]
        );
    }

    #[test]
    fn test_ready_and_converting_details() {
        let empty = StateParams::new();
        assert_eq!(
            WorkflowState::Ready.details(&empty),
            vec![
                DetailDirective::message(POWER_HINT),
                DetailDirective::button("Convert", Action::StartConversion),
            ]
        );
        assert_eq!(
            WorkflowState::Converting.details(&empty),
            vec![
                DetailDirective::message("Please wait while your device is converted..."),
                DetailDirective::button("Cancel", Action::CancelConversion),
            ]
        );
    }

    #[test]
    fn test_converted_interpolates_flash_details() {
        let params: StateParams = serde_json::from_value(json!({
            "flash_freq": 80,
            "flash_mode": "QIO",
            "flash_size": 4194304
        }))
        .unwrap();

        let details = WorkflowState::Converted.details(&params);
        assert_eq!(details.len(), 7);
        assert_eq!(
            texts(WorkflowState::Converted, &params),
            vec![
                "Your device has been successfully converted.",
                "Flash frequency: 80 MHz",
                "Flash mode: QIO",
                "Flash size: 4096 KB",
                "Download original firmware: original.bin",
                "Flash Firmware",
                "Convert Another Device",
            ]
        );
        assert_eq!(
            details[4],
            DetailDirective::link(
                "Download original firmware:",
                "original.bin",
                "/firmware/original.bin"
            )
        );
        assert_eq!(
            WorkflowState::Converted.view(&params).actions(),
            vec![Action::ShowFirmwarePanel, Action::StartConversion]
        );
    }

    #[test]
    fn test_converted_fractional_and_missing_values() {
        let params = StateParams::new().with("flash_size", 1536);
        let texts = texts(WorkflowState::Converted, &params);
        assert_eq!(texts[1], "Flash frequency: unknown MHz");
        assert_eq!(texts[2], "Flash mode: unknown");
        assert_eq!(texts[3], "Flash size: 1.5 KB");
    }

    #[test]
    fn test_error_states_prefer_param_message() {
        let custom = StateParams::message("Device did not answer");
        let empty = StateParams::new();

        assert_eq!(texts(WorkflowState::ConversionError, &custom)[0], "Device did not answer");
        assert_eq!(texts(WorkflowState::ConversionError, &empty)[0], "Could not convert device.");
        assert_eq!(
            texts(WorkflowState::ConversionError, &empty)[1..],
            [POWER_HINT.to_string(), "Retry".to_string()]
        );

        assert_eq!(texts(WorkflowState::FlashingError, &custom)[0], "Device did not answer");
        assert_eq!(
            texts(WorkflowState::FlashingError, &empty),
            vec!["Could not flash device.", "Retry", "Convert Another Device"]
        );
        assert_eq!(
            WorkflowState::FlashingError.view(&empty).actions(),
            vec![Action::StartFlash, Action::StartConversion]
        );
    }

    #[test]
    fn test_remaining_state_details() {
        let empty = StateParams::new();
        assert_eq!(
            texts(WorkflowState::ConversionCancelled, &empty),
            vec!["Conversion has been cancelled.", "Restart Conversion"]
        );
        assert_eq!(
            WorkflowState::Flashing.details(&empty),
            vec![DetailDirective::text("Please wait while your device is being flashed...")]
        );
        assert_eq!(
            texts(WorkflowState::Flashed, &empty),
            vec!["Your device has been successfully flashed.", "Convert Another Device"]
        );
        assert_eq!(
            WorkflowState::ServerCommunicationError.details(&empty),
            vec![DetailDirective::text("Could not communicate with Tuya Convert OS server")]
        );
    }

    #[test]
    fn test_rendered_buttons_match_permitted_actions() {
        let params = StateParams::new();
        for state in WorkflowState::ALL {
            assert_eq!(
                state.view(&params).actions(),
                state.permitted_actions().to_vec(),
                "state {}",
                state
            );
        }
    }
}
