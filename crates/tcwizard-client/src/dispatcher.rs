//! Action dispatcher
//!
//! Turns a user action into a `PATCH /status` request. The request runs in
//! its own task; a failure is reported back to the controller, which always
//! falls back to `server-communication-error`.

use std::sync::Arc;
use tcwizard_core::{Action, FirmwareCandidate, StateParams, StatusUpdate};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::BackendApi;
use crate::controller::Command;

/// Params of the `loading` state shown while `action` is in flight
pub fn loading_params(action: Action) -> StateParams {
    action
        .loading_message()
        .map(StateParams::message)
        .unwrap_or_default()
}

/// Request body for `action`.
///
/// `None` for local-only actions, and for a flash without a staged candidate.
pub fn status_update(
    action: Action,
    candidate: Option<&FirmwareCandidate>,
) -> Option<StatusUpdate> {
    let state = action.target_state()?;
    let params = match action {
        Action::StartFlash => StateParams::new().with("firmware", candidate?.encode_base64()),
        _ => StateParams::new(),
    };
    Some(StatusUpdate::new(state, params))
}

/// Issue `update` in the background
pub(crate) fn send<B: BackendApi>(
    backend: Arc<B>,
    update: StatusUpdate,
    completions: mpsc::UnboundedSender<Command>,
) {
    info!(state = %update.state, "Requesting backend state change");
    tokio::spawn(async move {
        if let Err(error) = backend.patch_status(&update).await {
            warn!(state = %update.state, error = %error, "Backend state request failed");
            let _ = completions.send(Command::RequestFailed {
                state: update.state,
                error,
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tcwizard_core::FirmwareOrigin;

    #[test]
    fn test_loading_params() {
        assert_eq!(
            loading_params(Action::StartConversion),
            StateParams::message("Starting conversion...")
        );
        assert_eq!(loading_params(Action::CancelConversion), StateParams::message("Cancelling..."));
        assert_eq!(
            loading_params(Action::StartFlash),
            StateParams::message("Starting flashing...")
        );
        assert!(loading_params(Action::ShowFirmwarePanel).is_empty());
    }

    #[test]
    fn test_conversion_requests() {
        let update = status_update(Action::StartConversion, None).unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"state": "converting", "params": {}})
        );

        let update = status_update(Action::CancelConversion, None).unwrap();
        assert_eq!(update.state, "ready");
        assert!(status_update(Action::ShowFirmwarePanel, None).is_none());
    }

    #[test]
    fn test_flash_request_carries_base64_firmware() {
        let candidate = FirmwareCandidate::new(
            vec![0xDE, 0xAD, 0xBE, 0xEF],
            FirmwareOrigin::Url {
                url: "http://example.com/fw.bin".to_string(),
            },
        );
        let update = status_update(Action::StartFlash, Some(&candidate)).unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"state": "flashing", "params": {"firmware": "3q2+7w=="}})
        );

        assert!(status_update(Action::StartFlash, None).is_none());
    }
}
