//! Wizard controller
//!
//! A single task owns the workflow state machine and the firmware staging
//! model. User input arrives through [`WizardHandle`]; poll results, request
//! failures, and intake results arrive from spawned tasks on the same
//! channel. Rendering happens through the [`UiEvent`] broadcast.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tcwizard_core::{
    Action, FirmwarePanelView, FirmwareSource, FirmwareStaging, StateParams, StatusReport,
    StatusView, Ticket, Transition, Workflow, WorkflowState,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::backend::{BackendApi, TransportError};
use crate::dispatcher;
use crate::poller::StatusPoller;

const EVENT_CAPACITY: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Controller is no longer running")]
    Closed,
}

/// Rendering output of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A new state was entered; repaint the status area
    Status(StatusView),
    /// The firmware panel changed
    FirmwarePanel(FirmwarePanelView),
}

/// Everything the controller task reacts to
#[derive(Debug)]
pub(crate) enum Command {
    Action(Action),
    SelectSource(FirmwareSource),
    FetchUrl(String),
    Upload(PathBuf),
    Poll {
        ticket: Ticket,
        result: Result<Option<StatusReport>, TransportError>,
    },
    RequestFailed {
        state: String,
        error: TransportError,
    },
    Intake {
        ticket: Ticket,
        result: Result<Vec<u8>, String>,
    },
    Shutdown,
}

/// Cloneable front end for driving a running controller
#[derive(Clone)]
pub struct WizardHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<UiEvent>,
}

impl WizardHandle {
    /// Subscribe to rendering events
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn trigger(&self, action: Action) -> Result<(), ControllerError> {
        self.send(Command::Action(action))
    }

    pub fn start_conversion(&self) -> Result<(), ControllerError> {
        self.trigger(Action::StartConversion)
    }

    pub fn cancel_conversion(&self) -> Result<(), ControllerError> {
        self.trigger(Action::CancelConversion)
    }

    /// Confirm the point of no return and flash the staged firmware
    pub fn start_flash(&self) -> Result<(), ControllerError> {
        self.trigger(Action::StartFlash)
    }

    pub fn show_firmware_panel(&self) -> Result<(), ControllerError> {
        self.trigger(Action::ShowFirmwarePanel)
    }

    pub fn select_firmware_source(&self, source: FirmwareSource) -> Result<(), ControllerError> {
        self.send(Command::SelectSource(source))
    }

    /// Download firmware from `url` through the backend proxy
    pub fn fetch_firmware_url(&self, url: impl Into<String>) -> Result<(), ControllerError> {
        self.send(Command::FetchUrl(url.into()))
    }

    /// Read a local firmware file
    pub fn upload_firmware(&self, path: impl Into<PathBuf>) -> Result<(), ControllerError> {
        self.send(Command::Upload(path.into()))
    }

    pub fn shutdown(&self) -> Result<(), ControllerError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands.send(command).map_err(|_| ControllerError::Closed)
    }
}

/// Owner of the wizard state
pub struct WizardController<B: BackendApi> {
    backend: Arc<B>,
    workflow: Workflow,
    staging: FirmwareStaging,
    poller: StatusPoller,
    commands: mpsc::UnboundedSender<Command>,
    inbox: Option<mpsc::UnboundedReceiver<Command>>,
    events: broadcast::Sender<UiEvent>,
}

impl<B: BackendApi> WizardController<B> {
    pub fn new(backend: B, poll_interval: Duration) -> (Self, WizardHandle) {
        Self::with_shared_backend(Arc::new(backend), poll_interval)
    }

    pub fn with_shared_backend(backend: Arc<B>, poll_interval: Duration) -> (Self, WizardHandle) {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = WizardHandle {
            commands: commands.clone(),
            events: events.clone(),
        };
        let controller = Self {
            backend,
            workflow: Workflow::new(),
            staging: FirmwareStaging::new(),
            poller: StatusPoller::new(poll_interval),
            commands,
            inbox: Some(inbox),
            events,
        };
        (controller, handle)
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn staging(&self) -> &FirmwareStaging {
        &self.staging
    }

    /// Run until [`WizardHandle::shutdown`] is called
    pub async fn run(mut self) {
        let Some(mut inbox) = self.inbox.take() else {
            return;
        };

        info!(interval_ms = self.poller.period().as_millis() as u64, "Wizard controller started");
        self.enter_state(WorkflowState::Loading, StateParams::message("Loading..."));

        let mut ticker = self.poller.ticker();
        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(),
                command = inbox.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command) {
                        break;
                    }
                }
            }
        }

        info!("Wizard controller stopped");
    }

    fn poll(&mut self) {
        let ticket = self.poller.issue();
        StatusPoller::spawn_fetch(self.backend.clone(), ticket, self.commands.clone());
    }

    /// Apply one command. Returns `false` once the controller should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Action(action) => self.handle_action(action),
            Command::SelectSource(source) => {
                if self.panel_closed("select source") {
                    return true;
                }
                self.staging.select_source(source);
                self.emit_panel();
            }
            Command::FetchUrl(url) => self.fetch_url(url),
            Command::Upload(path) => self.upload(path),
            Command::Poll { ticket, result } => {
                if !self.poller.accept(ticket) {
                    return true;
                }
                match result {
                    Ok(Some(report)) => self.enter(&report.state, report.params),
                    Ok(None) => {
                        warn!("Status response carried no state");
                        self.communication_error();
                    }
                    Err(error) => {
                        warn!(error = %error, "Status poll failed");
                        self.communication_error();
                    }
                }
            }
            Command::RequestFailed { state, error } => {
                debug!(state = %state, error = %error, "Falling back after failed request");
                self.communication_error();
            }
            Command::Intake { ticket, result } => {
                if self.staging.complete(ticket, result) {
                    self.emit_panel();
                }
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn handle_action(&mut self, action: Action) {
        let current = self.workflow.current();

        let candidate = match action {
            Action::ShowFirmwarePanel => {
                if !self.workflow.permits(action) {
                    warn!(state = %current, action = %action, "Action not permitted");
                    return;
                }
                self.staging.show();
                self.emit_panel();
                return;
            }
            Action::StartFlash => {
                let armed = self.staging.gate_unlocked()
                    && matches!(current, WorkflowState::Converted | WorkflowState::FlashingError);
                if armed {
                    self.staging.take_candidate()
                } else if self.workflow.permits(action) {
                    // Retry after a failed flash with nothing staged
                    info!(state = %current, "No firmware staged, opening firmware panel");
                    self.staging.show();
                    self.emit_panel();
                    return;
                } else {
                    warn!(state = %current, action = %action, "Flash is not armed");
                    return;
                }
            }
            _ => {
                if !self.workflow.permits(action) {
                    warn!(state = %current, action = %action, "Action not permitted");
                    return;
                }
                None
            }
        };

        let Some(update) = dispatcher::status_update(action, candidate.as_ref()) else {
            return;
        };

        info!(state = %current, action = %action, "User action");
        self.poller.invalidate();
        self.enter_state(WorkflowState::Loading, dispatcher::loading_params(action));
        dispatcher::send(self.backend.clone(), update, self.commands.clone());
    }

    fn fetch_url(&mut self, url: String) {
        if self.panel_closed("fetch firmware URL") {
            return;
        }
        let ticket = self.staging.begin_url_fetch(&url);
        self.emit_panel();

        let Some(ticket) = ticket else {
            return;
        };
        let backend = self.backend.clone();
        let completions = self.commands.clone();
        tokio::spawn(async move {
            let result = backend
                .download_firmware(&url)
                .await
                .map_err(|e| e.to_string());
            let _ = completions.send(Command::Intake { ticket, result });
        });
    }

    fn upload(&mut self, path: PathBuf) {
        if self.panel_closed("upload firmware") {
            return;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let ticket = self.staging.begin_upload(&name);
        self.emit_panel();

        let completions = self.commands.clone();
        tokio::spawn(async move {
            let result = tokio::fs::read(&path).await.map_err(|e| e.to_string());
            let _ = completions.send(Command::Intake { ticket, result });
        });
    }

    /// Enter a state by wire name; unknown names become a communication error
    fn enter(&mut self, name: &str, params: StateParams) {
        match self.workflow.enter(name, params) {
            Ok(transition) => self.apply(transition),
            Err(error) => {
                warn!(error = %error, "Backend reported an unknown state");
                self.communication_error();
            }
        }
    }

    fn enter_state(&mut self, state: WorkflowState, params: StateParams) {
        let transition = self.workflow.enter_state(state, params);
        self.apply(transition);
    }

    fn communication_error(&mut self) {
        self.enter_state(WorkflowState::ServerCommunicationError, StateParams::new());
    }

    fn apply(&mut self, transition: Transition) {
        let Transition::Entered(view) = transition else {
            return;
        };

        // The firmware panel belongs to the state it was opened in
        let before = self.staging.view();
        self.staging.close();

        let _ = self.events.send(UiEvent::Status(view));
        if self.staging.view() != before {
            self.emit_panel();
        }
    }

    fn emit_panel(&self) {
        let _ = self.events.send(UiEvent::FirmwarePanel(self.staging.view()));
    }

    fn panel_closed(&self, what: &str) -> bool {
        if self.staging.is_visible() {
            return false;
        }
        warn!(operation = what, "Firmware panel is closed");
        true
    }
}
