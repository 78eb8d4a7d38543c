//! tcwizard Client - Backend transport and the wizard controller
//!
//! The controller owns the workflow state machine and the firmware staging
//! model. It runs as a single task; network requests and file reads are
//! spawned and report back through its command channel.

pub mod backend;
pub mod controller;
pub mod dispatcher;
pub mod http;
pub mod poller;

pub use backend::{BackendApi, TransportError};
pub use controller::{ControllerError, UiEvent, WizardController, WizardHandle};
pub use http::HttpBackend;
pub use poller::StatusPoller;
