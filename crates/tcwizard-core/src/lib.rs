//! tcwizard Core - Workflow states, presentation model, and firmware intake
//!
//! This crate provides the pure, I/O-free side of the conversion wizard:
//! - Workflow states and the presentation table (icon, label, spin)
//! - Detail directives that describe what a renderer should paint
//! - The workflow state machine with structural de-duplication
//! - Firmware validation and the staging model behind the flash gate
//! - Wire types for the backend status endpoint

pub mod action;
pub mod directive;
pub mod firmware;
pub mod params;
pub mod staging;
pub mod state;
pub mod status;
pub mod workflow;

pub use action::Action;
pub use directive::{strip_tags, DetailDirective};
pub use firmware::{
    check_firmware_url, validate, FirmwareCandidate, FirmwareOrigin, ValidationVerdict,
};
pub use params::StateParams;
pub use staging::{FirmwareDetails, FirmwarePanelView, FirmwareSource, FirmwareStaging, Ticket};
pub use state::{StatusView, UnknownStateError, WorkflowState};
pub use status::{StatusReport, StatusUpdate};
pub use workflow::{Transition, Workflow};
