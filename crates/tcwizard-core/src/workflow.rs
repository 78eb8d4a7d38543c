//! Workflow state machine
//!
//! Holds the single current state and its params. Every change goes through
//! [`Workflow::enter`], which reports whether the caller must re-render and
//! run the enter side effect.

use tracing::debug;

use crate::action::Action;
use crate::params::StateParams;
use crate::state::{StatusView, UnknownStateError, WorkflowState};

/// Outcome of an [`Workflow::enter`] call
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// State or params changed; paint this view and run the enter side effect
    Entered(StatusView),
    /// Same state with structurally equal params; nothing to do
    Unchanged,
}

impl Transition {
    pub fn is_entered(&self) -> bool {
        matches!(self, Transition::Entered(_))
    }
}

/// Owner of the current workflow state
#[derive(Debug, Clone)]
pub struct Workflow {
    current: WorkflowState,
    params: StateParams,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    /// Start in `loading` with no params; nothing has been rendered yet
    pub fn new() -> Self {
        Self {
            current: WorkflowState::Loading,
            params: StateParams::new(),
        }
    }

    pub fn current(&self) -> WorkflowState {
        self.current
    }

    pub fn params(&self) -> &StateParams {
        &self.params
    }

    /// Enter the state registered under `name`
    pub fn enter(
        &mut self,
        name: &str,
        params: StateParams,
    ) -> Result<Transition, UnknownStateError> {
        let state = WorkflowState::from_name(name)?;
        Ok(self.enter_state(state, params))
    }

    /// Enter `state`, skipping the transition when nothing would change
    pub fn enter_state(&mut self, state: WorkflowState, params: StateParams) -> Transition {
        if state == self.current && params == self.params {
            return Transition::Unchanged;
        }

        debug!(from = %self.current, to = %state, "Workflow transition");
        self.current = state;
        self.params = params;
        Transition::Entered(self.view())
    }

    /// Presentation of the current state
    pub fn view(&self) -> StatusView {
        self.current.view(&self.params)
    }

    pub fn permits(&self, action: Action) -> bool {
        self.current.permits(action)
    }
}
