//! Wire types for the backend `/status` endpoint

use serde::{Deserialize, Serialize};

use crate::params::StateParams;

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: String,
    #[serde(default)]
    pub params: StateParams,
}

/// Body of `PATCH /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub state: String,
    #[serde(default)]
    pub params: StateParams,
}

impl StatusUpdate {
    pub fn new(state: impl Into<String>, params: StateParams) -> Self {
        Self {
            state: state.into(),
            params,
        }
    }
}
