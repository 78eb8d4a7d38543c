//! Declarative UI content emitted by workflow states

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// One piece of status content, independent of how it is painted.
///
/// A renderer consumes a fresh `Vec<DetailDirective>` on every render and
/// replaces whatever it showed before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailDirective {
    /// Rich message; may contain inline markup such as `<b>`
    Message { html: String },
    /// Clickable control bound to an action
    Button { label: String, action: Action },
    /// Download link with a leading message
    Link {
        label: String,
        message: String,
        href: String,
    },
    /// Plain text line
    Text { message: String },
}

impl DetailDirective {
    pub fn message(html: impl Into<String>) -> Self {
        Self::Message { html: html.into() }
    }

    pub fn button(label: impl Into<String>, action: Action) -> Self {
        Self::Button {
            label: label.into(),
            action,
        }
    }

    pub fn link(
        message: impl Into<String>,
        label: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        Self::Link {
            label: label.into(),
            message: message.into(),
            href: href.into(),
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self::Text {
            message: message.into(),
        }
    }

    /// Action bound to this directive, if it is a button
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Button { action, .. } => Some(*action),
            _ => None,
        }
    }

    /// Text content with markup tags removed
    pub fn plain_text(&self) -> String {
        match self {
            Self::Message { html } => strip_tags(html),
            Self::Button { label, .. } => label.clone(),
            Self::Link { label, message, .. } => format!("{} {}", strip_tags(message), label),
            Self::Text { message } => message.clone(),
        }
    }
}

/// Remove `<...>` tags from a markup fragment
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
