//! State parameters attached to a workflow transition

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Key/value payload supplied with a transition.
///
/// Equality is structural, so two payloads decoded from separate responses
/// compare equal when their contents match. A `null` payload decodes to an
/// empty map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StateParams(Map<String, Value>);

impl StateParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params carrying a single `message` entry
    pub fn message(message: impl Into<String>) -> Self {
        Self::new().with("message", message.into())
    }

    /// Add an entry, replacing any previous value under the same key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a non-empty string entry
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

impl From<Map<String, Value>> for StateParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for StateParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Option::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}
