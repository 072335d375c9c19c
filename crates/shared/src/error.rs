use serde::{Deserialize, Serialize};

/// Error body the agent host returns on rejected requests.
///
/// Framework-raised errors use `detail` (which may be a string or a list of
/// validation entries), handler-raised ones use `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerErrorBody {
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// Human readable reason, preferring `detail` over `message`.
    pub fn reason(&self) -> Option<String> {
        let detail = match &self.detail {
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        detail
            .or_else(|| self.message.clone())
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
