// ABOUTME: Classified form of the JSON messages the Engine streams during build, push and pull.
// ABOUTME: Every operation shares one event type, whether it arrives as wire JSON or a client model.

use serde::Deserialize;
use serde_json::Value;

/// Transport-level failure reported by the stream itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine stream error: {0}")]
pub struct StreamError(pub String);

/// Byte progress of one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProgressDetail {
    pub current: Option<i64>,
    pub total: Option<i64>,
}

impl ProgressDetail {
    /// Size of the layer once `current` has reached `total`.
    pub fn completed_total(&self) -> Option<u64> {
        match (self.current, self.total) {
            (Some(current), Some(total)) if current == total => u64::try_from(total).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// One streamed Engine message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    /// Layer or image the message refers to.
    pub id: Option<String>,
    pub status: Option<String>,
    /// Human-readable progress bar.
    pub progress: Option<String>,
    pub progress_detail: Option<ProgressDetail>,
    pub error_detail: Option<ErrorDetail>,
    /// Legacy error string, sent alongside `errorDetail`.
    pub error: Option<String>,
    /// Build output line.
    pub stream: Option<String>,
    pub aux: Option<Value>,
}

impl EngineEvent {
    /// An event carrying only an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Registry or build error carried by this event, if any.
    pub fn error_message(&self) -> Option<String> {
        match (&self.error_detail, &self.error) {
            (Some(detail), _) => Some(
                detail
                    .message
                    .clone()
                    .or_else(|| self.error.clone())
                    .unwrap_or_else(|| "unknown engine error".to_string()),
            ),
            (None, Some(error)) => Some(error.clone()),
            (None, None) => None,
        }
    }

    /// Image ID announced by a finished build.
    ///
    /// Taken from `aux.ID`, or from the classic builder's
    /// `Successfully built <id>` line.
    pub fn built_image_id(&self) -> Option<String> {
        if let Some(id) = self
            .aux
            .as_ref()
            .and_then(|aux| aux.get("ID"))
            .and_then(Value::as_str)
        {
            return Some(id.to_string());
        }

        self.stream
            .as_deref()
            .and_then(|line| line.trim().strip_prefix("Successfully built "))
            .map(|id| id.trim().to_string())
    }
}
