use ideaflow_model::ErrorKind;
use serde::{Deserialize, Serialize};

/// A failure the fake endpoint should report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    /// The connection broke.
    Transport,
    /// The endpoint answered with a non-success status.
    Status,
    /// The body lacked the completion text.
    MalformedResponse,
    /// The endpoint never answered in time.
    Timeout,
}

impl PresetFailure {
    pub(crate) fn kind(self) -> ErrorKind {
        match self {
            PresetFailure::Transport => ErrorKind::Transport,
            PresetFailure::Status => ErrorKind::Status,
            PresetFailure::MalformedResponse => ErrorKind::MalformedResponse,
            PresetFailure::Timeout => ErrorKind::Timeout,
        }
    }
}

/// What the fake endpoint answers to one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetOutcome {
    #[serde(rename = "reply")]
    Reply(String),
    #[serde(rename = "failure")]
    Failure(PresetFailure),
}

/// The preset answer for one request in the script.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// The outcome of the request.
    pub outcome: PresetOutcome,
    /// Overrides the provider-wide delay for this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` answering with the given text.
    #[inline]
    pub fn reply<S: Into<String>>(text: S) -> Self {
        Self {
            outcome: PresetOutcome::Reply(text.into()),
            delay_ms: None,
        }
    }

    /// Creates a `PresetResponse` failing with the given failure.
    #[inline]
    pub fn failure(failure: PresetFailure) -> Self {
        Self {
            outcome: PresetOutcome::Failure(failure),
            delay_ms: None,
        }
    }

    /// Delays this response by `delay_ms` milliseconds.
    #[inline]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let script = vec![
            PresetResponse::reply("Who is it for?"),
            PresetResponse::failure(PresetFailure::Status).with_delay_ms(20),
        ];

        let serialized = serde_json::to_string(&script).unwrap();
        assert_eq!(
            serialized,
            r#"[{"outcome":{"type":"reply","data":"Who is it for?"}},{"outcome":{"type":"failure","data":"status"},"delay_ms":20}]"#
        );
        let deserialized: Vec<PresetResponse> =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(script, deserialized);
    }
}
