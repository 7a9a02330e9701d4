use serde::{Deserialize, Serialize};

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model has finished generating text.
    Stop,
    /// The model hit the output token limit.
    MaxTokens,
    /// The reply was cut short by content moderation.
    Moderated,
    /// Any other reason reported by the provider.
    Other,
}

/// A complete reply from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text.
    pub text: String,
    /// Why generation stopped, if the provider reports it.
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelResponse {
    /// Creates a response that stopped normally.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(ModelFinishReason::Stop),
        }
    }
}
