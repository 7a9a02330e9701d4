use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Instructions delivered on the provider's out-of-band channel.
    ///
    /// This is never mixed into `messages`; providers that lack such a
    /// channel must reject the request instead of inlining it.
    pub system_instruction: Option<String>,
    /// The conversation, oldest message first.
    pub messages: Vec<ModelMessage>,
}

impl ModelRequest {
    /// Creates a request over the given messages without instructions.
    #[inline]
    pub fn with_messages(messages: impl Into<Vec<ModelMessage>>) -> Self {
        Self {
            system_instruction: None,
            messages: messages.into(),
        }
    }

    /// Attaches a system instruction to the request.
    #[inline]
    pub fn with_system_instruction<S: Into<String>>(
        mut self,
        instruction: S,
    ) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// A complete message in a two-party conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "text", rename_all = "lowercase")]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// A text previously produced by the model.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text of this message.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::User(text) | ModelMessage::Assistant(text) => text,
        }
    }
}
