use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::conversation::{ChatTurn, Transcript};
use crate::error::CompletionFailure;
use crate::model_client::ModelClient;
use crate::prompts::{USER_FLOW_REQUEST_PREFIX, user_flow_instruction};

/// Mermaid flowchart source, as returned by the model.
///
/// The text is kept verbatim. It is neither validated nor rendered here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramSource(String);

impl DiagramSource {
    /// Wraps the given source text.
    #[inline]
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self(source.into())
    }

    /// Returns the source text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the source text, consuming `self`.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for DiagramSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a finished transcript into a user-flow diagram with a single
/// completion request.
#[derive(Clone)]
pub struct FlowSynthesizer {
    model_client: ModelClient,
    instruction: String,
}

impl FlowSynthesizer {
    /// Creates a synthesizer using the default flowchart instruction.
    #[inline]
    pub fn new(model_client: ModelClient) -> Self {
        Self {
            model_client,
            instruction: user_flow_instruction().to_owned(),
        }
    }

    /// Replaces the flowchart instruction.
    #[inline]
    pub fn with_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Asks the model for the user flow described by `transcript`.
    ///
    /// The whole transcript is rendered as plain text into one user turn,
    /// so every speaker label and every turn reaches the model in order.
    pub fn synthesize(
        &self,
        transcript: &Transcript,
    ) -> impl Future<Output = Result<DiagramSource, CompletionFailure>>
    + Send
    + 'static {
        let request = ChatTurn::user(format!(
            "{USER_FLOW_REQUEST_PREFIX}{}",
            transcript.to_plain_text()
        ));
        let fut = self
            .model_client
            .complete(&[request], Some(self.instruction.as_str()));
        async move {
            let source = fut.await?;
            debug!("synthesized {} bytes of diagram source", source.len());
            Ok(DiagramSource(source))
        }
    }
}
