use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use ideaflow_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse,
};
use tokio::time::sleep;

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message, prefixed by the instruction if any.
struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            let Some(last) = req.messages.last() else {
                break 'blk Err(FakeModelProviderError(
                    ErrorKind::InvalidRequest,
                ));
            };
            let ModelMessage::User(text) = last else {
                break 'blk Err(FakeModelProviderError(
                    ErrorKind::InvalidRequest,
                ));
            };
            let reply = match &req.system_instruction {
                Some(instruction) => format!("[{instruction}] You said {text}"),
                None => format!("You said {text}"),
            };
            Ok(ModelResponse::with_text(reply))
        };
        async move {
            sleep(Duration::from_millis(1)).await;
            result
        }
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion() {
        let provider = FakeModelProvider;
        let req = ModelRequest::with_messages([ModelMessage::User(
            "Good morning".to_string(),
        )]);
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(resp.text, "You said Good morning");
    }

    #[tokio::test]
    async fn test_system_instruction_is_separate() {
        let provider = FakeModelProvider;
        let req = ModelRequest::with_messages([
            ModelMessage::User("Hi".to_string()),
            ModelMessage::Assistant("Hello".to_string()),
            ModelMessage::User("Bye".to_string()),
        ])
        .with_system_instruction("be brief");
        assert_eq!(req.messages.len(), 3);
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(resp.text, "[be brief] You said Bye");
    }

    #[tokio::test]
    async fn test_error() {
        let provider = FakeModelProvider;
        let req = ModelRequest::default();
        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_message_serialization() {
        let msg = ModelMessage::Assistant("Sure.".to_string());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "role": "assistant", "text": "Sure." })
        );
        assert_eq!(msg.text(), "Sure.");
    }
}
