use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use ideaflow_model::{ModelProvider, ModelProviderError, ModelRequest};
use tokio::time::timeout;
use tracing::Instrument;

use crate::conversation::ChatTurn;
use crate::error::CompletionFailure;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

type SendRequestResult = Result<String, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that erases its type, bounds every
/// call with a timeout, and speaks in chat turns instead of provider
/// messages.
///
/// Cloning is cheap; clones share the provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Duration,
}

impl ModelClient {
    /// Creates a client around the given provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(resp) => {
                            trace!(
                                "finished a request ({:?})",
                                resp.finish_reason
                            );
                            Ok(resp.text)
                        }
                        Err(err) => {
                            error!("got an error: {err:?}");
                            Err(Box::new(err) as Box<dyn ModelProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long a single completion may take.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the timeout applied to each completion.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Asks the model to continue `conversation`.
    ///
    /// The instruction, when given, is sent on the provider's instruction
    /// channel and never appears among the conversation messages.
    ///
    /// # Cancel safety
    ///
    /// The returned future doesn't borrow its arguments. Dropping it drops
    /// the underlying request.
    pub fn complete(
        &self,
        conversation: &[ChatTurn],
        system_instruction: Option<&str>,
    ) -> impl Future<Output = Result<String, CompletionFailure>> + Send + 'static + use<>
    {
        let request = (!conversation.is_empty()).then(|| ModelRequest {
            system_instruction: system_instruction.map(ToOwned::to_owned),
            messages: conversation
                .iter()
                .map(ChatTurn::to_model_message)
                .collect(),
        });
        let handler_fn = Arc::clone(&self.handler_fn);
        let limit = self.timeout;

        async move {
            let Some(request) = request else {
                return Err(CompletionFailure::EmptyConversation);
            };
            match timeout(limit, handler_fn(request)).await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(err)) => {
                    Err(CompletionFailure::from_provider(err.as_ref(), limit))
                }
                Err(_) => {
                    warn!("completion timed out after {limit:?}");
                    Err(CompletionFailure::Timeout(limit))
                }
            }
        }
    }
}
