use std::time::Duration;

use ideaflow_actor::Actor;
use ideaflow_model::ModelProvider;

use super::ConversationSession;
use super::state::SessionState;
use crate::model_client::ModelClient;
use crate::prompts;
use crate::reveal::DEFAULT_REVEAL_INTERVAL;

/// [`ConversationSession`] builder.
pub struct SessionBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) persona: String,
    pub(crate) reveal_interval: Duration,
    pub(crate) on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder sharing an existing model client.
    #[inline]
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            persona: prompts::brainstorm_persona().to_owned(),
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            on_idle: None,
        }
    }

    /// Replaces the instruction sent with the first request.
    #[inline]
    pub fn with_persona<S: Into<String>>(mut self, persona: S) -> Self {
        self.persona = persona.into();
        self
    }

    /// Sets the delay between two revealed characters. Zero shows replies
    /// at once.
    #[inline]
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    /// Bounds how long each completion request may take.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.model_client = self.model_client.with_timeout(timeout);
        self
    }

    /// Attaches a callback to be invoked whenever the session becomes idle
    /// after handling a reply.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the session.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[inline]
    pub fn build(self) -> ConversationSession {
        let (state, snapshot_rx) = SessionState::from_builder(self);
        let handle = Actor::spawn(state, Some("session"));
        ConversationSession {
            handle,
            snapshot_rx,
        }
    }
}
