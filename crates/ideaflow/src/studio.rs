use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ideaflow_core::{
    CompletionFailure, ConversationSession, DiagramSource, DiagramStage,
    ExportError, FlowSynthesizer, HandoffError, ModelClient, SessionBuilder,
};
use ideaflow_model::ModelProvider;
use thiserror::Error;

/// The screen the studio is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    /// The welcome screen.
    Landing,
    /// The brainstorming chat.
    Brainstorm,
    /// The user-flow diagram.
    Flow,
}

impl Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Screen::Landing => "landing",
            Screen::Brainstorm => "brainstorm",
            Screen::Flow => "flow",
        })
    }
}

/// Errors returned by [`Studio`].
#[derive(Debug, Error)]
pub enum StudioError {
    /// The call doesn't belong on the current screen.
    #[error("expected the {expected} screen, but the studio is on {actual}")]
    WrongScreen {
        /// The screen the call needs.
        expected: Screen,
        /// The screen the studio is on.
        actual: Screen,
    },
    /// The brainstorm could not be ended.
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    /// The diagram could not be generated.
    #[error(transparent)]
    Completion(#[from] CompletionFailure),
    /// The diagram could not be exported.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// A studio builder.
///
/// See [`Studio`].
pub struct StudioBuilder {
    model_client: ModelClient,
    reveal_interval: Option<Duration>,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl StudioBuilder {
    /// Creates a studio builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            reveal_interval: None,
            on_idle: None,
        }
    }

    /// Sets the delay between two revealed characters.
    #[inline]
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = Some(interval);
        self
    }

    /// Bounds how long each completion request may take.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.model_client = self.model_client.with_timeout(timeout);
        self
    }

    /// Attaches a callback to be invoked when the chat becomes idle after
    /// a reply.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds a new studio on the landing screen.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> Studio {
        let mut session_builder =
            SessionBuilder::with_model_client(self.model_client.clone());
        if let Some(interval) = self.reveal_interval {
            session_builder = session_builder.with_reveal_interval(interval);
        }
        if let Some(on_idle) = self.on_idle {
            session_builder = session_builder.on_idle(on_idle);
        }

        Studio {
            model_client: self.model_client,
            session: session_builder.build(),
            diagram: None,
            screen: Screen::Landing,
        }
    }
}

/// The whole app: a landing screen, a brainstorming chat, and the diagram
/// produced from it.
///
/// The model client is shared by the chat and the diagram stage. Dropping
/// the studio closes the chat session.
pub struct Studio {
    model_client: ModelClient,
    session: ConversationSession,
    diagram: Option<DiagramStage>,
    screen: Screen,
}

impl Studio {
    /// Returns the current screen.
    #[inline]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Returns the brainstorming session.
    #[inline]
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Returns the diagram stage, once the brainstorm has ended.
    #[inline]
    pub fn diagram(&self) -> Option<&DiagramStage> {
        self.diagram.as_ref()
    }

    /// Leaves the landing screen and opens the chat.
    pub fn begin_brainstorm(&mut self) -> Result<(), StudioError> {
        self.expect_screen(Screen::Landing)?;
        self.session.begin();
        self.screen = Screen::Brainstorm;
        debug!("moved to the brainstorm screen");
        Ok(())
    }

    /// Submits the app name and idea.
    pub fn start<N: Into<String>, I: Into<String>>(
        &self,
        app_name: N,
        app_idea: I,
    ) -> Result<(), StudioError> {
        self.expect_screen(Screen::Brainstorm)?;
        self.session.start(app_name, app_idea);
        Ok(())
    }

    /// Sends a chat message.
    pub fn send_message<S: Into<String>>(
        &self,
        text: S,
    ) -> Result<(), StudioError> {
        self.expect_screen(Screen::Brainstorm)?;
        self.session.send_message(text);
        Ok(())
    }

    /// Ends the brainstorm and moves to the flow screen.
    pub async fn end_brainstorm(
        &mut self,
    ) -> Result<&DiagramStage, StudioError> {
        self.expect_screen(Screen::Brainstorm)?;
        let handoff = self.session.end_brainstorm().await?;
        let synthesizer = FlowSynthesizer::new(self.model_client.clone());
        self.screen = Screen::Flow;
        debug!("moved to the flow screen");
        let stage = DiagramStage::new(handoff, synthesizer);
        Ok(&*self.diagram.insert(stage))
    }

    /// Generates the user-flow diagram, replacing the previous one on
    /// success.
    pub async fn generate_flow(
        &mut self,
    ) -> Result<&DiagramSource, StudioError> {
        self.expect_screen(Screen::Flow)?;
        let stage = self.diagram.as_mut().ok_or(StudioError::WrongScreen {
            expected: Screen::Flow,
            actual: self.screen,
        })?;
        Ok(stage.generate().await?)
    }

    /// Exports the latest diagram into `dir`.
    pub async fn export_flow<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<PathBuf, StudioError> {
        self.expect_screen(Screen::Flow)?;
        let stage =
            self.diagram.as_ref().ok_or(ExportError::NothingToExport)?;
        Ok(stage.export_to(dir).await?)
    }

    fn expect_screen(&self, expected: Screen) -> Result<(), StudioError> {
        if self.screen != expected {
            return Err(StudioError::WrongScreen {
                expected,
                actual: self.screen,
            });
        }
        Ok(())
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.session.close();
    }
}
