mod builder;
mod state;
#[cfg(test)]
mod tests;

use ideaflow_actor::Actor;
use tokio::sync::watch;

use crate::conversation::{SessionMetadata, Transcript};
use crate::error::HandoffError;
use crate::handoff::HandoffRecord;
pub use builder::SessionBuilder;
use state::{Begin, SendMessage, SessionState, Start};

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStage {
    /// Nothing has happened yet.
    #[default]
    NotStarted,
    /// The chat is open and waits for the app name and idea.
    AwaitingFirstTurn,
    /// The founder and the model are talking.
    InConversation,
    /// The transcript has been handed off.
    Ended,
}

/// What a session is busy with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Ready for the next message.
    #[default]
    Idle,
    /// A completion request is in flight.
    AwaitingCompletion,
    /// A reply is being revealed.
    Revealing,
}

/// The observable state of a session.
///
/// A new snapshot is published for every change, including every revealed
/// character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub(crate) stage: SessionStage,
    pub(crate) activity: Activity,
    pub(crate) metadata: Option<SessionMetadata>,
    pub(crate) transcript: Transcript,
}

impl SessionSnapshot {
    /// Returns the lifecycle stage.
    #[inline]
    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    /// Returns what the session is busy with.
    #[inline]
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Returns `true` while messages would be ignored.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    /// Returns the app name and idea, once set.
    #[inline]
    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.metadata.as_ref()
    }

    /// Returns the transcript as currently visible.
    ///
    /// It is empty after the session has ended.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

/// A brainstorming chat between a founder and the model.
///
/// The session owns the transcript and is its only writer: messages,
/// completion results and reveal ticks are all processed one at a time on
/// a background actor. Only one completion can be outstanding; messages sent
/// while a request is in flight or a reply is being revealed are ignored.
///
/// Handles are cheap to clone and refer to the same session.
#[derive(Clone)]
pub struct ConversationSession {
    handle: Actor<SessionState>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl ConversationSession {
    /// Opens the chat, so the session waits for the app name and idea.
    pub fn begin(&self) {
        self.post(Begin);
    }

    /// Submits the app name and idea and asks the model for its first reply.
    ///
    /// Ignored when either value is blank, or when the session has already
    /// started.
    pub fn start<N: Into<String>, I: Into<String>>(
        &self,
        app_name: N,
        app_idea: I,
    ) {
        self.post(Start(SessionMetadata::new(app_name, app_idea)));
    }

    /// Sends a user message and asks the model to reply.
    pub fn send_message<S: Into<String>>(&self, text: S) {
        self.post(SendMessage(text.into()));
    }

    /// Ends the brainstorm and hands the transcript off.
    ///
    /// A reply that is still being revealed is completed at once. A reply
    /// that arrives after this call is discarded.
    pub async fn end_brainstorm(&self) -> Result<HandoffRecord, HandoffError> {
        self.handle
            .ask(|state, _| state.end_brainstorm())
            .await
            .map_err(|_| HandoffError::SessionClosed)?
    }

    /// Returns the latest snapshot.
    #[inline]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Returns a receiver that observes every snapshot change.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Tears the session down, cancelling any reveal in progress and any
    /// completion request in flight.
    #[inline]
    pub fn close(&self) {
        self.handle.try_kill();
    }

    /// Returns `true` once the session has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    fn post<M: ideaflow_actor::Message<SessionState>>(&self, msg: M) {
        if self.handle.send(msg).is_err() {
            debug!("session is closed, dropping a message");
        }
    }
}
