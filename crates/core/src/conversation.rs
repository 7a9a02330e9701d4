//! Conversation-related types.

use std::fmt::{self, Display};
use std::ops::Deref;

use chrono::{DateTime, Utc};
use ideaflow_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// Who produced a [`ChatTurn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The founder typing into the chat.
    User,
    /// The language model.
    Assistant,
}

impl Speaker {
    /// Returns the lowercase name used in serialized transcripts.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

impl Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the brainstorming chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a turn stamped with the current time.
    #[inline]
    pub fn new<S: Into<String>>(speaker: Speaker, text: S) -> Self {
        Self {
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a user turn.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Speaker::User, text)
    }

    /// Creates an assistant turn.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    /// Returns who produced this turn.
    #[inline]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// Returns the visible text of this turn.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns when this turn was appended.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self.speaker {
            Speaker::User => ModelMessage::User(self.text.clone()),
            Speaker::Assistant => ModelMessage::Assistant(self.text.clone()),
        }
    }
}

/// The ordered record of turns in one brainstorming session.
///
/// Callers can only read it. Inside the crate, turns are appended and
/// the trailing assistant turn is grown while its reply is revealed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// Returns the turns, oldest first.
    #[inline]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Renders the transcript as `speaker: text` entries separated by
    /// blank lines.
    pub fn to_plain_text(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub(crate) fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Appends `ch` to the trailing assistant turn.
    ///
    /// Returns `false` if the transcript doesn't end with one.
    pub(crate) fn grow_last(&mut self, ch: char) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.speaker == Speaker::Assistant => {
                turn.text.push(ch);
                true
            }
            _ => false,
        }
    }
}

impl Deref for Transcript {
    type Target = [ChatTurn];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.turns
    }
}

impl From<Vec<ChatTurn>> for Transcript {
    #[inline]
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }
}

/// The app a session brainstorms about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionMetadata {
    app_name: String,
    app_idea: String,
}

impl SessionMetadata {
    /// Creates metadata from a name and an idea.
    #[inline]
    pub fn new<N: Into<String>, I: Into<String>>(
        app_name: N,
        app_idea: I,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_idea: app_idea.into(),
        }
    }

    /// Returns the app name.
    #[inline]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the app idea.
    #[inline]
    pub fn app_idea(&self) -> &str {
        &self.app_idea
    }

    /// Returns `true` if both the name and the idea have visible text.
    #[inline]
    pub fn is_complete(&self) -> bool {
        !self.app_name.trim().is_empty() && !self.app_idea.trim().is_empty()
    }

    /// The user turn that opens every session.
    pub(crate) fn opening_message(&self) -> String {
        format!(
            "App Name: {}\n\nApp Idea: {}",
            self.app_name, self.app_idea
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_keeps_order() {
        let transcript = Transcript::from(vec![
            ChatTurn::user("Hi"),
            ChatTurn::assistant("Hello"),
            ChatTurn::assistant("Hello"),
            ChatTurn::user("Bye"),
        ]);
        assert_eq!(
            transcript.to_plain_text(),
            "user: Hi\n\nassistant: Hello\n\nassistant: Hello\n\nuser: Bye"
        );
    }

    #[test]
    fn test_grow_last_only_touches_assistant() {
        let mut transcript = Transcript::default();
        assert!(!transcript.grow_last('x'));
        transcript.push(ChatTurn::user("Hi"));
        assert!(!transcript.grow_last('x'));
        transcript.push(ChatTurn::assistant(""));
        assert!(transcript.grow_last('o'));
        assert!(transcript.grow_last('k'));
        assert_eq!(transcript[0].text(), "Hi");
        assert_eq!(transcript[1].text(), "ok");
    }

    #[test]
    fn test_opening_message() {
        let metadata =
            SessionMetadata::new("TaskFlow", "A to-do app for teams");
        assert!(metadata.is_complete());
        assert_eq!(
            metadata.opening_message(),
            "App Name: TaskFlow\n\nApp Idea: A to-do app for teams"
        );
        assert!(!SessionMetadata::new("  ", "idea").is_complete());
    }

    #[test]
    fn test_transcript_serializes_as_list() {
        let transcript = Transcript::from(vec![ChatTurn::user("Hi")]);
        let value = serde_json::to_value(&transcript).unwrap();
        let turns = value.as_array().unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0]["speaker"], "user");
        assert_eq!(turns[0]["text"], "Hi");
        let back: Transcript = serde_json::from_value(value).unwrap();
        assert_eq!(back, transcript);
    }
}
